//! Row quantization
//!
//! Maps source-relative beat positions onto tracker rows at a given
//! rows-per-beat resolution. All arithmetic is exact integer math on ticks.

use ng_core::{Beats, MAX_ROWS_PER_BEAT, MidiRegion, PPQ};

/// Row grid covering a region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowGrid {
    rows_per_beat: u32,
    first: Beats,
    last: Beats,
    nrows: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Integer rounding helpers (denominator > 0)
// ─────────────────────────────────────────────────────────────────────────────

fn div_nearest(n: i128, d: i128) -> i128 {
    (2 * n + d).div_euclid(2 * d)
}

fn div_floor(n: i128, d: i128) -> i128 {
    n.div_euclid(d)
}

fn div_ceil(n: i128, d: i128) -> i128 {
    -((-n).div_euclid(d))
}

fn to_row_index(row: i128) -> i64 {
    row.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

impl RowGrid {
    /// Grid spanning the region, with first/last snapped to the nearest row.
    ///
    /// Resolution is clamped to `1..=MAX_ROWS_PER_BEAT` so every row covers
    /// at least one tick.
    pub fn new(rows_per_beat: u32, region: &MidiRegion) -> Self {
        let rows_per_beat = rows_per_beat.clamp(1, MAX_ROWS_PER_BEAT);
        let first = Self::snap(rows_per_beat, region.start);
        let last = Self::snap(rows_per_beat, region.end_beats()).max(first);
        let span = (last - first).ticks() as i128;
        let nrows = div_nearest(span * rows_per_beat as i128, PPQ as i128);
        Self {
            rows_per_beat,
            first,
            last,
            nrows: nrows.clamp(0, u32::MAX as i128) as u32,
        }
    }

    /// Grid with no rows
    pub fn empty(rows_per_beat: u32, region: &MidiRegion) -> Self {
        let rows_per_beat = rows_per_beat.clamp(1, MAX_ROWS_PER_BEAT);
        let first = Self::snap(rows_per_beat, region.start);
        Self {
            rows_per_beat,
            first,
            last: first,
            nrows: 0,
        }
    }

    /// Round a position to the nearest row boundary
    fn snap(rows_per_beat: u32, beats: Beats) -> Beats {
        let rpb = rows_per_beat as i128;
        let row = div_nearest(beats.ticks() as i128 * rpb, PPQ as i128);
        Beats::from_ticks(div_nearest(row * PPQ as i128, rpb) as i64)
    }

    pub fn rows_per_beat(&self) -> u32 {
        self.rows_per_beat
    }

    pub fn first(&self) -> Beats {
        self.first
    }

    pub fn last(&self) -> Beats {
        self.last
    }

    pub fn nrows(&self) -> u32 {
        self.nrows
    }

    /// Is `row` a displayed row?
    pub fn contains_row(&self, row: i64) -> bool {
        row >= 0 && row < self.nrows as i64
    }

    fn scaled_offset(&self, beats: Beats) -> i128 {
        (beats.ticks() as i128 - self.first.ticks() as i128) * self.rows_per_beat as i128
    }

    /// Nearest row
    pub fn row_at_beats(&self, beats: Beats) -> i64 {
        to_row_index(div_nearest(self.scaled_offset(beats), PPQ as i128))
    }

    /// Row rounded up: an event off the row boundary lands on the later row
    pub fn row_at_beats_min_delay(&self, beats: Beats) -> i64 {
        to_row_index(div_ceil(self.scaled_offset(beats), PPQ as i128))
    }

    /// Row rounded down: an event off the row boundary lands on the earlier row
    pub fn row_at_beats_max_delay(&self, beats: Beats) -> i64 {
        to_row_index(div_floor(self.scaled_offset(beats), PPQ as i128))
    }

    /// Nominal position of a row
    pub fn beats_at_row(&self, row: i64) -> Beats {
        let offset = div_nearest(row as i128 * PPQ as i128, self.rows_per_beat as i128);
        Beats::from_ticks((self.first.ticks() as i128 + offset) as i64)
    }

    /// Offset of `beats` from the nominal time of `row`, in ticks
    pub fn delay_ticks(&self, beats: Beats, row: i64) -> i64 {
        (beats - self.beats_at_row(row)).ticks()
    }

    /// Length of one row
    pub fn row_length(&self) -> Beats {
        Beats::from_ticks(div_nearest(PPQ as i128, self.rows_per_beat as i128) as i64)
    }
}
