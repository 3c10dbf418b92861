//! Time conversion between the absolute sample timeline and region-relative beats

use serde::{Deserialize, Serialize};

use crate::{Beats, GridValue, MidiRegion, SamplePosition};

/// Converts between absolute sample positions and absolute beat positions.
///
/// Implemented by [`crate::TempoMap`]; hosts with their own tempo
/// machinery can implement it directly.
pub trait TimeConverter: Send + Sync {
    fn samples_to_beats(&self, position: SamplePosition) -> Beats;
    fn beats_to_samples(&self, beats: Beats) -> SamplePosition;

    /// Length of a grid division; bars are 4/4 unless the converter knows the meter
    fn grid_length(&self, grid: GridValue) -> Beats {
        grid.to_beats()
    }
}

/// Rounding direction used when snapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoundMode {
    #[default]
    Nearest,
    Down,
    Up,
}

/// Snap policy applied to a beat position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Snap {
    /// Leave the position untouched
    #[default]
    None,
    /// Round to a multiple of `step`
    Grid { step: Beats, mode: RoundMode },
}

impl Snap {
    pub fn nearest(step: Beats) -> Self {
        Self::Grid {
            step,
            mode: RoundMode::Nearest,
        }
    }

    pub fn down(step: Beats) -> Self {
        Self::Grid {
            step,
            mode: RoundMode::Down,
        }
    }

    pub fn up(step: Beats) -> Self {
        Self::Grid {
            step,
            mode: RoundMode::Up,
        }
    }

    /// Grid step, if any
    pub fn step(&self) -> Option<Beats> {
        match self {
            Snap::None => None,
            Snap::Grid { step, .. } if step.ticks() > 0 => Some(*step),
            Snap::Grid { .. } => None,
        }
    }

    pub fn apply(&self, beats: Beats) -> Beats {
        match *self {
            Snap::None => beats,
            Snap::Grid { step, mode } => match mode {
                RoundMode::Nearest => beats.round_to_multiple(step),
                RoundMode::Down => beats.round_down_to_multiple(step),
                RoundMode::Up => beats.round_up_to_multiple(step),
            },
        }
    }
}

/// Converts between absolute time and a region's source-relative beats.
///
/// Snapping happens on the absolute beat grid, so snapped notes line up with
/// the session grid regardless of where the region starts.
pub struct RegionConverter<'a> {
    converter: &'a dyn TimeConverter,
    region: &'a MidiRegion,
}

impl<'a> RegionConverter<'a> {
    pub fn new(converter: &'a dyn TimeConverter, region: &'a MidiRegion) -> Self {
        Self { converter, region }
    }

    /// Absolute beat position of the region's first sample
    pub fn region_position_beats(&self) -> Beats {
        self.converter.samples_to_beats(self.region.position)
    }

    /// Absolute sample position -> source-relative beats
    pub fn to_beats(&self, position: SamplePosition, snap: Snap) -> Beats {
        let absolute = snap.apply(self.converter.samples_to_beats(position));
        self.absolute_beats_to_source(absolute)
    }

    /// Source-relative beats -> absolute sample position
    pub fn to_absolute(&self, source_beats: Beats) -> SamplePosition {
        self.converter
            .beats_to_samples(self.source_beats_to_absolute(source_beats))
    }

    pub fn source_beats_to_absolute(&self, source_beats: Beats) -> Beats {
        source_beats - self.region.start + self.region_position_beats()
    }

    pub fn absolute_beats_to_source(&self, absolute: Beats) -> Beats {
        absolute - self.region_position_beats() + self.region.start
    }

    /// Snap a source-relative position on the absolute grid
    pub fn snap_source_beats(&self, source_beats: Beats, snap: Snap) -> Beats {
        let absolute = self.source_beats_to_absolute(source_beats);
        self.absolute_beats_to_source(snap.apply(absolute))
    }

    /// Samples from the region start to a source-relative position
    pub fn region_offset_samples(&self, source_beats: Beats) -> i64 {
        self.to_absolute(source_beats).0 as i64 - self.region.position.0 as i64
    }

    /// Beat distance covered by `samples` starting at an absolute anchor
    pub fn distance_beats(&self, anchor: SamplePosition, samples: u64) -> Beats {
        self.converter.samples_to_beats(anchor + samples) - self.converter.samples_to_beats(anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TempoMap, PPQ};

    fn region() -> MidiRegion {
        // Region placed at beat 2 (48000 samples @ 120bpm/48k), reading the source from beat 1
        MidiRegion::new("r", SamplePosition(48000), Beats::ONE_BEAT, Beats::from_beats(4))
    }

    #[test]
    fn test_region_round_trip() {
        let map = TempoMap::new(48000);
        let region = region();
        let conv = RegionConverter::new(&map, &region);

        assert_eq!(conv.region_position_beats(), Beats::from_beats(2));
        // Source beat 1 sits at the region start
        assert_eq!(conv.to_absolute(Beats::ONE_BEAT), SamplePosition(48000));
        assert_eq!(conv.to_beats(SamplePosition(48000), Snap::None), Beats::ONE_BEAT);
        assert_eq!(conv.region_offset_samples(Beats::from_beats(2)), 24000);
    }

    #[test]
    fn test_snap_modes() {
        let step = Beats::from_ticks(PPQ / 4);
        let b = Beats::from_ticks(PPQ / 4 + 10);
        assert_eq!(Snap::nearest(step).apply(b), step);
        assert_eq!(Snap::down(step).apply(b), step);
        assert_eq!(Snap::up(step).apply(b), step * 2);
        assert_eq!(Snap::None.apply(b), b);
        assert_eq!(Snap::nearest(Beats::ZERO).step(), None);
    }

    #[test]
    fn test_distance_beats() {
        let map = TempoMap::new(48000);
        let region = region();
        let conv = RegionConverter::new(&map, &region);
        assert_eq!(conv.distance_beats(SamplePosition(0), 12000), Beats::from_ticks(PPQ / 2));
    }
}
