//! Tracker Pattern
//!
//! Distributes a region's notes across non-overlapping lanes and records,
//! per lane, which rows hold note-on and note-off events.
//!
//! Lane assignment is greedy first-fit over notes in a strict total order,
//! which is optimal for interval partitioning when processed by start time.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use ng_core::{Beats, MidiChannel, MidiRegion, Note, NoteId, NoteNumber, Velocity};

use crate::RowGrid;

/// One note boundary placed in a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowEvent {
    pub id: NoteId,
    pub note: NoteNumber,
    pub channel: MidiChannel,
    /// Note-on velocity for ons, release velocity for offs
    pub velocity: Velocity,
    /// Offset from the row's nominal time, in ticks
    pub delay: i64,
}

/// Events of one lane in one row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowCell {
    pub on: Vec<RowEvent>,
    pub off: Vec<RowEvent>,
}

impl RowCell {
    pub fn is_empty(&self) -> bool {
        self.on.is_empty() && self.off.is_empty()
    }
}

/// A set of notes that never overlap in time
#[derive(Debug, Clone, Default)]
pub struct Lane {
    notes: Vec<Note>,
    rows: BTreeMap<u32, RowCell>,
}

impl Lane {
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn rows(&self) -> &BTreeMap<u32, RowCell> {
        &self.rows
    }

    pub fn cell(&self, row: u32) -> Option<&RowCell> {
        self.rows.get(&row)
    }

    /// End of the most recently assigned note
    fn end(&self) -> Option<Beats> {
        self.notes.last().map(Note::end_time)
    }

    fn is_free_at(&self, start: Beats) -> bool {
        self.end().is_none_or(|end| end <= start)
    }
}

/// Strict ordering used for lane assignment
fn assignment_order(a: &Note, b: &Note) -> Ordering {
    a.time
        .cmp(&b.time)
        .then(a.length.cmp(&b.length))
        .then(a.note.cmp(&b.note))
        .then(a.channel.cmp(&b.channel))
        .then(a.velocity.cmp(&b.velocity))
        .then(a.off_velocity.cmp(&b.off_velocity))
        .then(a.id.cmp(&b.id))
}

/// Lane assignment and row layout of a region
#[derive(Debug, Clone)]
pub struct TrackerPattern {
    grid: RowGrid,
    lanes: Vec<Lane>,
}

impl TrackerPattern {
    /// Lay out the notes that start inside the region
    pub fn build(notes: &[Note], region: &MidiRegion, rows_per_beat: u32) -> Self {
        let mut in_region: Vec<Note> = notes
            .iter()
            .filter(|n| region.contains(n.time))
            .copied()
            .collect();

        if in_region.is_empty() {
            return Self {
                grid: RowGrid::empty(rows_per_beat, region),
                lanes: Vec::new(),
            };
        }

        in_region.sort_by(assignment_order);

        let grid = RowGrid::new(rows_per_beat, region);
        let mut lanes: Vec<Lane> = Vec::new();

        for note in in_region {
            let lane_idx = match lanes.iter().position(|l| l.is_free_at(note.time)) {
                Some(idx) => idx,
                None => {
                    lanes.push(Lane::default());
                    lanes.len() - 1
                }
            };
            let lane = &mut lanes[lane_idx];
            lane.notes.push(note);
            place_note(&grid, lane, &note);
        }

        log::trace!(
            "Tracker pattern: {} lanes, {} rows @ {} rows/beat",
            lanes.len(),
            grid.nrows(),
            grid.rows_per_beat()
        );

        Self { grid, lanes }
    }

    /// Recompute from scratch at a new resolution
    pub fn rebuild(&mut self, notes: &[Note], region: &MidiRegion, rows_per_beat: u32) {
        *self = Self::build(notes, region, rows_per_beat);
    }

    pub fn grid(&self) -> &RowGrid {
        &self.grid
    }

    pub fn nrows(&self) -> u32 {
        self.grid.nrows()
    }

    pub fn nlanes(&self) -> usize {
        self.lanes.len()
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn lane(&self, idx: usize) -> Option<&Lane> {
        self.lanes.get(idx)
    }

    /// Lane holding a note
    pub fn lane_of(&self, id: NoteId) -> Option<usize> {
        self.lanes
            .iter()
            .position(|l| l.notes.iter().any(|n| n.id == id))
    }
}

/// Compute on/off rows for a note and record them in its lane
fn place_note(grid: &RowGrid, lane: &mut Lane, note: &Note) {
    let mut on_row = grid.row_at_beats(note.time);
    let mut off_row = (!note.is_unterminated()).then(|| grid.row_at_beats(note.end_time()));

    // On and off collide: prefer on earlier, off later
    if let Some(off) = off_row
        && off == on_row
    {
        on_row = grid.row_at_beats_max_delay(note.time);
        off_row = Some(grid.row_at_beats_min_delay(note.end_time()));
    }

    // A start in the last half row rounds past the grid: keep it on the last row
    let last_row = grid.nrows() as i64 - 1;
    if on_row > last_row && last_row >= 0 {
        on_row = grid.row_at_beats_max_delay(note.time).min(last_row);
    }

    if grid.contains_row(on_row) {
        lane.rows.entry(on_row as u32).or_default().on.push(RowEvent {
            id: note.id,
            note: note.note,
            channel: note.channel,
            velocity: note.velocity,
            delay: grid.delay_ticks(note.time, on_row),
        });
    }

    if let Some(off) = off_row
        && grid.contains_row(off)
    {
        lane.rows.entry(off as u32).or_default().off.push(RowEvent {
            id: note.id,
            note: note.note,
            channel: note.channel,
            velocity: note.off_velocity,
            delay: grid.delay_ticks(note.end_time(), off),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ng_core::SamplePosition;

    fn region(length: f64) -> MidiRegion {
        MidiRegion::new("r", SamplePosition::ZERO, Beats::ZERO, Beats::from_f64(length))
    }

    fn note(start: f64, length: f64, pitch: i32) -> Note {
        Note::new(0, Beats::from_f64(start), Beats::from_f64(length), pitch, 100)
    }

    #[test]
    fn test_basic_assignment() {
        let a = note(0.0, 1.0, 60);
        let b = note(0.5, 1.0, 64);
        let c = note(2.0, 0.5, 60);
        let pattern = TrackerPattern::build(&[c, b, a], &region(2.5), 4);

        assert_eq!(pattern.nlanes(), 2);
        assert_eq!(pattern.nrows(), 10);
        assert_eq!(pattern.lane_of(a.id), Some(0));
        assert_eq!(pattern.lane_of(b.id), Some(1));
        assert_eq!(pattern.lane_of(c.id), Some(0));

        let lane0 = pattern.lane(0).unwrap();
        assert_eq!(lane0.cell(0).unwrap().on[0].id, a.id);
        assert_eq!(lane0.cell(4).unwrap().off[0].id, a.id);
        assert_eq!(lane0.cell(8).unwrap().on[0].id, c.id);
        // C ends exactly at the region end: row 10 is outside the grid
        assert!(lane0.cell(10).is_none());
    }

    #[test]
    fn test_empty_pattern() {
        let pattern = TrackerPattern::build(&[], &region(4.0), 4);
        assert_eq!(pattern.nlanes(), 0);
        assert_eq!(pattern.nrows(), 0);
    }

    #[test]
    fn test_notes_outside_region_ignored() {
        let pattern = TrackerPattern::build(&[note(5.0, 1.0, 60)], &region(4.0), 4);
        assert_eq!(pattern.nlanes(), 0);
    }

    #[test]
    fn test_short_note_splits_rows() {
        // 10 ticks long, inside row 1
        let n = Note::new(0, Beats::from_ticks(245), Beats::from_ticks(10), 60, 100);
        let pattern = TrackerPattern::build(&[n], &region(4.0), 4);
        let lane = pattern.lane(0).unwrap();
        assert_eq!(lane.cell(1).unwrap().on.len(), 1);
        assert_eq!(lane.cell(2).unwrap().off.len(), 1);
    }

    #[test]
    fn test_zero_length_on_row_shares_cell() {
        let n = Note::new(0, Beats::from_ticks(240), Beats::ZERO, 60, 100);
        let pattern = TrackerPattern::build(&[n], &region(4.0), 4);
        let cell = pattern.lane(0).unwrap().cell(1).unwrap();
        assert_eq!(cell.on.len(), 1);
        assert_eq!(cell.off.len(), 1);
    }

    #[test]
    fn test_unterminated_note_blocks_lane() {
        let held = Note::unterminated(0, Beats::ZERO, 60, 100);
        let later = note(2.0, 1.0, 62);
        let pattern = TrackerPattern::build(&[held, later], &region(4.0), 4);
        assert_eq!(pattern.nlanes(), 2);
        assert!(pattern.lane(0).unwrap().rows().values().all(|c| c.off.is_empty()));
    }

    #[test]
    fn test_start_near_region_end_keeps_last_row() {
        // 2.45 beats rounds to row 10, one past the last row
        let n = note(2.45, 1.0, 60);
        let pattern = TrackerPattern::build(&[n], &region(2.5), 4);
        assert_eq!(pattern.nrows(), 10);
        assert_eq!(pattern.lane_of(n.id), Some(0));

        let lane = pattern.lane(0).unwrap();
        let ev = lane.cell(9).unwrap().on[0];
        assert_eq!(ev.id, n.id);
        assert_eq!(ev.delay, 192);
        assert_eq!(lane.rows().len(), 1);

        let matrix = crate::TrackerMatrix::from_pattern(&pattern);
        assert!(matches!(matrix.cell(9, 0), Some(crate::TrackerCell::On(ev)) if ev.id == n.id));
    }

    #[test]
    fn test_delay_recorded() {
        let n = Note::new(0, Beats::from_ticks(250), Beats::ONE_BEAT, 60, 100);
        let pattern = TrackerPattern::build(&[n], &region(4.0), 4);
        let ev = pattern.lane(0).unwrap().cell(1).unwrap().on[0];
        assert_eq!(ev.delay, 10);
    }
}
