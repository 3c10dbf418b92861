//! MIDI operators
//!
//! An operator inspects a set of notes and stages its edits into a diff
//! command; the caller decides whether to apply or abort.

use ng_core::{Beats, Note};

use crate::{NoteChange, NoteDiffCommand};

/// A batch transformation over notes
pub trait MidiOperator {
    fn name(&self) -> &str;

    /// Stage edits for `notes` into `cmd`
    fn apply(&self, notes: &[Note], cmd: &mut NoteDiffCommand);
}

/// Grid quantize with strength, swing and threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantize {
    pub snap_start: bool,
    pub snap_end: bool,
    pub start_grid: Beats,
    pub end_grid: Beats,
    /// 0.0 leaves notes alone, 1.0 moves them fully onto the grid
    pub strength: f64,
    /// Fraction of a grid step to delay odd grid points by
    pub swing: f64,
    /// Notes closer than this to their target are left alone
    pub threshold: Beats,
}

impl Quantize {
    pub fn new(grid: Beats) -> Self {
        Self {
            snap_start: true,
            snap_end: false,
            start_grid: grid,
            end_grid: grid,
            strength: 1.0,
            swing: 0.0,
            threshold: Beats::ZERO,
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength.clamp(0.0, 1.0);
        self
    }

    pub fn with_swing(mut self, swing: f64) -> Self {
        self.swing = swing.clamp(0.0, 1.0);
        self
    }

    pub fn with_threshold(mut self, threshold: Beats) -> Self {
        self.threshold = threshold.max(Beats::ZERO);
        self
    }

    pub fn with_end(mut self, end_grid: Beats) -> Self {
        self.snap_end = true;
        self.end_grid = end_grid;
        self
    }

    /// Grid target for a start position, swing included
    fn start_target(&self, time: Beats) -> Beats {
        let grid = self.start_grid;
        let snapped = time.round_to_multiple(grid);
        if self.swing > 0.0 && (snapped.ticks() / grid.ticks()) % 2 == 1 {
            snapped + Beats::from_ticks((grid.ticks() as f64 * self.swing).round() as i64)
        } else {
            snapped
        }
    }

    /// Move `from` toward `to` by strength, honouring the threshold
    fn pull(&self, from: Beats, to: Beats) -> Beats {
        let delta = to - from;
        if delta.abs() < self.threshold {
            return from;
        }
        from + Beats::from_ticks((delta.ticks() as f64 * self.strength).round() as i64)
    }
}

impl MidiOperator for Quantize {
    fn name(&self) -> &str {
        "quantize"
    }

    fn apply(&self, notes: &[Note], cmd: &mut NoteDiffCommand) {
        let start_ok = self.snap_start && self.start_grid.ticks() > 0;
        let end_ok = self.snap_end && self.end_grid.ticks() > 0;

        for note in notes {
            let mut new_start = note.time;
            if start_ok {
                new_start = self.pull(note.time, self.start_target(note.time));
                if new_start != note.time {
                    cmd.change(note.id, NoteChange::StartTime(new_start));
                }
            }

            if end_ok && !note.is_unterminated() {
                let end = note.end_time();
                let new_end = self.pull(end, end.round_to_multiple(self.end_grid));
                let mut new_length = new_end - new_start;
                if new_length <= Beats::ZERO {
                    new_length = self.end_grid;
                }
                if new_length != note.length {
                    cmd.change(note.id, NoteChange::Length(new_length));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MidiModel;

    fn quantized(op: &Quantize, notes: Vec<Note>) -> Vec<Note> {
        let model = MidiModel::from_notes(notes.clone());
        let mut cmd = model.new_diff_command(op.name());
        op.apply(&notes, &mut cmd);
        cmd.apply(false).unwrap();
        notes.iter().filter_map(|n| model.note(n.id)).collect()
    }

    #[test]
    fn test_full_strength() {
        let n = Note::new(0, Beats::from_ticks(250), Beats::ONE_BEAT, 60, 100);
        let out = quantized(&Quantize::new(Beats::from_ticks(240)), vec![n]);
        assert_eq!(out[0].time, Beats::from_ticks(240));
        assert_eq!(out[0].length, Beats::ONE_BEAT);
    }

    #[test]
    fn test_half_strength() {
        let n = Note::new(0, Beats::from_ticks(300), Beats::ONE_BEAT, 60, 100);
        let op = Quantize::new(Beats::from_ticks(240)).with_strength(0.5);
        let out = quantized(&op, vec![n]);
        assert_eq!(out[0].time, Beats::from_ticks(270));
    }

    #[test]
    fn test_threshold_leaves_close_notes() {
        let n = Note::new(0, Beats::from_ticks(245), Beats::ONE_BEAT, 60, 100);
        let op = Quantize::new(Beats::from_ticks(240)).with_threshold(Beats::from_ticks(10));
        let out = quantized(&op, vec![n]);
        assert_eq!(out[0].time, Beats::from_ticks(245));
    }

    #[test]
    fn test_swing_delays_odd_points() {
        let n = Note::new(0, Beats::from_ticks(470), Beats::ONE_BEAT, 60, 100);
        let op = Quantize::new(Beats::from_ticks(480)).with_swing(0.5);
        let out = quantized(&op, vec![n]);
        assert_eq!(out[0].time, Beats::from_ticks(720));
    }

    #[test]
    fn test_end_snap() {
        let n = Note::new(0, Beats::ZERO, Beats::from_ticks(500), 60, 100);
        let op = Quantize::new(Beats::from_ticks(240)).with_end(Beats::from_ticks(240));
        let out = quantized(&op, vec![n]);
        assert_eq!(out[0].length, Beats::from_ticks(480));
    }
}
