//! Paste from a cut buffer

use ng_core::{Beats, SamplePosition, Snap};

use crate::{CutBuffer, MidiView};

impl MidiView {
    /// Paste `times` copies of the buffer at `position`.
    ///
    /// The buffer's span is rounded up to the grid so repeats tile without
    /// overlapping; `paste_count` offsets by that many spans, for repeated
    /// pastes at the same spot. Pasted notes become the selection and the
    /// region grows to hold them.
    pub fn paste_internal(
        &mut self,
        position: SamplePosition,
        paste_count: u32,
        times: u32,
        buffer: &CutBuffer,
    ) -> bool {
        let Some(first) = buffer.start() else {
            return false;
        };
        if times == 0 {
            return false;
        }

        let step = self.grid_beats().unwrap_or(Beats::ONE_TICK);
        let span = buffer.span().round_up_to_multiple(step).max(step);
        let mut origin = (self.converter().to_beats(position, Snap::None)
            + span * paste_count as i64)
            .max(Beats::ZERO);

        self.clear_selection_internal();
        self.start_note_diff_command("paste");
        let mut end = Beats::ZERO;
        for _ in 0..times {
            for note in buffer.notes() {
                let mut copy = note.duplicate();
                copy.time = origin + (note.time - first);
                end = end.max(copy.end_time());
                self.note_diff_add_note(copy, true);
            }
            origin += span;
        }

        let previous_length = self.region.length;
        self.extend_region(end);
        if !self.apply_note_diff(false) {
            self.restore_region_length(previous_length);
            self.flush_events();
            return false;
        }
        self.flush_events();
        true
    }

    /// Paste once at `position`
    pub fn paste(&mut self, position: SamplePosition, buffer: &CutBuffer) -> bool {
        self.paste_internal(position, 0, 1, buffer)
    }
}
