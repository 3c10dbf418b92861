//! Recording-time visuals
//!
//! Between [`MidiView::begin_write`] and [`MidiView::end_write`] the view
//! tracks which note is sounding on each pitch. A second note-on for a
//! pitch closes the previous visual where the new one starts.

use ng_core::{Beats, Note, NoteNumber, SamplePosition};

use crate::{ActiveNotes, MidiView, NoteVisual};

impl MidiView {
    /// Start a recording pass
    pub fn begin_write(&mut self) {
        self.active_notes = Some(ActiveNotes::new());
    }

    /// End a recording pass; visuals still sounding are closed where they reached
    pub fn end_write(&mut self) {
        let Some(active) = self.active_notes.take() else {
            return;
        };
        for (pitch, id) in active.iter() {
            if let Some(v) = self.visuals.get_mut(&id)
                && let NoteVisual::Sustained(rect) = &mut v.visual
            {
                rect.outline_right = true;
                log::debug!("Note {} on pitch {} still sounding at end of pass", id, pitch);
            }
        }
    }

    pub fn is_writing(&self) -> bool {
        self.active_notes.is_some()
    }

    pub fn active_notes(&self) -> Option<&ActiveNotes> {
        self.active_notes.as_ref()
    }

    /// Register a new sounding note, closing whatever was sounding on its pitch
    pub(crate) fn track_active_note(&mut self, note: &Note) {
        let displaced = match self.active_notes.as_mut() {
            Some(active) => active.start(note.note, note.id),
            None => return,
        };
        let Some(previous) = displaced else {
            return;
        };

        let x = self.beats_to_x(note.time);
        if let Some(v) = self.visuals.get_mut(&previous)
            && let NoteVisual::Sustained(rect) = &mut v.visual
        {
            rect.x1 = x.max(rect.x0);
            rect.outline_right = true;
        }
        log::debug!(
            "Stuck note {} on pitch {} closed at {}",
            previous,
            note.note,
            note.time
        );
    }

    /// Close the sounding visual on `pitch` at `end`
    pub fn resolve_note(&mut self, pitch: NoteNumber, end: Beats) -> bool {
        let Some(id) = self.active_notes.as_mut().and_then(|a| a.resolve(pitch)) else {
            return false;
        };
        let x = self.beats_to_x(end);
        if let Some(v) = self.visuals.get_mut(&id)
            && let NoteVisual::Sustained(rect) = &mut v.visual
        {
            rect.x1 = x.max(rect.x0);
            rect.outline_right = true;
        }
        true
    }

    /// Stretch every sounding visual to the record head
    pub fn extend_active_notes(&mut self, record_head: SamplePosition) {
        let Some(active) = self.active_notes.as_ref() else {
            return;
        };
        let ids: Vec<_> = active.iter().map(|(_, id)| id).collect();
        let x = self
            .mapping
            .offset_to_x(record_head.0 as i64 - self.region.position.0 as i64);

        for id in ids {
            if let Some(v) = self.visuals.get_mut(&id)
                && let NoteVisual::Sustained(rect) = &mut v.visual
            {
                rect.x1 = x.max(rect.x0);
            }
        }
    }
}
