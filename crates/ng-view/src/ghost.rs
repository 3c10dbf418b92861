//! Ghost note
//!
//! A single preview note that follows the pointer while drawing. It is
//! hidden, not destroyed, when the pointer leaves the region bounds.

use ng_core::{Beats, Note, NoteMode, SamplePosition};

use crate::{MidiView, NoteVisual};

/// Preview of the note a click would create
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostNote {
    pub note: Note,
    pub visual: NoteVisual,
    pub hidden: bool,
}

impl MidiView {
    pub fn ghost(&self) -> Option<&GhostNote> {
        self.ghost.as_ref()
    }

    /// Show the ghost under the pointer (replaces an existing one)
    pub fn create_ghost_note(&mut self, x: f64, y: f64) {
        let length = self.draw_length_beats();
        let note = Note::new(
            self.config.default_channel as i32,
            self.region.start,
            length,
            self.mapping.y_to_note(y) as i32,
            self.config.default_velocity as i32,
        );
        let visual = self.build_visual(&note);
        self.ghost = Some(GhostNote {
            note,
            visual,
            hidden: false,
        });
        self.update_ghost_note(x, y);
    }

    /// Follow the pointer: pitch from `y`, snapped time from `x`
    pub fn update_ghost_note(&mut self, x: f64, y: f64) {
        if self.ghost.is_none() {
            return;
        }
        let position: SamplePosition = self.x_to_position(x);
        let pitch = self.mapping.y_to_note(y);
        let time = self.converter().to_beats(position, self.edit_snap());

        let (channel, velocity) = (self.channel_for_add(time), self.velocity_for_add(time));
        let hidden = self.ghost_hidden_at(time);

        if let Some(ghost) = self.ghost.as_mut() {
            ghost.note.time = time.max(Beats::ZERO);
            ghost.note.note = pitch;
            ghost.note.channel = channel;
            ghost.note.velocity = velocity;
            ghost.hidden = hidden;
        }
        self.refresh_ghost();
    }

    /// Drop the ghost (leaving draw interaction or committing a note)
    pub fn remove_ghost_note(&mut self) {
        self.ghost = None;
    }

    /// Before the region start, or past its end for percussive hits
    fn ghost_hidden_at(&self, time: Beats) -> bool {
        if time < self.region.start {
            return true;
        }
        self.config.note_mode == NoteMode::Percussive && time >= self.region.end_beats()
    }

    pub(crate) fn refresh_ghost(&mut self) {
        if let Some(note) = self.ghost.map(|g| g.note) {
            let visual = self.build_visual(&note);
            if let Some(ghost) = self.ghost.as_mut() {
                ghost.visual = visual;
            }
        }
    }
}
