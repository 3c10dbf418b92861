//! Note auditioning
//!
//! The view sounds notes as they are created through a [`NoteAuditioner`];
//! the host decides what playing a note means.

use crossbeam_channel::Sender;

use ng_core::Note;

/// Plays notes on request
pub trait NoteAuditioner: Send {
    fn start_note(&mut self, note: &Note);

    /// Silence anything still sounding
    fn stop_all(&mut self) {}
}

/// Auditioner that plays nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAuditioner;

impl NoteAuditioner for SilentAuditioner {
    fn start_note(&mut self, _note: &Note) {}
}

/// Forwards auditioned notes to another thread (typically the engine)
#[derive(Debug, Clone)]
pub struct ChannelAuditioner {
    tx: Sender<Note>,
}

impl ChannelAuditioner {
    pub fn new(tx: Sender<Note>) -> Self {
        Self { tx }
    }
}

impl NoteAuditioner for ChannelAuditioner {
    fn start_note(&mut self, note: &Note) {
        if self.tx.try_send(*note).is_err() {
            log::trace!("Audition dropped for note {}", note.id);
        }
    }
}
