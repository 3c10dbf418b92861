//! View events
//!
//! Notifications for sibling UI (editor lists, inspectors) about what a
//! view operation did. Each kind fires at most once per operation.

use crossbeam_channel::{Receiver, Sender, unbounded};

use ng_core::{Beats, NoteId};

/// Something a view operation changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// Full selection after the change
    SelectionChanged(Vec<NoteId>),
    NotesAdded(Vec<NoteId>),
    NotesRemoved(Vec<NoteId>),
    /// The region grew to hold edited material; carries the new length
    RegionExtended(Beats),
    PatchChangesChanged,
}

/// Fan-out of view events to any number of receivers
#[derive(Debug, Default)]
pub struct ViewEventBroadcaster {
    subscribers: Vec<Sender<ViewEvent>>,
}

impl ViewEventBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<ViewEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Send to every live receiver; dropped receivers are forgotten
    pub fn emit(&mut self, event: ViewEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
