//! Cut buffer
//!
//! Notes copied out of a view, kept with their source positions.

use ng_core::{Beats, Note};

/// What a cut/copy/clear does with the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutCopyOp {
    /// Copy into the buffer and delete
    Cut,
    /// Copy into the buffer only
    Copy,
    /// Delete only
    Clear,
}

/// Copied notes, sorted by start time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CutBuffer {
    notes: Vec<Note>,
}

impl CutBuffer {
    /// Unterminated notes are skipped: they have no span to paste
    pub fn new(notes: impl IntoIterator<Item = Note>) -> Self {
        let mut notes: Vec<Note> = notes.into_iter().filter(|n| !n.is_unterminated()).collect();
        notes.sort_by(|a, b| a.time.cmp(&b.time).then(a.note.cmp(&b.note)));
        Self { notes }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Earliest start
    pub fn start(&self) -> Option<Beats> {
        self.notes.first().map(|n| n.time)
    }

    /// Latest end
    pub fn end(&self) -> Option<Beats> {
        self.notes.iter().map(Note::end_time).max()
    }

    /// Distance from the earliest start to the latest end
    pub fn span(&self) -> Beats {
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => end - start,
            _ => Beats::ZERO,
        }
    }
}
