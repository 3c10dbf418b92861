//! Error types for the note editing core

use thiserror::Error;

use crate::{NoteId, PatchChangeId};

/// Core error type
#[derive(Error, Debug)]
pub enum NgError {
    #[error("Note not found: {0}")]
    NoteNotFound(NoteId),

    #[error("Patch change not found: {0:?}")]
    PatchChangeNotFound(PatchChangeId),

    #[error("Duplicate note id: {0}")]
    DuplicateNote(NoteId),

    #[error("Invalid length: {0}")]
    InvalidLength(String),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("No open diff command")]
    NoOpenCommand,

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("State error: {0}")]
    State(String),
}

/// Result type alias
pub type NgResult<T> = Result<T, NgError>;
