//! ng-state: Note model, diff commands, undo/redo, recording, preferences
//!
//! Provides the note model with transactional edits and full undo/redo support.

mod diff;
mod model;
mod note_set;
mod operators;
mod preferences;
mod recorder;
mod undo;

pub use diff::*;
pub use model::*;
pub use note_set::*;
pub use operators::*;
pub use preferences::*;
pub use recorder::*;
pub use undo::*;
