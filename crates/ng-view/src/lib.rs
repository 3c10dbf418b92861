//! ng-view: Note View for the note editor
//!
//! A [`MidiView`] mirrors one region of a shared [`ng_state::MidiModel`]:
//! - One visual per model note, kept in sync from content-changed notifications
//! - Selection, ghost note, cut buffer and drag state
//! - Edit operations staged through the model's diff command
//! - Recording-time visuals (active notes, stuck-note recovery)

mod active;
mod audition;
mod config;
mod cut_buffer;
mod drag;
mod edit;
mod events;
mod geometry;
mod ghost;
mod paste;
mod patch;
mod record;
mod select;
mod selection;
mod view;
mod visual;

pub use active::*;
pub use audition::*;
pub use config::*;
pub use cut_buffer::*;
pub use drag::*;
pub use edit::*;
pub use events::*;
pub use geometry::*;
pub use ghost::*;
pub use selection::*;
pub use view::*;
pub use visual::*;
