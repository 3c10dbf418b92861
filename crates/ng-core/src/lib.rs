//! ng-core: Shared types, traits, and utilities for the note editor
//!
//! This crate provides the foundational types used across all ng crates:
//! musical time, notes, tempo mapping and region-relative time conversion.

mod convert;
mod error;
mod midi;
mod region;
mod tempo;
mod time;

pub use convert::*;
pub use error::*;
pub use midi::*;
pub use region::*;
pub use tempo::*;
pub use time::*;
