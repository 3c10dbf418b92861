//! ng-tracker: Track Assignment Engine
//!
//! Lays a region's notes out for tracker-style display:
//! - `RowGrid`: rows-per-beat quantization with delay-direction rounding
//! - `TrackerPattern`: greedy lane assignment and per-lane row events
//! - `TrackerMatrix`: dense rows x lanes cell grid

mod grid;
mod matrix;
mod pattern;

pub use grid::*;
pub use matrix::*;
pub use pattern::*;
