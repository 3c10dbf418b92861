//! MIDI region bounds

use serde::{Deserialize, Serialize};

use crate::{Beats, SamplePosition};

/// A window onto a MIDI source placed on the timeline.
///
/// Notes are stored source-relative; the region decides which of them are
/// visible and where they land on the absolute timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiRegion {
    pub name: String,
    /// Absolute timeline position of the region start
    pub position: SamplePosition,
    /// Offset into the source, in beats
    pub start: Beats,
    /// Region length, in beats
    pub length: Beats,
}

impl MidiRegion {
    pub fn new(name: &str, position: SamplePosition, start: Beats, length: Beats) -> Self {
        Self {
            name: name.to_string(),
            position,
            start: start.max(Beats::ZERO),
            length: length.max(Beats::ZERO),
        }
    }

    /// Source-relative end (exclusive)
    pub fn end_beats(&self) -> Beats {
        self.start + self.length
    }

    /// Does a source-relative position fall inside the region?
    pub fn contains(&self, source_beats: Beats) -> bool {
        source_beats >= self.start && source_beats < self.end_beats()
    }

    /// Grow the region so it reaches `source_end`. Returns true if it grew.
    pub fn extend_to(&mut self, source_end: Beats) -> bool {
        if source_end > self.end_beats() {
            self.length = source_end - self.start;
            true
        } else {
            false
        }
    }
}
