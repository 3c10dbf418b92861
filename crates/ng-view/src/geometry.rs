//! Pixel mapping
//!
//! Horizontal and vertical mapping between the view's pixel space and
//! region offsets / pitches.
//! - x is measured in pixels from the region start
//! - y grows downwards from the highest visible note

use ng_core::{MIDI_MAX, NoteNumber};

/// Zoom limits (samples per pixel)
pub const MIN_SAMPLES_PER_PIXEL: f64 = 1.0;
pub const MAX_SAMPLES_PER_PIXEL: f64 = 65536.0;

/// Row height limits (pixels)
pub const MIN_NOTE_HEIGHT: f64 = 4.0;
pub const MAX_NOTE_HEIGHT: f64 = 40.0;

/// Pixel <-> time/pitch mapping of a view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelMapping {
    /// Horizontal zoom
    samples_per_pixel: f64,
    /// Height of one pitch row
    note_height: f64,
    /// Lowest visible pitch
    lowest_note: NoteNumber,
    /// Highest visible pitch
    highest_note: NoteNumber,
}

impl Default for PixelMapping {
    fn default() -> Self {
        Self::new(256.0, 12.0, 36, 96)
    }
}

impl PixelMapping {
    pub fn new(
        samples_per_pixel: f64,
        note_height: f64,
        lowest: NoteNumber,
        highest: NoteNumber,
    ) -> Self {
        let mut mapping = Self {
            samples_per_pixel: samples_per_pixel
                .clamp(MIN_SAMPLES_PER_PIXEL, MAX_SAMPLES_PER_PIXEL),
            note_height: note_height.clamp(MIN_NOTE_HEIGHT, MAX_NOTE_HEIGHT),
            lowest_note: 0,
            highest_note: MIDI_MAX,
        };
        mapping.set_note_range(lowest, highest);
        mapping
    }

    pub fn samples_per_pixel(&self) -> f64 {
        self.samples_per_pixel
    }

    pub fn note_height(&self) -> f64 {
        self.note_height
    }

    pub fn lowest_note(&self) -> NoteNumber {
        self.lowest_note
    }

    pub fn highest_note(&self) -> NoteNumber {
        self.highest_note
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Horizontal
    // ─────────────────────────────────────────────────────────────────────────

    /// Samples from the region start -> x
    pub fn offset_to_x(&self, samples: i64) -> f64 {
        samples as f64 / self.samples_per_pixel
    }

    /// x -> samples from the region start
    pub fn x_to_offset(&self, x: f64) -> i64 {
        (x * self.samples_per_pixel).round() as i64
    }

    pub fn set_samples_per_pixel(&mut self, samples_per_pixel: f64) -> bool {
        let spp = samples_per_pixel.clamp(MIN_SAMPLES_PER_PIXEL, MAX_SAMPLES_PER_PIXEL);
        if spp == self.samples_per_pixel {
            return false;
        }
        self.samples_per_pixel = spp;
        true
    }

    /// Zoom in horizontally
    pub fn zoom_in(&mut self) -> bool {
        self.set_samples_per_pixel(self.samples_per_pixel / 2.0)
    }

    /// Zoom out horizontally
    pub fn zoom_out(&mut self) -> bool {
        self.set_samples_per_pixel(self.samples_per_pixel * 2.0)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Vertical
    // ─────────────────────────────────────────────────────────────────────────

    /// Top edge of a pitch row
    pub fn note_to_y(&self, note: NoteNumber) -> f64 {
        (self.highest_note as f64 - note as f64) * self.note_height
    }

    /// Pitch under a y coordinate, clamped to the visible range
    pub fn y_to_note(&self, y: f64) -> NoteNumber {
        let offset = (y / self.note_height).floor();
        (self.highest_note as f64 - offset).clamp(self.lowest_note as f64, self.highest_note as f64)
            as NoteNumber
    }

    /// Total height of the visible pitch range
    pub fn contents_height(&self) -> f64 {
        (self.highest_note as f64 - self.lowest_note as f64 + 1.0) * self.note_height
    }

    pub fn set_note_height(&mut self, height: f64) {
        self.note_height = height.clamp(MIN_NOTE_HEIGHT, MAX_NOTE_HEIGHT);
    }

    /// Zoom in vertically
    pub fn zoom_in_v(&mut self) {
        self.set_note_height(self.note_height * 1.25);
    }

    /// Zoom out vertically
    pub fn zoom_out_v(&mut self) {
        self.set_note_height(self.note_height / 1.25);
    }

    pub fn set_note_range(&mut self, lowest: NoteNumber, highest: NoteNumber) {
        let lowest = lowest.min(MIDI_MAX);
        let highest = highest.min(MIDI_MAX);
        self.lowest_note = lowest.min(highest);
        self.highest_note = lowest.max(highest);
    }

    pub fn is_note_visible(&self, note: NoteNumber) -> bool {
        note >= self.lowest_note && note <= self.highest_note
    }

    /// Widen the visible range to include `note`. Returns true if it changed.
    pub fn extend_note_range(&mut self, note: NoteNumber) -> bool {
        let note = note.min(MIDI_MAX);
        if note < self.lowest_note {
            self.lowest_note = note;
            true
        } else if note > self.highest_note {
            self.highest_note = note;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_horizontal_mapping() {
        let mapping = PixelMapping::new(100.0, 10.0, 0, 127);
        assert_relative_eq!(mapping.offset_to_x(24000), 240.0);
        assert_eq!(mapping.x_to_offset(240.0), 24000);
        assert_relative_eq!(mapping.offset_to_x(-500), -5.0);
    }

    #[test]
    fn test_vertical_mapping() {
        let mapping = PixelMapping::new(100.0, 10.0, 48, 72);
        assert_relative_eq!(mapping.note_to_y(72), 0.0);
        assert_relative_eq!(mapping.note_to_y(60), 120.0);
        assert_eq!(mapping.y_to_note(125.0), 60);
        assert_eq!(mapping.y_to_note(-50.0), 72);
        assert_eq!(mapping.y_to_note(10_000.0), 48);
        assert_relative_eq!(mapping.contents_height(), 250.0);
    }

    #[test]
    fn test_zoom_limits() {
        let mut mapping = PixelMapping::new(2.0, 12.0, 0, 127);
        assert!(mapping.zoom_in());
        assert!(!mapping.zoom_in());
        assert_relative_eq!(mapping.samples_per_pixel(), MIN_SAMPLES_PER_PIXEL);

        for _ in 0..20 {
            mapping.zoom_in_v();
        }
        assert_relative_eq!(mapping.note_height(), MAX_NOTE_HEIGHT);
    }

    #[test]
    fn test_extend_note_range() {
        let mut mapping = PixelMapping::new(256.0, 12.0, 48, 72);
        assert!(!mapping.extend_note_range(60));
        assert!(mapping.extend_note_range(30));
        assert!(mapping.extend_note_range(100));
        assert_eq!((mapping.lowest_note(), mapping.highest_note()), (30, 100));
    }

    #[test]
    fn test_inverted_range_normalised() {
        let mapping = PixelMapping::new(256.0, 12.0, 90, 40);
        assert_eq!((mapping.lowest_note(), mapping.highest_note()), (40, 90));
    }
}
