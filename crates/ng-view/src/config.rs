//! View configuration
//!
//! Runtime settings of a [`crate::MidiView`], built from the persisted
//! [`EditorPreferences`].

use ng_core::{
    Beats, GridValue, MidiChannel, NoteMode, NoteNumber, TimeConverter, Velocity,
};
use ng_state::EditorPreferences;

/// Runtime view settings
#[derive(Debug, Clone, PartialEq)]
pub struct ViewConfig {
    pub note_mode: NoteMode,
    /// Velocity for new notes in an empty region
    pub default_velocity: Velocity,
    /// Channel for new notes in an empty region
    pub default_channel: MidiChannel,
    pub velocity_override: Option<Velocity>,
    pub channel_override: Option<MidiChannel>,
    /// Snap grid; `None` disables snapping
    pub grid: Option<GridValue>,
    /// Length of drawn notes; `None` follows the grid
    pub draw_length: Option<GridValue>,
    /// Nudge distance (samples); zero falls back to the grid
    pub nudge_samples: u64,
    pub audition_on_create: bool,
    pub samples_per_pixel: f64,
    pub note_height: f64,
    pub lowest_note: NoteNumber,
    pub highest_note: NoteNumber,
    /// Rows per beat of the tracker display
    pub rows_per_beat: u32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self::from_preferences(&EditorPreferences::default())
    }
}

impl ViewConfig {
    pub fn from_preferences(prefs: &EditorPreferences) -> Self {
        Self {
            note_mode: prefs.display.note_mode,
            default_velocity: prefs.draw.default_velocity.min(127),
            default_channel: prefs.draw.default_channel.min(15),
            velocity_override: prefs.draw.velocity_override.map(|v| v.min(127)),
            channel_override: prefs.draw.channel_override.map(|c| c.min(15)),
            grid: prefs.grid.snap_enabled.then_some(prefs.grid.grid),
            draw_length: prefs.draw.draw_length,
            nudge_samples: prefs.grid.nudge_samples,
            audition_on_create: prefs.draw.audition_on_create,
            samples_per_pixel: prefs.display.samples_per_pixel.max(1.0),
            note_height: prefs.display.note_height.max(1.0),
            lowest_note: prefs.display.lowest_note.min(prefs.display.highest_note).min(127),
            highest_note: prefs.display.highest_note.min(127),
            rows_per_beat: prefs.tracker.clamped_rows_per_beat(),
        }
    }

    /// Grid step in beats, if snapping is on. Bars follow the converter's meter.
    pub fn grid_beats(&self, tempo: &dyn TimeConverter) -> Option<Beats> {
        self.grid
            .map(|g| tempo.grid_length(g))
            .filter(|b| b.ticks() > 0)
    }

    /// Length of a drawn note: draw length, else grid, else one beat
    pub fn draw_length_beats(&self, tempo: &dyn TimeConverter) -> Beats {
        self.draw_length
            .map(|g| tempo.grid_length(g))
            .filter(|b| b.ticks() > 0)
            .or_else(|| self.grid_beats(tempo))
            .unwrap_or(Beats::ONE_BEAT)
    }
}

impl From<&EditorPreferences> for ViewConfig {
    fn from(prefs: &EditorPreferences) -> Self {
        Self::from_preferences(prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ng_core::{TempoMap, TimeSignature};

    #[test]
    fn test_from_default_preferences() {
        let config = ViewConfig::default();
        assert_eq!(config.note_mode, NoteMode::Sustained);
        assert_eq!(config.default_velocity, 64);
        assert_eq!(config.grid, Some(GridValue::Sixteenth));
        let tempo = TempoMap::default();
        assert_eq!(config.grid_beats(&tempo), Some(Beats::from_ticks(240)));
        assert_eq!(config.draw_length_beats(&tempo), Beats::from_ticks(240));
    }

    #[test]
    fn test_snap_disabled() {
        let mut prefs = EditorPreferences::default();
        prefs.grid.snap_enabled = false;
        let config = ViewConfig::from(&prefs);
        assert_eq!(config.grid, None);
        assert_eq!(config.draw_length_beats(&TempoMap::default()), Beats::ONE_BEAT);
    }

    #[test]
    fn test_draw_length_wins() {
        let mut prefs = EditorPreferences::default();
        prefs.draw.draw_length = Some(GridValue::Half);
        let config = ViewConfig::from(&prefs);
        assert_eq!(config.draw_length_beats(&TempoMap::default()), Beats::from_beats(2));
    }

    #[test]
    fn test_bar_grid_follows_meter() {
        let mut prefs = EditorPreferences::default();
        prefs.grid.grid = GridValue::Bar;
        prefs.draw.draw_length = Some(GridValue::Bar);
        let config = ViewConfig::from(&prefs);

        let mut waltz = TempoMap::default();
        waltz.set_time_signature(TimeSignature::new(3, 4));
        assert_eq!(config.grid_beats(&waltz), Some(Beats::from_beats(3)));
        assert_eq!(config.draw_length_beats(&waltz), Beats::from_beats(3));
        assert_eq!(config.grid_beats(&TempoMap::default()), Some(Beats::from_beats(4)));
    }

    #[test]
    fn test_out_of_range_preferences_clamped() {
        let mut prefs = EditorPreferences::default();
        prefs.draw.default_channel = 40;
        prefs.display.lowest_note = 100;
        prefs.display.highest_note = 60;
        prefs.tracker.rows_per_beat = 4096;
        let config = ViewConfig::from(&prefs);
        assert_eq!(config.default_channel, 15);
        assert!(config.lowest_note <= config.highest_note);
        assert_eq!(config.rows_per_beat, 960);
    }
}
