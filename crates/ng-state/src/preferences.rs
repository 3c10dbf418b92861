//! Editor Preferences System
//!
//! Persistent user preferences for the note editor:
//! - Drawing defaults (velocity, channel, overrides, draw length)
//! - Grid and nudge settings
//! - Display settings (note mode, row height, zoom)
//! - Tracker settings (rows per beat)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use ng_core::{DEFAULT_VELOCITY, GridValue, MAX_ROWS_PER_BEAT, NoteMode};

/// Editor preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorPreferences {
    /// Note drawing defaults
    pub draw: DrawPreferences,
    /// Grid/nudge settings
    pub grid: GridPreferences,
    /// Display settings
    pub display: DisplayPreferences,
    /// Tracker settings
    pub tracker: TrackerPreferences,
    /// Maximum undo history size
    pub max_undo_history: usize,
}

impl Default for EditorPreferences {
    fn default() -> Self {
        Self {
            draw: DrawPreferences::default(),
            grid: GridPreferences::default(),
            display: DisplayPreferences::default(),
            tracker: TrackerPreferences::default(),
            max_undo_history: 500,
        }
    }
}

/// Drawing preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawPreferences {
    /// Velocity for new notes when nothing better is known
    pub default_velocity: u8,
    /// Channel for new notes when nothing better is known
    pub default_channel: u8,
    /// Forced velocity for drawn notes
    pub velocity_override: Option<u8>,
    /// Forced channel for drawn notes
    pub channel_override: Option<u8>,
    /// Length of drawn notes (None = follow the grid)
    pub draw_length: Option<GridValue>,
    /// Play notes as they are created
    pub audition_on_create: bool,
}

impl Default for DrawPreferences {
    fn default() -> Self {
        Self {
            default_velocity: DEFAULT_VELOCITY,
            default_channel: 0,
            velocity_override: None,
            channel_override: None,
            draw_length: None,
            audition_on_create: true,
        }
    }
}

/// Grid preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridPreferences {
    /// Snap to grid by default
    pub snap_enabled: bool,
    /// Grid value
    pub grid: GridValue,
    /// Nudge distance used without a grid (samples)
    pub nudge_samples: u64,
}

impl Default for GridPreferences {
    fn default() -> Self {
        Self {
            snap_enabled: true,
            grid: GridValue::Sixteenth,
            nudge_samples: 4800, // 100ms @ 48kHz
        }
    }
}

/// Display preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayPreferences {
    /// Sustained notes or percussive hits
    pub note_mode: NoteMode,
    /// Height of one note row (pixels)
    pub note_height: f64,
    /// Horizontal zoom (samples per pixel)
    pub samples_per_pixel: f64,
    /// Lowest displayed note
    pub lowest_note: u8,
    /// Highest displayed note
    pub highest_note: u8,
}

impl Default for DisplayPreferences {
    fn default() -> Self {
        Self {
            note_mode: NoteMode::Sustained,
            note_height: 12.0,
            samples_per_pixel: 256.0,
            lowest_note: 36,
            highest_note: 96,
        }
    }
}

/// Tracker preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerPreferences {
    /// Rows per beat
    pub rows_per_beat: u32,
}

impl Default for TrackerPreferences {
    fn default() -> Self {
        Self { rows_per_beat: 4 }
    }
}

impl TrackerPreferences {
    /// Rows per beat within `1..=MAX_ROWS_PER_BEAT`
    pub fn clamped_rows_per_beat(&self) -> u32 {
        self.rows_per_beat.clamp(1, MAX_ROWS_PER_BEAT)
    }
}

impl EditorPreferences {
    /// Load preferences from standard location
    pub fn load() -> Self {
        Self::load_from(Self::default_path())
    }

    /// Load preferences from specified path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let mut prefs = match fs::read_to_string(path.as_ref()) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!(
                    "Malformed preferences at {}: {}, using defaults",
                    path.as_ref().display(),
                    e
                );
                Self::default()
            }),
            Err(_) => Self::default(),
        };
        prefs.clamp_ranges();
        prefs
    }

    /// Pull loaded values back into their legal ranges
    fn clamp_ranges(&mut self) {
        let rows_per_beat = self.tracker.clamped_rows_per_beat();
        if rows_per_beat != self.tracker.rows_per_beat {
            log::warn!(
                "Tracker resolution {} rows/beat out of range, using {}",
                self.tracker.rows_per_beat,
                rows_per_beat
            );
            self.tracker.rows_per_beat = rows_per_beat;
        }
    }

    /// Save preferences to standard location
    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(Self::default_path())
    }

    /// Save preferences to specified path
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, json)
    }

    /// Get default preferences file path
    pub fn default_path() -> PathBuf {
        let base = if cfg!(target_os = "macos") {
            dirs::home_dir()
                .map(|h| h.join("Library/Application Support/NoteGrid"))
                .unwrap_or_else(|| PathBuf::from("."))
        } else if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .map(|d| d.join("NoteGrid"))
                .unwrap_or_else(|| PathBuf::from("."))
        } else {
            // Linux/other
            dirs::config_dir()
                .map(|d| d.join("notegrid"))
                .unwrap_or_else(|| PathBuf::from("."))
        };
        base.join("editor.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preferences() {
        let prefs = EditorPreferences::default();
        assert_eq!(prefs.draw.default_velocity, 64);
        assert_eq!(prefs.tracker.rows_per_beat, 4);
        assert_eq!(prefs.display.note_mode, NoteMode::Sustained);
        assert!(prefs.draw.velocity_override.is_none());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{ "tracker": { "rows_per_beat": 8 }, "draw": { "velocity_override": 100 } }"#;
        let prefs: EditorPreferences = serde_json::from_str(json).unwrap();
        assert_eq!(prefs.tracker.rows_per_beat, 8);
        assert_eq!(prefs.draw.velocity_override, Some(100));
        assert_eq!(prefs.draw.default_velocity, 64);
        assert_eq!(prefs.max_undo_history, 500);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/editor.json");

        let mut prefs = EditorPreferences::default();
        prefs.display.note_mode = NoteMode::Percussive;
        prefs.grid.grid = GridValue::Eighth;
        prefs.save_to(&path).unwrap();

        let loaded = EditorPreferences::load_from(&path);
        assert_eq!(loaded, prefs);
    }

    #[test]
    fn test_tracker_resolution_clamped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.json");

        std::fs::write(&path, r#"{ "tracker": { "rows_per_beat": 1920 } }"#).unwrap();
        assert_eq!(EditorPreferences::load_from(&path).tracker.rows_per_beat, 960);

        std::fs::write(&path, r#"{ "tracker": { "rows_per_beat": 0 } }"#).unwrap();
        assert_eq!(EditorPreferences::load_from(&path).tracker.rows_per_beat, 1);
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(EditorPreferences::load_from(&path), EditorPreferences::default());
        assert_eq!(
            EditorPreferences::load_from(dir.path().join("missing.json")),
            EditorPreferences::default()
        );
    }
}
