//! MIDI Note Types
//!
//! Provides the note-level data model shared by every crate:
//! - Notes with stable identities
//! - Patch changes
//! - Range clamping for pitch, velocity and channel
//! - Note naming helpers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::Beats;

// ═══════════════════════════════════════════════════════════════════════════════
// MIDI VALUE TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// MIDI channel (0-15)
pub type MidiChannel = u8;

/// MIDI note number (0-127)
pub type NoteNumber = u8;

/// MIDI velocity (0-127)
pub type Velocity = u8;

/// Highest legal note number / velocity / program
pub const MIDI_MAX: u8 = 127;

/// Highest legal channel
pub const CHANNEL_MAX: u8 = 15;

/// Highest legal 14-bit bank number
pub const BANK_MAX: u16 = 16383;

/// Default velocity for notes added with no neighbours to infer from
pub const DEFAULT_VELOCITY: Velocity = 64;

/// Default release velocity
pub const DEFAULT_OFF_VELOCITY: Velocity = 64;

/// Clamp a widened value into 0..=127
#[inline]
pub fn clamp_to_0_127(value: i32) -> u8 {
    value.clamp(0, MIDI_MAX as i32) as u8
}

/// Clamp a widened value into a legal channel 0..=15
#[inline]
pub fn clamp_channel(value: i32) -> MidiChannel {
    value.clamp(0, CHANNEL_MAX as i32) as u8
}

/// Clamp a widened value into a legal 14-bit bank number
#[inline]
pub fn clamp_bank(value: i32) -> u16 {
    value.clamp(0, BANK_MAX as i32) as u16
}

// ═══════════════════════════════════════════════════════════════════════════════
// NOTE NAMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Note name helper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteName {
    C, Cs, D, Ds, E, F, Fs, G, Gs, A, As, B,
}

impl NoteName {
    const ALL: [NoteName; 12] = [
        NoteName::C,
        NoteName::Cs,
        NoteName::D,
        NoteName::Ds,
        NoteName::E,
        NoteName::F,
        NoteName::Fs,
        NoteName::G,
        NoteName::Gs,
        NoteName::A,
        NoteName::As,
        NoteName::B,
    ];

    pub fn from_note(note: NoteNumber) -> (Self, i8) {
        let octave = (note as i8 / 12) - 1;
        (Self::ALL[(note % 12) as usize], octave)
    }

    pub fn name(&self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::Cs => "C#",
            NoteName::D => "D",
            NoteName::Ds => "D#",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::Fs => "F#",
            NoteName::G => "G",
            NoteName::Gs => "G#",
            NoteName::A => "A",
            NoteName::As => "A#",
            NoteName::B => "B",
        }
    }

    /// Display string such as "C4" or "F#-1"
    pub fn display(note: NoteNumber) -> String {
        let (name, octave) = Self::from_note(note);
        format!("{}{}", name.name(), octave)
    }

    /// Is note a black key?
    pub fn is_black_key(note: NoteNumber) -> bool {
        matches!(note % 12, 1 | 3 | 6 | 8 | 10)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NOTE
// ═══════════════════════════════════════════════════════════════════════════════

static NEXT_NOTE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_PATCH_ID: AtomicU64 = AtomicU64::new(1);

/// Stable note identity, monotonically assigned.
///
/// Survives property changes and model reloads, so selections and the
/// view's note-to-visual association are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoteId(pub u64);

impl NoteId {
    /// Allocate the next unused id
    pub fn next() -> Self {
        Self(NEXT_NOTE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How notes are drawn and edited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoteMode {
    /// Notes have a length and are drawn as blocks
    #[default]
    Sustained,
    /// Notes are drawn as hits; length is ignored for display
    Percussive,
}

/// A note event with a start position and a length, both in beats.
///
/// The start position is relative to the owning region's source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Stable identity
    pub id: NoteId,
    /// Channel (0-15)
    pub channel: MidiChannel,
    /// Start position
    pub time: Beats,
    /// Length, or [`Beats::MAX`] while the note-off is outstanding
    pub length: Beats,
    /// Note number (0-127)
    pub note: NoteNumber,
    /// Velocity (0-127)
    pub velocity: Velocity,
    /// Release velocity (0-127)
    pub off_velocity: Velocity,
}

impl Note {
    /// Create a note with a fresh id. Values are clamped into their legal ranges.
    pub fn new(channel: i32, time: Beats, length: Beats, note: i32, velocity: i32) -> Self {
        Self {
            id: NoteId::next(),
            channel: clamp_channel(channel),
            time: time.max(Beats::ZERO),
            length: length.max(Beats::ZERO),
            note: clamp_to_0_127(note),
            velocity: clamp_to_0_127(velocity),
            off_velocity: DEFAULT_OFF_VELOCITY,
        }
    }

    /// Create a note still waiting for its note-off
    pub fn unterminated(channel: i32, time: Beats, note: i32, velocity: i32) -> Self {
        let mut n = Self::new(channel, time, Beats::ZERO, note, velocity);
        n.length = Beats::MAX;
        n
    }

    pub fn with_off_velocity(mut self, off_velocity: i32) -> Self {
        self.off_velocity = clamp_to_0_127(off_velocity);
        self
    }

    /// Copy of this note carrying a fresh id
    pub fn duplicate(&self) -> Self {
        Self {
            id: NoteId::next(),
            ..*self
        }
    }

    /// Is the note-off still outstanding?
    #[inline]
    pub fn is_unterminated(&self) -> bool {
        self.length == Beats::MAX
    }

    /// End position (saturates for unterminated notes)
    #[inline]
    pub fn end_time(&self) -> Beats {
        self.time.saturating_add(self.length)
    }

    /// Same start, pitch and channel: two such notes would be indistinguishable
    #[inline]
    pub fn same_slot(&self, other: &Note) -> bool {
        self.time == other.time && self.note == other.note && self.channel == other.channel
    }

    /// Does the note sound at `t`? Zero-length notes sound only at their start.
    pub fn sounds_at(&self, t: Beats) -> bool {
        if self.length.is_zero() {
            return t == self.time;
        }
        t >= self.time && t < self.end_time()
    }

    /// Force every field back into its legal range
    pub fn clamped(mut self) -> Self {
        self.channel = self.channel.min(CHANNEL_MAX);
        self.note = self.note.min(MIDI_MAX);
        self.velocity = self.velocity.min(MIDI_MAX);
        self.off_velocity = self.off_velocity.min(MIDI_MAX);
        self.time = self.time.max(Beats::ZERO);
        self.length = self.length.max(Beats::ZERO);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PATCH CHANGE
// ═══════════════════════════════════════════════════════════════════════════════

/// Stable patch change identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatchChangeId(pub u64);

impl PatchChangeId {
    pub fn next() -> Self {
        Self(NEXT_PATCH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Program/bank selection at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchChange {
    pub id: PatchChangeId,
    pub time: Beats,
    pub channel: MidiChannel,
    pub program: u8,
    /// 14-bit bank number (MSB/LSB combined)
    pub bank: u16,
}

impl PatchChange {
    pub fn new(time: Beats, channel: i32, program: i32, bank: i32) -> Self {
        Self {
            id: PatchChangeId::next(),
            time: time.max(Beats::ZERO),
            channel: clamp_channel(channel),
            program: clamp_to_0_127(program),
            bank: clamp_bank(bank),
        }
    }

    pub fn bank_msb(&self) -> u8 {
        (self.bank >> 7) as u8
    }

    pub fn bank_lsb(&self) -> u8 {
        (self.bank & 0x7f) as u8
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
