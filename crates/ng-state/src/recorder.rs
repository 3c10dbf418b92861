//! Recording Writer
//!
//! Appends incoming note-on/note-off events to a model while recording:
//! - Note-on appends an unterminated note
//! - Note-off resolves the matching sounding note
//! - A repeated note-on on a sounding pitch force-resolves the old note
//! - `finish` resolves everything still sounding at the end boundary
//!
//! Nothing written here produces undo entries.

use ng_core::{
    Beats, DEFAULT_OFF_VELOCITY, MidiChannel, NgResult, Note, NoteId, NoteNumber, clamp_channel,
    clamp_to_0_127,
};

use crate::MidiModel;

/// Per-channel, per-pitch table of sounding notes
type SoundingTable = [[Option<NoteId>; 128]; 16];

/// Writes live note events into a [`MidiModel`]
pub struct RecordingWriter {
    model: MidiModel,
    sounding: Box<SoundingTable>,
    /// Latest event time seen
    last_time: Beats,
}

impl RecordingWriter {
    pub fn new(model: MidiModel) -> Self {
        Self {
            model,
            sounding: Box::new([[None; 128]; 16]),
            last_time: Beats::ZERO,
        }
    }

    pub fn model(&self) -> &MidiModel {
        &self.model
    }

    pub fn last_time(&self) -> Beats {
        self.last_time
    }

    /// Start a note. Velocity 0 is a note-off.
    pub fn note_on(
        &mut self,
        time: Beats,
        channel: i32,
        note: i32,
        velocity: i32,
    ) -> NgResult<Option<NoteId>> {
        if velocity <= 0 {
            self.note_off(time, channel, note, DEFAULT_OFF_VELOCITY as i32)?;
            return Ok(None);
        }

        let (ch, pitch) = (clamp_channel(channel), clamp_to_0_127(note));
        self.last_time = self.last_time.max(time);

        if let Some(stuck) = self.sounding[ch as usize][pitch as usize].take() {
            log::debug!(
                "Note-on ch {} pitch {} while sounding, resolving {} at {}",
                ch,
                pitch,
                stuck,
                time
            );
            self.model
                .resolve_recorded(stuck, time, DEFAULT_OFF_VELOCITY as i32)?;
        }

        let recorded = Note::unterminated(ch as i32, time, pitch as i32, velocity);
        let id = self.model.append_recorded(recorded)?;
        self.sounding[ch as usize][pitch as usize] = Some(id);
        Ok(Some(id))
    }

    /// End a note. Returns the resolved note id, or None for an unmatched note-off.
    pub fn note_off(
        &mut self,
        time: Beats,
        channel: i32,
        note: i32,
        off_velocity: i32,
    ) -> NgResult<Option<NoteId>> {
        let (ch, pitch) = (clamp_channel(channel), clamp_to_0_127(note));
        self.last_time = self.last_time.max(time);

        let Some(id) = self.sounding[ch as usize][pitch as usize].take() else {
            log::trace!("Unmatched note-off ch {} pitch {}", ch, pitch);
            return Ok(None);
        };
        self.model.resolve_recorded(id, time, off_velocity)?;
        Ok(Some(id))
    }

    pub fn is_sounding(&self, channel: MidiChannel, note: NoteNumber) -> bool {
        self.sounding
            .get(channel as usize)
            .and_then(|row| row.get(note as usize))
            .is_some_and(Option::is_some)
    }

    /// Pitches currently sounding on a channel
    pub fn sounding_notes(&self, channel: MidiChannel) -> Vec<NoteNumber> {
        self.sounding
            .get(channel as usize)
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(_, id)| id.is_some())
                    .map(|(pitch, _)| pitch as NoteNumber)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn sounding_count(&self) -> usize {
        self.sounding
            .iter()
            .flat_map(|row| row.iter())
            .filter(|id| id.is_some())
            .count()
    }

    /// Resolve every sounding note at `end`. Returns the ids that were resolved.
    pub fn finish(&mut self, end: Beats) -> NgResult<Vec<NoteId>> {
        let mut resolved = Vec::new();
        for row in self.sounding.iter_mut() {
            for slot in row.iter_mut() {
                if let Some(id) = slot.take() {
                    self.model
                        .resolve_recorded(id, end, DEFAULT_OFF_VELOCITY as i32)?;
                    resolved.push(id);
                }
            }
        }
        if !resolved.is_empty() {
            log::debug!("Recording finished, resolved {} notes at {}", resolved.len(), end);
        }
        Ok(resolved)
    }
}
