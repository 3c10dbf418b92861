//! Active notes table
//!
//! While a recording pass is open, one slot per pitch remembers the visual
//! of the note currently sounding on that pitch.

use ng_core::{MIDI_MAX, NoteId, NoteNumber};

const SLOTS: usize = MIDI_MAX as usize + 1;

/// Pitch -> sounding note
#[derive(Debug, Clone)]
pub struct ActiveNotes {
    slots: Box<[Option<NoteId>; SLOTS]>,
}

impl Default for ActiveNotes {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveNotes {
    pub fn new() -> Self {
        Self {
            slots: Box::new([None; SLOTS]),
        }
    }

    pub fn get(&self, pitch: NoteNumber) -> Option<NoteId> {
        self.slots.get(pitch as usize).copied().flatten()
    }

    /// Mark `id` as sounding on `pitch`, returning the note it displaces
    pub fn start(&mut self, pitch: NoteNumber, id: NoteId) -> Option<NoteId> {
        let slot = self.slots.get_mut(pitch as usize)?;
        slot.replace(id).filter(|prev| *prev != id)
    }

    /// Clear the slot for `pitch`, returning what was there
    pub fn resolve(&mut self, pitch: NoteNumber) -> Option<NoteId> {
        self.slots.get_mut(pitch as usize)?.take()
    }

    /// Clear whichever slot holds `id`
    pub fn forget(&mut self, id: NoteId) -> bool {
        match self.slots.iter_mut().find(|s| **s == Some(id)) {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: NoteId) -> bool {
        self.slots.iter().any(|s| *s == Some(id))
    }

    /// Sounding notes, lowest pitch first
    pub fn iter(&self) -> impl Iterator<Item = (NoteNumber, NoteId)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(pitch, slot)| slot.map(|id| (pitch as NoteNumber, id)))
    }

    pub fn count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}
