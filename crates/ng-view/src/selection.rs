//! Note selection set

use std::collections::BTreeSet;

use ng_core::NoteId;

/// Selected notes, by identity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<NoteId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: NoteId) -> bool {
        self.ids.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = NoteId> + '_ {
        self.ids.iter().copied()
    }

    pub fn ids(&self) -> Vec<NoteId> {
        self.ids.iter().copied().collect()
    }

    /// Returns true if newly added
    pub fn add(&mut self, id: NoteId) -> bool {
        self.ids.insert(id)
    }

    /// Returns true if it was selected
    pub fn remove(&mut self, id: NoteId) -> bool {
        self.ids.remove(&id)
    }

    /// Flip membership; returns the new state
    pub fn toggle(&mut self, id: NoteId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    /// Returns true if anything was selected
    pub fn clear(&mut self) -> bool {
        let had = !self.ids.is_empty();
        self.ids.clear();
        had
    }

    pub fn retain(&mut self, keep: impl FnMut(&NoteId) -> bool) {
        self.ids.retain(keep);
    }
}

impl FromIterator<NoteId> for Selection {
    fn from_iter<T: IntoIterator<Item = NoteId>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
