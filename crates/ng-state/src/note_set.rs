//! Ordered note container
//!
//! Notes are kept sorted by start time (ties ordered by id), duplicates of
//! time/pitch/channel are permitted. Patch changes live alongside, sorted by time.

use ng_core::{Beats, NgError, NgResult, Note, NoteId, PatchChange, PatchChangeId};

/// The canonical note multiset of a model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteSet {
    notes: Vec<Note>,
    patch_changes: Vec<PatchChange>,
}

impl NoteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from arbitrary notes (sorted, clamped; later duplicates of an id are dropped)
    pub fn from_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        let mut set = Self::new();
        for note in notes {
            if set.insert(note).is_err() {
                log::warn!("Dropping note with duplicate id {}", note.id);
            }
        }
        set
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Note> {
        self.notes.iter()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn contains_id(&self, id: NoteId) -> bool {
        self.get(id).is_some()
    }

    /// Is there already a note with the same start, pitch and channel?
    pub fn contains(&self, note: &Note) -> bool {
        self.lower_bound(note.time)
            .take_while(|n| n.time == note.time)
            .any(|n| n.same_slot(note))
    }

    /// Index of the first note starting at or after `time`
    pub fn lower_bound_index(&self, time: Beats) -> usize {
        self.notes.partition_point(|n| n.time < time)
    }

    /// Notes starting at or after `time`, in order
    pub fn lower_bound(&self, time: Beats) -> impl Iterator<Item = &Note> + '_ {
        self.notes[self.lower_bound_index(time)..].iter()
    }

    /// Last note starting strictly before `time`
    pub fn note_before(&self, time: Beats) -> Option<&Note> {
        let idx = self.lower_bound_index(time);
        idx.checked_sub(1).map(|i| &self.notes[i])
    }

    /// Notes overlapping `[start, end)`
    pub fn notes_in_range(&self, start: Beats, end: Beats) -> impl Iterator<Item = &Note> + '_ {
        self.notes
            .iter()
            .take_while(move |n| n.time < end)
            .filter(move |n| n.end_time() > start || n.time >= start)
    }

    pub fn first(&self) -> Option<&Note> {
        self.notes.first()
    }

    pub fn last(&self) -> Option<&Note> {
        self.notes.last()
    }

    pub fn patch_changes(&self) -> &[PatchChange] {
        &self.patch_changes
    }

    pub fn patch_change(&self, id: PatchChangeId) -> Option<&PatchChange> {
        self.patch_changes.iter().find(|p| p.id == id)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Mutation (model-internal; edits go through diff commands)
    // ─────────────────────────────────────────────────────────────────────────────

    pub(crate) fn insert(&mut self, note: Note) -> NgResult<()> {
        if self.contains_id(note.id) {
            return Err(NgError::DuplicateNote(note.id));
        }
        let note = note.clamped();
        let idx = self
            .notes
            .partition_point(|n| (n.time, n.id) < (note.time, note.id));
        self.notes.insert(idx, note);
        Ok(())
    }

    pub(crate) fn remove(&mut self, id: NoteId) -> NgResult<Note> {
        let idx = self
            .notes
            .iter()
            .position(|n| n.id == id)
            .ok_or(NgError::NoteNotFound(id))?;
        Ok(self.notes.remove(idx))
    }

    /// Swap in a new version of a note (matched by id), returning the old one
    pub(crate) fn replace(&mut self, note: Note) -> NgResult<Note> {
        let before = self.remove(note.id)?;
        self.insert(note)?;
        Ok(before)
    }

    pub(crate) fn insert_patch(&mut self, patch: PatchChange) -> NgResult<()> {
        if self.patch_change(patch.id).is_some() {
            return Err(NgError::State(format!("duplicate patch change {:?}", patch.id)));
        }
        let idx = self
            .patch_changes
            .partition_point(|p| (p.time, p.id) < (patch.time, patch.id));
        self.patch_changes.insert(idx, patch);
        Ok(())
    }

    pub(crate) fn remove_patch(&mut self, id: PatchChangeId) -> NgResult<PatchChange> {
        let idx = self
            .patch_changes
            .iter()
            .position(|p| p.id == id)
            .ok_or(NgError::PatchChangeNotFound(id))?;
        Ok(self.patch_changes.remove(idx))
    }

    pub(crate) fn replace_patch(&mut self, patch: PatchChange) -> NgResult<PatchChange> {
        let before = self.remove_patch(patch.id)?;
        self.insert_patch(patch)?;
        Ok(before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(beats: f64, pitch: i32) -> Note {
        Note::new(0, Beats::from_f64(beats), Beats::ONE_BEAT, pitch, 100)
    }

    #[test]
    fn test_sorted_insert_allows_duplicates() {
        let mut set = NoteSet::new();
        set.insert(note(1.0, 60)).unwrap();
        set.insert(note(0.0, 62)).unwrap();
        set.insert(note(1.0, 60)).unwrap();

        let times: Vec<_> = set.iter().map(|n| n.time.to_f64()).collect();
        assert_eq!(times, vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut set = NoteSet::new();
        let n = note(0.0, 60);
        set.insert(n).unwrap();
        assert!(matches!(set.insert(n), Err(NgError::DuplicateNote(_))));
    }

    #[test]
    fn test_lower_bound() {
        let set = NoteSet::from_notes([note(0.0, 60), note(1.0, 61), note(2.0, 62)]);
        let first = set.lower_bound(Beats::from_f64(0.5)).next().unwrap();
        assert_eq!(first.note, 61);
        assert_eq!(set.note_before(Beats::from_f64(0.5)).unwrap().note, 60);
        assert!(set.lower_bound(Beats::from_beats(3)).next().is_none());
        assert!(set.note_before(Beats::ZERO).is_none());
    }

    #[test]
    fn test_contains_matches_slot() {
        let n = note(1.0, 60);
        let set = NoteSet::from_notes([n]);
        assert!(set.contains(&n.duplicate()));
        assert!(!set.contains(&note(1.0, 61)));
    }

    #[test]
    fn test_replace_reorders() {
        let a = note(0.0, 60);
        let b = note(1.0, 61);
        let mut set = NoteSet::from_notes([a, b]);

        let mut moved = a;
        moved.time = Beats::from_beats(2);
        let before = set.replace(moved).unwrap();
        assert_eq!(before.time, Beats::ZERO);
        assert_eq!(set.first().unwrap().id, b.id);
        assert_eq!(set.last().unwrap().id, a.id);
    }

    #[test]
    fn test_notes_in_range() {
        let set = NoteSet::from_notes([note(0.0, 60), note(2.0, 61), note(4.0, 62)]);
        let hits: Vec<_> = set
            .notes_in_range(Beats::from_f64(0.5), Beats::from_beats(3))
            .map(|n| n.note)
            .collect();
        assert_eq!(hits, vec![60, 61]);
    }
}
