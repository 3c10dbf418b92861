//! Note Model
//!
//! Shared, thread-safe handle over a [`NoteSet`] with:
//! - Transactional edits through [`NoteDiffCommand`]
//! - Undo/redo and reversible-command groups
//! - A recording path that appends without undo entries
//! - Content-change subscriptions that unsubscribe on drop

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use ng_core::{Beats, NgError, NgResult, Note, NoteId};

use crate::{AppliedOp, DiffOp, NoteDiffCommand, NoteSet, Transaction, UndoManager};

// ═══════════════════════════════════════════════════════════════════════════════
// CHANGE NOTIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

/// What caused a content change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// An applied diff command
    Edit,
    /// Live recording
    Record,
    Undo,
    Redo,
    /// An aborted reversible command was rolled back
    Rollback,
    /// Whole content replaced
    Reload,
}

/// One content-changed notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    /// Model generation after the change
    pub generation: u64,
    pub origin: ChangeOrigin,
    pub added: Vec<NoteId>,
    pub removed: Vec<NoteId>,
    pub changed: Vec<NoteId>,
    /// Patch changes were touched
    pub patches_changed: bool,
}

impl ContentChange {
    fn from_ops(generation: u64, origin: ChangeOrigin, ops: &[AppliedOp]) -> Self {
        let mut change = Self {
            generation,
            origin,
            added: Vec::new(),
            removed: Vec::new(),
            changed: Vec::new(),
            patches_changed: false,
        };
        for op in ops {
            match op {
                AppliedOp::NoteAdded(n) => change.added.push(n.id),
                AppliedOp::NoteRemoved(n) => change.removed.push(n.id),
                AppliedOp::NoteChanged { after, .. } => {
                    if !change.changed.contains(&after.id) {
                        change.changed.push(after.id);
                    }
                }
                AppliedOp::PatchAdded(_)
                | AppliedOp::PatchRemoved(_)
                | AppliedOp::PatchChanged { .. } => change.patches_changed = true,
            }
        }
        change
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.changed.is_empty()
            && !self.patches_changed
    }
}

/// A live content-change subscription.
///
/// Dropping it removes the subscriber from the model.
pub struct ContentSubscription {
    id: u64,
    receiver: Receiver<ContentChange>,
    model: Weak<ModelInner>,
}

impl ContentSubscription {
    /// Next pending change, if any
    pub fn try_recv(&self) -> Option<ContentChange> {
        match self.receiver.try_recv() {
            Ok(change) => Some(change),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// All pending changes, oldest first
    pub fn drain(&self) -> Vec<ContentChange> {
        self.receiver.try_iter().collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.receiver.is_empty()
    }

    pub fn receiver(&self) -> &Receiver<ContentChange> {
        &self.receiver
    }
}

impl Drop for ContentSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.model.upgrade() {
            inner.subscribers.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODEL
// ═══════════════════════════════════════════════════════════════════════════════

struct ModelInner {
    notes: RwLock<NoteSet>,
    history: Mutex<UndoManager>,
    subscribers: Mutex<Vec<(u64, Sender<ContentChange>)>>,
    next_subscriber: AtomicU64,
    generation: AtomicU64,
}

/// Shared handle to a note model. Clones refer to the same model.
#[derive(Clone)]
pub struct MidiModel {
    inner: Arc<ModelInner>,
}

impl MidiModel {
    pub fn new() -> Self {
        Self::with_history(100)
    }

    pub fn with_history(max_history: usize) -> Self {
        Self {
            inner: Arc::new(ModelInner {
                notes: RwLock::new(NoteSet::new()),
                history: Mutex::new(UndoManager::new(max_history)),
                subscribers: Mutex::new(Vec::new()),
                next_subscriber: AtomicU64::new(1),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Model pre-populated with notes (no undo history)
    pub fn from_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        let model = Self::new();
        *model.inner.notes.write() = NoteSet::from_notes(notes);
        model
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────────

    /// Read access to the note set. Hold the guard briefly; edits block on it.
    pub fn read(&self) -> RwLockReadGuard<'_, NoteSet> {
        self.inner.notes.read()
    }

    pub fn note(&self, id: NoteId) -> Option<Note> {
        self.read().get(id).copied()
    }

    /// Copy of every note in time order
    pub fn notes(&self) -> Vec<Note> {
        self.read().notes().to_vec()
    }

    pub fn note_count(&self) -> usize {
        self.read().len()
    }

    /// Is a note with the same start, pitch and channel already present?
    pub fn contains(&self, note: &Note) -> bool {
        self.read().contains(note)
    }

    /// First note starting at or after `time`
    pub fn note_lower_bound(&self, time: Beats) -> Option<Note> {
        self.read().lower_bound(time).next().copied()
    }

    /// Monotonic counter bumped by every content change
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Diff commands
    // ─────────────────────────────────────────────────────────────────────────────

    /// Open a new diff command against this model
    pub fn new_diff_command(&self, name: &str) -> NoteDiffCommand {
        NoteDiffCommand::new(self.clone(), name)
    }

    /// Apply a diff command; see [`NoteDiffCommand::apply`]
    pub fn apply(&self, command: NoteDiffCommand, as_subcommand: bool) -> NgResult<ContentChange> {
        command.apply(as_subcommand)
    }

    /// Abort a diff command; see [`NoteDiffCommand::abort`]
    pub fn abort(&self, command: NoteDiffCommand) {
        command.abort();
    }

    pub(crate) fn apply_ops(
        &self,
        name: &str,
        ops: Vec<DiffOp>,
        as_subcommand: bool,
    ) -> NgResult<ContentChange> {
        let applied = {
            let mut notes = self.inner.notes.write();
            let mut working = notes.clone();
            let applied = execute_diff(&mut working, ops)?;
            *notes = working;
            applied
        };

        {
            let mut history = self.inner.history.lock();
            if as_subcommand && !history.in_group() {
                log::warn!("Diff '{}' applied as subcommand with no open reversible command", name);
            }
            history.record(Transaction::new(name, applied.clone()));
        }

        log::debug!("Applied diff '{}' ({} ops)", name, applied.len());
        Ok(self.notify(ChangeOrigin::Edit, &applied))
    }

    pub(crate) fn abort_diff(&self, name: &str) {
        log::debug!("Aborted diff '{}'", name);
        if self.inner.history.lock().in_group() {
            self.abort_reversible_command();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Reversible commands and history
    // ─────────────────────────────────────────────────────────────────────────────

    /// Open a group; diffs applied until the matching commit form one undo step
    pub fn begin_reversible_command(&self, name: &str) {
        self.inner.history.lock().begin_group(name);
    }

    pub fn commit_reversible_command(&self) {
        self.inner.history.lock().end_group();
    }

    /// Close the open group and revert every diff it recorded
    pub fn abort_reversible_command(&self) {
        let group = self.inner.history.lock().abort_group();
        let Some(group) = group else {
            return;
        };
        if group.is_empty() {
            return;
        }

        match self.execute_applied(&group.inverse_ops()) {
            Ok(reverted) => {
                log::info!("Rolled back '{}' ({} ops)", group.name(), reverted.len());
                self.notify(ChangeOrigin::Rollback, &reverted);
            }
            Err(e) => log::error!("Failed to roll back '{}': {}", group.name(), e),
        }
    }

    pub fn in_reversible_command(&self) -> bool {
        self.inner.history.lock().in_group()
    }

    pub fn undo(&self) -> NgResult<ContentChange> {
        let transaction = {
            let mut history = self.inner.history.lock();
            if history.in_group() {
                return Err(NgError::State("cannot undo inside a reversible command".into()));
            }
            history.pop_undo().ok_or(NgError::NothingToUndo)?
        };

        match self.execute_applied(&transaction.inverse_ops()) {
            Ok(reverted) => {
                self.inner.history.lock().push_redo(transaction);
                Ok(self.notify(ChangeOrigin::Undo, &reverted))
            }
            Err(e) => {
                self.inner.history.lock().restore_undo(transaction);
                Err(e)
            }
        }
    }

    pub fn redo(&self) -> NgResult<ContentChange> {
        let transaction = {
            let mut history = self.inner.history.lock();
            if history.in_group() {
                return Err(NgError::State("cannot redo inside a reversible command".into()));
            }
            history.pop_redo().ok_or(NgError::NothingToRedo)?
        };

        match self.execute_applied(transaction.ops()) {
            Ok(replayed) => {
                self.inner.history.lock().push_redone(transaction);
                Ok(self.notify(ChangeOrigin::Redo, &replayed))
            }
            Err(e) => {
                self.inner.history.lock().push_redo(transaction);
                Err(e)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.inner.history.lock().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.inner.history.lock().can_redo()
    }

    pub fn undo_name(&self) -> Option<String> {
        self.inner.history.lock().undo_name().map(str::to_string)
    }

    pub fn set_max_history(&self, max_history: usize) {
        self.inner.history.lock().set_max_history(max_history);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Recording path
    // ─────────────────────────────────────────────────────────────────────────────

    /// Append a recorded note directly (no undo entry)
    pub fn append_recorded(&self, note: Note) -> NgResult<NoteId> {
        let op = AppliedOp::NoteAdded(note.clamped());
        self.execute_applied(std::slice::from_ref(&op))?;
        self.notify(ChangeOrigin::Record, &[op]);
        Ok(note.id)
    }

    /// Give a recorded note its note-off (no undo entry)
    pub fn resolve_recorded(&self, id: NoteId, end: Beats, off_velocity: i32) -> NgResult<Note> {
        let (before, after) = {
            let mut notes = self.inner.notes.write();
            let before = *notes.get(id).ok_or(NgError::NoteNotFound(id))?;
            let mut after = before.with_off_velocity(off_velocity);
            after.length = (end - before.time).max(Beats::ZERO);
            notes.replace(after)?;
            (before, after)
        };
        self.notify(ChangeOrigin::Record, &[AppliedOp::NoteChanged { before, after }]);
        Ok(after)
    }

    /// Replace the whole content and forget history
    pub fn load(&self, notes: impl IntoIterator<Item = Note>) {
        let fresh = NoteSet::from_notes(notes);
        let ops: Vec<AppliedOp> = {
            let mut current = self.inner.notes.write();
            let mut ops: Vec<AppliedOp> =
                current.iter().map(|n| AppliedOp::NoteRemoved(*n)).collect();
            ops.extend(fresh.iter().map(|n| AppliedOp::NoteAdded(*n)));
            *current = fresh;
            ops
        };
        self.inner.history.lock().clear();
        self.notify(ChangeOrigin::Reload, &ops);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn subscribe(&self) -> ContentSubscription {
        let (tx, rx) = crossbeam_channel::unbounded();
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        self.inner.subscribers.lock().push((id, tx));
        ContentSubscription {
            id,
            receiver: rx,
            model: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────────

    /// Replay already-resolved ops atomically
    fn execute_applied(&self, ops: &[AppliedOp]) -> NgResult<Vec<AppliedOp>> {
        let mut notes = self.inner.notes.write();
        let mut working = notes.clone();
        for op in ops {
            match *op {
                AppliedOp::NoteAdded(n) => working.insert(n)?,
                AppliedOp::NoteRemoved(n) => {
                    working.remove(n.id)?;
                }
                AppliedOp::NoteChanged { after, .. } => {
                    working.replace(after)?;
                }
                AppliedOp::PatchAdded(p) => working.insert_patch(p)?,
                AppliedOp::PatchRemoved(p) => {
                    working.remove_patch(p.id)?;
                }
                AppliedOp::PatchChanged { after, .. } => {
                    working.replace_patch(after)?;
                }
            }
        }
        *notes = working;
        Ok(ops.to_vec())
    }

    fn notify(&self, origin: ChangeOrigin, ops: &[AppliedOp]) -> ContentChange {
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let change = ContentChange::from_ops(generation, origin, ops);
        self.inner
            .subscribers
            .lock()
            .retain(|(_, tx)| tx.send(change.clone()).is_ok());
        change
    }
}

impl Default for MidiModel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MidiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiModel")
            .field("notes", &self.note_count())
            .field("generation", &self.generation())
            .finish()
    }
}

/// Resolve staged ops against `set`, in staging order
fn execute_diff(set: &mut NoteSet, ops: Vec<DiffOp>) -> NgResult<Vec<AppliedOp>> {
    let mut applied = Vec::with_capacity(ops.len());
    for op in ops {
        match op {
            DiffOp::AddNote(note) => {
                let note = note.clamped();
                set.insert(note)?;
                applied.push(AppliedOp::NoteAdded(note));
            }
            DiffOp::RemoveNote(id) => {
                let note = set.remove(id)?;
                applied.push(AppliedOp::NoteRemoved(note));
            }
            DiffOp::ChangeNote(id, change) => {
                let before = *set.get(id).ok_or(NgError::NoteNotFound(id))?;
                let after = change.apply_to(before);
                set.replace(after)?;
                applied.push(AppliedOp::NoteChanged { before, after });
            }
            DiffOp::AddPatch(patch) => {
                set.insert_patch(patch)?;
                applied.push(AppliedOp::PatchAdded(patch));
            }
            DiffOp::RemovePatch(id) => {
                let patch = set.remove_patch(id)?;
                applied.push(AppliedOp::PatchRemoved(patch));
            }
            DiffOp::ChangePatch(id, property) => {
                let before = *set
                    .patch_change(id)
                    .ok_or(NgError::PatchChangeNotFound(id))?;
                let after = property.apply_to(before);
                set.replace_patch(after)?;
                applied.push(AppliedOp::PatchChanged { before, after });
            }
        }
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoteChange;

    fn note(beats: i64, pitch: i32) -> Note {
        Note::new(0, Beats::from_beats(beats), Beats::ONE_BEAT, pitch, 100)
    }

    #[test]
    fn test_apply_and_undo_redo() {
        let model = MidiModel::new();
        let n = note(0, 60);

        let mut cmd = model.new_diff_command("add note");
        cmd.add(n);
        let change = cmd.apply(false).unwrap();
        assert_eq!(change.added, vec![n.id]);
        assert_eq!(model.note_count(), 1);
        assert_eq!(model.undo_name().as_deref(), Some("add note"));

        let undone = model.undo().unwrap();
        assert_eq!(undone.origin, ChangeOrigin::Undo);
        assert_eq!(undone.removed, vec![n.id]);
        assert_eq!(model.note_count(), 0);

        model.redo().unwrap();
        assert_eq!(model.note(n.id), Some(n));
        assert!(matches!(model.redo(), Err(NgError::NothingToRedo)));
    }

    #[test]
    fn test_failed_diff_is_atomic() {
        let model = MidiModel::from_notes([note(0, 60)]);
        let before = model.notes();

        let mut cmd = model.new_diff_command("bad");
        cmd.add(note(1, 62));
        cmd.change(NoteId(u64::MAX), NoteChange::Velocity(10));
        assert!(cmd.apply(false).is_err());

        assert_eq!(model.notes(), before);
        assert!(!model.can_undo());
    }

    #[test]
    fn test_changes_apply_in_order() {
        let n = note(0, 60);
        let model = MidiModel::from_notes([n]);

        let mut cmd = model.new_diff_command("transpose twice");
        cmd.change(n.id, NoteChange::NoteNumber(72));
        cmd.change(n.id, NoteChange::NoteNumber(84));
        cmd.apply(false).unwrap();
        assert_eq!(model.note(n.id).unwrap().note, 84);

        model.undo().unwrap();
        assert_eq!(model.note(n.id).unwrap().note, 60);
    }

    #[test]
    fn test_group_is_one_undo_step() {
        let model = MidiModel::new();
        model.begin_reversible_command("paste");
        for pitch in [60, 64, 67] {
            let mut cmd = model.new_diff_command("add");
            cmd.add(note(0, pitch));
            cmd.apply(true).unwrap();
        }
        model.commit_reversible_command();

        assert_eq!(model.note_count(), 3);
        assert_eq!(model.undo_name().as_deref(), Some("paste"));
        model.undo().unwrap();
        assert_eq!(model.note_count(), 0);
    }

    #[test]
    fn test_abort_rolls_back_group() {
        let model = MidiModel::new();
        let sub = model.subscribe();

        model.begin_reversible_command("drag");
        let mut cmd = model.new_diff_command("first");
        cmd.add(note(0, 60));
        cmd.apply(true).unwrap();

        let mut second = model.new_diff_command("second");
        second.add(note(1, 61));
        second.abort();

        assert_eq!(model.note_count(), 0);
        assert!(!model.in_reversible_command());
        assert!(!model.can_undo());

        let origins: Vec<_> = sub.drain().into_iter().map(|c| c.origin).collect();
        assert_eq!(origins, vec![ChangeOrigin::Edit, ChangeOrigin::Rollback]);
    }

    #[test]
    fn test_plain_abort_is_silent() {
        let model = MidiModel::new();
        let sub = model.subscribe();
        let mut cmd = model.new_diff_command("nothing");
        cmd.add(note(0, 60));
        model.abort(cmd);
        assert!(!sub.has_pending());
        assert_eq!(model.generation(), 0);
    }

    #[test]
    fn test_subscription_drop_unsubscribes() {
        let model = MidiModel::new();
        let sub = model.subscribe();
        assert_eq!(model.subscriber_count(), 1);
        drop(sub);
        assert_eq!(model.subscriber_count(), 0);
    }

    #[test]
    fn test_recording_has_no_undo() {
        let model = MidiModel::new();
        let n = Note::unterminated(0, Beats::ZERO, 60, 90);
        let id = model.append_recorded(n).unwrap();
        assert!(model.note(id).unwrap().is_unterminated());

        let resolved = model
            .resolve_recorded(id, Beats::from_beats(2), 40)
            .unwrap();
        assert_eq!(resolved.length, Beats::from_beats(2));
        assert_eq!(resolved.off_velocity, 40);
        assert!(!model.can_undo());
    }

    #[test]
    fn test_load_clears_history() {
        let model = MidiModel::new();
        let mut cmd = model.new_diff_command("add");
        cmd.add(note(0, 60));
        cmd.apply(false).unwrap();

        model.load([note(0, 50), note(1, 52)]);
        assert_eq!(model.note_count(), 2);
        assert!(!model.can_undo());
    }

    #[test]
    fn test_patch_changes_undo() {
        let model = MidiModel::new();
        let patch = ng_core::PatchChange::new(Beats::ZERO, 0, 5, 0);
        let mut cmd = model.new_diff_command("add patch");
        cmd.add_patch_change(patch);
        let change = cmd.apply(false).unwrap();
        assert!(change.patches_changed);
        assert_eq!(model.read().patch_changes().len(), 1);

        let mut cmd = model.new_diff_command("program");
        cmd.change_patch_change(patch.id, crate::PatchProperty::Program(9));
        cmd.apply(false).unwrap();
        assert_eq!(model.read().patch_change(patch.id).unwrap().program, 9);

        model.undo().unwrap();
        model.undo().unwrap();
        assert!(model.read().patch_changes().is_empty());
    }
}
