//! Diff commands: the only way to edit a model
//!
//! A [`NoteDiffCommand`] stages adds, removes and property changes, then is
//! either applied in full or aborted. Dropping a command that was neither
//! applied nor aborted aborts it.

use ng_core::{
    Beats, NgResult, Note, NoteId, PatchChange, PatchChangeId, clamp_bank, clamp_channel,
    clamp_to_0_127,
};

use crate::{ContentChange, MidiModel};

/// Property of a note that a diff can change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteProperty {
    NoteNumber,
    Velocity,
    OffVelocity,
    Channel,
    StartTime,
    Length,
}

/// A new value for one note property.
///
/// Integer values are clamped into their legal range when applied, so callers
/// may stage out-of-range arithmetic results directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteChange {
    NoteNumber(i32),
    Velocity(i32),
    OffVelocity(i32),
    Channel(i32),
    StartTime(Beats),
    Length(Beats),
}

impl NoteChange {
    pub fn property(&self) -> NoteProperty {
        match self {
            NoteChange::NoteNumber(_) => NoteProperty::NoteNumber,
            NoteChange::Velocity(_) => NoteProperty::Velocity,
            NoteChange::OffVelocity(_) => NoteProperty::OffVelocity,
            NoteChange::Channel(_) => NoteProperty::Channel,
            NoteChange::StartTime(_) => NoteProperty::StartTime,
            NoteChange::Length(_) => NoteProperty::Length,
        }
    }

    /// The note with this change applied
    pub fn apply_to(&self, mut note: Note) -> Note {
        match *self {
            NoteChange::NoteNumber(v) => note.note = clamp_to_0_127(v),
            NoteChange::Velocity(v) => note.velocity = clamp_to_0_127(v),
            NoteChange::OffVelocity(v) => note.off_velocity = clamp_to_0_127(v),
            NoteChange::Channel(v) => note.channel = clamp_channel(v),
            NoteChange::StartTime(t) => note.time = t.max(Beats::ZERO),
            NoteChange::Length(l) => note.length = l.max(Beats::ZERO),
        }
        note
    }
}

/// A new value for one patch change property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchProperty {
    Time(Beats),
    Channel(i32),
    Program(i32),
    Bank(i32),
}

impl PatchProperty {
    pub fn apply_to(&self, mut patch: PatchChange) -> PatchChange {
        match *self {
            PatchProperty::Time(t) => patch.time = t.max(Beats::ZERO),
            PatchProperty::Channel(v) => patch.channel = clamp_channel(v),
            PatchProperty::Program(v) => patch.program = clamp_to_0_127(v),
            PatchProperty::Bank(v) => patch.bank = clamp_bank(v),
        }
        patch
    }
}

/// A staged operation
#[derive(Debug, Clone, PartialEq)]
pub enum DiffOp {
    AddNote(Note),
    RemoveNote(NoteId),
    ChangeNote(NoteId, NoteChange),
    AddPatch(PatchChange),
    RemovePatch(PatchChangeId),
    ChangePatch(PatchChangeId, PatchProperty),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandState {
    Open,
    Applied,
    Aborted,
}

/// A single-use batch of edits against a [`MidiModel`]
pub struct NoteDiffCommand {
    name: String,
    model: MidiModel,
    ops: Vec<DiffOp>,
    state: CommandState,
}

impl NoteDiffCommand {
    pub(crate) fn new(model: MidiModel, name: &str) -> Self {
        Self {
            name: name.to_string(),
            model,
            ops: Vec::new(),
            state: CommandState::Open,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ops(&self) -> &[DiffOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Staging
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn add(&mut self, note: Note) {
        self.ops.push(DiffOp::AddNote(note));
    }

    pub fn remove(&mut self, id: NoteId) {
        self.ops.push(DiffOp::RemoveNote(id));
    }

    pub fn change(&mut self, id: NoteId, change: NoteChange) {
        self.ops.push(DiffOp::ChangeNote(id, change));
    }

    pub fn add_patch_change(&mut self, patch: PatchChange) {
        self.ops.push(DiffOp::AddPatch(patch));
    }

    pub fn remove_patch_change(&mut self, id: PatchChangeId) {
        self.ops.push(DiffOp::RemovePatch(id));
    }

    pub fn change_patch_change(&mut self, id: PatchChangeId, property: PatchProperty) {
        self.ops.push(DiffOp::ChangePatch(id, property));
    }

    /// Notes staged for addition
    pub fn added_notes(&self) -> impl Iterator<Item = &Note> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DiffOp::AddNote(n) => Some(n),
            _ => None,
        })
    }

    /// Is `id` staged for removal?
    pub fn removes(&self, id: NoteId) -> bool {
        self.ops
            .iter()
            .any(|op| matches!(op, DiffOp::RemoveNote(r) if *r == id))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Completion
    // ─────────────────────────────────────────────────────────────────────────────

    /// Apply every staged op atomically. On error the model is untouched.
    pub fn apply(mut self, as_subcommand: bool) -> NgResult<ContentChange> {
        self.state = CommandState::Applied;
        let ops = std::mem::take(&mut self.ops);
        self.model.apply_ops(&self.name, ops, as_subcommand)
    }

    /// Discard every staged op and roll back any open reversible command
    pub fn abort(mut self) {
        self.abort_inner();
    }

    fn abort_inner(&mut self) {
        if self.state != CommandState::Open {
            return;
        }
        self.state = CommandState::Aborted;
        self.ops.clear();
        self.model.abort_diff(&self.name);
    }
}

impl Drop for NoteDiffCommand {
    fn drop(&mut self) {
        if self.state == CommandState::Open {
            log::debug!("Diff '{}' dropped while open, aborting", self.name);
            self.abort_inner();
        }
    }
}

impl std::fmt::Debug for NoteDiffCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteDiffCommand")
            .field("name", &self.name)
            .field("ops", &self.ops.len())
            .field("state", &self.state)
            .finish()
    }
}
