//! Undo/Redo history of applied note edits
//!
//! Every applied diff is recorded as a [`Transaction`] of [`AppliedOp`]s that
//! carry enough state to be reversed. Diffs applied while a reversible-command
//! group is open are folded into that group's transaction.

use std::collections::VecDeque;

use ng_core::{Note, PatchChange};

/// One applied change, with before/after state
#[derive(Debug, Clone, PartialEq)]
pub enum AppliedOp {
    NoteAdded(Note),
    NoteRemoved(Note),
    NoteChanged { before: Note, after: Note },
    PatchAdded(PatchChange),
    PatchRemoved(PatchChange),
    PatchChanged { before: PatchChange, after: PatchChange },
}

impl AppliedOp {
    /// The op that reverses this one
    pub fn inverse(&self) -> AppliedOp {
        match *self {
            AppliedOp::NoteAdded(n) => AppliedOp::NoteRemoved(n),
            AppliedOp::NoteRemoved(n) => AppliedOp::NoteAdded(n),
            AppliedOp::NoteChanged { before, after } => AppliedOp::NoteChanged {
                before: after,
                after: before,
            },
            AppliedOp::PatchAdded(p) => AppliedOp::PatchRemoved(p),
            AppliedOp::PatchRemoved(p) => AppliedOp::PatchAdded(p),
            AppliedOp::PatchChanged { before, after } => AppliedOp::PatchChanged {
                before: after,
                after: before,
            },
        }
    }
}

/// An undoable unit: a single diff or a whole reversible-command group
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    name: String,
    ops: Vec<AppliedOp>,
}

impl Transaction {
    pub fn new(name: impl Into<String>, ops: Vec<AppliedOp>) -> Self {
        Self {
            name: name.into(),
            ops,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ops(&self) -> &[AppliedOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Ops that undo this transaction, in application order
    pub fn inverse_ops(&self) -> Vec<AppliedOp> {
        self.ops.iter().rev().map(AppliedOp::inverse).collect()
    }
}

/// Undo/Redo manager
#[derive(Debug)]
pub struct UndoManager {
    undo_stack: VecDeque<Transaction>,
    redo_stack: Vec<Transaction>,
    max_history: usize,
    group_depth: usize,
    group: Option<Transaction>,
}

impl UndoManager {
    pub fn new(max_history: usize) -> Self {
        Self {
            undo_stack: VecDeque::with_capacity(max_history.min(256)),
            redo_stack: Vec::new(),
            max_history: max_history.max(1),
            group_depth: 0,
            group: None,
        }
    }

    /// Record an applied transaction.
    ///
    /// Inside an open group the ops join the group; otherwise the transaction
    /// becomes its own undo step.
    pub fn record(&mut self, transaction: Transaction) {
        if transaction.is_empty() {
            return;
        }

        if let Some(group) = self.group.as_mut() {
            group.ops.extend(transaction.ops);
        } else {
            self.push_transaction(transaction);
        }

        // Clear redo stack on new edits
        self.redo_stack.clear();
    }

    fn push_transaction(&mut self, transaction: Transaction) {
        // Enforce max history
        while self.undo_stack.len() >= self.max_history {
            self.undo_stack.pop_front();
        }

        self.undo_stack.push_back(transaction);
    }

    /// Take the most recent transaction for undoing
    pub fn pop_undo(&mut self) -> Option<Transaction> {
        self.undo_stack.pop_back()
    }

    /// Put back a transaction whose undo failed
    pub fn restore_undo(&mut self, transaction: Transaction) {
        self.undo_stack.push_back(transaction);
    }

    /// Move an undone transaction onto the redo stack
    pub fn push_redo(&mut self, transaction: Transaction) {
        self.redo_stack.push(transaction);
    }

    /// Take the most recent undone transaction for redoing
    pub fn pop_redo(&mut self) -> Option<Transaction> {
        self.redo_stack.pop()
    }

    /// Move a redone transaction back onto the undo stack (keeps remaining redo steps)
    pub fn push_redone(&mut self, transaction: Transaction) {
        self.push_transaction(transaction);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Reversible-command groups
    // ─────────────────────────────────────────────────────────────────────────────

    /// Start a command group (grouped diffs are undone/redone together).
    /// Nested begins are counted; only the outermost name is kept.
    pub fn begin_group(&mut self, name: &str) {
        self.group_depth += 1;
        if self.group.is_none() {
            self.group = Some(Transaction::new(name, Vec::new()));
        } else {
            log::debug!("Nested command group '{}' folded into open group", name);
        }
    }

    /// End a command group. The outermost end records the group as one step.
    pub fn end_group(&mut self) {
        if self.group_depth == 0 {
            log::warn!("end_group without open group");
            return;
        }
        self.group_depth -= 1;

        if self.group_depth == 0
            && let Some(group) = self.group.take()
            && !group.is_empty()
        {
            self.push_transaction(group);
        }
    }

    /// Close every open group and hand back what it had recorded so the
    /// caller can roll it back
    pub fn abort_group(&mut self) -> Option<Transaction> {
        self.group_depth = 0;
        self.group.take()
    }

    pub fn in_group(&self) -> bool {
        self.group_depth > 0
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────────

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get the name of the next undo step
    pub fn undo_name(&self) -> Option<&str> {
        self.undo_stack.back().map(|t| t.name())
    }

    /// Get the name of the next redo step
    pub fn redo_name(&self) -> Option<&str> {
        self.redo_stack.last().map(|t| t.name())
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.group = None;
        self.group_depth = 0;
    }

    /// Get number of undo steps
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get number of redo steps
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn set_max_history(&mut self, max_history: usize) {
        self.max_history = max_history.max(1);
        while self.undo_stack.len() > self.max_history {
            self.undo_stack.pop_front();
        }
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(100)
    }
}
