//! Drag state machine
//!
//! `begin_drag` snapshots the selection, `update_drag` recomputes a preview
//! from the total pointer offset, and `finish_drag` commits the preview as
//! one edit. `abort_drag` drops it; the model is never touched before finish.

use ng_core::{Beats, Note, NoteId, Snap};

use crate::{MidiView, NoteVisual};

/// What a drag does to the selected notes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    /// Move copies, leaving the originals
    Copy,
    /// Drag note starts (ends stay put)
    TrimStart,
    /// Drag note ends
    TrimEnd,
}

/// An in-progress drag
#[derive(Debug, Clone)]
pub struct DragState {
    kind: DragKind,
    /// Selected notes as they were when the drag began
    origin: Vec<Note>,
    /// Total pointer offset since the drag began
    dx: f64,
    dy: f64,
    snap: Snap,
    /// Time delta of a move, measured at the earliest note
    dt: Beats,
    dnote: i32,
    preview: Vec<(NoteId, NoteVisual)>,
}

impl DragState {
    pub fn kind(&self) -> DragKind {
        self.kind
    }

    pub fn origin(&self) -> &[Note] {
        &self.origin
    }

    pub fn dt(&self) -> Beats {
        self.dt
    }

    pub fn dnote(&self) -> i32 {
        self.dnote
    }

    /// Where each dragged note would be drawn
    pub fn preview(&self) -> &[(NoteId, NoteVisual)] {
        &self.preview
    }
}

impl MidiView {
    pub fn drag(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Start dragging the selection. Fails with nothing selected or a drag running.
    pub fn begin_drag(&mut self, kind: DragKind) -> bool {
        if self.drag.is_some() {
            return false;
        }
        let trimming = matches!(kind, DragKind::TrimStart | DragKind::TrimEnd);
        let origin: Vec<Note> = self
            .selected_notes()
            .into_iter()
            .filter(|n| !(trimming && n.is_unterminated()))
            .collect();
        if origin.is_empty() {
            return false;
        }

        let preview = origin
            .iter()
            .map(|n| (n.id, self.build_visual(n)))
            .collect();
        self.drag = Some(DragState {
            kind,
            origin,
            dx: 0.0,
            dy: 0.0,
            snap: Snap::None,
            dt: Beats::ZERO,
            dnote: 0,
            preview,
        });
        true
    }

    /// Pointer moved: `dx`/`dy` are the total offset from where the drag began
    pub fn update_drag(&mut self, dx: f64, dy: f64, snap: Snap) {
        let Some(mut state) = self.drag.take() else {
            return;
        };
        state.dx = dx;
        state.dy = dy;
        state.snap = snap;

        let mut preview = Vec::with_capacity(state.origin.len());
        match state.kind {
            DragKind::Move | DragKind::Copy => {
                let earliest = state.origin.iter().map(|n| n.time).min().unwrap_or_default();
                state.dt = self.dragged_edge(earliest, dx, snap) - earliest;
                let rows = -(dy / self.mapping.note_height()).round() as i32;
                state.dnote = Self::group_pitch_delta(&state.origin, rows);

                for note in &state.origin {
                    let mut moved = *note;
                    let new_time = note.time + state.dt;
                    if !new_time.is_negative() {
                        moved.time = new_time;
                        moved.note = (note.note as i32 + state.dnote).clamp(0, 127) as u8;
                    }
                    preview.push((note.id, self.build_visual(&moved)));
                }
            }
            DragKind::TrimStart | DragKind::TrimEnd => {
                for note in &state.origin {
                    let trimmed = match self.trim_deltas(note, state.kind, dx, snap) {
                        Some((front, end)) => trimmed_note(note, front, end),
                        None => *note,
                    };
                    preview.push((note.id, self.build_visual(&trimmed)));
                }
            }
        }
        state.preview = preview;
        self.drag = Some(state);
    }

    /// Commit the drag as one edit. Returns false if it changed nothing.
    pub fn finish_drag(&mut self) -> bool {
        let Some(state) = self.drag.take() else {
            return false;
        };

        match state.kind {
            DragKind::Move => self.move_selection(state.dt, state.dnote),
            DragKind::Copy => self.move_copies(state.dt, state.dnote),
            DragKind::TrimStart | DragKind::TrimEnd => {
                let trims: Vec<(NoteId, Beats, Beats)> = state
                    .origin
                    .iter()
                    .filter_map(|n| {
                        self.trim_deltas(n, state.kind, state.dx, state.snap)
                            .map(|(front, end)| (n.id, front, end))
                    })
                    .collect();
                if trims.is_empty() {
                    return false;
                }
                self.start_note_diff_command("resize notes");
                let mut staged = false;
                for (id, front, end) in trims {
                    staged |= self.trim_note(id, front, end);
                }
                self.commit_edit() && staged
            }
        }
    }

    /// Drop the drag without touching the model
    pub fn abort_drag(&mut self) {
        if self.drag.take().is_some() {
            log::trace!("Drag aborted");
        }
    }

    /// Source position reached by dragging `edge` by `dx` pixels
    fn dragged_edge(&self, edge: Beats, dx: f64, snap: Snap) -> Beats {
        if dx == 0.0 {
            return edge;
        }
        let position = self.x_to_position(self.beats_to_x(edge) + dx);
        self.converter().to_beats(position, snap)
    }

    /// (front, end) trim deltas for one note, or `None` if the edge would
    /// not move or would cross the other edge
    fn trim_deltas(
        &self,
        note: &Note,
        kind: DragKind,
        dx: f64,
        snap: Snap,
    ) -> Option<(Beats, Beats)> {
        let end = note.end_time();
        match kind {
            DragKind::TrimStart => {
                let new_start = self.dragged_edge(note.time, dx, snap).max(Beats::ZERO);
                (new_start != note.time && new_start < end)
                    .then(|| (new_start - note.time, Beats::ZERO))
            }
            DragKind::TrimEnd => {
                let new_end = self.dragged_edge(end, dx, snap);
                (new_end != end && new_end > note.time).then(|| (Beats::ZERO, new_end - end))
            }
            DragKind::Move | DragKind::Copy => None,
        }
    }
}

/// `note` with trim deltas applied, end held fixed on front trims
fn trimmed_note(note: &Note, front: Beats, end: Beats) -> Note {
    let mut trimmed = *note;
    let note_end = note.end_time();
    trimmed.time = (note.time + front).max(Beats::ZERO);
    trimmed.length = (note_end - trimmed.time + end).max(Beats::ZERO);
    trimmed
}
