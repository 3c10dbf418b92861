//! Edit operations
//!
//! Every operation stages its changes into the view's diff command and
//! applies it as one undoable step. Rejected operations return `false` or
//! `None` and leave the model untouched.

use std::collections::BTreeMap;

use ng_core::{
    Beats, GridValue, MidiChannel, Note, NoteId, NoteNumber, SamplePosition, Snap, Velocity,
    clamp_to_0_127,
};
use ng_state::{MidiOperator, NoteChange};

use crate::{CutBuffer, CutCopyOp, MidiView};

/// Velocity step of coarse velocity edits
pub const VELOCITY_STEP: i32 = 10;

/// Semitones of a coarse transpose
pub const OCTAVE: i32 = 12;

/// Grid lines closer than this (pixels) are too dense to snap to
pub const MIN_GRID_PIXELS: f64 = 8.0;

impl MidiView {
    // ═════════════════════════════════════════════════════════════════════════
    // CREATION
    // ═════════════════════════════════════════════════════════════════════════

    /// Draw a note at an absolute position; pitch comes from `y`.
    ///
    /// Channel and velocity follow the overrides, else the neighbouring
    /// notes. Returns the new note's id.
    pub fn create_note_at(
        &mut self,
        position: SamplePosition,
        y: f64,
        length: Beats,
        snap: Snap,
    ) -> Option<NoteId> {
        if length < Beats::ONE_TICK {
            return None;
        }

        let pitch = self.mapping.y_to_note(y);
        let time = self.converter().to_beats(position, snap);
        if time < self.region.start {
            return None;
        }

        let channel = self.channel_for_add(time);
        let velocity = self.velocity_for_add(time);
        let note = Note::new(channel as i32, time, length, pitch as i32, velocity as i32);
        if self.model.contains(&note) {
            log::trace!("Note {} at {} already present", pitch, time);
            return None;
        }

        let previous_length = self.region.length;
        if time >= self.region.end_beats() {
            self.extend_region(note.end_time());
        }

        self.clear_selection_internal();
        self.start_note_diff_command("add note");
        self.note_diff_add_note(note, true);
        if !self.apply_note_diff(false) {
            self.restore_region_length(previous_length);
            self.flush_events();
            return None;
        }
        self.remove_ghost_note();
        self.flush_events();

        self.audition(&note);
        Some(note.id)
    }

    /// Channel for a note added at `time`
    pub fn channel_for_add(&self, time: Beats) -> MidiChannel {
        if let Some(channel) = self.config.channel_override {
            return channel;
        }
        let notes = self.model.read();
        notes
            .lower_bound(time)
            .next()
            .or_else(|| notes.last())
            .map(|n| n.channel)
            .unwrap_or(self.config.default_channel)
    }

    /// Velocity for a note added at `time`, interpolated between its neighbours
    pub fn velocity_for_add(&self, time: Beats) -> Velocity {
        if let Some(velocity) = self.config.velocity_override {
            return velocity;
        }
        let notes = self.model.read();
        let next = notes.lower_bound(time).next().copied();
        let prev = notes.note_before(time).copied();

        match (prev, next) {
            (None, None) => self.config.default_velocity,
            (Some(only), None) | (None, Some(only)) => only.velocity,
            (Some(prev), Some(next)) => {
                let span = (next.time - prev.time).to_f64();
                if span <= f64::EPSILON {
                    return prev.velocity;
                }
                let frac = (time - prev.time).to_f64() / span;
                let v = prev.velocity as f64 + (next.velocity as f64 - prev.velocity as f64) * frac;
                clamp_to_0_127(v.round() as i32)
            }
        }
    }

    /// Enter a note at a known position (step entry). Selects it.
    pub fn step_add_note(
        &mut self,
        channel: MidiChannel,
        pitch: NoteNumber,
        velocity: Velocity,
        position: Beats,
        length: Beats,
    ) -> Option<NoteId> {
        if length < Beats::ONE_TICK {
            return None;
        }
        let note = Note::new(channel as i32, position, length, pitch as i32, velocity as i32);
        if self.model.contains(&note) {
            return None;
        }

        let previous_length = self.region.length;
        self.extend_region(note.end_time());

        self.clear_selection_internal();
        self.start_note_diff_command("step add");
        self.note_diff_add_note(note, true);
        if !self.apply_note_diff(false) {
            self.restore_region_length(previous_length);
            self.flush_events();
            return None;
        }
        self.flush_events();
        Some(note.id)
    }

    /// Lengthen the selected notes' ends (zero uses the grid)
    pub fn step_sustain(&mut self, beats: Beats) -> bool {
        self.change_note_lengths(false, false, beats, false, true)
    }

    // ═════════════════════════════════════════════════════════════════════════
    // DELETE / CUT / COPY
    // ═════════════════════════════════════════════════════════════════════════

    pub fn delete_selection(&mut self) -> bool {
        if self.selection.is_empty() {
            return false;
        }
        self.start_note_diff_command("delete selection");
        for id in self.selection.ids() {
            self.note_diff_remove_note(id);
        }
        self.clear_selection_internal();
        self.commit_edit()
    }

    pub fn delete_note(&mut self, id: NoteId) -> bool {
        if !self.visuals.contains_key(&id) {
            return false;
        }
        self.start_note_diff_command("delete note");
        self.note_diff_remove_note(id);
        self.commit_edit()
    }

    /// Copy the selection out and/or delete it. Returns the copied notes for cut and copy.
    pub fn cut_copy_clear(&mut self, op: CutCopyOp) -> Option<CutBuffer> {
        if self.selection.is_empty() {
            return None;
        }
        let buffer = (op != CutCopyOp::Clear).then(|| CutBuffer::new(self.selected_notes()));

        let name = match op {
            CutCopyOp::Copy => return buffer,
            CutCopyOp::Cut => "cut",
            CutCopyOp::Clear => "clear",
        };
        self.start_note_diff_command(name);
        for id in self.selection.ids() {
            self.note_diff_remove_note(id);
        }
        self.clear_selection_internal();
        self.commit_edit();
        buffer
    }

    // ═════════════════════════════════════════════════════════════════════════
    // PER-NOTE STAGING
    // ═════════════════════════════════════════════════════════════════════════
    //
    // These stage into the open diff command and leave applying to the caller.

    fn staged_note(&self, id: NoteId) -> Option<Note> {
        self.visuals.get(&id).map(|v| v.note)
    }

    pub fn change_note_velocity(&mut self, id: NoteId, velocity: i32, relative: bool) {
        let Some(note) = self.staged_note(id) else {
            return;
        };
        let value = if relative {
            note.velocity as i32 + velocity
        } else {
            velocity
        };
        self.note_diff_add_change(id, NoteChange::Velocity(value));
    }

    pub fn change_note_note(&mut self, id: NoteId, pitch: i32, relative: bool) {
        let Some(note) = self.staged_note(id) else {
            return;
        };
        let value = if relative { note.note as i32 + pitch } else { pitch };
        self.note_diff_add_change(id, NoteChange::NoteNumber(value));
    }

    pub fn change_note_channel(&mut self, id: NoteId, channel: i32, relative: bool) {
        let Some(note) = self.staged_note(id) else {
            return;
        };
        let value = if relative {
            note.channel as i32 + channel
        } else {
            channel
        };
        self.note_diff_add_change(id, NoteChange::Channel(value));
    }

    pub fn change_note_time(&mut self, id: NoteId, time: Beats, relative: bool) {
        let Some(note) = self.staged_note(id) else {
            return;
        };
        let value = if relative { note.time + time } else { time };
        self.note_diff_add_change(id, NoteChange::StartTime(value));
    }

    pub fn change_note_length(&mut self, id: NoteId, length: Beats) {
        if self.staged_note(id).is_some() {
            self.note_diff_add_change(id, NoteChange::Length(length));
        }
    }

    /// Stage a trim of one note.
    ///
    /// `front_delta` > 0 moves the start later, < 0 earlier; either way the
    /// end stays put. `end_delta` moves the end and never makes the length
    /// negative. Returns true if anything was staged.
    pub fn trim_note(&mut self, id: NoteId, front_delta: Beats, end_delta: Beats) -> bool {
        let Some(note) = self.staged_note(id) else {
            return false;
        };
        if note.is_unterminated() {
            return false;
        }

        let end = note.end_time();
        let mut start = note.time;
        let mut length = note.length;
        let mut change_start = false;
        let mut change_length = false;

        if front_delta.is_negative() {
            start = (note.time + front_delta).max(Beats::ZERO);
            length = end - start;
            change_start = start != note.time;
            change_length = change_start;
        } else if !front_delta.is_zero() && note.time + front_delta < end {
            start = note.time + front_delta;
            length = end - start;
            change_start = true;
            change_length = true;
        }

        if !end_delta.is_zero() {
            let candidate = length + end_delta;
            if !candidate.is_negative() {
                length = candidate;
                change_length = true;
            }
        }

        if change_start {
            self.note_diff_add_change(id, NoteChange::StartTime(start));
        }
        if change_length {
            self.note_diff_add_change(id, NoteChange::Length(length));
        }
        change_start || change_length
    }

    // ═════════════════════════════════════════════════════════════════════════
    // SELECTION EDITS
    // ═════════════════════════════════════════════════════════════════════════

    /// Set one note's velocity
    pub fn set_velocity(&mut self, id: NoteId, velocity: Velocity) -> bool {
        if self.staged_note(id).is_none() {
            return false;
        }
        self.start_note_diff_command("set velocity");
        self.change_note_velocity(id, velocity as i32, false);
        self.commit_edit()
    }

    /// Raise or lower the selected notes' velocities.
    ///
    /// Unless `allow_smush`, refuses when any note would leave 0..=127.
    /// With `all_together` every note takes the first note's new value.
    pub fn change_velocities(
        &mut self,
        up: bool,
        fine: bool,
        allow_smush: bool,
        all_together: bool,
    ) -> bool {
        let notes = self.selected_notes();
        if notes.is_empty() {
            return false;
        }
        let mut delta = if fine { 1 } else { VELOCITY_STEP };
        if !up {
            delta = -delta;
        }

        if !allow_smush
            && notes.iter().any(|n| {
                let v = n.velocity as i32 + delta;
                !(0..=127).contains(&v)
            })
        {
            return false;
        }

        self.start_note_diff_command("change velocities");
        let mut together: Option<i32> = None;
        for note in &notes {
            if all_together {
                let value = *together
                    .get_or_insert_with(|| clamp_to_0_127(note.velocity as i32 + delta) as i32);
                self.change_note_velocity(note.id, value, false);
            } else {
                self.change_note_velocity(note.id, delta, true);
            }
        }
        self.commit_edit()
    }

    /// Shift the selection by an octave (a semitone if `fine`).
    ///
    /// Unless `allow_smush`, the whole transpose is refused if any note
    /// would leave 0..=127.
    pub fn transpose(&mut self, up: bool, fine: bool, allow_smush: bool) -> bool {
        let notes = self.selected_notes();
        if notes.is_empty() {
            return false;
        }
        let mut delta = if fine { 1 } else { OCTAVE };
        if !up {
            delta = -delta;
        }

        if !allow_smush
            && notes.iter().any(|n| {
                let p = n.note as i32 + delta;
                !(0..=127).contains(&p)
            })
        {
            return false;
        }

        self.start_note_diff_command("transpose");
        for note in &notes {
            self.change_note_note(note.id, delta, true);
        }
        self.commit_edit()
    }

    /// Pitch delta limited so the highest note stays at or below 127
    pub(crate) fn group_pitch_delta(notes: &[Note], dnote: i32) -> i32 {
        let highest = notes.iter().map(|n| n.note as i32).max().unwrap_or(0);
        dnote.min(127 - highest)
    }

    /// Move the selection by `dt` and `dnote`.
    ///
    /// The chord shape is kept at the top: the pitch delta shrinks so the
    /// highest note stays in range. Notes that would start before zero stay.
    pub fn move_selection(&mut self, dt: Beats, dnote: i32) -> bool {
        let notes = self.selected_notes();
        if notes.is_empty() {
            return false;
        }
        let dnote = Self::group_pitch_delta(&notes, dnote);
        if dt.is_zero() && dnote == 0 {
            return false;
        }

        self.start_note_diff_command("move notes");
        for note in &notes {
            let new_time = note.time + dt;
            if new_time.is_negative() {
                continue;
            }
            if !dt.is_zero() {
                self.note_diff_add_change(note.id, NoteChange::StartTime(new_time));
            }
            if dnote != 0 {
                let pitch = note.note as i32 + dnote;
                self.note_diff_add_change(note.id, NoteChange::NoteNumber(pitch));
            }
        }
        self.commit_edit()
    }

    /// Copy the selection, offset by `dt` and `dnote`; the copies become the selection
    pub fn move_copies(&mut self, dt: Beats, dnote: i32) -> bool {
        let notes = self.selected_notes();
        if notes.is_empty() {
            return false;
        }
        let dnote = Self::group_pitch_delta(&notes, dnote);
        if dt.is_zero() && dnote == 0 {
            return false;
        }

        self.clear_selection_internal();
        self.start_note_diff_command("copy notes");
        for note in &notes {
            let new_time = note.time + dt;
            if new_time.is_negative() {
                continue;
            }
            let mut copy = note.duplicate();
            copy.time = new_time;
            copy.note = clamp_to_0_127(note.note as i32 + dnote);
            self.note_diff_add_note(copy, true);
        }
        self.commit_edit()
    }

    /// Lengthen or shorten the selected notes.
    ///
    /// A zero `delta` uses the grid (or draw length); `fine` quarters it.
    /// `start` moves starts earlier, `end` moves ends later (the reverse
    /// when `shorter`).
    pub fn change_note_lengths(
        &mut self,
        fine: bool,
        shorter: bool,
        delta: Beats,
        start: bool,
        end: bool,
    ) -> bool {
        let notes = self.selected_notes();
        if notes.is_empty() || !(start || end) {
            return false;
        }

        let mut delta = if delta.is_zero() {
            self.grid_beats().unwrap_or_else(|| self.draw_length_beats())
        } else {
            delta.abs()
        };
        if fine {
            delta = (delta / 4).max(Beats::ONE_TICK);
        }
        if shorter {
            delta = -delta;
        }

        self.start_note_diff_command("change note lengths");
        let mut staged = false;
        for note in &notes {
            let front = if start { -delta } else { Beats::ZERO };
            let back = if end { delta } else { Beats::ZERO };
            staged |= self.trim_note(note.id, front, back);
        }
        self.commit_edit() && staged
    }

    /// Nudge the selection by the nudge distance (grid if unset); `fine` quarters it
    pub fn nudge_notes(&mut self, forward: bool, fine: bool) -> bool {
        let notes = self.selected_notes();
        let Some(earliest) = notes.first() else {
            return false;
        };

        let mut delta = if self.config.nudge_samples > 0 {
            let conv = self.converter();
            let anchor = conv.to_absolute(earliest.time);
            conv.distance_beats(anchor, self.config.nudge_samples)
        } else {
            self.grid_beats().unwrap_or(Beats::ONE_BEAT)
        };
        if fine {
            delta = delta / 4;
        }
        if delta.is_zero() {
            return false;
        }
        if !forward {
            delta = -delta;
        }

        self.start_note_diff_command("nudge");
        for note in &notes {
            self.change_note_time(note.id, delta, true);
        }
        self.commit_edit()
    }

    /// Run an operator over the selection as one edit
    pub fn quantize_selected_notes(&mut self, op: &dyn MidiOperator) -> bool {
        let notes = self.selected_notes();
        if notes.is_empty() {
            return false;
        }
        self.start_note_diff_command(op.name());
        if let Some(cmd) = self.note_diff.as_mut() {
            op.apply(&notes, cmd);
        }
        self.commit_edit()
    }

    // ═════════════════════════════════════════════════════════════════════════
    // SPLIT / JOIN
    // ═════════════════════════════════════════════════════════════════════════

    pub fn split_divisor(&self) -> Option<u32> {
        self.split_divisor
    }

    /// Pieces per split note; `None` derives it from the grid
    pub fn set_split_divisor(&mut self, divisor: Option<u32>) {
        self.split_divisor = divisor.map(|d| d.max(2));
    }

    /// Split into one more piece next time
    pub fn split_notes_more(&mut self) -> u32 {
        let next = self.split_divisor.map_or(2, |d| d + 1);
        self.split_divisor = Some(next);
        next
    }

    /// Split into one fewer piece next time (never below two)
    pub fn split_notes_less(&mut self) -> u32 {
        let next = self.split_divisor.map_or(2, |d| d.saturating_sub(1).max(2));
        self.split_divisor = Some(next);
        next
    }

    /// Replace each selected note by equal pieces of the same pitch, channel
    /// and velocity. The last piece absorbs any remainder.
    pub fn split_notes(&mut self) -> bool {
        let notes: Vec<Note> = self
            .selected_notes()
            .into_iter()
            .filter(|n| !n.is_unterminated())
            .collect();
        if notes.is_empty() {
            return false;
        }
        let grid = self.grid_beats().unwrap_or_else(|| self.draw_length_beats());

        self.start_note_diff_command("split notes");
        let mut staged = false;
        for note in &notes {
            let pieces = match self.split_divisor {
                Some(d) => d as i64,
                None => note.length.ticks() / grid.ticks().max(1),
            };
            if pieces < 2 {
                continue;
            }
            let piece_length = note.length / pieces;
            if piece_length < Beats::ONE_TICK {
                continue;
            }

            self.note_diff_remove_note(note.id);
            for i in 0..pieces {
                let mut piece = note.duplicate();
                piece.time = note.time + piece_length * i;
                piece.length = if i == pieces - 1 {
                    note.end_time() - piece.time
                } else {
                    piece_length
                };
                self.note_diff_add_note(piece, true);
            }
            staged = true;
        }
        self.commit_edit() && staged
    }

    /// Merge selected notes sharing pitch and channel into one note each.
    ///
    /// The merged note spans the group and takes its average velocities.
    pub fn join_notes(&mut self) -> bool {
        let mut groups: BTreeMap<(NoteNumber, MidiChannel), Vec<Note>> = BTreeMap::new();
        for note in self.selected_notes() {
            if !note.is_unterminated() {
                groups.entry((note.note, note.channel)).or_default().push(note);
            }
        }

        self.start_note_diff_command("join notes");
        let mut staged = false;
        for ((pitch, channel), group) in groups {
            if group.len() < 2 {
                continue;
            }
            let start = group.iter().map(|n| n.time).min().unwrap_or_default();
            let end = group.iter().map(Note::end_time).max().unwrap_or_default();
            let count = group.len() as f64;
            let velocity = group.iter().map(|n| n.velocity as f64).sum::<f64>() / count;
            let off_velocity = group.iter().map(|n| n.off_velocity as f64).sum::<f64>() / count;

            for note in &group {
                self.note_diff_remove_note(note.id);
            }
            let joined = Note::new(
                channel as i32,
                start,
                end - start,
                pitch as i32,
                velocity.round() as i32,
            )
            .with_off_velocity(off_velocity.round() as i32);
            self.note_diff_add_note(joined, true);
            staged = true;
        }
        self.commit_edit() && staged
    }

    // ═════════════════════════════════════════════════════════════════════════
    // ZOOM AND DISPLAY RANGE
    // ═════════════════════════════════════════════════════════════════════════

    /// Change horizontal zoom. Sounding notes only move their left edge.
    pub fn set_samples_per_pixel(&mut self, samples_per_pixel: f64) -> bool {
        if !self.mapping.set_samples_per_pixel(samples_per_pixel) {
            return false;
        }
        self.config.samples_per_pixel = self.mapping.samples_per_pixel();
        self.redisplay(true);
        true
    }

    pub fn zoom_in(&mut self) -> bool {
        self.set_samples_per_pixel(self.mapping.samples_per_pixel() / 2.0)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.set_samples_per_pixel(self.mapping.samples_per_pixel() * 2.0)
    }

    /// Finest straight grid whose lines are at least [`MIN_GRID_PIXELS`] apart
    pub fn grid_for_zoom(&self) -> GridValue {
        let anchor = self.converter().region_position_beats();
        let anchor_samples = self.tempo.beats_to_samples(anchor).0 as f64;
        let spp = self.mapping.samples_per_pixel();

        GridValue::ZOOM_LADDER
            .iter()
            .copied()
            .take_while(|grid| {
                let step = self.tempo.grid_length(*grid);
                let end = self.tempo.beats_to_samples(anchor + step).0 as f64;
                (end - anchor_samples) / spp >= MIN_GRID_PIXELS
            })
            .last()
            .unwrap_or(GridValue::Whole)
    }

    /// Snap to the zoom-scaled grid
    pub fn snap_for_zoom(&self) -> Snap {
        Snap::nearest(self.tempo.grid_length(self.grid_for_zoom()))
    }

    /// Configured grid step in the current meter, if snapping is on
    pub fn grid_beats(&self) -> Option<Beats> {
        self.config.grid_beats(self.tempo.as_ref())
    }

    /// Length of a drawn note in the current meter
    pub fn draw_length_beats(&self) -> Beats {
        self.config.draw_length_beats(self.tempo.as_ref())
    }

    /// Snap to the configured grid (rounding down), if snapping is on
    pub fn edit_snap(&self) -> Snap {
        self.grid_beats().map_or(Snap::None, Snap::down)
    }

    pub fn visible_note_range(&self) -> (NoteNumber, NoteNumber) {
        (self.mapping.lowest_note(), self.mapping.highest_note())
    }

    pub fn set_visible_note_range(&mut self, lowest: NoteNumber, highest: NoteNumber) {
        self.mapping.set_note_range(lowest, highest);
        self.config.lowest_note = self.mapping.lowest_note();
        self.config.highest_note = self.mapping.highest_note();
        self.redisplay(false);
    }
}
