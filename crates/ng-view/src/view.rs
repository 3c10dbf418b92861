//! Note View
//!
//! [`MidiView`] keeps one [`VisualNote`] per model note of a region and runs
//! edit operations against the shared model through a diff command.
//!
//! The model is the only source of truth: operations stage a diff, apply it,
//! and the view rebuilds its visuals from the content-changed notification.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crossbeam_channel::Receiver;

use ng_core::{
    Beats, MidiRegion, Note, NoteId, NoteMode, NoteNumber, RegionConverter, SamplePosition,
    TimeConverter,
};
use ng_state::{ContentSubscription, MidiModel, NoteChange, NoteDiffCommand};

use crate::{
    ActiveNotes, DragState, GhostNote, HitShape, NoteAuditioner, NoteRect, NoteVisual, PixelMapping,
    Selection, SilentAuditioner, ViewConfig, ViewEvent, ViewEventBroadcaster, VisualNote,
};

/// Events collected during one operation, emitted together
#[derive(Debug, Default)]
struct PendingEvents {
    added: Vec<NoteId>,
    removed: Vec<NoteId>,
    selection_changed: bool,
    region_extended: bool,
    patches_changed: bool,
}

/// Editable view of one region of a [`MidiModel`]
pub struct MidiView {
    pub(crate) model: MidiModel,
    subscription: ContentSubscription,
    pub(crate) region: MidiRegion,
    pub(crate) tempo: Arc<dyn TimeConverter>,
    pub(crate) config: ViewConfig,
    pub(crate) mapping: PixelMapping,
    pub(crate) visuals: BTreeMap<NoteId, VisualNote>,
    pub(crate) selection: Selection,
    /// Notes to select once they show up in the model
    pub(crate) marked_for_selection: HashSet<NoteId>,
    pub(crate) ghost: Option<GhostNote>,
    /// Present only while a recording pass is open
    pub(crate) active_notes: Option<ActiveNotes>,
    pub(crate) note_diff: Option<NoteDiffCommand>,
    /// Pieces per note for split; `None` derives it from the grid
    pub(crate) split_divisor: Option<u32>,
    pub(crate) drag: Option<DragState>,
    events: ViewEventBroadcaster,
    pending: PendingEvents,
    auditioner: Box<dyn NoteAuditioner>,
}

impl MidiView {
    pub fn new(
        model: MidiModel,
        region: MidiRegion,
        tempo: Arc<dyn TimeConverter>,
        config: ViewConfig,
    ) -> Self {
        let subscription = model.subscribe();
        let mapping = PixelMapping::new(
            config.samples_per_pixel,
            config.note_height,
            config.lowest_note,
            config.highest_note,
        );
        let mut view = Self {
            model,
            subscription,
            region,
            tempo,
            config,
            mapping,
            visuals: BTreeMap::new(),
            selection: Selection::new(),
            marked_for_selection: HashSet::new(),
            ghost: None,
            active_notes: None,
            note_diff: None,
            split_divisor: None,
            drag: None,
            events: ViewEventBroadcaster::new(),
            pending: PendingEvents::default(),
            auditioner: Box::new(SilentAuditioner),
        };
        view.rescan();
        // Initial population is not news to anyone
        view.pending = PendingEvents::default();
        view
    }

    pub fn with_auditioner(mut self, auditioner: Box<dyn NoteAuditioner>) -> Self {
        self.auditioner = auditioner;
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn model(&self) -> &MidiModel {
        &self.model
    }

    pub fn region(&self) -> &MidiRegion {
        &self.region
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn mapping(&self) -> &PixelMapping {
        &self.mapping
    }

    /// Region-relative time conversion
    pub fn converter(&self) -> RegionConverter<'_> {
        RegionConverter::new(self.tempo.as_ref(), &self.region)
    }

    pub fn visual(&self, id: NoteId) -> Option<&VisualNote> {
        self.visuals.get(&id)
    }

    /// Every visual, hidden ones included
    pub fn visuals(&self) -> impl Iterator<Item = &VisualNote> + '_ {
        self.visuals.values()
    }

    pub fn visible_count(&self) -> usize {
        self.visuals.values().filter(|v| v.is_visible()).count()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_selected(&self, id: NoteId) -> bool {
        self.selection.contains(id)
    }

    /// Selected notes in time order
    pub fn selected_notes(&self) -> Vec<Note> {
        let mut notes: Vec<Note> = self
            .selection
            .iter()
            .filter_map(|id| self.visuals.get(&id).map(|v| v.note))
            .collect();
        notes.sort_by(|a, b| a.time.cmp(&b.time).then(a.id.cmp(&b.id)));
        notes
    }

    /// Topmost visible note under a point
    pub fn note_at(&self, x: f64, y: f64) -> Option<NoteId> {
        self.visuals
            .values()
            .filter(|v| v.is_visible() && v.visual.contains(x, y))
            .max_by_key(|v| v.note.time)
            .map(|v| v.id())
    }

    /// Receive notifications about what view operations did
    pub fn subscribe(&mut self) -> Receiver<ViewEvent> {
        self.events.subscribe()
    }

    pub fn set_config(&mut self, config: ViewConfig) {
        self.mapping = PixelMapping::new(
            config.samples_per_pixel,
            config.note_height,
            config.lowest_note,
            config.highest_note,
        );
        self.config = config;
        self.redisplay(false);
    }

    pub fn set_note_mode(&mut self, mode: NoteMode) {
        if self.config.note_mode != mode {
            self.config.note_mode = mode;
            self.redisplay(false);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Model synchronisation
    // ─────────────────────────────────────────────────────────────────────────

    /// Handle pending content-changed notifications. Returns true if any arrived.
    pub fn process_model_changes(&mut self) -> bool {
        let changes = self.subscription.drain();
        if changes.is_empty() {
            return false;
        }
        self.model_changed();
        true
    }

    /// Rebuild visuals from the model and emit the resulting events
    pub fn model_changed(&mut self) {
        self.rescan();
        self.flush_events();
    }

    /// Bring visuals in line with the model without emitting events
    pub(crate) fn rescan(&mut self) {
        // Copy out under the read lock; view state is never touched while holding it
        let notes: Vec<Note> = self.model.read().notes().to_vec();
        let live: HashSet<NoteId> = notes.iter().map(|n| n.id).collect();

        let stale: Vec<NoteId> = self
            .visuals
            .keys()
            .filter(|id| !live.contains(id))
            .copied()
            .collect();
        for id in stale {
            log::trace!("Removing stale visual for note {}", id);
            self.visuals.remove(&id);
            if self.selection.remove(id) {
                self.pending.selection_changed = true;
            }
            if let Some(active) = self.active_notes.as_mut() {
                active.forget(id);
            }
            self.pending.removed.push(id);
        }

        let pitches: Vec<NoteNumber> = notes
            .iter()
            .filter(|n| self.note_in_region_range(n))
            .map(|n| n.note)
            .collect();
        let mut range_changed = false;
        for pitch in pitches {
            range_changed |= self.mapping.extend_note_range(pitch);
        }
        if range_changed {
            self.redisplay(false);
        }

        for note in notes {
            let hidden = !self.note_in_region_range(&note);
            match self.visuals.get(&note.id).copied() {
                Some(existing) => {
                    let visual = self.refreshed_visual(&existing, &note, false);
                    if existing.note.is_unterminated()
                        && !note.is_unterminated()
                        && let Some(active) = self.active_notes.as_mut()
                    {
                        active.forget(note.id);
                    }
                    if hidden && self.selection.remove(note.id) {
                        self.pending.selection_changed = true;
                    }
                    self.visuals.insert(
                        note.id,
                        VisualNote {
                            note,
                            visual,
                            selected: self.selection.contains(note.id),
                            hidden,
                        },
                    );
                }
                None => {
                    let visual = self.build_visual(&note);
                    if self.marked_for_selection.remove(&note.id)
                        && !hidden
                        && self.selection.add(note.id)
                    {
                        self.pending.selection_changed = true;
                    }
                    self.visuals.insert(
                        note.id,
                        VisualNote {
                            note,
                            visual,
                            selected: self.selection.contains(note.id),
                            hidden,
                        },
                    );
                    self.pending.added.push(note.id);
                    if note.is_unterminated() {
                        self.track_active_note(&note);
                    }
                }
            }
        }

        self.marked_for_selection.clear();
    }

    /// Emit everything collected since the last flush
    pub(crate) fn flush_events(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        if !pending.added.is_empty() {
            self.events.emit(ViewEvent::NotesAdded(pending.added));
        }
        if !pending.removed.is_empty() {
            self.events.emit(ViewEvent::NotesRemoved(pending.removed));
        }
        if pending.region_extended {
            self.events.emit(ViewEvent::RegionExtended(self.region.length));
        }
        if pending.patches_changed {
            self.events.emit(ViewEvent::PatchChangesChanged);
        }
        if pending.selection_changed {
            self.events.emit(ViewEvent::SelectionChanged(self.selection.ids()));
        }
    }

    /// Drop queued model notifications and rescan
    pub(crate) fn sync(&mut self) {
        self.subscription.drain();
        self.rescan();
    }

    /// Does the note start inside the region?
    pub(crate) fn note_in_region_range(&self, note: &Note) -> bool {
        self.region.contains(note.time)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Geometry
    // ─────────────────────────────────────────────────────────────────────────

    /// x of a source-relative position
    pub fn beats_to_x(&self, source_beats: Beats) -> f64 {
        self.mapping
            .offset_to_x(self.converter().region_offset_samples(source_beats))
    }

    /// Absolute sample position under x
    pub fn x_to_position(&self, x: f64) -> SamplePosition {
        self.region.position.offset(self.mapping.x_to_offset(x))
    }

    pub(crate) fn build_visual(&self, note: &Note) -> NoteVisual {
        let x0 = self.beats_to_x(note.time);
        let y0 = self.mapping.note_to_y(note.note);
        let height = self.mapping.note_height();

        match self.config.note_mode {
            NoteMode::Percussive => NoteVisual::Hit(HitShape {
                x: x0,
                y: y0 + height / 2.0,
                size: height,
            }),
            NoteMode::Sustained => {
                let (x1, outline_right) = if note.is_unterminated() {
                    (x0, false)
                } else {
                    (self.beats_to_x(note.end_time()), true)
                };
                NoteVisual::Sustained(NoteRect {
                    x0,
                    x1,
                    y0,
                    y1: y0 + height,
                    outline_right,
                })
            }
        }
    }

    /// New geometry for an existing visual.
    ///
    /// Sounding notes keep their right edge, which recording extends live;
    /// a zoom only moves their left edge.
    fn refreshed_visual(&self, existing: &VisualNote, note: &Note, zoom_only: bool) -> NoteVisual {
        let fresh = self.build_visual(note);
        if !note.is_unterminated() {
            return fresh;
        }
        match (existing.visual, fresh) {
            (NoteVisual::Sustained(old), NoteVisual::Sustained(new)) if zoom_only => {
                NoteVisual::Sustained(NoteRect { x0: new.x0, ..old })
            }
            (NoteVisual::Sustained(old), NoteVisual::Sustained(new)) => {
                NoteVisual::Sustained(NoteRect {
                    x1: old.x1.max(new.x0),
                    outline_right: old.outline_right,
                    ..new
                })
            }
            _ => fresh,
        }
    }

    /// Recompute every visual's geometry
    pub(crate) fn redisplay(&mut self, zoom_only: bool) {
        let updated: Vec<(NoteId, NoteVisual)> = self
            .visuals
            .values()
            .map(|v| (v.id(), self.refreshed_visual(v, &v.note, zoom_only)))
            .collect();
        for (id, visual) in updated {
            if let Some(v) = self.visuals.get_mut(&id) {
                v.visual = visual;
            }
        }
        self.refresh_ghost();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Diff command staging
    // ─────────────────────────────────────────────────────────────────────────

    /// Open the view's diff command (reuses one that is already open)
    pub fn start_note_diff_command(&mut self, name: &str) {
        if self.note_diff.is_none() {
            self.note_diff = Some(self.model.new_diff_command(name));
        }
    }

    pub fn has_open_diff(&self) -> bool {
        self.note_diff.is_some()
    }

    /// Stage an added note; `selected` selects it once applied
    pub fn note_diff_add_note(&mut self, note: Note, selected: bool) {
        let Some(cmd) = self.note_diff.as_mut() else {
            return diff_misuse("add note");
        };
        if selected {
            self.marked_for_selection.insert(note.id);
        }
        cmd.add(note);
    }

    pub fn note_diff_remove_note(&mut self, id: NoteId) {
        let Some(cmd) = self.note_diff.as_mut() else {
            return diff_misuse("remove note");
        };
        if !cmd.removes(id) {
            cmd.remove(id);
        }
    }

    pub fn note_diff_add_change(&mut self, id: NoteId, change: NoteChange) {
        let Some(cmd) = self.note_diff.as_mut() else {
            return diff_misuse("change note");
        };
        cmd.change(id, change);
    }

    /// Apply the open diff. Returns false if there was none or the model rejected it.
    pub fn apply_note_diff(&mut self, as_subcommand: bool) -> bool {
        let Some(cmd) = self.note_diff.take() else {
            diff_misuse("apply");
            return false;
        };
        let name = cmd.name().to_string();
        match cmd.apply(as_subcommand) {
            Ok(change) => {
                log::trace!("View applied '{}' (generation {})", name, change.generation);
                self.sync();
                true
            }
            Err(e) => {
                log::warn!("Edit '{}' rejected: {}", name, e);
                self.marked_for_selection.clear();
                false
            }
        }
    }

    /// Discard the open diff (no-op if none)
    pub fn abort_note_diff(&mut self) {
        if let Some(cmd) = self.note_diff.take() {
            cmd.abort();
            self.marked_for_selection.clear();
            // An enclosing reversible command may have been rolled back
            if self.subscription.has_pending() {
                self.sync();
            }
        }
    }

    /// Apply and flush events: the usual tail of an edit operation
    pub(crate) fn commit_edit(&mut self) -> bool {
        let applied = self.apply_note_diff(false);
        self.flush_events();
        applied
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Selection internals
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn select_internal(&mut self, id: NoteId) -> bool {
        let visible = self.visuals.get(&id).is_some_and(|v| v.is_visible());
        if !visible || !self.selection.add(id) {
            return false;
        }
        if let Some(v) = self.visuals.get_mut(&id) {
            v.selected = true;
        }
        self.pending.selection_changed = true;
        true
    }

    pub(crate) fn deselect_internal(&mut self, id: NoteId) -> bool {
        if !self.selection.remove(id) {
            return false;
        }
        if let Some(v) = self.visuals.get_mut(&id) {
            v.selected = false;
        }
        self.pending.selection_changed = true;
        true
    }

    pub(crate) fn clear_selection_internal(&mut self) {
        if self.selection.clear() {
            for v in self.visuals.values_mut() {
                v.selected = false;
            }
            self.pending.selection_changed = true;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Misc internals
    // ─────────────────────────────────────────────────────────────────────────

    /// Grow the region to `source_end`
    pub(crate) fn extend_region(&mut self, source_end: Beats) -> bool {
        if self.region.extend_to(source_end) {
            log::debug!("Region '{}' extended to {}", self.region.name, self.region.length);
            self.pending.region_extended = true;
            true
        } else {
            false
        }
    }

    /// Undo an extension made by an edit that was then rejected
    pub(crate) fn restore_region_length(&mut self, length: Beats) {
        if self.region.length != length {
            self.region.length = length;
            self.pending.region_extended = false;
            self.rescan();
        }
    }

    pub(crate) fn mark_patches_changed(&mut self) {
        self.pending.patches_changed = true;
    }

    pub(crate) fn audition(&mut self, note: &Note) {
        if self.config.audition_on_create {
            self.auditioner.start_note(note);
        }
    }
}

/// Diff staging with no open command
fn diff_misuse(what: &str) {
    log::warn!("{}: no open diff command", what);
    debug_assert!(false, "{}: no open diff command", what);
}

impl std::fmt::Debug for MidiView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiView")
            .field("region", &self.region.name)
            .field("visuals", &self.visuals.len())
            .field("selected", &self.selection.len())
            .field("recording", &self.active_notes.is_some())
            .finish()
    }
}
