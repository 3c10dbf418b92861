//! Recording, ghost note, drag, patch change and selection behaviour

use std::sync::Arc;

use approx::assert_relative_eq;
use ng_core::{Beats, MidiRegion, Note, NoteMode, SamplePosition, Snap, TempoMap, TimeConverter};
use ng_state::{MidiModel, RecordingWriter};
use ng_view::{DragKind, MidiView, NoteVisual, ViewConfig, ViewEvent};

const BEAT_SAMPLES: u64 = 24000;

fn beats(b: f64) -> Beats {
    Beats::from_f64(b)
}

fn note(start: f64, length: f64, pitch: i32) -> Note {
    Note::new(0, beats(start), beats(length), pitch, 100)
}

fn view_over(model: &MidiModel, region: MidiRegion, config: ViewConfig) -> MidiView {
    let tempo: Arc<dyn TimeConverter> = Arc::new(TempoMap::new(48000));
    MidiView::new(model.clone(), region, tempo, config)
}

fn setup(notes: Vec<Note>) -> (MidiModel, MidiView) {
    let model = MidiModel::from_notes(notes);
    let region = MidiRegion::new("test", SamplePosition::ZERO, Beats::ZERO, Beats::from_beats(16));
    let view = view_over(&model, region, ViewConfig::default());
    (model, view)
}

fn rect(view: &MidiView, id: ng_core::NoteId) -> ng_view::NoteRect {
    match view.visual(id).map(|v| v.visual) {
        Some(NoteVisual::Sustained(r)) => r,
        other => panic!("expected a sustained visual, got {:?}", other),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDING
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_second_note_on_closes_stuck_visual() {
    let (model, mut view) = setup(vec![]);
    view.begin_write();

    let first = model
        .append_recorded(Note::unterminated(0, Beats::ZERO, 60, 100))
        .unwrap();
    view.process_model_changes();
    assert!(!rect(&view, first).outline_right);

    let second = model
        .append_recorded(Note::unterminated(0, Beats::ONE_BEAT, 60, 90))
        .unwrap();
    view.process_model_changes();

    let closed = rect(&view, first);
    assert_relative_eq!(closed.x1, 93.75);
    assert!(closed.outline_right);
    assert_eq!(view.active_notes().and_then(|a| a.get(60)), Some(second));
}

#[test]
fn test_active_notes_follow_record_head() {
    let (model, mut view) = setup(vec![]);
    view.begin_write();
    let id = model
        .append_recorded(Note::unterminated(0, Beats::ONE_BEAT, 64, 100))
        .unwrap();
    view.process_model_changes();

    view.extend_active_notes(SamplePosition(3 * BEAT_SAMPLES));
    assert_relative_eq!(rect(&view, id).x1, 281.25);

    // Record head behind the note never inverts it
    view.extend_active_notes(SamplePosition(0));
    assert_relative_eq!(rect(&view, id).x1, 93.75);
}

#[test]
fn test_zoom_keeps_sounding_right_edge() {
    let (model, mut view) = setup(vec![]);
    view.begin_write();
    let id = model
        .append_recorded(Note::unterminated(0, Beats::ONE_BEAT, 64, 100))
        .unwrap();
    view.process_model_changes();
    view.extend_active_notes(SamplePosition(3 * BEAT_SAMPLES));

    assert!(view.zoom_in());
    let r = rect(&view, id);
    assert_relative_eq!(r.x0, 187.5);
    assert_relative_eq!(r.x1, 281.25);
}

#[test]
fn test_end_write_closes_remaining() {
    let (model, mut view) = setup(vec![]);
    view.begin_write();
    let id = model
        .append_recorded(Note::unterminated(0, Beats::ZERO, 60, 100))
        .unwrap();
    view.process_model_changes();
    view.extend_active_notes(SamplePosition(BEAT_SAMPLES));

    view.end_write();
    assert!(!view.is_writing());
    assert!(view.active_notes().is_none());
    assert!(rect(&view, id).outline_right);
}

#[test]
fn test_resolve_note_closes_visual() {
    let (model, mut view) = setup(vec![]);
    view.begin_write();
    let id = model
        .append_recorded(Note::unterminated(0, Beats::ZERO, 60, 100))
        .unwrap();
    view.process_model_changes();

    assert!(view.resolve_note(60, beats(2.0)));
    assert_relative_eq!(rect(&view, id).x1, 187.5);
    assert!(!view.resolve_note(60, beats(3.0)));
}

#[test]
fn test_recording_writer_feeds_view() {
    let (model, mut view) = setup(vec![]);
    let events = view.subscribe();
    let mut writer = RecordingWriter::new(model.clone());
    view.begin_write();

    writer.note_on(Beats::ZERO, 0, 60, 100).unwrap();
    writer.note_on(Beats::ZERO, 0, 64, 100).unwrap();
    view.process_model_changes();
    assert_eq!(view.active_notes().map(|a| a.count()), Some(2));

    writer.note_off(Beats::ONE_BEAT, 0, 60, 64).unwrap();
    writer.finish(beats(2.0)).unwrap();
    view.process_model_changes();
    view.end_write();

    let notes = model.notes();
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().all(|n| !n.is_unterminated()));
    for n in &notes {
        let r = rect(&view, n.id);
        assert_relative_eq!(r.x1, view.beats_to_x(n.end_time()));
    }
    // Recorded notes never enter the undo history
    assert_eq!(model.undo_name(), None);
    assert!(
        events
            .try_iter()
            .any(|e| matches!(e, ViewEvent::NotesAdded(ids) if ids.len() == 2))
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// GHOST NOTE
// ═══════════════════════════════════════════════════════════════════════════════

fn offset_region() -> MidiRegion {
    MidiRegion::new("offset", SamplePosition(2 * BEAT_SAMPLES), Beats::ZERO, Beats::from_beats(4))
}

#[test]
fn test_ghost_follows_pointer() {
    let model = MidiModel::new();
    let mut view = view_over(&model, offset_region(), ViewConfig::default());

    // 1.1 beats into the region, snapped down to a sixteenth
    view.create_ghost_note(103.125, 438.0);
    let ghost = view.ghost().copied().unwrap();
    assert_eq!(ghost.note.time, Beats::ONE_BEAT);
    assert_eq!(ghost.note.note, 60);
    assert!(!ghost.hidden);

    view.update_ghost_note(0.0, 426.0);
    let ghost = view.ghost().copied().unwrap();
    assert_eq!(ghost.note.time, Beats::ZERO);
    assert_eq!(ghost.note.note, 61);
    assert_relative_eq!(ghost.visual.x0(), 0.0);

    view.remove_ghost_note();
    assert!(view.ghost().is_none());
}

#[test]
fn test_sustained_ghost_stays_visible_past_end() {
    let model = MidiModel::new();
    let mut view = view_over(&model, offset_region(), ViewConfig::default());
    // 5 beats into a 4 beat region
    view.create_ghost_note(468.75, 438.0);
    assert!(!view.ghost().unwrap().hidden);
}

#[test]
fn test_percussive_ghost_hidden_past_end() {
    let model = MidiModel::new();
    let mut config = ViewConfig::default();
    config.note_mode = NoteMode::Percussive;
    let mut view = view_over(&model, offset_region(), config);

    view.create_ghost_note(468.75, 438.0);
    assert!(view.ghost().unwrap().hidden);
    view.update_ghost_note(93.75, 438.0);
    assert!(!view.ghost().unwrap().hidden);
}

#[test]
fn test_ghost_hidden_before_trimmed_start() {
    let model = MidiModel::new();
    let region = MidiRegion::new(
        "trimmed",
        SamplePosition(2 * BEAT_SAMPLES),
        Beats::from_beats(2),
        Beats::from_beats(4),
    );
    let mut view = view_over(&model, region, ViewConfig::default());

    // Left of the region's first visible beat
    view.create_ghost_note(-93.75, 438.0);
    assert!(view.ghost().unwrap().hidden);
    view.update_ghost_note(10.0, 438.0);
    assert!(!view.ghost().unwrap().hidden);
}

#[test]
fn test_creating_note_drops_ghost() {
    let (_, mut view) = setup(vec![]);
    view.create_ghost_note(10.0, 438.0);
    let position = view.x_to_position(93.75);
    assert!(
        view.create_note_at(position, 438.0, Beats::ONE_BEAT, Snap::None)
            .is_some()
    );
    assert!(view.ghost().is_none());
}

// ═══════════════════════════════════════════════════════════════════════════════
// DRAG
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_move_drag() {
    let n = note(1.0, 1.0, 60);
    let (model, mut view) = setup(vec![n]);
    assert!(!view.begin_drag(DragKind::Move));
    view.select_all();
    assert!(view.begin_drag(DragKind::Move));
    assert!(!view.begin_drag(DragKind::Copy));

    // One beat right, two rows up
    view.update_drag(93.75, -24.0, Snap::None);
    let state = view.drag().unwrap();
    assert_eq!(state.dt(), Beats::ONE_BEAT);
    assert_eq!(state.dnote(), 2);
    assert_relative_eq!(state.preview()[0].1.x0(), 187.5);

    // Model untouched until finish
    assert_eq!(model.note(n.id).unwrap().time, Beats::ONE_BEAT);

    assert!(view.finish_drag());
    let moved = model.note(n.id).unwrap();
    assert_eq!((moved.time, moved.note), (beats(2.0), 62));
    assert!(!view.is_dragging());
}

#[test]
fn test_drag_snaps() {
    let n = note(1.0, 1.0, 60);
    let (model, mut view) = setup(vec![n]);
    view.select_all();
    view.begin_drag(DragKind::Move);
    // 1.1 beats right, snapped to the nearest beat
    view.update_drag(103.125, 0.0, Snap::nearest(Beats::ONE_BEAT));
    assert!(view.finish_drag());
    assert_eq!(model.note(n.id).unwrap().time, beats(2.0));
}

#[test]
fn test_abort_drag_leaves_model() {
    let n = note(1.0, 1.0, 60);
    let (model, mut view) = setup(vec![n]);
    view.select_all();
    view.begin_drag(DragKind::Move);
    view.update_drag(93.75, -24.0, Snap::None);
    view.abort_drag();

    assert!(!view.is_dragging());
    assert_eq!(model.note(n.id), Some(n));
    assert_eq!(model.undo_name(), None);
}

#[test]
fn test_copy_drag() {
    let n = note(0.0, 1.0, 60);
    let (model, mut view) = setup(vec![n]);
    view.select_all();
    view.begin_drag(DragKind::Copy);
    view.update_drag(187.5, 0.0, Snap::None);
    assert!(view.finish_drag());

    assert_eq!(model.note_count(), 2);
    assert_eq!(model.note(n.id), Some(n));
    assert_eq!(view.selected_notes()[0].time, beats(2.0));
}

#[test]
fn test_trim_end_drag() {
    let n = note(1.0, 1.0, 60);
    let (model, mut view) = setup(vec![n]);
    view.select_all();
    assert!(view.begin_drag(DragKind::TrimEnd));
    view.update_drag(46.875, 0.0, Snap::None);
    assert_relative_eq!(view.drag().unwrap().preview()[0].1.x1(), 234.375);
    assert!(view.finish_drag());

    let trimmed = model.note(n.id).unwrap();
    assert_eq!(trimmed.time, Beats::ONE_BEAT);
    assert_eq!(trimmed.length, beats(1.5));
    assert_eq!(model.undo_name().as_deref(), Some("resize notes"));
}

#[test]
fn test_trim_start_drag_keeps_end() {
    let n = note(1.0, 1.0, 60);
    let (model, mut view) = setup(vec![n]);
    view.select_all();
    view.begin_drag(DragKind::TrimStart);
    view.update_drag(-46.875, 0.0, Snap::None);
    assert!(view.finish_drag());

    let trimmed = model.note(n.id).unwrap();
    assert_eq!(trimmed.time, beats(0.5));
    assert_eq!(trimmed.end_time(), beats(2.0));
}

#[test]
fn test_trim_past_other_edge_is_noop() {
    let n = note(1.0, 1.0, 60);
    let (model, mut view) = setup(vec![n]);
    view.select_all();
    view.begin_drag(DragKind::TrimEnd);
    view.update_drag(-187.5, 0.0, Snap::None);
    assert!(!view.finish_drag());
    assert_eq!(model.note(n.id), Some(n));
}

// ═══════════════════════════════════════════════════════════════════════════════
// PATCH CHANGES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_patch_change_lifecycle() {
    let (model, mut view) = setup(vec![]);
    let events = view.subscribe();

    assert!(view.add_patch_change(beats(20.0), 0, 5, 0).is_none());
    let id = view.add_patch_change(Beats::ONE_BEAT, 0, 5, 0).unwrap();
    assert_eq!(view.patch_changes().len(), 1);
    assert!(events.try_iter().any(|e| e == ViewEvent::PatchChangesChanged));

    assert!(view.step_patch(id, false, 1));
    assert_eq!(view.patch_change(id).unwrap().program, 6);
    assert!(view.step_patch(id, true, 3));
    assert_eq!(view.patch_change(id).unwrap().bank, 3);
    assert!(view.step_patch(id, false, -200));
    assert_eq!(view.patch_change(id).unwrap().program, 0);
    assert!(!view.step_patch(id, false, -1));

    assert!(view.move_patch_change(id, beats(2.0)));
    assert!(!view.move_patch_change(id, beats(2.0)));
    assert_eq!(view.patch_change(id).unwrap().time, beats(2.0));

    assert!(view.change_patch_change(id, 9, 40, 1));
    assert!(!view.change_patch_change(id, 9, 40, 1));
    let p = view.patch_change(id).unwrap();
    assert_eq!((p.channel, p.program, p.bank), (9, 40, 1));

    assert!(view.delete_patch_change(id));
    assert!(view.patch_changes().is_empty());
    model.undo().unwrap();
    view.process_model_changes();
    assert_eq!(view.patch_changes().len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════════
// SELECTION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_selection_operations() {
    let a = note(0.0, 1.0, 60);
    let b = note(1.0, 1.0, 64);
    let c = note(2.0, 1.0, 67);
    let (_, mut view) = setup(vec![a, b, c]);

    view.unique_select(a.id);
    view.select_next_note(false);
    assert_eq!(view.selection().ids(), vec![b.id]);
    view.select_next_note(true);
    assert!(view.is_selected(b.id) && view.is_selected(c.id));

    view.invert_selection();
    assert_eq!(view.selection().ids(), vec![a.id]);

    view.select_range(beats(1.0), beats(3.0), false);
    assert!(!view.is_selected(a.id));
    assert_eq!(view.selection().len(), 2);

    view.toggle_selection(b.id);
    assert!(!view.is_selected(b.id));
    view.clear_selection();
    assert!(view.selection().is_empty());
}

#[test]
fn test_select_next_wraps() {
    let a = note(0.0, 1.0, 60);
    let b = note(1.0, 1.0, 64);
    let (_, mut view) = setup(vec![a, b]);
    view.unique_select(b.id);
    view.select_next_note(false);
    assert_eq!(view.selection().ids(), vec![a.id]);
    view.select_previous_note(false);
    assert_eq!(view.selection().ids(), vec![b.id]);
}

#[test]
fn test_select_matching_extend() {
    let notes = vec![
        note(0.0, 1.0, 60),
        note(1.0, 1.0, 62),
        note(2.0, 1.0, 65),
        note(3.0, 1.0, 70),
    ];
    let ids: Vec<_> = notes.iter().map(|n| n.id).collect();
    let (_, mut view) = setup(notes);

    view.select_matching_notes(62, None, false, false);
    assert_eq!(view.selection().ids(), vec![ids[1]]);

    view.select_matching_notes(66, None, false, true);
    assert!(view.is_selected(ids[1]) && view.is_selected(ids[2]));
    assert!(!view.is_selected(ids[0]) && !view.is_selected(ids[3]));
}

#[test]
fn test_hidden_notes_not_selectable() {
    let inside = note(0.0, 1.0, 60);
    let outside = note(20.0, 1.0, 60);
    let (_, mut view) = setup(vec![inside, outside]);
    view.add_to_selection(outside.id);
    assert!(view.selection().is_empty());
    view.select_all();
    assert_eq!(view.selection().ids(), vec![inside.id]);
}
