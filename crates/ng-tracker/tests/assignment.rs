//! Lane assignment properties over generated note sets

use ng_core::{Beats, MidiRegion, Note, SamplePosition};
use ng_tracker::{TrackerMatrix, TrackerPattern};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn region(beats: i64) -> MidiRegion {
    MidiRegion::new("test", SamplePosition::ZERO, Beats::ZERO, Beats::from_beats(beats))
}

fn random_notes(count: usize, seed: u64) -> Vec<Note> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let start = Beats::from_ticks(rng.random_range(0..32 * 960));
            let length = Beats::from_ticks(rng.random_range(0..4 * 960));
            Note::new(
                rng.random_range(0..16),
                start,
                length,
                rng.random_range(0..128),
                rng.random_range(1..128),
            )
        })
        .collect()
}

/// Maximum number of notes sounding at once (half-open intervals)
fn max_concurrency(notes: &[Note]) -> usize {
    let mut events: Vec<(Beats, i32)> = Vec::new();
    for n in notes {
        events.push((n.time, 1));
        events.push((n.end_time(), -1));
    }
    // Ends sort before starts at the same time
    events.sort();
    let mut current = 0i32;
    let mut max = 0i32;
    for (_, delta) in events {
        current += delta;
        max = max.max(current);
    }
    max as usize
}

#[test]
fn test_no_overlap_within_lane() {
    for seed in 0..20 {
        let notes = random_notes(200, seed);
        let pattern = TrackerPattern::build(&notes, &region(40), 4);

        for lane in pattern.lanes() {
            for pair in lane.notes().windows(2) {
                assert!(
                    pair[0].end_time() <= pair[1].time,
                    "seed {}: {:?} overlaps {:?}",
                    seed,
                    pair[0],
                    pair[1]
                );
            }
        }
    }
}

#[test]
fn test_lane_count_is_max_concurrency() {
    for seed in 100..120 {
        let notes: Vec<Note> = random_notes(150, seed)
            .into_iter()
            .filter(|n| !n.length.is_zero())
            .collect();
        let pattern = TrackerPattern::build(&notes, &region(40), 4);
        assert_eq!(pattern.nlanes(), max_concurrency(&notes), "seed {}", seed);
    }
}

#[test]
fn test_every_note_assigned_once() {
    let notes = random_notes(300, 7);
    let pattern = TrackerPattern::build(&notes, &region(40), 8);
    let assigned: usize = pattern.lanes().iter().map(|l| l.notes().len()).sum();
    assert_eq!(assigned, notes.len());
    for n in &notes {
        assert!(pattern.lane_of(n.id).is_some());
    }
}

#[test]
fn test_deterministic_across_input_order() {
    let notes = random_notes(100, 42);
    let mut reversed = notes.clone();
    reversed.reverse();

    let a = TrackerPattern::build(&notes, &region(40), 4);
    let b = TrackerPattern::build(&reversed, &region(40), 4);
    for n in &notes {
        assert_eq!(a.lane_of(n.id), b.lane_of(n.id));
    }
}

#[test]
fn test_resolution_change_recomputes() {
    let notes = random_notes(50, 3);
    let mut pattern = TrackerPattern::build(&notes, &region(40), 4);
    assert_eq!(pattern.nrows(), 160);

    pattern.rebuild(&notes, &region(40), 16);
    assert_eq!(pattern.nrows(), 640);

    let matrix = TrackerMatrix::from_pattern(&pattern);
    assert_eq!(matrix.nrows(), 640);
    assert_eq!(matrix.nlanes(), pattern.nlanes());
}

#[test]
fn test_row_events_match_note_starts() {
    let notes = random_notes(80, 11);
    let pattern = TrackerPattern::build(&notes, &region(40), 4);
    let grid = pattern.grid();

    for lane in pattern.lanes() {
        for (row, cell) in lane.rows() {
            for on in &cell.on {
                let note = notes.iter().find(|n| n.id == on.id).unwrap();
                assert_eq!(grid.beats_at_row(*row as i64) + Beats::from_ticks(on.delay), note.time);
            }
        }
    }
}
