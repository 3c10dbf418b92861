//! Selection operations

use ng_core::{Beats, MidiChannel, NoteId, NoteNumber};

use crate::MidiView;

impl MidiView {
    /// Visible notes in time order
    fn visible_in_time_order(&self) -> Vec<(NoteId, Beats, NoteNumber, MidiChannel)> {
        let mut notes: Vec<_> = self
            .visuals
            .values()
            .filter(|v| v.is_visible())
            .map(|v| (v.id(), v.note.time, v.note.note, v.note.channel))
            .collect();
        notes.sort_by(|a, b| a.1.cmp(&b.1).then(a.2.cmp(&b.2)).then(a.0.cmp(&b.0)));
        notes
    }

    pub fn select_all(&mut self) {
        let ids: Vec<NoteId> = self.visuals.keys().copied().collect();
        for id in ids {
            self.select_internal(id);
        }
        self.flush_events();
    }

    pub fn clear_selection(&mut self) {
        self.clear_selection_internal();
        self.flush_events();
    }

    /// Make `id` the only selected note
    pub fn unique_select(&mut self, id: NoteId) {
        let others: Vec<NoteId> = self.selection.iter().filter(|s| *s != id).collect();
        for other in others {
            self.deselect_internal(other);
        }
        self.select_internal(id);
        self.flush_events();
    }

    pub fn add_to_selection(&mut self, id: NoteId) {
        self.select_internal(id);
        self.flush_events();
    }

    pub fn remove_from_selection(&mut self, id: NoteId) {
        self.deselect_internal(id);
        self.flush_events();
    }

    pub fn toggle_selection(&mut self, id: NoteId) {
        if self.selection.contains(id) {
            self.deselect_internal(id);
        } else {
            self.select_internal(id);
        }
        self.flush_events();
    }

    /// Select notes starting in `[start, end)` (source beats)
    pub fn select_range(&mut self, start: Beats, end: Beats, extend: bool) {
        if !extend {
            self.clear_selection_internal();
        }
        let ids: Vec<NoteId> = self
            .visuals
            .values()
            .filter(|v| v.note.time >= start && v.note.time < end)
            .map(|v| v.id())
            .collect();
        for id in ids {
            self.select_internal(id);
        }
        self.flush_events();
    }

    /// Select exactly the visible notes that were not selected
    pub fn invert_selection(&mut self) {
        let ids: Vec<NoteId> = self
            .visuals
            .values()
            .filter(|v| v.is_visible())
            .map(|v| v.id())
            .collect();
        for id in ids {
            if self.selection.contains(id) {
                self.deselect_internal(id);
            } else {
                self.select_internal(id);
            }
        }
        self.flush_events();
    }

    /// Select notes of one pitch.
    ///
    /// With `extend`, selects every pitch between the current selection's
    /// range and `pitch`. `add` keeps the current selection.
    pub fn select_matching_notes(
        &mut self,
        pitch: NoteNumber,
        channel: Option<MidiChannel>,
        add: bool,
        extend: bool,
    ) {
        let (mut low, mut high) = (pitch, pitch);
        if extend {
            for id in self.selection.iter() {
                if let Some(v) = self.visuals.get(&id) {
                    low = low.min(v.note.note);
                    high = high.max(v.note.note);
                }
            }
        }
        if !add {
            self.clear_selection_internal();
        }

        let ids: Vec<NoteId> = self
            .visuals
            .values()
            .filter(|v| v.note.note >= low && v.note.note <= high)
            .filter(|v| channel.is_none_or(|c| v.note.channel == c))
            .map(|v| v.id())
            .collect();
        for id in ids {
            self.select_internal(id);
        }
        self.flush_events();
    }

    /// Select the first unselected note after a selected one, wrapping to the start
    pub fn select_next_note(&mut self, add: bool) {
        let ordered = self.visible_in_time_order();
        self.step_selection(ordered.into_iter().map(|n| n.0).collect(), add);
    }

    /// Select the last unselected note before a selected one, wrapping to the end
    pub fn select_previous_note(&mut self, add: bool) {
        let ordered = self.visible_in_time_order();
        self.step_selection(ordered.into_iter().rev().map(|n| n.0).collect(), add);
    }

    fn step_selection(&mut self, ordered: Vec<NoteId>, add: bool) {
        let mut use_next = false;
        let mut target = None;
        for id in &ordered {
            if self.selection.contains(*id) {
                use_next = true;
            } else if use_next {
                target = Some(*id);
                break;
            }
        }
        let Some(target) = target.or_else(|| ordered.first().copied()) else {
            return;
        };
        if add {
            self.add_to_selection(target);
        } else {
            self.unique_select(target);
        }
    }
}
