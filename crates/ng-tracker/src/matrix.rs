//! Tracker Matrix
//!
//! Dense rows x lanes rendering of a [`TrackerPattern`], ready for display.

use ng_core::NoteName;

use crate::{RowEvent, TrackerPattern};

/// What one lane shows in one row
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TrackerCell {
    #[default]
    Empty,
    /// A note starts here
    On(RowEvent),
    /// A note ends here
    Off(RowEvent),
    /// One note ends and another starts (or a note starts and ends) here
    OnOff { off: RowEvent, on: RowEvent },
    /// A note is held through this row
    Sustain,
    /// More events than one cell can show
    Crowded { ons: usize, offs: usize },
}

impl TrackerCell {
    pub fn is_empty(&self) -> bool {
        matches!(self, TrackerCell::Empty)
    }

    /// Short text for the cell, e.g. `C4 100`, `===`, `|`
    pub fn label(&self) -> String {
        match self {
            TrackerCell::Empty => "---".to_string(),
            TrackerCell::On(ev) => format!("{} {:3}", NoteName::display(ev.note), ev.velocity),
            TrackerCell::Off(_) => "===".to_string(),
            TrackerCell::OnOff { on, .. } => {
                format!("={} {:3}", NoteName::display(on.note), on.velocity)
            }
            TrackerCell::Sustain => "|".to_string(),
            TrackerCell::Crowded { ons, offs } => format!("*{}/{}", ons, offs),
        }
    }
}

/// Dense cell grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerMatrix {
    nrows: usize,
    nlanes: usize,
    /// Row-major cells
    cells: Vec<TrackerCell>,
}

impl TrackerMatrix {
    pub fn from_pattern(pattern: &TrackerPattern) -> Self {
        let nrows = pattern.nrows() as usize;
        let nlanes = pattern.nlanes();
        let mut cells = vec![TrackerCell::Empty; nrows * nlanes];

        for (lane_idx, lane) in pattern.lanes().iter().enumerate() {
            // Row from which the lane's current note is held, if one is sounding
            let mut held_from: Option<usize> = None;

            for row in 0..nrows {
                let idx = row * nlanes + lane_idx;
                let Some(cell) = lane.cell(row as u32) else {
                    if held_from.is_some() {
                        cells[idx] = TrackerCell::Sustain;
                    }
                    continue;
                };

                cells[idx] = match (cell.on.as_slice(), cell.off.as_slice()) {
                    ([], []) => TrackerCell::Empty,
                    ([on], []) => TrackerCell::On(*on),
                    ([], [off]) => TrackerCell::Off(*off),
                    ([on], [off]) => TrackerCell::OnOff { off: *off, on: *on },
                    (ons, offs) => TrackerCell::Crowded {
                        ons: ons.len(),
                        offs: offs.len(),
                    },
                };

                // A note is held after this row if the last event here is an
                // on whose off has not appeared in the same cell
                let starts_held = cell
                    .on
                    .iter()
                    .any(|on| !cell.off.iter().any(|off| off.id == on.id));
                held_from = if starts_held {
                    Some(row)
                } else if cell.off.is_empty() {
                    held_from
                } else {
                    None
                };
            }
        }

        Self {
            nrows,
            nlanes,
            cells,
        }
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn nlanes(&self) -> usize {
        self.nlanes
    }

    pub fn cell(&self, row: usize, lane: usize) -> Option<&TrackerCell> {
        if row < self.nrows && lane < self.nlanes {
            self.cells.get(row * self.nlanes + lane)
        } else {
            None
        }
    }

    /// Cells of one row, lane order
    pub fn row(&self, row: usize) -> Option<&[TrackerCell]> {
        (row < self.nrows).then(|| &self.cells[row * self.nlanes..(row + 1) * self.nlanes])
    }

    /// Plain-text dump, one line per row
    pub fn render(&self) -> String {
        let mut out = String::new();
        for row in 0..self.nrows {
            out.push_str(&format!("{:04} ", row));
            if let Some(cells) = self.row(row) {
                let labels: Vec<String> =
                    cells.iter().map(|c| format!("{:<8}", c.label())).collect();
                out.push_str(labels.join(" ").trim_end());
            }
            out.push('\n');
        }
        out
    }
}
