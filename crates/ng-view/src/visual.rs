//! Visual notes
//!
//! The on-screen representation of a model note. Sustained notes are
//! rectangles; percussive notes are hits centred on their start.

use ng_core::{Note, NoteId};

/// Rectangle of a sustained note
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteRect {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    /// Whether the right edge is outlined (false while the note is still sounding)
    pub outline_right: bool,
}

/// Diamond of a percussive hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitShape {
    /// Centre
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

/// Shape of a visual note
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoteVisual {
    Sustained(NoteRect),
    Hit(HitShape),
}

impl NoteVisual {
    /// Left edge (hit centre for percussive notes)
    pub fn x0(&self) -> f64 {
        match self {
            NoteVisual::Sustained(r) => r.x0,
            NoteVisual::Hit(h) => h.x,
        }
    }

    /// Right edge (hit centre for percussive notes)
    pub fn x1(&self) -> f64 {
        match self {
            NoteVisual::Sustained(r) => r.x1,
            NoteVisual::Hit(h) => h.x,
        }
    }

    /// Top edge
    pub fn y0(&self) -> f64 {
        match self {
            NoteVisual::Sustained(r) => r.y0,
            NoteVisual::Hit(h) => h.y - h.size / 2.0,
        }
    }

    /// Bounding box (x0, y0, x1, y1)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        match self {
            NoteVisual::Sustained(r) => (r.x0, r.y0, r.x1, r.y1),
            NoteVisual::Hit(h) => {
                let half = h.size / 2.0;
                (h.x - half, h.y - half, h.x + half, h.y + half)
            }
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        match self {
            NoteVisual::Sustained(r) => x >= r.x0 && x <= r.x1 && y >= r.y0 && y < r.y1,
            NoteVisual::Hit(h) => {
                let half = h.size / 2.0;
                (x - h.x).abs() + (y - h.y).abs() <= half
            }
        }
    }

    /// Shift by a pixel delta
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        match *self {
            NoteVisual::Sustained(r) => NoteVisual::Sustained(NoteRect {
                x0: r.x0 + dx,
                x1: r.x1 + dx,
                y0: r.y0 + dy,
                y1: r.y1 + dy,
                ..r
            }),
            NoteVisual::Hit(h) => NoteVisual::Hit(HitShape {
                x: h.x + dx,
                y: h.y + dy,
                ..h
            }),
        }
    }
}

/// A model note as shown by the view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualNote {
    /// Snapshot of the model note this visual shows
    pub note: Note,
    pub visual: NoteVisual,
    pub selected: bool,
    /// Outside the region bounds: kept, but not drawn
    pub hidden: bool,
}

impl VisualNote {
    pub fn id(&self) -> NoteId {
        self.note.id
    }

    pub fn is_visible(&self) -> bool {
        !self.hidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rect() -> NoteVisual {
        NoteVisual::Sustained(NoteRect {
            x0: 10.0,
            x1: 50.0,
            y0: 20.0,
            y1: 32.0,
            outline_right: true,
        })
    }

    #[test]
    fn test_rect_hit_testing() {
        let r = rect();
        assert!(r.contains(10.0, 20.0));
        assert!(r.contains(50.0, 31.9));
        assert!(!r.contains(50.0, 32.0));
        assert!(!r.contains(9.9, 25.0));
    }

    #[test]
    fn test_hit_shape() {
        let hit = NoteVisual::Hit(HitShape {
            x: 100.0,
            y: 50.0,
            size: 10.0,
        });
        assert!(hit.contains(103.0, 51.0));
        assert!(!hit.contains(104.0, 54.0));
        let (x0, y0, x1, y1) = hit.bounds();
        assert_relative_eq!(x0, 95.0);
        assert_relative_eq!(y0, 45.0);
        assert_relative_eq!(x1, 105.0);
        assert_relative_eq!(y1, 55.0);
        assert_relative_eq!(hit.x0(), hit.x1());
    }

    #[test]
    fn test_translate() {
        let moved = rect().translated(5.0, -12.0);
        assert_relative_eq!(moved.x0(), 15.0);
        assert_relative_eq!(moved.x1(), 55.0);
        assert_relative_eq!(moved.y0(), 8.0);
    }
}
