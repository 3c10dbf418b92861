//! Time-related types for note editing
//!
//! Two clocks meet in the editor:
//! - Samples: absolute audio timeline positions (engine/tempo map domain)
//! - Beats: musical time, stored as ticks at [`PPQ`] resolution
//!
//! Note positions live in the beat domain so that edits survive tempo changes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Ticks per quarter note (beat)
pub const PPQ: i64 = 960;

/// Finest tracker resolution: one row per tick
pub const MAX_ROWS_PER_BEAT: u32 = PPQ as u32;

// ═══════════════════════════════════════════════════════════════════════════════
// SAMPLE POSITION
// ═══════════════════════════════════════════════════════════════════════════════

/// Sample position in the timeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SamplePosition(pub u64);

impl SamplePosition {
    pub const ZERO: Self = Self(0);

    #[inline]
    pub fn from_seconds(seconds: f64, sample_rate: f64) -> Self {
        Self((seconds * sample_rate).max(0.0) as u64)
    }

    #[inline]
    pub fn to_seconds(self, sample_rate: f64) -> f64 {
        self.0 as f64 / sample_rate
    }

    /// Offset by a signed number of samples, saturating at zero
    #[inline]
    pub fn offset(self, samples: i64) -> Self {
        if samples >= 0 {
            Self(self.0.saturating_add(samples as u64))
        } else {
            Self(self.0.saturating_sub(samples.unsigned_abs()))
        }
    }
}

impl Add<u64> for SamplePosition {
    type Output = Self;

    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl Sub for SamplePosition {
    type Output = u64;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0.saturating_sub(rhs.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BEATS
// ═══════════════════════════════════════════════════════════════════════════════

/// Musical time as a signed tick count (960 ticks per beat).
///
/// Signed so that deltas (nudge, trim, drag offsets) share the type with
/// positions. [`Beats::MAX`] is the "unterminated" sentinel used for the
/// length of notes whose note-off has not arrived yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Beats(i64);

impl Beats {
    pub const ZERO: Self = Self(0);
    pub const ONE_TICK: Self = Self(1);
    pub const ONE_BEAT: Self = Self(PPQ);
    pub const MAX: Self = Self(i64::MAX);

    #[inline]
    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    #[inline]
    pub const fn from_beats(beats: i64) -> Self {
        Self(beats * PPQ)
    }

    /// From fractional beats, rounded to the nearest tick
    #[inline]
    pub fn from_f64(beats: f64) -> Self {
        Self((beats * PPQ as f64).round() as i64)
    }

    #[inline]
    pub const fn ticks(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / PPQ as f64
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    #[inline]
    pub fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    #[inline]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Round to the nearest multiple of `step` (half rounds up)
    pub fn round_to_multiple(self, step: Beats) -> Self {
        if step.0 <= 0 {
            return self;
        }
        Self((self.0 + step.0 / 2).div_euclid(step.0) * step.0)
    }

    /// Round down (towards negative infinity) to a multiple of `step`
    pub fn round_down_to_multiple(self, step: Beats) -> Self {
        if step.0 <= 0 {
            return self;
        }
        Self(self.0.div_euclid(step.0) * step.0)
    }

    /// Round up (towards positive infinity) to a multiple of `step`
    pub fn round_up_to_multiple(self, step: Beats) -> Self {
        if step.0 <= 0 {
            return self;
        }
        let down = self.0.div_euclid(step.0) * step.0;
        if down == self.0 { self } else { Self(down + step.0) }
    }
}

impl fmt::Display for Beats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Beats::MAX {
            return write!(f, "inf");
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        let t = self.0.unsigned_abs();
        write!(f, "{}{}:{:03}", sign, t / PPQ as u64, t % PPQ as u64)
    }
}

impl Add for Beats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Beats {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Beats {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Beats {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Beats {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Mul<i64> for Beats {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<i64> for Beats {
    type Output = Self;

    fn div(self, rhs: i64) -> Self::Output {
        Self(self.0 / rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beats_conversion() {
        assert_eq!(Beats::from_beats(2).ticks(), 2 * PPQ);
        assert_eq!(Beats::from_f64(0.5).ticks(), PPQ / 2);
        assert_eq!(Beats::from_f64(2.5).to_f64(), 2.5);
    }

    #[test]
    fn test_rounding() {
        let grid = Beats::from_ticks(240);
        assert_eq!(Beats::from_ticks(100).round_to_multiple(grid), Beats::ZERO);
        assert_eq!(Beats::from_ticks(130).round_to_multiple(grid), grid);
        assert_eq!(Beats::from_ticks(250).round_down_to_multiple(grid), grid);
        assert_eq!(Beats::from_ticks(250).round_up_to_multiple(grid), grid * 2);
        assert_eq!(grid.round_up_to_multiple(grid), grid);
        assert_eq!(Beats::from_ticks(-10).round_down_to_multiple(grid), -grid);
    }

    #[test]
    fn test_display() {
        assert_eq!(Beats::from_ticks(PPQ + 5).to_string(), "1:005");
        assert_eq!(Beats::MAX.to_string(), "inf");
    }

    #[test]
    fn test_sample_offset_saturates() {
        assert_eq!(SamplePosition(10).offset(-20), SamplePosition::ZERO);
        assert_eq!(SamplePosition(10).offset(5), SamplePosition(15));
    }
}
