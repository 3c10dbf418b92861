//! Tempo and Time Signature System
//!
//! Tempo management for the beat <-> sample conversions the editor needs:
//! - Tempo map with tempo changes
//! - Time signature changes
//! - Linear tempo ramps
//! - Grid values for snapping
//!
//! ## Time Units
//! - Samples: Audio samples (absolute)
//! - Beats: PPQ-based ticks (musical, 960 ticks per quarter note)

use serde::{Deserialize, Serialize};

use crate::{Beats, SamplePosition, TimeConverter, PPQ};

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Minimum tempo
pub const MIN_TEMPO: f64 = 20.0;

/// Maximum tempo
pub const MAX_TEMPO: f64 = 400.0;

// ═══════════════════════════════════════════════════════════════════════════════
// TIME SIGNATURE
// ═══════════════════════════════════════════════════════════════════════════════

/// Time signature (e.g., 4/4, 3/4, 6/8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Numerator (beats per bar)
    pub numerator: u8,
    /// Denominator (note value that gets one beat)
    pub denominator: u8,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::COMMON
    }
}

impl TimeSignature {
    pub fn new(numerator: u8, denominator: u8) -> Self {
        Self {
            numerator: numerator.max(1),
            denominator: denominator.max(1),
        }
    }

    /// Common time (4/4)
    pub const COMMON: Self = Self {
        numerator: 4,
        denominator: 4,
    };

    /// Length of one bar in quarter-note beats
    pub fn bar_length(&self) -> Beats {
        Beats::from_ticks(PPQ * 4 / self.denominator as i64 * self.numerator as i64)
    }

    /// Length of one beat of this meter in quarter-note beats
    pub fn beat_length(&self) -> Beats {
        Beats::from_ticks(PPQ * 4 / self.denominator as i64)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPO EVENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Tempo ramp type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TempoRamp {
    /// Instant tempo change
    #[default]
    Instant,
    /// Linear ramp to next tempo
    Linear,
}

/// Tempo change event
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TempoEvent {
    /// Position in beats
    pub at: Beats,
    /// Tempo in BPM
    pub bpm: f64,
    /// Ramp type to next tempo
    pub ramp: TempoRamp,
}

impl TempoEvent {
    pub fn new(at: Beats, bpm: f64) -> Self {
        Self::with_ramp(at, bpm, TempoRamp::Instant)
    }

    pub fn with_ramp(at: Beats, bpm: f64, ramp: TempoRamp) -> Self {
        if !(MIN_TEMPO..=MAX_TEMPO).contains(&bpm) {
            log::warn!("Tempo {} BPM out of range, clamping", bpm);
        }
        Self {
            at: at.max(Beats::ZERO),
            bpm: bpm.clamp(MIN_TEMPO, MAX_TEMPO),
            ramp,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPO MAP
// ═══════════════════════════════════════════════════════════════════════════════

/// Tempo and time signature map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempoMap {
    /// Tempo events (sorted by position, first one at zero)
    tempo_events: Vec<TempoEvent>,
    /// Time signature (single meter; bar grids follow it)
    time_signature: TimeSignature,
    /// Sample rate for conversions
    sample_rate: u32,
}

impl Default for TempoMap {
    fn default() -> Self {
        Self::new(48000)
    }
}

impl TempoMap {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            tempo_events: vec![TempoEvent::new(Beats::ZERO, 120.0)],
            time_signature: TimeSignature::default(),
            sample_rate: sample_rate.max(1),
        }
    }

    /// Constant-tempo map
    pub fn constant(bpm: f64, sample_rate: u32) -> Self {
        let mut map = Self::new(sample_rate);
        map.tempo_events[0].bpm = bpm.clamp(MIN_TEMPO, MAX_TEMPO);
        map
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn set_time_signature(&mut self, time_signature: TimeSignature) {
        self.time_signature = time_signature;
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Tempo Management
    // ─────────────────────────────────────────────────────────────────────────────

    /// Get tempo at a beat position
    pub fn tempo_at(&self, at: Beats) -> f64 {
        let idx = self
            .tempo_events
            .iter()
            .rposition(|e| e.at <= at)
            .unwrap_or(0);
        let event = &self.tempo_events[idx];

        if let Some(next) = self.tempo_events.get(idx + 1)
            && event.ramp == TempoRamp::Linear
            && at < next.at
        {
            let t = (at - event.at).ticks() as f64 / (next.at - event.at).ticks() as f64;
            return event.bpm + (next.bpm - event.bpm) * t;
        }

        event.bpm
    }

    /// Set tempo at a beat position
    pub fn set_tempo(&mut self, at: Beats, bpm: f64) {
        self.set_tempo_with_ramp(at, bpm, TempoRamp::Instant);
    }

    /// Set tempo with ramp type
    pub fn set_tempo_with_ramp(&mut self, at: Beats, bpm: f64, ramp: TempoRamp) {
        let event = TempoEvent::with_ramp(at, bpm, ramp);
        if let Some(existing) = self.tempo_events.iter_mut().find(|e| e.at == event.at) {
            *existing = event;
        } else {
            self.tempo_events.push(event);
            self.tempo_events.sort_by_key(|e| e.at);
        }
    }

    /// Remove tempo event (the initial tempo cannot be removed)
    pub fn remove_tempo_event(&mut self, at: Beats) {
        if at > Beats::ZERO {
            self.tempo_events.retain(|e| e.at != at);
        }
    }

    pub fn tempo_events(&self) -> &[TempoEvent] {
        &self.tempo_events
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Conversion: Beats <-> Samples
    // ─────────────────────────────────────────────────────────────────────────────

    /// Tempo at the start and end of segment `i`, and its length in ticks
    /// (`None` for the open-ended last segment)
    fn segment(&self, i: usize) -> (f64, f64, Option<f64>) {
        let event = &self.tempo_events[i];
        match self.tempo_events.get(i + 1) {
            Some(next) => {
                let end_bpm = match event.ramp {
                    TempoRamp::Linear => next.bpm,
                    TempoRamp::Instant => event.bpm,
                };
                let ticks = (next.at - event.at).ticks() as f64;
                (event.bpm, end_bpm, Some(ticks))
            }
            None => (event.bpm, event.bpm, None),
        }
    }

    fn samples_per_tick(&self, bpm: f64) -> f64 {
        60.0 * self.sample_rate as f64 / (bpm * PPQ as f64)
    }

    /// Samples spanned by the first `ticks` of segment `i`.
    ///
    /// Tempo rises linearly in ticks across a ramp, so the sample count is the
    /// integral of samples-per-tick: `k * len / (b1 - b0) * ln(bpm(ticks) / b0)`.
    fn segment_samples(&self, i: usize, ticks: f64) -> f64 {
        let (b0, b1, len) = self.segment(i);
        match len {
            Some(len) if len > 0.0 && (b1 - b0).abs() > f64::EPSILON => {
                let k = self.samples_per_tick(1.0);
                let slope = (b1 - b0) / len;
                k / slope * ((b0 + slope * ticks) / b0).ln()
            }
            _ => ticks * self.samples_per_tick(b0),
        }
    }

    /// Inverse of [`Self::segment_samples`]
    fn segment_ticks(&self, i: usize, samples: f64) -> f64 {
        let (b0, b1, len) = self.segment(i);
        match len {
            Some(len) if len > 0.0 && (b1 - b0).abs() > f64::EPSILON => {
                let k = self.samples_per_tick(1.0);
                let slope = (b1 - b0) / len;
                b0 * ((samples * slope / k).exp() - 1.0) / slope
            }
            _ => samples / self.samples_per_tick(b0),
        }
    }

    /// Beat position to (fractional) samples
    pub fn beats_to_samples_f64(&self, beats: Beats) -> f64 {
        let target = beats.max(Beats::ZERO);
        let mut total = 0.0;

        for i in 0..self.tempo_events.len() {
            let start = self.tempo_events[i].at;
            if start >= target {
                break;
            }
            let end = self
                .tempo_events
                .get(i + 1)
                .map(|e| e.at.min(target))
                .unwrap_or(target);
            total += self.segment_samples(i, (end - start).ticks() as f64);
        }

        total
    }

    /// Samples to (fractional) ticks
    pub fn samples_to_ticks_f64(&self, samples: f64) -> f64 {
        let mut remaining = samples.max(0.0);
        let mut ticks = 0.0;

        for i in 0..self.tempo_events.len() {
            match self.segment(i) {
                (_, _, Some(seg_ticks)) => {
                    let seg_samples = self.segment_samples(i, seg_ticks);
                    if remaining <= seg_samples {
                        return ticks + self.segment_ticks(i, remaining).min(seg_ticks);
                    }
                    ticks += seg_ticks;
                    remaining -= seg_samples;
                }
                (_, _, None) => return ticks + self.segment_ticks(i, remaining),
            }
        }

        ticks
    }
}

impl TimeConverter for TempoMap {
    fn samples_to_beats(&self, position: SamplePosition) -> Beats {
        Beats::from_ticks(self.samples_to_ticks_f64(position.0 as f64).round() as i64)
    }

    fn beats_to_samples(&self, beats: Beats) -> SamplePosition {
        SamplePosition(self.beats_to_samples_f64(beats).round() as u64)
    }

    /// Bars follow the time signature
    fn grid_length(&self, grid: GridValue) -> Beats {
        match grid {
            GridValue::Bar => self.time_signature.bar_length(),
            other => other.to_beats(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GRID VALUE
// ═══════════════════════════════════════════════════════════════════════════════

/// Grid/quantize values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridValue {
    /// One bar of the current meter
    Bar,
    /// Whole note
    Whole,
    /// Half note
    Half,
    /// Quarter note
    Quarter,
    /// Eighth note
    Eighth,
    /// Sixteenth note
    Sixteenth,
    /// Thirty-second note
    ThirtySecond,
    /// Sixty-fourth note
    SixtyFourth,
    /// Triplet eighth
    TripletEighth,
    /// Triplet sixteenth
    TripletSixteenth,
    /// Custom ticks
    Custom(u32),
}

impl Default for GridValue {
    fn default() -> Self {
        Self::Sixteenth
    }
}

impl GridValue {
    /// Length in beats (bars assume 4/4; see [`TimeConverter::grid_length`])
    pub fn to_beats(&self) -> Beats {
        let ticks = match self {
            GridValue::Bar | GridValue::Whole => PPQ * 4,
            GridValue::Half => PPQ * 2,
            GridValue::Quarter => PPQ,
            GridValue::Eighth => PPQ / 2,
            GridValue::Sixteenth => PPQ / 4,
            GridValue::ThirtySecond => PPQ / 8,
            GridValue::SixtyFourth => PPQ / 16,
            GridValue::TripletEighth => PPQ / 3,
            GridValue::TripletSixteenth => PPQ / 6,
            GridValue::Custom(ticks) => *ticks as i64,
        };
        Beats::from_ticks(ticks)
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            GridValue::Bar => "Bar",
            GridValue::Whole => "1",
            GridValue::Half => "1/2",
            GridValue::Quarter => "1/4",
            GridValue::Eighth => "1/8",
            GridValue::Sixteenth => "1/16",
            GridValue::ThirtySecond => "1/32",
            GridValue::SixtyFourth => "1/64",
            GridValue::TripletEighth => "1/8T",
            GridValue::TripletSixteenth => "1/16T",
            GridValue::Custom(_) => "Custom",
        }
    }

    /// Straight grids from coarse to fine, used to pick a grid for a zoom level
    pub const ZOOM_LADDER: [GridValue; 7] = [
        GridValue::Whole,
        GridValue::Half,
        GridValue::Quarter,
        GridValue::Eighth,
        GridValue::Sixteenth,
        GridValue::ThirtySecond,
        GridValue::SixtyFourth,
    ];
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
