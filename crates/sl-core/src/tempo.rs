//! Tempo and Time Signature Map
//!
//! Tempo-aware musical timeline:
//! - Piecewise-constant tempo changes (BPM)
//! - Piecewise-constant time signature changes
//! - Forward beat walk with globally correct measure/beat numbering
//! - Nearest-beat snapping for edit tools
//! - Tolerant ingestion of song metadata documents
//!
//! ## Lookup semantics
//! `tempo_at`/`time_sig_at` are left-continuous step functions: the value at
//! a change instant is the new value, and the value just before it is the
//! previous one. A missing or malformed change list never errors; the map
//! falls back to 120 BPM in 4/4.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SlError;

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default tempo when no change list is present
pub const DEFAULT_BPM: f64 = 120.0;

/// Hard cap on forward beat-walk iterations.
///
/// Degenerate metadata (e.g. an absurd tempo) must not hang the caller; the
/// walk returns whatever it accumulated before hitting the cap.
pub const MAX_WALK_STEPS: usize = 100_000;

// ═══════════════════════════════════════════════════════════════════════════════
// TIME SIGNATURE
// ═══════════════════════════════════════════════════════════════════════════════

/// Time signature (e.g. 4/4, 3/4, 6/8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Beats per measure
    pub numerator: u32,
    /// Note value that gets one beat (4 = quarter, 8 = eighth)
    pub denominator: u32,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }
}

impl TimeSignature {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Common time (4/4)
    pub const COMMON: Self = Self {
        numerator: 4,
        denominator: 4,
    };

    /// Seconds per notated beat at the given quarter-note tempo.
    ///
    /// The denominator converts a quarter-note BPM into the notated beat
    /// unit: an eighth-note beat (x/8) is half as long as a quarter-note
    /// beat at the same BPM.
    #[inline]
    pub fn seconds_per_beat(&self, bpm: f64) -> f64 {
        (60.0 / bpm) * (4.0 / self.denominator as f64)
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for TimeSignature {
    type Err = SlError;

    /// Parse the `"N/D"` form used by song metadata documents.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num, den) = s
            .split_once('/')
            .ok_or_else(|| SlError::InvalidParam(format!("time signature: {s}")))?;
        let numerator: u32 = num
            .trim()
            .parse()
            .map_err(|_| SlError::InvalidParam(format!("time signature: {s}")))?;
        let denominator: u32 = den
            .trim()
            .parse()
            .map_err(|_| SlError::InvalidParam(format!("time signature: {s}")))?;
        if numerator == 0 || denominator == 0 {
            return Err(SlError::InvalidParam(format!("time signature: {s}")));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CHANGE EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Tempo change event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoChange {
    /// Position in seconds
    pub start: f64,
    /// Tempo in BPM from this instant on
    pub bpm: f64,
}

impl TempoChange {
    pub fn new(start: f64, bpm: f64) -> Self {
        Self { start, bpm }
    }
}

/// Time signature change event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSigChange {
    /// Position in seconds
    pub start: f64,
    /// Signature from this instant on
    pub signature: TimeSignature,
}

impl TimeSigChange {
    pub fn new(start: f64, signature: TimeSignature) -> Self {
        Self { start, signature }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BEAT EVENT
// ═══════════════════════════════════════════════════════════════════════════════

/// One beat on the timeline, as produced by the forward beat walk.
///
/// Measure and beat numbers are 1-based display values; `is_measure_start`
/// marks downbeats for ruler rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatEvent {
    /// Position in seconds
    pub time: f64,
    /// Measure number (1-based)
    pub measure: u32,
    /// Beat within the measure (1..=numerator)
    pub beat: u32,
    /// True on beat 1 of a measure
    pub is_measure_start: bool,
    /// Tempo in effect at this beat
    pub tempo: f64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// METADATA DOCUMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Tempo entry as it appears in a song metadata document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempoEntry {
    pub start: f64,
    pub tempo: f64,
}

/// Time signature entry as it appears in a song metadata document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSigEntry {
    pub start: f64,
    /// `"N/D"` form, e.g. `"6/8"`
    pub sig: String,
}

/// Tempo/time-signature portion of a song metadata document.
///
/// Both lists are optional and pre-sorted ascending by `start` when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SongMeta {
    #[serde(default)]
    pub tempos: Vec<TempoEntry>,
    #[serde(default, rename = "time-sigs")]
    pub time_sigs: Vec<TimeSigEntry>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPO MAP
// ═══════════════════════════════════════════════════════════════════════════════

/// Piecewise-constant tempo and time signature lookup over a song.
///
/// Immutable once built; replaced wholesale on song reload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TempoMap {
    /// Tempo changes, ascending by start time
    tempo_changes: Vec<TempoChange>,
    /// Time signature changes, ascending by start time
    sig_changes: Vec<TimeSigChange>,
}

impl TempoMap {
    /// Map with no changes: 120 BPM in 4/4 everywhere.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pre-sorted change lists.
    pub fn with_changes(tempo_changes: Vec<TempoChange>, sig_changes: Vec<TimeSigChange>) -> Self {
        Self {
            tempo_changes,
            sig_changes,
        }
    }

    /// Build from a song metadata document, substituting defaults for
    /// anything malformed.
    ///
    /// A list that is non-monotonic, contains a non-positive tempo, a
    /// negative start, or an unparsable signature is dropped wholesale with
    /// a warning: a best-guess musical grid beats blocking playback.
    pub fn from_meta(meta: &SongMeta) -> Self {
        let mut tempo_changes = Vec::with_capacity(meta.tempos.len());
        let mut prev = f64::NEG_INFINITY;
        for entry in &meta.tempos {
            if entry.start < 0.0 || entry.start < prev || entry.tempo <= 0.0 {
                log::warn!(
                    "malformed tempo list (entry at {}), falling back to {} BPM",
                    entry.start,
                    DEFAULT_BPM
                );
                tempo_changes.clear();
                break;
            }
            prev = entry.start;
            tempo_changes.push(TempoChange::new(entry.start, entry.tempo));
        }

        let mut sig_changes = Vec::with_capacity(meta.time_sigs.len());
        let mut prev = f64::NEG_INFINITY;
        for entry in &meta.time_sigs {
            let parsed = entry.sig.parse::<TimeSignature>();
            match parsed {
                Ok(signature) if entry.start >= 0.0 && entry.start >= prev => {
                    prev = entry.start;
                    sig_changes.push(TimeSigChange::new(entry.start, signature));
                }
                _ => {
                    log::warn!(
                        "malformed time signature list (entry at {}), falling back to 4/4",
                        entry.start
                    );
                    sig_changes.clear();
                    break;
                }
            }
        }

        Self {
            tempo_changes,
            sig_changes,
        }
    }

    /// All tempo changes, ascending
    pub fn tempo_changes(&self) -> &[TempoChange] {
        &self.tempo_changes
    }

    /// All time signature changes, ascending
    pub fn time_sig_changes(&self) -> &[TimeSigChange] {
        &self.sig_changes
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────────────────────

    /// Tempo in effect at `t`: the last change with `start <= t`, else 120.
    pub fn tempo_at(&self, t: f64) -> f64 {
        self.tempo_changes
            .iter()
            .rev()
            .find(|c| c.start <= t)
            .map(|c| c.bpm)
            .unwrap_or(DEFAULT_BPM)
    }

    /// Signature in effect at `t`: the last change with `start <= t`, else 4/4.
    pub fn time_sig_at(&self, t: f64) -> TimeSignature {
        self.sig_changes
            .iter()
            .rev()
            .find(|c| c.start <= t)
            .map(|c| c.signature)
            .unwrap_or_default()
    }

    /// Seconds per notated beat at `t`.
    pub fn seconds_per_beat_at(&self, t: f64) -> f64 {
        self.time_sig_at(t).seconds_per_beat(self.tempo_at(t))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Beat walk
    // ─────────────────────────────────────────────────────────────────────────────

    /// All beats with `lo <= time < hi`, numbered from the start of the song.
    ///
    /// The walk always starts at time 0 so measure/beat numbers are globally
    /// correct regardless of the requested window. Deterministic: identical
    /// inputs produce bit-identical output.
    pub fn beats_in_range(&self, lo: f64, hi: f64) -> Vec<BeatEvent> {
        self.walk_beats(lo, hi, MAX_WALK_STEPS, &[], |t| t)
    }

    /// Nearest beat to `t` (clamped to >= 0), searching a ±2-beat window
    /// sized from the tempo at `t`. The earlier beat wins a tie.
    ///
    /// Snapping is idempotent: querying at a returned beat time returns the
    /// same beat.
    pub fn nearest_beat(&self, t: f64) -> Option<BeatEvent> {
        let t = t.max(0.0);
        let window = 2.0 * self.seconds_per_beat_at(t);
        // Pad the upper bound so a beat exactly two beats away is a candidate.
        let candidates = self.beats_in_range((t - window).max(0.0), t + window + 1e-9);
        let mut best: Option<BeatEvent> = None;
        for event in candidates {
            match best {
                Some(b) if (event.time - t).abs() >= (b.time - t).abs() => {}
                _ => best = Some(event),
            }
        }
        best
    }

    /// Forward beat walk from time 0.
    ///
    /// `to_source` maps walked (possibly virtual) time into source time for
    /// tempo/signature lookup; `snap_instants` are exact instants the
    /// accumulator snaps to when within [`crate::DRIFT_EPSILON`], defeating
    /// cumulative floating-point drift over long songs.
    pub(crate) fn walk_beats<F>(
        &self,
        lo: f64,
        hi: f64,
        max_steps: usize,
        snap_instants: &[f64],
        to_source: F,
    ) -> Vec<BeatEvent>
    where
        F: Fn(f64) -> f64,
    {
        let mut events = Vec::new();
        if hi <= 0.0 || hi <= lo {
            return events;
        }

        let mut time = 0.0_f64;
        let mut prev_time = f64::NEG_INFINITY;
        let mut measure = 1u32;
        let mut beat = 1u32;
        let mut tempo_cursor = 0usize;
        let mut sig_cursor = 0usize;

        for step in 0..max_steps {
            // Never snap back to an instant a previous beat already landed
            // on; a beat shorter than the tolerance would otherwise pin the
            // accumulator there until the cap.
            if let Some(snap) = nearest_snap(snap_instants, time) {
                if snap > prev_time {
                    time = snap;
                }
            }
            if time >= hi {
                break;
            }

            let source_time = to_source(time);

            // Cursors only ever move forward; the walk is monotonic.
            while tempo_cursor < self.tempo_changes.len()
                && self.tempo_changes[tempo_cursor].start <= source_time
            {
                tempo_cursor += 1;
            }
            let bpm = if tempo_cursor == 0 {
                DEFAULT_BPM
            } else {
                self.tempo_changes[tempo_cursor - 1].bpm
            };

            let prev_sig_cursor = sig_cursor;
            while sig_cursor < self.sig_changes.len()
                && self.sig_changes[sig_cursor].start <= source_time
            {
                sig_cursor += 1;
            }
            let signature = if sig_cursor == 0 {
                TimeSignature::default()
            } else {
                self.sig_changes[sig_cursor - 1].signature
            };

            // A signature change starts a new measure at the first beat at
            // or after its instant; otherwise wrap when the beat count
            // exceeds the numerator.
            if step > 0 && sig_cursor != prev_sig_cursor {
                measure += 1;
                beat = 1;
            } else if beat > signature.numerator {
                measure += 1;
                beat = 1;
            }

            if time >= lo {
                events.push(BeatEvent {
                    time,
                    measure,
                    beat,
                    is_measure_start: beat == 1,
                    tempo: bpm,
                });
            }

            prev_time = time;
            time += signature.seconds_per_beat(bpm);
            beat += 1;
        }

        events
    }
}

/// Closest snap instant within the drift tolerance, if any.
fn nearest_snap(instants: &[f64], time: f64) -> Option<f64> {
    let mut best: Option<f64> = None;
    for &s in instants {
        if (s - time).abs() <= crate::DRIFT_EPSILON {
            match best {
                Some(b) if (s - time).abs() >= (b - time).abs() => {}
                _ => best = Some(s),
            }
        }
    }
    best
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
