//! Ordered Interval Partition
//!
//! The backbone of arrangement and mute editing: a gapless, non-overlapping
//! cover of `[0, duration]` by labeled segments, mutated only through
//! split/merge/move/toggle. Mutators return `false` for expected rejections
//! instead of erroring, since "nothing happened" is a normal answer to an
//! edit gesture.
//!
//! Invariants, preserved by every mutation:
//! - segments are sorted and contiguous: `seg[i].end == seg[i+1].start`
//! - `seg[0].start == 0`, `seg[last].end == duration`
//! - every segment has positive length

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Tolerance when matching an existing boundary by time, in seconds
pub const BOUNDARY_EPSILON: f64 = 0.001;

/// Minimum gap a moved boundary must keep to each neighbor, in seconds
pub const MIN_BOUNDARY_GAP: f64 = 0.01;

// ═══════════════════════════════════════════════════════════════════════════════
// SEGMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// One labeled interval of a partition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment<L> {
    pub start: f64,
    pub end: f64,
    pub label: L,
}

impl<L> Segment<L> {
    #[inline]
    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARTITION
// ═══════════════════════════════════════════════════════════════════════════════

/// Gapless ordered partition of `[0, duration]`, parameterized by label type.
///
/// Size/snap policy (minimum beat lengths etc.) is layered on by the
/// arrangement/mute specializations; the generic type enforces only
/// "strictly interior, non-degenerate".
#[derive(Debug, Clone, PartialEq)]
pub struct Partition<L> {
    duration: f64,
    segments: Vec<Segment<L>>,
}

impl<L: Copy> Partition<L> {
    /// One full-duration segment carrying the default label.
    pub fn new(duration: f64, label: L) -> Self {
        Self {
            duration,
            segments: vec![Segment {
                start: 0.0,
                end: duration,
                label,
            }],
        }
    }

    /// Rebuild from already-validated segments (document import).
    pub(crate) fn from_segments(duration: f64, segments: Vec<Segment<L>>) -> Self {
        Self { duration, segments }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn segments(&self) -> &[Segment<L>] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────────

    /// Segment with `start <= time < end`; `time == duration` returns the
    /// last segment. Outside `[0, duration]` there is nothing.
    pub fn segment_at(&self, time: f64) -> Option<&Segment<L>> {
        self.index_at(time).map(|i| &self.segments[i])
    }

    /// Index form of [`segment_at`](Self::segment_at).
    pub fn index_at(&self, time: f64) -> Option<usize> {
        if time == self.duration {
            return Some(self.segments.len() - 1);
        }
        self.segments
            .iter()
            .position(|s| s.start <= time && time < s.end)
    }

    /// Interior boundaries only: split times, excluding 0 and duration.
    pub fn boundary_times(&self) -> Vec<f64> {
        self.segments.iter().skip(1).map(|s| s.start).collect()
    }

    /// Label at `index`, if in range.
    pub fn label_at(&self, index: usize) -> Option<L> {
        self.segments.get(index).map(|s| s.label)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────────

    /// Split the segment strictly containing `time` into two segments that
    /// both inherit its label. Exact boundary hits are no-ops.
    pub fn split_at(&mut self, time: f64) -> bool {
        let Some(index) = self
            .segments
            .iter()
            .position(|s| s.start < time && time < s.end)
        else {
            return false;
        };
        let original = self.segments[index];
        self.segments[index].end = time;
        self.segments.insert(
            index + 1,
            Segment {
                start: time,
                end: original.end,
                label: original.label,
            },
        );
        true
    }

    /// Merge the segment whose `start` matches `time` (within
    /// [`BOUNDARY_EPSILON`]) into its predecessor, keeping the predecessor's
    /// label. The leading boundary at 0 is permanent.
    pub fn merge_at(&mut self, time: f64) -> bool {
        let Some(index) = self.boundary_index(time) else {
            return false;
        };
        let end = self.segments[index].end;
        self.segments[index - 1].end = end;
        self.segments.remove(index);
        true
    }

    /// Relocate the shared boundary at `time` to `new_time`. Rejected unless
    /// `new_time` stays strictly between the neighboring segments' own
    /// boundaries with [`MIN_BOUNDARY_GAP`] preserved on each side.
    pub fn move_boundary(&mut self, time: f64, new_time: f64) -> bool {
        let Some(index) = self.boundary_index(time) else {
            return false;
        };
        let prev_start = self.segments[index - 1].start;
        let next_end = self.segments[index].end;
        if new_time < prev_start + MIN_BOUNDARY_GAP || new_time > next_end - MIN_BOUNDARY_GAP {
            return false;
        }
        self.segments[index - 1].end = new_time;
        self.segments[index].start = new_time;
        true
    }

    /// Index of the segment whose start is the interior boundary at `time`.
    /// Index 0 (the boundary at 0) never matches.
    fn boundary_index(&self, time: f64) -> Option<usize> {
        (1..self.segments.len()).find(|&i| (self.segments[i].start - time).abs() <= BOUNDARY_EPSILON)
    }
}

impl Partition<bool> {
    /// Flip the boolean label at `index`.
    pub fn toggle(&mut self, index: usize) -> bool {
        match self.segments.get_mut(index) {
            Some(segment) => {
                segment.label = !segment.label;
                true
            }
            None => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
