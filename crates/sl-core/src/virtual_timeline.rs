//! Virtual Timeline
//!
//! Remaps an ordered selection of source spans into one contiguous
//! timeline: "what the listener hears" when disabled regions are skipped
//! or spans are reordered. Playback position, loop points, and beat
//! numbering are all expressed in virtual time and translated back to
//! source time at the edges.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// SPANS & SEGMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// A reference range into a track's native duration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub source_start: f64,
    pub source_end: f64,
}

impl SourceSpan {
    pub fn new(source_start: f64, source_end: f64) -> Self {
        Self {
            source_start,
            source_end,
        }
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.source_end - self.source_start
    }
}

/// One laid-out span: a source range pinned to its virtual position.
///
/// `virtual_end - virtual_start == source_end - source_start` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VirtualSegment {
    pub virtual_start: f64,
    pub virtual_end: f64,
    pub source_start: f64,
    pub source_end: f64,
}

impl VirtualSegment {
    /// Distance from `t` to this segment's source range (0 when inside).
    fn source_distance(&self, t: f64) -> f64 {
        if t < self.source_start {
            self.source_start - t
        } else if t > self.source_end {
            t - self.source_end
        } else {
            0.0
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VIRTUAL TIMELINE
// ═══════════════════════════════════════════════════════════════════════════════

/// End-to-end layout of source spans starting at virtual time 0.
///
/// Never patched incrementally: rebuilt from scratch whenever the selection
/// changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualTimeline {
    segments: Vec<VirtualSegment>,
}

impl VirtualTimeline {
    /// Lay `spans` end to end from virtual time 0, in the given order.
    /// Empty or inverted spans are skipped.
    pub fn from_spans(spans: &[SourceSpan]) -> Self {
        let mut segments = Vec::with_capacity(spans.len());
        let mut cursor = 0.0_f64;
        for span in spans {
            let length = span.length();
            if length <= 0.0 {
                continue;
            }
            segments.push(VirtualSegment {
                virtual_start: cursor,
                virtual_end: cursor + length,
                source_start: span.source_start,
                source_end: span.source_end,
            });
            cursor += length;
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[VirtualSegment] {
        &self.segments
    }

    /// Sum of span lengths
    pub fn total_duration(&self) -> f64 {
        self.segments.last().map(|s| s.virtual_end).unwrap_or(0.0)
    }

    /// Map a source time onto the virtual timeline.
    ///
    /// A source time inside a skipped gap clamps to the nearest segment
    /// edge; with reordered or overlapping spans the earliest (lowest
    /// virtual) containing segment wins.
    pub fn to_virtual_time(&self, source_time: f64) -> f64 {
        let Some(nearest) = self.nearest_by_source(source_time) else {
            return 0.0;
        };
        let clamped = source_time.clamp(nearest.source_start, nearest.source_end);
        nearest.virtual_start + (clamped - nearest.source_start)
    }

    /// Map a virtual time back into source time. Out-of-range input clamps
    /// to the first/last segment edge.
    pub fn to_source_time(&self, virtual_time: f64) -> f64 {
        let Some(last) = self.segments.last() else {
            return 0.0;
        };
        if virtual_time >= last.virtual_end {
            return last.source_end;
        }
        let v = virtual_time.max(0.0);
        for segment in &self.segments {
            if v < segment.virtual_end {
                return segment.source_start + (v - segment.virtual_start);
            }
        }
        last.source_end
    }

    fn nearest_by_source(&self, t: f64) -> Option<&VirtualSegment> {
        let mut best: Option<&VirtualSegment> = None;
        for segment in &self.segments {
            match best {
                Some(b) if segment.source_distance(t) >= b.source_distance(t) => {}
                _ => best = Some(segment),
            }
        }
        best
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn spans_lay_out_end_to_end() {
        // Arrangement skipping source 10..20.
        let vt = VirtualTimeline::from_spans(&[SourceSpan::new(0.0, 10.0), SourceSpan::new(20.0, 30.0)]);
        assert_eq!(vt.segments().len(), 2);
        assert_abs_diff_eq!(vt.total_duration(), 20.0);
        assert_abs_diff_eq!(vt.to_virtual_time(25.0), 15.0);
        assert_abs_diff_eq!(vt.to_source_time(15.0), 25.0);
    }

    #[test]
    fn round_trip_inside_span_domain() {
        let vt = VirtualTimeline::from_spans(&[
            SourceSpan::new(5.0, 12.0),
            SourceSpan::new(30.0, 31.5),
            SourceSpan::new(14.0, 20.0),
        ]);
        for &x in &[5.0, 6.25, 11.9, 30.0, 31.0, 14.0, 19.999] {
            assert_abs_diff_eq!(vt.to_source_time(vt.to_virtual_time(x)), x, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(vt.total_duration(), 7.0 + 1.5 + 6.0);
    }

    #[test]
    fn gap_input_clamps_to_nearest_edge() {
        let vt = VirtualTimeline::from_spans(&[SourceSpan::new(0.0, 10.0), SourceSpan::new(20.0, 30.0)]);
        // 12 is closer to the first span's end.
        assert_abs_diff_eq!(vt.to_virtual_time(12.0), 10.0);
        // 19 is closer to the second span's start.
        assert_abs_diff_eq!(vt.to_virtual_time(19.0), 10.0);
        // Equidistant: the earlier segment wins.
        assert_abs_diff_eq!(vt.to_virtual_time(15.0), 10.0);
        // Before/after everything.
        assert_abs_diff_eq!(vt.to_virtual_time(-4.0), 0.0);
        assert_abs_diff_eq!(vt.to_virtual_time(99.0), 20.0);
    }

    #[test]
    fn virtual_input_clamps_to_timeline_ends() {
        let vt = VirtualTimeline::from_spans(&[SourceSpan::new(20.0, 30.0)]);
        assert_abs_diff_eq!(vt.to_source_time(-1.0), 20.0);
        assert_abs_diff_eq!(vt.to_source_time(10.0), 30.0);
        assert_abs_diff_eq!(vt.to_source_time(25.0), 30.0);
    }

    #[test]
    fn reordered_spans_keep_selection_order() {
        let vt = VirtualTimeline::from_spans(&[SourceSpan::new(20.0, 30.0), SourceSpan::new(0.0, 10.0)]);
        assert_abs_diff_eq!(vt.to_source_time(0.0), 20.0);
        assert_abs_diff_eq!(vt.to_source_time(10.0), 0.0);
        assert_abs_diff_eq!(vt.to_virtual_time(5.0), 15.0);
        assert_abs_diff_eq!(vt.to_virtual_time(25.0), 5.0);
    }

    #[test]
    fn degenerate_spans_are_skipped() {
        let vt = VirtualTimeline::from_spans(&[
            SourceSpan::new(0.0, 5.0),
            SourceSpan::new(5.0, 5.0),
            SourceSpan::new(9.0, 8.0),
            SourceSpan::new(5.0, 7.0),
        ]);
        assert_eq!(vt.segments().len(), 2);
        assert_abs_diff_eq!(vt.total_duration(), 7.0);
    }

    #[test]
    fn empty_timeline_maps_everything_to_zero() {
        let vt = VirtualTimeline::from_spans(&[]);
        assert_eq!(vt.total_duration(), 0.0);
        assert_eq!(vt.to_virtual_time(3.0), 0.0);
        assert_eq!(vt.to_source_time(3.0), 0.0);
    }
}
