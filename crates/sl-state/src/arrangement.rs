//! Arrangement Sections
//!
//! A track's duration partitioned into enabled/disabled sections. Splits are
//! additionally guarded by a minimum length in whole beats, measured via the
//! tempo map at the candidate split point, so a section can never get
//! shorter than one beat of the local grid.
//!
//! The timeline-based model here is canonical; the older index-based
//! "custom arrangement" (an ordered selection of marker-derived sections)
//! is supported as a one-way import into source spans only.

use serde::{Deserialize, Serialize};
use sl_core::{SlError, SlResult, SourceSpan, TempoMap};

use crate::partition::{Partition, Segment};

/// Minimum section length for splits, in whole beats
pub const MIN_SPLIT_BEATS: f64 = 1.0;

// ═══════════════════════════════════════════════════════════════════════════════
// ARRANGEMENT SECTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Gapless enabled/disabled partition of a song's duration.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrangementSections {
    sections: Partition<bool>,
}

impl ArrangementSections {
    /// One enabled section covering the whole duration.
    pub fn new(duration: f64) -> Self {
        Self {
            sections: Partition::new(duration, true),
        }
    }

    pub fn duration(&self) -> f64 {
        self.sections.duration()
    }

    pub fn sections(&self) -> &[Segment<bool>] {
        self.sections.segments()
    }

    pub fn boundary_times(&self) -> Vec<f64> {
        self.sections.boundary_times()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Editing
    // ─────────────────────────────────────────────────────────────────────────────

    /// Split at `time`, rejecting the split if either resulting section
    /// would be shorter than [`MIN_SPLIT_BEATS`] of the local beat grid.
    pub fn split_at(&mut self, time: f64, tempo: &TempoMap) -> bool {
        if !split_respects_min_length(&self.sections, time, tempo) {
            return false;
        }
        self.sections.split_at(time)
    }

    /// See [`Partition::merge_at`]: keeps the earlier section's flag.
    pub fn merge_at(&mut self, time: f64) -> bool {
        self.sections.merge_at(time)
    }

    /// See [`Partition::move_boundary`].
    pub fn move_boundary(&mut self, time: f64, new_time: f64) -> bool {
        self.sections.move_boundary(time, new_time)
    }

    /// Enable/disable the section at `index`.
    pub fn toggle(&mut self, index: usize) -> bool {
        self.sections.toggle(index)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn section_at_time(&self, t: f64) -> Option<&Segment<bool>> {
        self.sections.segment_at(t)
    }

    /// First enabled section starting strictly after `t`.
    pub fn next_enabled_section_after(&self, t: f64) -> Option<&Segment<bool>> {
        self.sections.segments().iter().find(|s| s.start > t && s.label)
    }

    /// First enabled section still in progress (or later) at `t`: where
    /// playback resumes when `t` sits inside a disabled range.
    pub fn first_enabled_section_at_or_after(&self, t: f64) -> Option<&Segment<bool>> {
        self.sections.segments().iter().find(|s| s.end > t && s.label)
    }

    /// Whether any section is disabled; gates the "has edits" affordances.
    pub fn has_disabled_sections(&self) -> bool {
        self.sections.segments().iter().any(|s| !s.label)
    }

    pub fn has_multiple_sections(&self) -> bool {
        self.sections.len() > 1
    }

    /// Enabled sections, in source order, as spans for the virtual timeline.
    pub fn enabled_spans(&self) -> Vec<SourceSpan> {
        self.sections
            .segments()
            .iter()
            .filter(|s| s.label)
            .map(|s| SourceSpan::new(s.start, s.end))
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Persisted shape
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn to_doc(&self) -> ArrangementDoc {
        ArrangementDoc {
            sections: self
                .sections
                .segments()
                .iter()
                .map(|s| SectionDoc {
                    start: s.start,
                    end: s.end,
                    enabled: s.label,
                })
                .collect(),
        }
    }

    /// Rebuild from a persisted document. The document must describe a
    /// valid partition: non-empty, starting at 0, contiguous, ascending.
    pub fn from_doc(doc: &ArrangementDoc) -> SlResult<Self> {
        let segments: Vec<Segment<bool>> = doc
            .sections
            .iter()
            .map(|s| Segment {
                start: s.start,
                end: s.end,
                label: s.enabled,
            })
            .collect();
        let duration = validate_partition(&segments)?;
        Ok(Self {
            sections: Partition::from_segments(duration, segments),
        })
    }

    pub fn to_json(&self) -> SlResult<String> {
        serde_json::to_string(&self.to_doc()).map_err(|e| SlError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> SlResult<Self> {
        let doc: ArrangementDoc =
            serde_json::from_str(json).map_err(|e| SlError::Serialization(e.to_string()))?;
        Self::from_doc(&doc)
    }
}

/// Persisted arrangement shape: `{ "sections": [{start, end, enabled}] }`.
/// Round-tripped verbatim; the storage mechanism is external.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrangementDoc {
    pub sections: Vec<SectionDoc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionDoc {
    pub start: f64,
    pub end: f64,
    pub enabled: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED EDIT POLICY
// ═══════════════════════════════════════════════════════════════════════════════

/// Minimum-beat-length guard shared by arrangement and mute splits.
pub(crate) fn split_respects_min_length(
    partition: &Partition<bool>,
    time: f64,
    tempo: &TempoMap,
) -> bool {
    let Some(segment) = partition.segment_at(time) else {
        return false;
    };
    let min_length = MIN_SPLIT_BEATS * tempo.seconds_per_beat_at(time);
    time - segment.start >= min_length && segment.end - time >= min_length
}

/// Validate a persisted segment list and return its duration.
pub(crate) fn validate_partition<L>(segments: &[Segment<L>]) -> SlResult<f64> {
    let Some(first) = segments.first() else {
        return Err(SlError::InvalidParam("empty section list".into()));
    };
    if first.start != 0.0 {
        return Err(SlError::InvalidParam("sections must start at 0".into()));
    }
    let mut end = first.start;
    for segment in segments {
        if segment.start != end || segment.end <= segment.start {
            return Err(SlError::InvalidParam(format!(
                "non-contiguous section at {}",
                segment.start
            )));
        }
        end = segment.end;
    }
    Ok(end)
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEGACY INDEX-BASED ARRANGEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Legacy "custom arrangement": an ordered selection of marker-derived
/// section indices. Imported once into source spans; never edited in this
/// form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyArrangementDoc {
    /// Section boundaries (markers), ascending, including 0 and duration
    pub markers: Vec<f64>,
    /// Selected section indices, in playback order (repeats allowed)
    pub order: Vec<usize>,
}

/// Convert a legacy index-based arrangement into ordered source spans.
/// Out-of-range indices are dropped with a warning.
pub fn legacy_arrangement_spans(doc: &LegacyArrangementDoc) -> Vec<SourceSpan> {
    let mut spans = Vec::with_capacity(doc.order.len());
    for &index in &doc.order {
        match (doc.markers.get(index), doc.markers.get(index + 1)) {
            (Some(&start), Some(&end)) if end > start => {
                spans.push(SourceSpan::new(start, end));
            }
            _ => log::warn!("legacy arrangement references missing section {index}"),
        }
    }
    spans
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use sl_core::{TempoChange, TimeSigChange, TimeSignature};

    fn default_tempo() -> TempoMap {
        TempoMap::with_changes(
            vec![TempoChange::new(0.0, 120.0)],
            vec![TimeSigChange::new(0.0, TimeSignature::new(4, 4))],
        )
    }

    #[test]
    fn split_and_merge_round_trip() {
        let tempo = default_tempo();
        let mut arr = ArrangementSections::new(100.0);
        assert!(arr.split_at(40.0, &tempo));
        assert_eq!(arr.sections().len(), 2);
        assert!(arr.sections().iter().all(|s| s.label));
        assert!(arr.merge_at(40.0));
        assert_eq!(arr.sections().len(), 1);
        assert_eq!(arr.sections()[0].end, 100.0);
    }

    #[test]
    fn split_too_close_to_a_boundary_is_rejected() {
        // One beat at 120 BPM in 4/4 is 0.5 s.
        let tempo = default_tempo();
        let mut arr = ArrangementSections::new(100.0);
        assert!(!arr.split_at(0.4, &tempo));
        assert!(!arr.split_at(99.7, &tempo));
        assert!(arr.split_at(0.5, &tempo));
        assert!(!arr.split_at(0.75, &tempo));
        assert!(arr.split_at(1.0, &tempo));
    }

    #[test]
    fn min_split_length_follows_the_local_grid() {
        // 60 BPM in 4/4: one beat is a full second.
        let tempo = TempoMap::with_changes(vec![TempoChange::new(0.0, 60.0)], vec![]);
        let mut arr = ArrangementSections::new(100.0);
        assert!(!arr.split_at(0.6, &tempo));
        assert!(arr.split_at(1.0, &tempo));
    }

    #[test]
    fn playback_queries_skip_disabled_sections() {
        let tempo = default_tempo();
        let mut arr = ArrangementSections::new(100.0);
        arr.split_at(20.0, &tempo);
        arr.split_at(60.0, &tempo);
        arr.toggle(1); // disable 20..60
        assert!(arr.has_disabled_sections());
        assert!(arr.has_multiple_sections());

        assert!(!arr.section_at_time(30.0).unwrap().label);
        assert_eq!(arr.next_enabled_section_after(10.0).unwrap().start, 60.0);
        // Inside the disabled range playback resumes at 60.
        assert_eq!(arr.first_enabled_section_at_or_after(30.0).unwrap().start, 60.0);
        // Inside an enabled section, that section is still the answer.
        assert_eq!(arr.first_enabled_section_at_or_after(5.0).unwrap().start, 0.0);

        assert_eq!(
            arr.enabled_spans(),
            vec![SourceSpan::new(0.0, 20.0), SourceSpan::new(60.0, 100.0)]
        );
    }

    #[test]
    fn document_round_trip_is_verbatim() {
        let tempo = default_tempo();
        let mut arr = ArrangementSections::new(90.0);
        arr.split_at(30.0, &tempo);
        arr.toggle(0);

        let json = arr.to_json().unwrap();
        let restored = ArrangementSections::from_json(&json).unwrap();
        assert_eq!(restored, arr);

        let doc: ArrangementDoc = serde_json::from_str(&json).unwrap();
        assert_eq!(
            doc.sections,
            vec![
                SectionDoc {
                    start: 0.0,
                    end: 30.0,
                    enabled: false
                },
                SectionDoc {
                    start: 30.0,
                    end: 90.0,
                    enabled: true
                },
            ]
        );
    }

    #[test]
    fn invalid_documents_are_rejected() {
        assert!(ArrangementSections::from_json(r#"{"sections":[]}"#).is_err());
        assert!(
            ArrangementSections::from_json(
                r#"{"sections":[{"start":0.0,"end":10.0,"enabled":true},
                               {"start":12.0,"end":20.0,"enabled":true}]}"#
            )
            .is_err()
        );
        assert!(
            ArrangementSections::from_json(
                r#"{"sections":[{"start":5.0,"end":10.0,"enabled":true}]}"#
            )
            .is_err()
        );
    }

    #[test]
    fn legacy_import_produces_ordered_spans() {
        let doc = LegacyArrangementDoc {
            markers: vec![0.0, 10.0, 20.0, 30.0],
            order: vec![2, 0, 2, 9],
        };
        assert_eq!(
            legacy_arrangement_spans(&doc),
            vec![
                SourceSpan::new(20.0, 30.0),
                SourceSpan::new(0.0, 10.0),
                SourceSpan::new(20.0, 30.0),
            ]
        );
    }
}
