//! Per-Track Mute Sections
//!
//! One muted/unmuted partition per track, keyed by track file name and
//! fully independent: an edit on one track never touches another. Shares
//! the arrangement's minimum-beat split policy.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sl_core::{SlError, SlResult, TempoMap};

use crate::arrangement::{split_respects_min_length, validate_partition};
use crate::partition::{Partition, Segment};

// ═══════════════════════════════════════════════════════════════════════════════
// MUTE SECTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// All tracks' mute partitions for the current song.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MuteSections {
    tracks: HashMap<String, Partition<bool>>,
}

impl MuteSections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditionally replace the track's partition with a single unmuted
    /// segment.
    pub fn reset(&mut self, track_id: &str, duration: f64) {
        self.tracks
            .insert(track_id.to_string(), Partition::new(duration, false));
    }

    /// Create the track's partition only if none exists yet, so user edits
    /// survive a duration re-detection.
    pub fn initialize_if_missing(&mut self, track_id: &str, duration: f64) {
        self.tracks
            .entry(track_id.to_string())
            .or_insert_with(|| Partition::new(duration, false));
    }

    pub fn contains(&self, track_id: &str) -> bool {
        self.tracks.contains_key(track_id)
    }

    pub fn remove(&mut self, track_id: &str) {
        self.tracks.remove(track_id);
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn track_ids(&self) -> impl Iterator<Item = &str> {
        self.tracks.keys().map(String::as_str)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Editing (per track)
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn split_at(&mut self, track_id: &str, time: f64, tempo: &TempoMap) -> bool {
        match self.tracks.get_mut(track_id) {
            Some(partition) if split_respects_min_length(partition, time, tempo) => {
                partition.split_at(time)
            }
            _ => false,
        }
    }

    pub fn merge_at(&mut self, track_id: &str, time: f64) -> bool {
        self.tracks
            .get_mut(track_id)
            .is_some_and(|p| p.merge_at(time))
    }

    pub fn move_boundary(&mut self, track_id: &str, time: f64, new_time: f64) -> bool {
        self.tracks
            .get_mut(track_id)
            .is_some_and(|p| p.move_boundary(time, new_time))
    }

    pub fn toggle(&mut self, track_id: &str, index: usize) -> bool {
        self.tracks
            .get_mut(track_id)
            .is_some_and(|p| p.toggle(index))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────────

    /// Whether the track is muted at `t`; unknown tracks are unmuted.
    pub fn is_muted_at(&self, track_id: &str, t: f64) -> bool {
        self.tracks
            .get(track_id)
            .and_then(|p| p.segment_at(t))
            .is_some_and(|s| s.label)
    }

    pub fn sections(&self, track_id: &str) -> Option<&[Segment<bool>]> {
        self.tracks.get(track_id).map(|p| p.segments())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Persisted shape
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn to_doc(&self) -> MuteSetDoc {
        MuteSetDoc {
            tracks: self
                .tracks
                .iter()
                .map(|(id, partition)| {
                    let ranges = partition
                        .segments()
                        .iter()
                        .map(|s| MuteRangeDoc {
                            start: s.start,
                            end: s.end,
                            muted: s.label,
                        })
                        .collect();
                    (id.clone(), ranges)
                })
                .collect(),
        }
    }

    pub fn from_doc(doc: &MuteSetDoc) -> SlResult<Self> {
        let mut tracks = HashMap::with_capacity(doc.tracks.len());
        for (id, ranges) in &doc.tracks {
            let segments: Vec<Segment<bool>> = ranges
                .iter()
                .map(|r| Segment {
                    start: r.start,
                    end: r.end,
                    label: r.muted,
                })
                .collect();
            let duration = validate_partition(&segments)?;
            tracks.insert(id.clone(), Partition::from_segments(duration, segments));
        }
        Ok(Self { tracks })
    }

    pub fn to_json(&self) -> SlResult<String> {
        serde_json::to_string(&self.to_doc()).map_err(|e| SlError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> SlResult<Self> {
        let doc: MuteSetDoc =
            serde_json::from_str(json).map_err(|e| SlError::Serialization(e.to_string()))?;
        Self::from_doc(&doc)
    }
}

/// Persisted mute set shape:
/// `{ "tracks": { "<trackFileName>": [{start, end, muted}] } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MuteSetDoc {
    pub tracks: HashMap<String, Vec<MuteRangeDoc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MuteRangeDoc {
    pub start: f64,
    pub end: f64,
    pub muted: bool,
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use sl_core::TempoChange;

    fn tempo() -> TempoMap {
        TempoMap::with_changes(vec![TempoChange::new(0.0, 120.0)], vec![])
    }

    #[test]
    fn mute_edit_scenario() {
        let tempo = tempo();
        let mut mutes = MuteSections::new();
        mutes.reset("drums.wav", 50.0);

        assert!(mutes.split_at("drums.wav", 10.0, &tempo));
        assert!(mutes.toggle("drums.wav", 1));
        let sections = mutes.sections("drums.wav").unwrap();
        assert_eq!(sections[0], Segment { start: 0.0, end: 10.0, label: false });
        assert_eq!(sections[1], Segment { start: 10.0, end: 50.0, label: true });
        assert!(mutes.is_muted_at("drums.wav", 12.0));

        assert!(mutes.move_boundary("drums.wav", 10.0, 15.0));
        let sections = mutes.sections("drums.wav").unwrap();
        assert_eq!(sections[0].end, 15.0);
        assert!(!mutes.is_muted_at("drums.wav", 12.0));
        assert!(mutes.is_muted_at("drums.wav", 20.0));
    }

    #[test]
    fn tracks_are_independent() {
        let tempo = tempo();
        let mut mutes = MuteSections::new();
        mutes.reset("bass.wav", 40.0);
        mutes.reset("keys.wav", 40.0);

        assert!(mutes.split_at("bass.wav", 20.0, &tempo));
        assert!(mutes.toggle("bass.wav", 0));

        assert!(mutes.is_muted_at("bass.wav", 5.0));
        assert!(!mutes.is_muted_at("keys.wav", 5.0));
        assert_eq!(mutes.sections("keys.wav").unwrap().len(), 1);
    }

    #[test]
    fn initialize_if_missing_preserves_edits() {
        let tempo = tempo();
        let mut mutes = MuteSections::new();
        mutes.initialize_if_missing("vox.wav", 30.0);
        assert!(mutes.split_at("vox.wav", 10.0, &tempo));
        assert!(mutes.toggle("vox.wav", 0));

        // Duration re-detection must not wipe the user's edits...
        mutes.initialize_if_missing("vox.wav", 30.0);
        assert_eq!(mutes.sections("vox.wav").unwrap().len(), 2);
        assert!(mutes.is_muted_at("vox.wav", 3.0));

        // ...but an explicit reset does.
        mutes.reset("vox.wav", 30.0);
        assert_eq!(mutes.sections("vox.wav").unwrap().len(), 1);
        assert!(!mutes.is_muted_at("vox.wav", 3.0));
    }

    #[test]
    fn edits_on_unknown_tracks_are_no_ops() {
        let tempo = tempo();
        let mut mutes = MuteSections::new();
        assert!(!mutes.split_at("ghost.wav", 10.0, &tempo));
        assert!(!mutes.merge_at("ghost.wav", 10.0));
        assert!(!mutes.toggle("ghost.wav", 0));
        assert!(!mutes.is_muted_at("ghost.wav", 10.0));
    }

    #[test]
    fn document_round_trip() {
        let tempo = tempo();
        let mut mutes = MuteSections::new();
        mutes.reset("drums.wav", 50.0);
        mutes.reset("bass.wav", 50.0);
        mutes.split_at("drums.wav", 25.0, &tempo);
        mutes.toggle("drums.wav", 1);

        let json = mutes.to_json().unwrap();
        let restored = MuteSections::from_json(&json).unwrap();
        assert_eq!(restored, mutes);

        let doc: MuteSetDoc = serde_json::from_str(&json).unwrap();
        assert_eq!(doc.tracks["drums.wav"].len(), 2);
        assert!(doc.tracks["drums.wav"][1].muted);
        assert_eq!(doc.tracks["bass.wav"].len(), 1);
    }
}
