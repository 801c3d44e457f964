//! Song Session
//!
//! Explicit state root owned by the application for one open song: tempo
//! metadata, the arrangement partition, per-track mute partitions, and the
//! derived virtual timeline + beat cache. No event bus: callers mutate
//! through commands and read the recomputed results.
//!
//! Derived structures are pull-based and idempotent: every successful
//! arrangement edit rebuilds them wholesale rather than patching, which
//! trades a little recomputation for the elimination of staleness bugs.
//! Mutations are not internally synchronized; the application serializes
//! edits (single writer per session).

use serde::{Deserialize, Serialize};
use sl_core::{BeatCache, BeatEvent, SongMeta, TempoMap, VirtualTimeline};

use crate::arrangement::ArrangementSections;
use crate::mute::MuteSections;

// ═══════════════════════════════════════════════════════════════════════════════
// EDIT COMMANDS
// ═══════════════════════════════════════════════════════════════════════════════

/// A section edit gesture, with times already converted from pixels by the
/// rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EditCommand {
    Split { time: f64 },
    Merge { time: f64 },
    MoveBoundary { time: f64, new_time: f64 },
    Toggle { index: usize },
}

// ═══════════════════════════════════════════════════════════════════════════════
// SESSION
// ═══════════════════════════════════════════════════════════════════════════════

/// State root for one open song.
#[derive(Debug, Clone)]
pub struct Session {
    duration: f64,
    tempo_map: TempoMap,
    arrangement: ArrangementSections,
    mutes: MuteSections,
    virtual_timeline: VirtualTimeline,
    beat_cache: BeatCache,
}

impl Session {
    /// Open a song whose duration has just become known.
    pub fn new(duration: f64, meta: &SongMeta) -> Self {
        let tempo_map = TempoMap::from_meta(meta);
        let arrangement = ArrangementSections::new(duration);
        let mut session = Self {
            duration,
            tempo_map,
            arrangement,
            mutes: MuteSections::new(),
            virtual_timeline: VirtualTimeline::default(),
            beat_cache: BeatCache::default(),
        };
        session.recompute_derived();
        session
    }

    /// Replace everything for a newly loaded song: metadata wholesale, a
    /// fresh full-duration arrangement, no mute partitions.
    pub fn load_song(&mut self, duration: f64, meta: &SongMeta) {
        *self = Self::new(duration, meta);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn tempo_map(&self) -> &TempoMap {
        &self.tempo_map
    }

    pub fn arrangement(&self) -> &ArrangementSections {
        &self.arrangement
    }

    pub fn mutes(&self) -> &MuteSections {
        &self.mutes
    }

    /// Listener-facing timeline over the enabled sections.
    pub fn virtual_timeline(&self) -> &VirtualTimeline {
        &self.virtual_timeline
    }

    /// Beats over the virtual timeline, for rulers and grid lines.
    pub fn beat_cache(&self) -> &BeatCache {
        &self.beat_cache
    }

    pub fn beat_events(&self) -> &[BeatEvent] {
        self.beat_cache.events()
    }

    /// Playhead translation into "what the listener hears" time.
    pub fn to_virtual_time(&self, source_time: f64) -> f64 {
        self.virtual_timeline.to_virtual_time(source_time)
    }

    pub fn to_source_time(&self, virtual_time: f64) -> f64 {
        self.virtual_timeline.to_source_time(virtual_time)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Track lifecycle
    // ─────────────────────────────────────────────────────────────────────────────

    /// Track duration detected: create its mute partition unless the user
    /// already edited one.
    pub fn track_detected(&mut self, track_id: &str) {
        self.mutes.initialize_if_missing(track_id, self.duration);
    }

    /// Wipe a track's mute edits.
    pub fn reset_track(&mut self, track_id: &str) {
        self.mutes.reset(track_id, self.duration);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Editing
    // ─────────────────────────────────────────────────────────────────────────────

    /// Apply an edit to the arrangement. On success the virtual timeline and
    /// beat cache are rebuilt before returning.
    pub fn apply_arrangement_edit(&mut self, command: EditCommand) -> bool {
        let applied = match command {
            EditCommand::Split { time } => self.arrangement.split_at(time, &self.tempo_map),
            EditCommand::Merge { time } => self.arrangement.merge_at(time),
            EditCommand::MoveBoundary { time, new_time } => {
                self.arrangement.move_boundary(time, new_time)
            }
            EditCommand::Toggle { index } => self.arrangement.toggle(index),
        };
        if applied {
            self.recompute_derived();
        }
        applied
    }

    /// Apply an edit to one track's mute partition. Mute state never feeds
    /// the virtual timeline, so nothing derived needs rebuilding.
    pub fn apply_mute_edit(&mut self, track_id: &str, command: EditCommand) -> bool {
        match command {
            EditCommand::Split { time } => self.mutes.split_at(track_id, time, &self.tempo_map),
            EditCommand::Merge { time } => self.mutes.merge_at(track_id, time),
            EditCommand::MoveBoundary { time, new_time } => {
                self.mutes.move_boundary(track_id, time, new_time)
            }
            EditCommand::Toggle { index } => self.mutes.toggle(track_id, index),
        }
    }

    /// Restore a persisted arrangement (already parsed); rebuilds derived
    /// structures.
    pub fn restore_arrangement(&mut self, arrangement: ArrangementSections) {
        self.arrangement = arrangement;
        self.recompute_derived();
    }

    /// Restore a persisted mute set (already parsed).
    pub fn restore_mutes(&mut self, mutes: MuteSections) {
        self.mutes = mutes;
    }

    fn recompute_derived(&mut self) {
        self.virtual_timeline = VirtualTimeline::from_spans(&self.arrangement.enabled_spans());
        self.beat_cache = BeatCache::for_virtual(&self.tempo_map, &self.virtual_timeline);
        log::debug!(
            "recomputed derived timeline: {} segments, {} beats",
            self.virtual_timeline.segments().len(),
            self.beat_cache.len()
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
