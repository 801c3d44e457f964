//! Precomputed Beat Positions
//!
//! Full beat-event list over a source or virtual duration, built with the
//! same forward walk as [`TempoMap::beats_in_range`] plus drift control:
//! whenever an accumulated beat lands within [`DRIFT_EPSILON`] of an exact
//! tempo-change instant, the accumulator snaps to that instant, so
//! floating-point error cannot build up across a long song.
//!
//! Caches are rebuilt wholesale whenever their inputs change; they are never
//! patched in place.

use crate::tempo::{BeatEvent, TempoMap};
use crate::virtual_timeline::VirtualTimeline;

/// Snap tolerance around tempo-change instants, in seconds
pub const DRIFT_EPSILON: f64 = 0.001;

/// Hard cap on cached beats; degrades to a truncated ruler on bad metadata
pub const MAX_CACHED_BEATS: usize = 10_000;

/// Drift-controlled, ordered beat-event list over a fixed duration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeatCache {
    events: Vec<BeatEvent>,
}

impl BeatCache {
    /// Beats over `[0, duration)` of the native track timeline.
    pub fn for_source(duration: f64, map: &TempoMap) -> Self {
        let snaps: Vec<f64> = map.tempo_changes().iter().map(|c| c.start).collect();
        Self {
            events: map.walk_beats(0.0, duration, MAX_CACHED_BEATS, &snaps, |t| t),
        }
    }

    /// Beats over a virtual timeline, numbered from virtual time 0.
    ///
    /// Tempo and signature at virtual time `v` are whatever is in effect at
    /// `to_source_time(v)`; tempo-change instants are mapped into virtual
    /// time before they become snap targets.
    pub fn for_virtual(map: &TempoMap, timeline: &VirtualTimeline) -> Self {
        let snaps: Vec<f64> = map
            .tempo_changes()
            .iter()
            .map(|c| timeline.to_virtual_time(c.start))
            .collect();
        Self {
            events: map.walk_beats(0.0, timeline.total_duration(), MAX_CACHED_BEATS, &snaps, |v| {
                timeline.to_source_time(v)
            }),
        }
    }

    pub fn events(&self) -> &[BeatEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Cached beat closest to `t`; the earlier beat wins a tie.
    pub fn nearest(&self, t: f64) -> Option<&BeatEvent> {
        let mut best: Option<&BeatEvent> = None;
        for event in &self.events {
            match best {
                Some(b) if (event.time - t).abs() >= (b.time - t).abs() => {}
                _ => best = Some(event),
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tempo::{TempoChange, TimeSigChange, TimeSignature};
    use crate::virtual_timeline::SourceSpan;
    use approx::assert_abs_diff_eq;

    #[test]
    fn source_cache_matches_range_walk() {
        let map = TempoMap::with_changes(
            vec![TempoChange::new(0.0, 120.0)],
            vec![TimeSigChange::new(0.0, TimeSignature::new(4, 4))],
        );
        let cache = BeatCache::for_source(8.0, &map);
        assert_eq!(cache.events(), &map.beats_in_range(0.0, 8.0)[..]);
        assert_eq!(cache.len(), 16);
    }

    #[test]
    fn accumulator_snaps_to_tempo_change_instants() {
        // The change at 0.5005 is within the drift tolerance of the beat
        // accumulated at 0.5, so the beat lands exactly on the change and
        // already carries the new tempo.
        let map = TempoMap::with_changes(
            vec![TempoChange::new(0.0, 120.0), TempoChange::new(0.5005, 60.0)],
            vec![],
        );
        let cache = BeatCache::for_source(4.0, &map);
        let second = cache.events()[1];
        assert_eq!(second.time, 0.5005);
        assert_eq!(second.tempo, 60.0);
        // Subsequent beats walk on from the exact instant.
        assert_abs_diff_eq!(cache.events()[2].time, 1.5005, epsilon = 1e-9);
    }

    #[test]
    fn change_instants_outside_tolerance_do_not_snap() {
        let map = TempoMap::with_changes(
            vec![TempoChange::new(0.0, 120.0), TempoChange::new(0.7, 60.0)],
            vec![],
        );
        let cache = BeatCache::for_source(3.0, &map);
        assert_eq!(cache.events()[1].time, 0.5);
        assert_eq!(cache.events()[1].tempo, 120.0);
        // First beat past the change picks up the new tempo.
        assert_eq!(cache.events()[2].time, 1.0);
        assert_eq!(cache.events()[2].tempo, 60.0);
    }

    #[test]
    fn virtual_cache_renumbers_from_zero() {
        // Skip source 10..20; a tempo change at source 25 appears at
        // virtual 15.
        let map = TempoMap::with_changes(
            vec![TempoChange::new(0.0, 120.0), TempoChange::new(25.0, 60.0)],
            vec![],
        );
        let vt = VirtualTimeline::from_spans(&[SourceSpan::new(0.0, 10.0), SourceSpan::new(20.0, 30.0)]);
        let cache = BeatCache::for_virtual(&map, &vt);

        let first = cache.events()[0];
        assert_eq!(first.time, 0.0);
        assert_eq!(first.measure, 1);
        assert_eq!(first.beat, 1);

        // 0.5 s beats until virtual 15 (source 25), 1.0 s beats after.
        let at_change = cache.events().iter().find(|e| e.time == 15.0).unwrap();
        assert_eq!(at_change.tempo, 60.0);
        let after = cache.events().iter().find(|e| e.time > 15.0).unwrap();
        assert_abs_diff_eq!(after.time, 16.0);

        // 30 half-second beats, then 5 one-second beats in [15, 20).
        assert_eq!(cache.len(), 35);
    }

    #[test]
    fn beats_shorter_than_the_snap_tolerance_stay_monotonic() {
        // With a beat far shorter than DRIFT_EPSILON, the change instant at
        // 0.5 sits within tolerance of every subsequent beat; the walk must
        // keep moving forward instead of pinning repeated beats there.
        let map = TempoMap::with_changes(
            vec![TempoChange::new(0.0, 120.0), TempoChange::new(0.5, 1.0e9)],
            vec![],
        );
        let cache = BeatCache::for_source(1.0, &map);
        assert_eq!(cache.len(), MAX_CACHED_BEATS);
        for pair in cache.events().windows(2) {
            assert!(pair[0].time < pair[1].time);
        }
    }

    #[test]
    fn cache_is_capped() {
        let map = TempoMap::with_changes(vec![TempoChange::new(0.0, 1.0e9)], vec![]);
        let cache = BeatCache::for_source(60.0, &map);
        assert_eq!(cache.len(), MAX_CACHED_BEATS);
    }

    #[test]
    fn nearest_prefers_earlier_on_tie() {
        let map = TempoMap::new();
        let cache = BeatCache::for_source(4.0, &map);
        assert_eq!(cache.nearest(0.25).unwrap().time, 0.0);
        assert_eq!(cache.nearest(0.3).unwrap().time, 0.5);
        assert!(BeatCache::default().nearest(1.0).is_none());
    }
}
