//! sl-state: Editable arrangement state for StemLine
//!
//! User-editable, invariant-preserving segmentation of an open song:
//! - Generic gapless interval partition (split/merge/move/toggle)
//! - Arrangement sections (enabled/disabled regions)
//! - Per-track mute sections
//! - Session root that owns metadata and rebuilds derived timelines
//! - The literal persisted JSON shapes for arrangements and mute sets

mod arrangement;
mod mute;
mod partition;
mod session;

pub use arrangement::*;
pub use mute::*;
pub use partition::*;
pub use session::*;
