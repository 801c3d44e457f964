//! sl-core: Tempo-aware timeline math for StemLine
//!
//! Pure, synchronous, allocation-light building blocks shared across the
//! StemLine crates:
//! - Tempo / time signature map with forward beat walk
//! - Drift-controlled beat position cache
//! - Virtual timeline (source ↔ listener time remapping)
//! - Pixel ↔ time viewport conversion
//!
//! Nothing here performs I/O or owns mutable global state; callers
//! recompute derived structures after every edit instead of patching them.

mod beat_cache;
mod error;
mod tempo;
mod viewport;
mod virtual_timeline;

pub use beat_cache::*;
pub use error::*;
pub use tempo::*;
pub use viewport::*;
pub use virtual_timeline::*;
