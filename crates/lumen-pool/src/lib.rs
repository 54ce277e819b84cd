//! Lumen Pool -- generational slot storage with typed handles.
//!
//! Every entity collection in the game (units, projectiles, pickups, light
//! crystals) lives in a [`SlotPool`](pool::SlotPool). Pools hand out
//! [`Handle`](handle::Handle)s carrying a category, slot index and generation;
//! a handle held across a despawn stops validating even if the slot has been
//! reused.
//!
//! # Quick Start
//!
//! ```
//! use lumen_pool::prelude::*;
//!
//! let mut crystals: SlotPool<f32> = SlotPool::new(Category::LightCrystal);
//! let a = crystals.spawn_with(1.5);
//! assert!(crystals.is_valid(a));
//!
//! assert_eq!(crystals.despawn(a), Some(1.5));
//! assert!(!crystals.is_valid(a));
//!
//! // The freed slot is reused, under a new generation.
//! let b = crystals.spawn_with(2.0);
//! assert_eq!(b.index(), a.index());
//! assert_ne!(b, a);
//! ```

#![deny(unsafe_code)]

pub mod handle;
pub mod pool;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::handle::{Category, Handle};
    pub use crate::pool::{OccupiedIndices, SlotPool};
}
