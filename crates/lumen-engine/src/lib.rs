//! Lumen Engine -- fixed-step simulation wiring pools, physics, and navigation.
//!
//! Entities are issued from per-category [`SlotPool`](lumen_pool::pool::SlotPool)s
//! and simulated by a rapier2d [`PhysicsWorld`](physics::PhysicsWorld). After
//! every physics step the [`NavGrid`](lumen_nav::grid::NavGrid) is rebuilt from
//! the physics world, so path requests always see where bodies are and which
//! way they are moving.

#![deny(unsafe_code)]

pub mod physics;
pub mod tick;

use lumen_nav::NavError;
use lumen_pool::prelude::{Category, Handle};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the simulation driver.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The fixed timestep was zero, negative, or not finite.
    #[error("fixed_dt must be positive and finite, got {0}")]
    InvalidTimestep(f32),

    /// Entities cannot be spawned for this category.
    #[error("no pool for category {0}")]
    InvalidCategory(Category),

    /// The handle no longer names a live entity.
    #[error("stale or unknown handle {0}")]
    StaleHandle(Handle),

    #[error(transparent)]
    Nav(#[from] NavError),

    /// A configuration document could not be parsed.
    #[error("invalid simulation config: {0}")]
    Config(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::physics::{ColliderShape, PhysicsBody, PhysicsBodyType, PhysicsWorld};
    pub use crate::tick::{BodyRecord, SimConfig, Simulation, TickDiagnostics};
    pub use crate::EngineError;
    pub use lumen_nav::prelude::*;
    pub use lumen_pool::prelude::*;
}
