//! Lumen Nav -- dynamic navigation grid and momentum-aware pathfinding.
//!
//! The [`NavGrid`](grid::NavGrid) covers a bounded world rectangle with a
//! regular grid. Once per physics step it is rebuilt from a single bulk
//! [`ColliderQuery`](query::ColliderQuery): static and slow colliders make
//! their cells *blocking*, moving bodies add their scaled momentum. The
//! [`find_path`](pathfind::find_path) A* search then treats a cell as passable
//! when an agent pushing through it at full speed would still move along its
//! step, so crowds flowing the same way do not stop an agent but a crowd
//! coming the other way does.
//!
//! # Quick Start
//!
//! ```
//! use glam::{IVec2, Vec2};
//! use lumen_nav::prelude::*;
//!
//! let bounds = Bounds2D::new(Vec2::ZERO, Vec2::splat(10.0));
//! let mut grid = NavGrid::new(bounds, Vec2::ONE).unwrap();
//!
//! // One wall collider covering cell (1, 0).
//! let colliders = vec![ColliderSample::fixed(Bounds2D::new(
//!     Vec2::new(1.0, 0.0),
//!     Vec2::new(2.0, 1.0),
//! ))];
//! grid.refresh(&colliders, 1.0 / 60.0);
//!
//! let mut path = Vec::new();
//! let mut pathfinder = Pathfinder::new();
//! assert!(pathfinder.find_path(&grid, 1.0, Vec2::new(0.5, 0.5), Vec2::new(2.5, 0.5), &mut path));
//! assert!(!path.contains(&IVec2::new(1, 0)));
//! ```

#![deny(unsafe_code)]

pub mod bounds;
pub mod config;
pub mod grid;
pub mod node;
pub mod pathfind;
pub mod query;

use glam::Vec2;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while configuring navigation.
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    /// A cell dimension was zero, negative, or not finite.
    #[error("cell size must be positive and finite, got ({x}, {y})")]
    InvalidCellSize { x: f32, y: f32 },

    /// The grid bounds enclose no area.
    #[error("grid bounds must have positive area, got min {min:?} max {max:?}")]
    EmptyBounds { min: Vec2, max: Vec2 },

    /// The cell count does not fit the grid's index type.
    #[error("grid of {cols} x {rows} cells is too large")]
    GridTooLarge { cols: i32, rows: i32 },

    /// A configuration document could not be parsed.
    #[error("invalid navigation config: {0}")]
    Config(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::bounds::Bounds2D;
    pub use crate::config::NavConfig;
    pub use crate::grid::{NavGrid, NEIGHBOR_OFFSETS};
    pub use crate::node::{NavNode, MOMENTUM_SCALE, MOVING_THRESHOLD_FACTOR};
    pub use crate::pathfind::{find_path, iteration_budget, PathScratch, Pathfinder, SearchScore};
    pub use crate::query::{BodySample, ColliderQuery, ColliderSample, LayerMask};
    pub use crate::NavError;
}
