//! Per-cell navigation state.
//!
//! A [`NavNode`] aggregates every collider overlapping one grid cell: the
//! number of blocking (static or slow) colliders, and the summed scaled
//! momentum of the moving ones. Momentum is stored as integers after scaling
//! by [`MOMENTUM_SCALE`] so comparisons in the pathfinder stay cheap.

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::query::{BodySample, ColliderSample};

/// Multiplier from physical momentum (mass * positional delta) to the grid's
/// integer representation.
pub const MOMENTUM_SCALE: f32 = 10.0;

/// A body is considered moving when its positional delta over one step
/// exceeds `fixed_dt * MOVING_THRESHOLD_FACTOR`.
pub const MOVING_THRESHOLD_FACTOR: f32 = 1.69;

/// Aggregate of the colliders overlapping one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NavNode {
    /// Combined scaled momentum of non-blocking colliders.
    pub momentum: IVec2,
    /// Number of blocking colliders. Positive means impassable.
    pub blocking: i32,
}

impl NavNode {
    pub const ZERO: NavNode = NavNode {
        momentum: IVec2::ZERO,
        blocking: 0,
    };

    /// A single immovable obstacle.
    pub const fn blocking() -> Self {
        Self {
            momentum: IVec2::ZERO,
            blocking: 1,
        }
    }

    pub const fn from_momentum(momentum: IVec2) -> Self {
        Self {
            momentum,
            blocking: 0,
        }
    }

    /// Node contributed by a body moving at `delta` per step, or a blocking
    /// node when there is no body or it moved less than the threshold.
    pub fn from_body(body: Option<&BodySample>, fixed_dt: f32) -> Self {
        let threshold = fixed_dt * MOVING_THRESHOLD_FACTOR;
        match body {
            Some(body) if threshold * threshold < body.delta.length_squared() => {
                let scaled: Vec2 = body.delta * body.mass * MOMENTUM_SCALE;
                Self::from_momentum(scaled.round().as_ivec2())
            }
            _ => Self::blocking(),
        }
    }

    pub fn from_collider(sample: &ColliderSample, fixed_dt: f32) -> Self {
        Self::from_body(sample.body.as_ref(), fixed_dt)
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking > 0
    }

    /// Predicted momentum if `other` were added to this cell, still in scaled
    /// units. Zero whenever either side is blocking: momentum never outweighs
    /// an immovable obstacle.
    pub fn combine_scaled_momentum(&self, other: &NavNode) -> IVec2 {
        if self.blocking > 0 || other.blocking > 0 {
            return IVec2::ZERO;
        }
        self.momentum + other.momentum
    }
}

impl Add for NavNode {
    type Output = NavNode;

    fn add(self, rhs: NavNode) -> NavNode {
        NavNode {
            momentum: self.momentum + rhs.momentum,
            blocking: self.blocking + rhs.blocking,
        }
    }
}

impl AddAssign for NavNode {
    fn add_assign(&mut self, rhs: NavNode) {
        self.momentum += rhs.momentum;
        self.blocking += rhs.blocking;
    }
}

impl Sub for NavNode {
    type Output = NavNode;

    fn sub(self, rhs: NavNode) -> NavNode {
        self + -rhs
    }
}

impl SubAssign for NavNode {
    fn sub_assign(&mut self, rhs: NavNode) {
        *self += -rhs;
    }
}

impl Neg for NavNode {
    type Output = NavNode;

    fn neg(self) -> NavNode {
        NavNode {
            momentum: -self.momentum,
            blocking: -self.blocking,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
