//! Collision query boundary.
//!
//! The navigation grid never talks to a physics engine directly. Each refresh
//! it asks a [`ColliderQuery`] for every collider overlapping the grid, and
//! each reported [`ColliderSample`] carries the collider's world bounds plus,
//! when a rigid body is attached, its mass and positional delta over the last
//! physics step.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::bounds::Bounds2D;

// ---------------------------------------------------------------------------
// LayerMask
// ---------------------------------------------------------------------------

/// Bitmask of collision layers. A collider is reported when its layers
/// intersect the query's mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: LayerMask = LayerMask(u32::MAX);
    pub const NONE: LayerMask = LayerMask(0);

    /// Mask with only layer `n` (0..32) set.
    pub const fn layer(n: u32) -> LayerMask {
        LayerMask(1 << n)
    }

    pub const fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn union(self, other: LayerMask) -> LayerMask {
        LayerMask(self.0 | other.0)
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

// ---------------------------------------------------------------------------
// Samples
// ---------------------------------------------------------------------------

/// Rigid-body state attached to a collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySample {
    /// Body mass.
    pub mass: f32,
    /// World-space translation change over the previous physics step.
    pub delta: Vec2,
}

/// One collider overlapping a queried area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderSample {
    /// World-space bounding rectangle.
    pub bounds: Bounds2D,
    /// Layers the collider belongs to.
    pub layers: LayerMask,
    /// Attached rigid body, if any. Colliders without one are always blocking.
    pub body: Option<BodySample>,
}

impl ColliderSample {
    /// A collider with no rigid body on every layer.
    pub fn fixed(bounds: Bounds2D) -> Self {
        Self {
            bounds,
            layers: LayerMask::ALL,
            body: None,
        }
    }

    /// A collider attached to a body of `mass` that moved by `delta`.
    pub fn moving(bounds: Bounds2D, mass: f32, delta: Vec2) -> Self {
        Self {
            bounds,
            layers: LayerMask::ALL,
            body: Some(BodySample { mass, delta }),
        }
    }

    pub fn with_layers(mut self, layers: LayerMask) -> Self {
        self.layers = layers;
        self
    }
}

// ---------------------------------------------------------------------------
// ColliderQuery
// ---------------------------------------------------------------------------

/// Provider of colliders for [`NavGrid::refresh`](crate::grid::NavGrid::refresh).
pub trait ColliderQuery {
    /// Append every collider on `layers` whose bounds overlap `area` to `out`.
    ///
    /// Implementations must not clear `out`.
    fn overlap_area(&self, area: &Bounds2D, layers: LayerMask, out: &mut Vec<ColliderSample>);
}

/// A fixed snapshot of colliders, filtered by overlap and layer.
impl ColliderQuery for [ColliderSample] {
    fn overlap_area(&self, area: &Bounds2D, layers: LayerMask, out: &mut Vec<ColliderSample>) {
        out.extend(
            self.iter()
                .filter(|s| s.layers.intersects(layers) && s.bounds.overlaps(area))
                .copied(),
        );
    }
}

impl ColliderQuery for Vec<ColliderSample> {
    fn overlap_area(&self, area: &Bounds2D, layers: LayerMask, out: &mut Vec<ColliderSample>) {
        self.as_slice().overlap_area(area, layers, out);
    }
}

impl<Q: ColliderQuery + ?Sized> ColliderQuery for &Q {
    fn overlap_area(&self, area: &Bounds2D, layers: LayerMask, out: &mut Vec<ColliderSample>) {
        (**self).overlap_area(area, layers, out);
    }
}
