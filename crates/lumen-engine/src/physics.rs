//! rapier2d physics world feeding the navigation grid.
//!
//! The [`PhysicsWorld`] owns a rapier2d simulation whose bodies are keyed by
//! pool [`Handle`]s. Each step records how far every registered body moved,
//! which is exactly what the navigation grid needs to turn bodies into
//! momentum: [`PhysicsWorld`] implements [`ColliderQuery`], so
//! `grid.refresh(&physics, dt)` samples it directly.
//!
//! # Determinism
//!
//! rapier2d is compiled with `enhanced-determinism`. Bodies are tracked in a
//! `BTreeMap` keyed by handle and query results follow rapier's arena order, so
//! the same registrations and steps produce the same grid on the same platform.

use std::collections::{BTreeMap, HashMap};

use glam::Vec2;
use lumen_nav::prelude::{BodySample, Bounds2D, ColliderQuery, ColliderSample, LayerMask};
use lumen_pool::prelude::Handle;
use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Body descriptors
// ---------------------------------------------------------------------------

/// How rapier treats a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhysicsBodyType {
    /// Fully simulated by the solver.
    Dynamic,
    /// Driven by its velocity, ignores contacts.
    Kinematic,
    /// Immovable (walls, pillars).
    Static,
}

/// Collider shape, centered on the body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    /// Axis-aligned box with half-extents.
    Box { half_width: f32, half_height: f32 },
    /// Circle with radius.
    Circle { radius: f32 },
}

/// Everything needed to put an entity into the physics world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsBody {
    pub body_type: PhysicsBodyType,
    pub collider: ColliderShape,
    /// Mass used both by the solver and for momentum on the grid.
    pub mass: f32,
    /// Coefficient of restitution. 0.0 = no bounce, 1.0 = perfect bounce.
    pub restitution: f32,
    /// Sensors detect overlaps but never push anything.
    pub is_sensor: bool,
    /// Collision layers the collider belongs to.
    pub layers: LayerMask,
}

impl PhysicsBody {
    /// An immovable box, the usual wall piece.
    pub fn wall(half_width: f32, half_height: f32) -> Self {
        Self {
            body_type: PhysicsBodyType::Static,
            collider: ColliderShape::Box { half_width, half_height },
            mass: 0.0,
            restitution: 0.0,
            is_sensor: false,
            layers: LayerMask::ALL,
        }
    }

    /// A round body of the given type and mass.
    pub fn circle(body_type: PhysicsBodyType, radius: f32, mass: f32) -> Self {
        Self {
            body_type,
            collider: ColliderShape::Circle { radius },
            mass,
            restitution: 0.0,
            is_sensor: false,
            layers: LayerMask::ALL,
        }
    }

    /// A box body of the given type and mass.
    pub fn boxed(body_type: PhysicsBodyType, half_width: f32, half_height: f32, mass: f32) -> Self {
        Self {
            body_type,
            collider: ColliderShape::Box { half_width, half_height },
            mass,
            restitution: 0.0,
            is_sensor: false,
            layers: LayerMask::ALL,
        }
    }

    pub fn with_layers(mut self, layers: LayerMask) -> Self {
        self.layers = layers;
        self
    }
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct TrackedBody {
    body: RigidBodyHandle,
    mass: f32,
    /// Translation at the start of the last step.
    previous: Vec2,
    /// Translation change over the last step.
    delta: Vec2,
}

/// Manages rapier2d simulation state for handle-keyed bodies.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    bodies: BTreeMap<Handle, TrackedBody>,
    body_to_handle: HashMap<RigidBodyHandle, Handle>,
}

impl PhysicsWorld {
    /// Create a physics world with the given gravity.
    pub fn new(gravity: Vec2) -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![gravity.x as Real, gravity.y as Real],
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            bodies: BTreeMap::new(),
            body_to_handle: HashMap::new(),
        }
    }

    /// Top-down worlds have no gravity.
    pub fn new_zero_gravity() -> Self {
        Self::new(Vec2::ZERO)
    }

    /// Register a body for `handle`. If the handle is already registered
    /// this is a no-op.
    pub fn register_body(&mut self, handle: Handle, position: Vec2, velocity: Vec2, body: &PhysicsBody) {
        if self.bodies.contains_key(&handle) {
            return;
        }

        let translation = vector![position.x as Real, position.y as Real];
        let linvel = vector![velocity.x as Real, velocity.y as Real];
        let rb = match body.body_type {
            PhysicsBodyType::Dynamic => RigidBodyBuilder::dynamic()
                .translation(translation)
                .linvel(linvel)
                .additional_mass(body.mass.max(0.0) as Real)
                .lock_rotations()
                .build(),
            PhysicsBodyType::Kinematic => RigidBodyBuilder::kinematic_velocity_based()
                .translation(translation)
                .linvel(linvel)
                .build(),
            PhysicsBodyType::Static => RigidBodyBuilder::fixed().translation(translation).build(),
        };
        let body_handle = self.rigid_body_set.insert(rb);

        let shape: SharedShape = match body.collider {
            ColliderShape::Box {
                half_width,
                half_height,
            } => SharedShape::cuboid(half_width as Real, half_height as Real),
            ColliderShape::Circle { radius } => SharedShape::ball(radius as Real),
        };
        let collider = ColliderBuilder::new(shape)
            .density(0.0)
            .restitution(body.restitution as Real)
            .sensor(body.is_sensor)
            .collision_groups(InteractionGroups::new(
                Group::from_bits_truncate(body.layers.0),
                Group::ALL,
            ))
            .build();
        self.collider_set
            .insert_with_parent(collider, body_handle, &mut self.rigid_body_set);

        self.bodies.insert(
            handle,
            TrackedBody {
                body: body_handle,
                mass: body.mass,
                previous: position,
                delta: Vec2::ZERO,
            },
        );
        self.body_to_handle.insert(body_handle, handle);
        trace!(%handle, ?position, "registered body");
    }

    /// Remove the body for `handle` and its colliders. Returns whether a body
    /// was registered.
    pub fn unregister_body(&mut self, handle: Handle) -> bool {
        let Some(tracked) = self.bodies.remove(&handle) else {
            return false;
        };
        self.body_to_handle.remove(&tracked.body);
        self.rigid_body_set.remove(
            tracked.body,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        trace!(%handle, "unregistered body");
        true
    }

    /// Move a registered body to `position` without changing its velocity.
    /// The jump is not reported as movement: the next step measures the
    /// body's delta from its new position.
    pub fn teleport(&mut self, handle: Handle, position: Vec2) -> bool {
        let Some(tracked) = self.bodies.get(&handle) else {
            return false;
        };
        let Some(rb) = self.rigid_body_set.get_mut(tracked.body) else {
            return false;
        };
        rb.set_translation(vector![position.x as Real, position.y as Real], true);
        trace!(%handle, ?position, "teleported body");
        true
    }

    /// Set only the velocity of a registered body.
    pub fn set_velocity(&mut self, handle: Handle, velocity: Vec2) {
        let Some(tracked) = self.bodies.get(&handle) else {
            return;
        };
        if let Some(rb) = self.rigid_body_set.get_mut(tracked.body) {
            rb.set_linvel(vector![velocity.x as Real, velocity.y as Real], true);
        }
    }

    /// Step the simulation by `dt` seconds and record each body's
    /// positional delta.
    pub fn step(&mut self, dt: f32) {
        self.integration_params.dt = dt as Real;

        for tracked in self.bodies.values_mut() {
            if let Some(rb) = self.rigid_body_set.get(tracked.body) {
                let t = rb.translation();
                tracked.previous = Vec2::new(t.x, t.y);
            }
        }

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );

        for tracked in self.bodies.values_mut() {
            if let Some(rb) = self.rigid_body_set.get(tracked.body) {
                let t = rb.translation();
                tracked.delta = Vec2::new(t.x, t.y) - tracked.previous;
            }
        }
        debug!(bodies = self.bodies.len(), dt, "physics step");
    }

    /// Current translation of a registered body.
    pub fn position(&self, handle: Handle) -> Option<Vec2> {
        self.translation_of(self.bodies.get(&handle)?.body)
    }

    /// How far the body moved during the last step.
    pub fn positional_delta(&self, handle: Handle) -> Option<Vec2> {
        self.bodies.get(&handle).map(|t| t.delta)
    }

    /// Samples for the colliders attached to one body, in the same form the
    /// grid receives them from [`ColliderQuery::overlap_area`].
    pub fn body_samples(&self, handle: Handle, out: &mut Vec<ColliderSample>) {
        let Some(tracked) = self.bodies.get(&handle) else {
            return;
        };
        let Some(rb) = self.rigid_body_set.get(tracked.body) else {
            return;
        };
        for &collider_handle in rb.colliders() {
            if let Some(collider) = self.collider_set.get(collider_handle) {
                out.push(self.sample(collider));
            }
        }
    }

    pub fn has_body(&self, handle: Handle) -> bool {
        self.bodies.contains_key(&handle)
    }

    /// Number of rapier bodies currently registered.
    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    fn translation_of(&self, body: RigidBodyHandle) -> Option<Vec2> {
        let t = self.rigid_body_set.get(body)?.translation();
        Some(Vec2::new(t.x, t.y))
    }

    fn sample(&self, collider: &Collider) -> ColliderSample {
        let aabb = collider.compute_aabb();
        let bounds = Bounds2D::new(
            Vec2::new(aabb.mins.x, aabb.mins.y),
            Vec2::new(aabb.maxs.x, aabb.maxs.y),
        );
        let layers = LayerMask(collider.collision_groups().memberships.bits());
        let body = collider.parent().and_then(|parent| {
            let handle = self.body_to_handle.get(&parent)?;
            let tracked = self.bodies.get(handle)?;
            Some(BodySample {
                mass: tracked.mass,
                delta: tracked.delta,
            })
        });
        ColliderSample { bounds, layers, body }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new_zero_gravity()
    }
}

impl ColliderQuery for PhysicsWorld {
    fn overlap_area(&self, area: &Bounds2D, layers: LayerMask, out: &mut Vec<ColliderSample>) {
        for (_, collider) in self.collider_set.iter() {
            let sample = self.sample(collider);
            if sample.layers.intersects(layers) && sample.bounds.overlaps(area) {
                out.push(sample);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_pool::prelude::Category;

    const DT: f32 = 1.0 / 60.0;

    fn handle(index: u32) -> Handle {
        Handle::new(Category::Enemy, index, 0)
    }

    #[test]
    fn register_is_idempotent() {
        let mut pw = PhysicsWorld::new_zero_gravity();
        let body = PhysicsBody::circle(PhysicsBodyType::Dynamic, 0.5, 1.0);
        pw.register_body(handle(0), Vec2::ZERO, Vec2::ZERO, &body);
        pw.register_body(handle(0), Vec2::ZERO, Vec2::ZERO, &body);
        assert!(pw.has_body(handle(0)));
        assert_eq!(pw.body_count(), 1);
    }

    #[test]
    fn unregister_removes_body() {
        let mut pw = PhysicsWorld::new_zero_gravity();
        pw.register_body(handle(0), Vec2::ZERO, Vec2::ZERO, &PhysicsBody::wall(0.5, 0.5));
        assert!(pw.unregister_body(handle(0)));
        assert!(!pw.has_body(handle(0)));
        assert_eq!(pw.body_count(), 0);
        assert!(!pw.unregister_body(handle(0)));
    }

    #[test]
    fn kinematic_body_records_delta() {
        let mut pw = PhysicsWorld::new_zero_gravity();
        let body = PhysicsBody::boxed(PhysicsBodyType::Kinematic, 0.4, 0.4, 2.0);
        pw.register_body(handle(1), Vec2::new(2.5, 2.5), Vec2::new(30.0, 0.0), &body);
        pw.step(DT);

        let delta = pw.positional_delta(handle(1)).unwrap();
        assert!((delta.x - 0.5).abs() < 1e-4, "delta {delta:?}");
        assert!(delta.y.abs() < 1e-6);
        assert!(pw.position(handle(1)).unwrap().x > 2.5);
    }

    #[test]
    fn dynamic_body_moves() {
        let mut pw = PhysicsWorld::new_zero_gravity();
        let body = PhysicsBody::circle(PhysicsBodyType::Dynamic, 0.5, 1.0);
        pw.register_body(handle(0), Vec2::ZERO, Vec2::new(10.0, 0.0), &body);
        pw.register_body(handle(1), Vec2::new(5.0, 5.0), Vec2::ZERO, &PhysicsBody::wall(1.0, 1.0));
        pw.step(DT);

        assert!(pw.position(handle(0)).unwrap().x > 0.0);
        assert!(pw.positional_delta(handle(0)).unwrap().x > 0.0);
        assert_eq!(pw.positional_delta(handle(1)), Some(Vec2::ZERO));
    }

    #[test]
    fn teleport_is_not_reported_as_movement() {
        let mut pw = PhysicsWorld::new_zero_gravity();
        let body = PhysicsBody::boxed(PhysicsBodyType::Kinematic, 0.4, 0.4, 1.0);
        pw.register_body(handle(2), Vec2::new(2.5, 2.5), Vec2::new(30.0, 0.0), &body);
        pw.step(DT);

        assert!(pw.teleport(handle(2), Vec2::new(8.0, 2.5)));
        assert_eq!(pw.position(handle(2)), Some(Vec2::new(8.0, 2.5)));
        pw.step(DT);

        let delta = pw.positional_delta(handle(2)).unwrap();
        assert!((delta.x - 0.5).abs() < 1e-3, "delta {delta:?}");
        assert!((pw.position(handle(2)).unwrap().x - 8.5).abs() < 1e-3);
        assert!(!pw.teleport(handle(3), Vec2::ZERO));
    }

    #[test]
    fn overlap_area_filters_by_area_and_layer() {
        let mut pw = PhysicsWorld::new_zero_gravity();
        pw.register_body(handle(0), Vec2::new(1.5, 1.5), Vec2::ZERO, &PhysicsBody::wall(0.45, 0.45));
        pw.register_body(
            handle(1),
            Vec2::new(3.5, 1.5),
            Vec2::ZERO,
            &PhysicsBody::wall(0.45, 0.45).with_layers(LayerMask::layer(3)),
        );
        pw.register_body(handle(2), Vec2::new(50.0, 50.0), Vec2::ZERO, &PhysicsBody::wall(0.45, 0.45));
        pw.step(DT);

        let area = Bounds2D::new(Vec2::ZERO, Vec2::splat(10.0));
        let mut out = Vec::new();
        pw.overlap_area(&area, LayerMask::ALL, &mut out);
        assert_eq!(out.len(), 2);

        out.clear();
        pw.overlap_area(&area, LayerMask::layer(0), &mut out);
        assert_eq!(out.len(), 1);
        let sample = out[0];
        assert!((sample.bounds.min - Vec2::new(1.05, 1.05)).length() < 1e-4);
        assert_eq!(sample.body.map(|b| b.delta), Some(Vec2::ZERO));
    }

    #[test]
    fn body_samples_carry_mass() {
        let mut pw = PhysicsWorld::new_zero_gravity();
        let body = PhysicsBody::boxed(PhysicsBodyType::Kinematic, 0.4, 0.4, 3.0);
        pw.register_body(handle(4), Vec2::splat(1.5), Vec2::ZERO, &body);
        pw.step(DT);

        let mut out = Vec::new();
        pw.body_samples(handle(4), &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].body.map(|b| b.mass), Some(3.0));

        out.clear();
        pw.body_samples(handle(5), &mut out);
        assert!(out.is_empty());
    }
}
