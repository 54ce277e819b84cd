//! Fixed-timestep simulation driver.
//!
//! The [`Simulation`] ties the pieces together. Entities live in one
//! [`SlotPool`] per [`Category`], their bodies live in the [`PhysicsWorld`],
//! and the [`NavGrid`] is rebuilt from the physics world after every step.
//! Each tick:
//!
//! 1. rapier steps with the fixed dt and records every body's delta.
//! 2. The grid is refreshed from the physics world.
//! 3. The tick counter advances.
//!
//! Path requests issued between ticks see the grid of the last completed tick.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use lumen_engine::prelude::*;
//!
//! let mut sim = Simulation::new(SimConfig::default()).unwrap();
//! let wall = sim
//!     .spawn_body(Category::Boss, Vec2::new(0.5, 0.5), Vec2::ZERO, PhysicsBody::wall(0.45, 0.45))
//!     .unwrap();
//!
//! sim.tick();
//! assert_eq!(sim.tick_count(), 1);
//! assert!(sim.grid().node(sim.grid().world_to_cell(Vec2::new(0.5, 0.5))).unwrap().is_blocking());
//!
//! assert!(sim.despawn_body(wall));
//! assert!(!sim.is_alive(wall));
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Context;
use glam::{IVec2, Vec2};
use lumen_nav::prelude::{ColliderSample, NavConfig, NavGrid, NavNode, Pathfinder};
use lumen_pool::prelude::{Category, Handle, SlotPool};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::physics::{PhysicsBody, PhysicsWorld};
use crate::EngineError;

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`Simulation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed time step in seconds per tick. Must be positive and finite.
    pub fixed_dt: f32,
    /// World gravity. Top-down worlds leave this at zero.
    pub gravity: Vec2,
    /// Navigation grid covering the playable area.
    pub nav: NavConfig,
}

impl Default for SimConfig {
    /// 60 Hz, no gravity, default navigation grid.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            gravity: Vec2::ZERO,
            nav: NavConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading simulation config {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("parsing simulation config {}", path.display()))?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// TickDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last tick.
#[derive(Debug, Clone, Default)]
pub struct TickDiagnostics {
    /// Time spent in the physics step.
    pub physics_time: Duration,
    /// Time spent rebuilding the navigation grid.
    pub refresh_time: Duration,
    /// Total time for the tick.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Pool payload for a simulated entity.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyRecord {
    /// Descriptor the body was spawned with.
    pub body: PhysicsBody,
    /// Tick on which the entity was spawned.
    pub spawned_at: u64,
}

/// The deterministic fixed-timestep simulation.
pub struct Simulation {
    config: SimConfig,
    pools: BTreeMap<Category, SlotPool<BodyRecord>>,
    physics: PhysicsWorld,
    grid: NavGrid,
    pathfinder: Pathfinder,
    own_samples: Vec<ColliderSample>,
    tick_counter: u64,
    last_diagnostics: TickDiagnostics,
}

impl Simulation {
    /// Create a simulation with one empty pool per issuable category.
    pub fn new(config: SimConfig) -> Result<Self, EngineError> {
        if !(config.fixed_dt > 0.0 && config.fixed_dt.is_finite()) {
            return Err(EngineError::InvalidTimestep(config.fixed_dt));
        }
        let grid = NavGrid::from_config(&config.nav)?;
        let pools = Category::ALL
            .into_iter()
            .filter(|c| *c != Category::Invalid)
            .map(|c| (c, SlotPool::new(c)))
            .collect();
        info!(
            cols = grid.cols(),
            rows = grid.rows(),
            fixed_dt = config.fixed_dt,
            "simulation created"
        );
        Ok(Self {
            physics: PhysicsWorld::new(config.gravity),
            config,
            pools,
            grid,
            pathfinder: Pathfinder::new(),
            own_samples: Vec::new(),
            tick_counter: 0,
            last_diagnostics: TickDiagnostics::default(),
        })
    }

    /// Spawn an entity of `category` and give it a physics body.
    pub fn spawn_body(
        &mut self,
        category: Category,
        position: Vec2,
        velocity: Vec2,
        body: PhysicsBody,
    ) -> Result<Handle, EngineError> {
        let pool = self
            .pools
            .get_mut(&category)
            .ok_or(EngineError::InvalidCategory(category))?;
        let record = BodyRecord {
            body,
            spawned_at: self.tick_counter,
        };
        let handle = pool.spawn_with(record);
        if let Some(record) = pool.get_by_handle(handle) {
            self.physics.register_body(handle, position, velocity, &record.body);
        }
        debug!(%handle, ?position, "spawned body");
        Ok(handle)
    }

    /// Despawn an entity and remove its body. Returns `false` for handles that
    /// no longer validate.
    pub fn despawn_body(&mut self, handle: Handle) -> bool {
        let Some(pool) = self.pools.get_mut(&handle.category()) else {
            warn!(%handle, "despawn rejected: no pool for category");
            return false;
        };
        if pool.despawn(handle).is_none() {
            return false;
        }
        self.physics.unregister_body(handle);
        debug!(%handle, "despawned body");
        true
    }

    /// Whether `handle` still names a live entity.
    pub fn is_alive(&self, handle: Handle) -> bool {
        self.pools
            .get(&handle.category())
            .is_some_and(|pool| pool.is_valid(handle))
    }

    /// The pool record for a live entity.
    pub fn record(&self, handle: Handle) -> Option<&BodyRecord> {
        self.pools.get(&handle.category())?.get_by_handle(handle)
    }

    /// Steer a live entity.
    pub fn set_velocity(&mut self, handle: Handle, velocity: Vec2) -> Result<(), EngineError> {
        if !self.is_alive(handle) {
            return Err(EngineError::StaleHandle(handle));
        }
        self.physics.set_velocity(handle, velocity);
        Ok(())
    }

    /// Current position of a live entity.
    pub fn position(&self, handle: Handle) -> Option<Vec2> {
        if !self.is_alive(handle) {
            return None;
        }
        self.physics.position(handle)
    }

    /// Advance the simulation by one fixed step.
    pub fn tick(&mut self) {
        let tick_start = Instant::now();
        let dt = self.config.fixed_dt;

        let physics_start = Instant::now();
        self.physics.step(dt);
        let physics_time = physics_start.elapsed();

        let refresh_start = Instant::now();
        self.grid.refresh(&self.physics, dt);
        let refresh_time = refresh_start.elapsed();

        self.tick_counter += 1;
        self.last_diagnostics = TickDiagnostics {
            physics_time,
            refresh_time,
            total_time: tick_start.elapsed(),
        };
        debug!(
            tick = self.tick_counter,
            physics_us = physics_time.as_micros() as u64,
            refresh_us = refresh_time.as_micros() as u64,
            "tick complete"
        );
    }

    /// Run `count` ticks.
    pub fn run_ticks(&mut self, count: u64) {
        for _ in 0..count {
            self.tick();
        }
    }

    /// Plan a path between two world positions on the current grid.
    pub fn find_path(&mut self, max_agent_speed: f32, start: Vec2, goal: Vec2, path: &mut Vec<IVec2>) -> bool {
        self.pathfinder
            .find_path(&self.grid, max_agent_speed, start, goal, path)
    }

    /// Plan a path for a live entity from its current position.
    ///
    /// The entity's own contribution is taken off the grid for the search and
    /// put back afterwards, so it never blocks itself. Only what the last
    /// refresh actually added is removed: an entity spawned since then, or one
    /// on layers the grid does not sample, has nothing on the grid.
    pub fn find_path_for(
        &mut self,
        handle: Handle,
        max_agent_speed: f32,
        goal: Vec2,
        path: &mut Vec<IVec2>,
    ) -> Result<bool, EngineError> {
        let start = self.position(handle).ok_or(EngineError::StaleHandle(handle))?;
        let dt = self.config.fixed_dt;

        self.own_samples.clear();
        let refreshed = self
            .record(handle)
            .is_some_and(|record| record.spawned_at < self.tick_counter);
        if refreshed {
            self.physics.body_samples(handle, &mut self.own_samples);
            let layers = self.grid.layers();
            self.own_samples.retain(|sample| sample.layers.intersects(layers));
        }
        for sample in &self.own_samples {
            self.grid
                .add_bounds(&sample.bounds, -NavNode::from_collider(sample, dt));
        }

        let found = self
            .pathfinder
            .find_path(&self.grid, max_agent_speed, start, goal, path);

        for sample in &self.own_samples {
            self.grid
                .add_bounds(&sample.bounds, NavNode::from_collider(sample, dt));
        }
        Ok(found)
    }

    /// World position of the center of the first open cell around a
    /// `box_size` (in cells) obstacle centered on `center`.
    pub fn unstick(&self, center: Vec2, box_size: IVec2) -> Option<Vec2> {
        self.grid
            .find_open_cell_adjacent_to_box(center, box_size)
            .map(|cell| self.grid.cell_to_world(cell))
    }

    /// Move a live entity whose body is stuck inside a `box_size` (in cells)
    /// obstacle to the first open cell around it. Returns the new position,
    /// or `None` if the whole ring is blocked and the entity stays put.
    pub fn unstick_body(&mut self, handle: Handle, box_size: IVec2) -> Result<Option<Vec2>, EngineError> {
        let center = self.position(handle).ok_or(EngineError::StaleHandle(handle))?;
        let Some(target) = self.unstick(center, box_size) else {
            warn!(%handle, ?center, "no open cell around obstacle");
            return Ok(None);
        };
        self.physics.teleport(handle, target);
        debug!(%handle, from = ?center, to = ?target, "unstuck body");
        Ok(Some(target))
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn grid(&self) -> &NavGrid {
        &self.grid
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    /// The pool for `category`. `None` only for [`Category::Invalid`].
    pub fn pool(&self, category: Category) -> Option<&SlotPool<BodyRecord>> {
        self.pools.get(&category)
    }

    /// Number of ticks executed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_counter
    }

    /// Simulated time in seconds, computed from the tick count so it does not
    /// accumulate rounding error.
    pub fn elapsed(&self) -> f64 {
        self.tick_counter as f64 * self.config.fixed_dt as f64
    }

    pub fn last_diagnostics(&self) -> &TickDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_timestep() {
        let config = SimConfig {
            fixed_dt: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            Simulation::new(config),
            Err(EngineError::InvalidTimestep(_))
        ));
    }

    #[test]
    fn rejects_bad_grid() {
        let mut config = SimConfig::default();
        config.nav.cell_size = Vec2::new(0.0, 1.0);
        assert!(matches!(Simulation::new(config), Err(EngineError::Nav(_))));
    }

    #[test]
    fn invalid_category_has_no_pool() {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        assert!(sim.pool(Category::Invalid).is_none());
        assert!(sim.pool(Category::Projectile).is_some());
        let result = sim.spawn_body(Category::Invalid, Vec2::ZERO, Vec2::ZERO, PhysicsBody::wall(0.5, 0.5));
        assert!(matches!(result, Err(EngineError::InvalidCategory(Category::Invalid))));
    }

    #[test]
    fn tick_advances_counter_and_time() {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        sim.run_ticks(60);
        assert_eq!(sim.tick_count(), 60);
        assert!((sim.elapsed() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn config_json_fills_defaults() {
        let config = SimConfig::from_json(r#"{ "fixed_dt": 0.02 }"#).unwrap();
        assert_eq!(config.fixed_dt, 0.02);
        assert_eq!(config.nav, NavConfig::default());
        assert!(SimConfig::from_json("{ nope").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = SimConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(format!("{err:#}").contains("reading simulation config"));
    }

    #[test]
    fn spawn_records_tick() {
        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        sim.run_ticks(3);
        let h = sim
            .spawn_body(Category::Pickup, Vec2::ZERO, Vec2::ZERO, PhysicsBody::wall(0.2, 0.2))
            .unwrap();
        assert_eq!(sim.record(h).map(|r| r.spawned_at), Some(3));
        assert_eq!(h.category(), Category::Pickup);
    }
}
