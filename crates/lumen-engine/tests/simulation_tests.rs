//! Simulation scenarios: bodies are spawned into rapier, the grid is rebuilt on
//! tick, and paths are planned against what the physics world reports.

use glam::{IVec2, Vec2};
use lumen_engine::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn sim(cols: f32, rows: f32) -> Simulation {
    sim_on_layers(cols, rows, LayerMask::ALL)
}

fn sim_on_layers(cols: f32, rows: f32, layers: LayerMask) -> Simulation {
    init_tracing();
    let config = SimConfig {
        nav: NavConfig {
            bounds: Bounds2D::new(Vec2::ZERO, Vec2::new(cols, rows)),
            cell_size: Vec2::ONE,
            layers,
        },
        ..Default::default()
    };
    Simulation::new(config).unwrap()
}

fn center(x: i32, y: i32) -> Vec2 {
    Vec2::new(x as f32 + 0.5, y as f32 + 0.5)
}

/// A static wall filling most of one cell, so its bounds never touch the
/// neighboring cells.
fn spawn_wall(sim: &mut Simulation, x: i32, y: i32) -> Handle {
    sim.spawn_body(Category::LightCrystal, center(x, y), Vec2::ZERO, PhysicsBody::wall(0.45, 0.45))
        .unwrap()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn wall_column_forces_path_through_gap() {
    let mut sim = sim(10.0, 10.0);
    for y in 0..9 {
        spawn_wall(&mut sim, 5, y);
    }
    sim.tick();

    for y in 0..9 {
        assert!(sim.grid().node(IVec2::new(5, y)).unwrap().is_blocking());
    }
    assert!(!sim.grid().node(IVec2::new(5, 9)).unwrap().is_blocking());

    let mut path = Vec::new();
    assert!(sim.find_path(1.0, center(0, 0), center(9, 0), &mut path));
    assert_eq!(path.first(), Some(&IVec2::new(0, 0)));
    assert_eq!(path.last(), Some(&IVec2::new(9, 0)));
    assert!(path.contains(&IVec2::new(5, 9)), "path must use the gap: {path:?}");
}

#[test]
fn crowd_direction_decides_passability() {
    for (velocity, passable) in [(30.0, true), (-30.0, false)] {
        let mut sim = sim(5.0, 3.0);
        for y in 0..3 {
            sim.spawn_body(
                Category::Enemy,
                center(2, y),
                Vec2::new(velocity, 0.0),
                PhysicsBody::boxed(PhysicsBodyType::Kinematic, 0.45, 0.45, 10.0),
            )
            .unwrap();
        }
        sim.tick();

        let mut path = Vec::new();
        assert!(sim.find_path(1.0, center(0, 1), center(4, 1), &mut path));
        if passable {
            assert_eq!(path.last(), Some(&IVec2::new(4, 1)), "crowd moving with the agent");
        } else {
            assert!(
                path.iter().all(|c| c.x < 2),
                "crowd moving against the agent must not be crossed: {path:?}"
            );
        }
    }
}

#[test]
fn agent_does_not_block_itself() {
    let mut sim = sim(8.0, 8.0);
    // A 2x2-cell agent standing still covers cells (1..=2, 1..=2).
    let agent = sim
        .spawn_body(
            Category::Player,
            Vec2::new(2.0, 2.0),
            Vec2::ZERO,
            PhysicsBody::boxed(PhysicsBodyType::Kinematic, 0.9, 0.9, 1.0),
        )
        .unwrap();
    sim.tick();
    assert!(sim.grid().node(IVec2::new(1, 1)).unwrap().is_blocking());

    let mut detour = Vec::new();
    assert!(sim.find_path(1.0, Vec2::new(2.0, 2.0), center(0, 0), &mut detour));

    let mut path = Vec::new();
    assert!(sim.find_path_for(agent, 1.0, center(0, 0), &mut path).unwrap());
    assert_eq!(path, vec![IVec2::new(2, 2), IVec2::new(1, 1), IVec2::new(0, 0)]);
    assert!(detour.len() > path.len());

    // The agent's contribution is back on the grid.
    assert!(sim.grid().node(IVec2::new(1, 1)).unwrap().is_blocking());
}

/// A wall column at x = 2 on a 5x3 grid and a 1.8x0.8 agent standing at
/// (1.6, 1.5), so the agent's bounds reach into the wall cell (2, 1).
fn wall_column_with_agent(grid_layers: LayerMask, agent_layers: LayerMask) -> (Simulation, Handle) {
    let mut sim = sim_on_layers(5.0, 3.0, grid_layers);
    for y in 0..3 {
        spawn_wall(&mut sim, 2, y);
    }
    sim.tick();
    let agent = sim
        .spawn_body(
            Category::Player,
            Vec2::new(1.6, 1.5),
            Vec2::ZERO,
            PhysicsBody::boxed(PhysicsBodyType::Kinematic, 0.9, 0.4, 1.0).with_layers(agent_layers),
        )
        .unwrap();
    (sim, agent)
}

#[test]
fn agent_spawned_since_refresh_does_not_clear_walls() {
    let (mut sim, agent) = wall_column_with_agent(LayerMask::ALL, LayerMask::ALL);
    let before = sim.grid().nodes().to_vec();

    let mut path = Vec::new();
    assert!(sim.find_path_for(agent, 1.0, center(4, 1), &mut path).unwrap());
    assert!(!path.contains(&IVec2::new(2, 1)), "path crosses the wall: {path:?}");
    assert!(path.iter().all(|c| c.x < 2), "{path:?}");
    assert_eq!(sim.grid().nodes(), before.as_slice());

    // Once refreshed, only the agent's own share is taken off the wall cell.
    sim.tick();
    assert_eq!(sim.grid().node(IVec2::new(2, 1)).unwrap().blocking, 2);
    assert!(sim.find_path_for(agent, 1.0, center(4, 1), &mut path).unwrap());
    assert!(path.iter().all(|c| c.x < 2), "{path:?}");
    assert_eq!(sim.grid().node(IVec2::new(2, 1)).unwrap().blocking, 2);
}

#[test]
fn agent_on_unsampled_layer_does_not_clear_walls() {
    let (mut sim, agent) = wall_column_with_agent(LayerMask::layer(0), LayerMask::layer(5));
    sim.tick();
    assert_eq!(sim.grid().node(IVec2::new(2, 1)).unwrap().blocking, 1);

    let mut path = Vec::new();
    assert!(sim.find_path_for(agent, 1.0, center(4, 1), &mut path).unwrap());
    assert!(path.iter().all(|c| c.x < 2), "{path:?}");
    assert_eq!(sim.grid().node(IVec2::new(2, 1)).unwrap().blocking, 1);
}

#[test]
fn despawn_frees_cells_and_invalidates_handle() {
    let mut sim = sim(6.0, 6.0);
    let wall = spawn_wall(&mut sim, 3, 3);
    sim.tick();
    assert!(sim.grid().node(IVec2::new(3, 3)).unwrap().is_blocking());

    assert!(sim.despawn_body(wall));
    assert!(!sim.is_alive(wall));
    assert!(!sim.despawn_body(wall));
    assert!(!sim.physics().has_body(wall));

    sim.tick();
    assert_eq!(*sim.grid().node(IVec2::new(3, 3)).unwrap(), NavNode::ZERO);

    let mut path = Vec::new();
    assert!(matches!(
        sim.find_path_for(wall, 1.0, center(0, 0), &mut path),
        Err(EngineError::StaleHandle(_))
    ));

    // The slot is recycled under a new generation.
    let again = spawn_wall(&mut sim, 1, 1);
    assert_eq!(again.index(), wall.index());
    assert_ne!(again, wall);
    assert!(sim.is_alive(again));
}

#[test]
fn unstick_from_enclosing_block() {
    let mut sim = sim(10.0, 10.0);
    for y in 3..6 {
        for x in 3..6 {
            spawn_wall(&mut sim, x, y);
        }
    }
    sim.tick();

    let target = sim.unstick(center(4, 4), IVec2::splat(3));
    assert_eq!(target, Some(center(4, 2)));

    let stuck = sim
        .spawn_body(
            Category::Player,
            center(4, 4),
            Vec2::ZERO,
            PhysicsBody::boxed(PhysicsBodyType::Kinematic, 0.3, 0.3, 1.0),
        )
        .unwrap();
    assert_eq!(sim.unstick_body(stuck, IVec2::splat(3)).unwrap(), Some(center(4, 2)));
    assert_eq!(sim.position(stuck), Some(center(4, 2)));

    // After the next step the body sits on the open cell it was moved to.
    sim.tick();
    assert!(sim.grid().node(IVec2::new(4, 2)).unwrap().is_blocking());
    assert_eq!(sim.physics().positional_delta(stuck), Some(Vec2::ZERO));

    assert!(sim.despawn_body(stuck));
    assert!(matches!(
        sim.unstick_body(stuck, IVec2::splat(3)),
        Err(EngineError::StaleHandle(_))
    ));
}

#[test]
fn bodies_on_unsampled_layers_are_ignored() {
    init_tracing();
    let config = SimConfig::from_json(
        r#"{
            "fixed_dt": 0.02,
            "nav": { "bounds": { "min": [0.0, 0.0], "max": [4.0, 4.0] }, "layers": 1 }
        }"#,
    )
    .unwrap();
    let mut sim = Simulation::new(config).unwrap();
    sim.spawn_body(
        Category::Projectile,
        center(1, 1),
        Vec2::ZERO,
        PhysicsBody::wall(0.45, 0.45).with_layers(LayerMask::layer(5)),
    )
    .unwrap();
    sim.spawn_body(Category::Projectile, center(2, 2), Vec2::ZERO, PhysicsBody::wall(0.45, 0.45))
        .unwrap();
    sim.tick();

    assert_eq!(*sim.grid().node(IVec2::new(1, 1)).unwrap(), NavNode::ZERO);
    assert!(sim.grid().node(IVec2::new(2, 2)).unwrap().is_blocking());
    assert_eq!(sim.pool(Category::Projectile).unwrap().count_occupied(), 2);
}
