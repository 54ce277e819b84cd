//! Momentum-aware A* over a [`NavGrid`].
//!
//! A step from one cell to a neighbor is allowed only when the neighbor's
//! predicted momentum (its current occupants plus the agent pushing through at
//! full speed in the step direction) still points along the step strongly
//! enough, and the neighbor is not blocking. Cells full of bodies moving with
//! the agent are passable, cells full of bodies moving against it are not.
//!
//! The search is bounded and never fails once the start is inside the grid:
//! if the goal cannot be reached within the iteration budget the path ends at
//! the visited cell closest to the goal, and callers re-plan as they move.

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use glam::{IVec2, Vec2};
use tracing::debug;

use crate::grid::NavGrid;
use crate::node::{NavNode, MOMENTUM_SCALE};

/// Iteration budget when the goal cell is open.
pub const OPEN_GOAL_ITERATIONS: usize = 200;
/// Iteration budget when the goal cell is blocking; the search only looks for
/// somewhere close by.
pub const BLOCKED_GOAL_ITERATIONS: usize = 100;

/// Fraction of the agent's own scaled momentum the predicted momentum must
/// keep along the step direction.
const MOVABLE_FRACTION: f32 = 0.9;

/// Step lengths above this are diagonal.
const DIAGONAL_STEP: f32 = 1.1;

// ---------------------------------------------------------------------------
// SearchScore
// ---------------------------------------------------------------------------

/// A candidate cell in the open list.
///
/// Ordered so that *greater is better*: lower `total_score` first, then lower
/// `cell.x`, then lower `cell.y`. The open list is kept ascending, so the best
/// candidate is always popped from the tail.
#[derive(Debug, Clone, Copy)]
pub struct SearchScore {
    /// `distance_travelled + distance_to_goal`.
    pub total_score: f32,
    pub cell: IVec2,
    /// Accumulated Euclidean step length from the start.
    pub distance_travelled: f32,
    /// Straight-line distance to the goal cell.
    pub distance_to_goal: f32,
}

impl Ord for SearchScore {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .total_score
            .total_cmp(&self.total_score)
            .then_with(|| other.cell.x.cmp(&self.cell.x))
            .then_with(|| other.cell.y.cmp(&self.cell.y))
    }
}

impl PartialOrd for SearchScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SearchScore {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchScore {}

// ---------------------------------------------------------------------------
// Scratch
// ---------------------------------------------------------------------------

/// Reusable search state. Keeping one around between calls avoids
/// reallocating the visited map and open list every tick.
#[derive(Debug, Default, Clone)]
pub struct PathScratch {
    /// Visited cell -> predecessor cell.
    pub visited: HashMap<IVec2, IVec2>,
    /// Open list, ascending, best at the tail.
    pub candidates: Vec<SearchScore>,
}

impl PathScratch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.visited.clear();
        self.candidates.clear();
    }
}

/// A pathfinder that owns its scratch buffers.
#[derive(Debug, Default, Clone)]
pub struct Pathfinder {
    scratch: PathScratch,
}

impl Pathfinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// See [`find_path`].
    pub fn find_path(
        &mut self,
        grid: &NavGrid,
        max_agent_speed: f32,
        start: Vec2,
        goal: Vec2,
        path: &mut Vec<IVec2>,
    ) -> bool {
        find_path(
            grid,
            max_agent_speed,
            start,
            goal,
            path,
            &mut self.scratch.visited,
            &mut self.scratch.candidates,
        )
    }

    pub fn scratch(&self) -> &PathScratch {
        &self.scratch
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Compute a cell path from `start` to `goal` (world positions).
///
/// `path` is cleared and filled start-first: `path[0]` is the start cell and
/// consecutive cells are 8-neighbors. `goal` is clamped into the grid. Returns
/// `false` only when `start` lies outside the grid; otherwise some path is
/// always produced, ending at the goal if it was reached within the budget and
/// at the closest visited cell if not.
///
/// `visited` and `candidates` are scratch space. They are cleared on entry and
/// left holding the final search state.
pub fn find_path(
    grid: &NavGrid,
    max_agent_speed: f32,
    start: Vec2,
    goal: Vec2,
    path: &mut Vec<IVec2>,
    visited: &mut HashMap<IVec2, IVec2>,
    candidates: &mut Vec<SearchScore>,
) -> bool {
    path.clear();

    let start_cell = grid.world_to_cell(start);
    let goal_cell = grid.round_clamp_to_cell(goal);

    if !grid.in_range(start_cell) {
        debug!(start = ?start, "path search rejected: start outside grid");
        return false;
    }
    if start_cell == goal_cell {
        path.push(goal_cell);
        return true;
    }

    visited.clear();
    candidates.clear();
    visited.insert(start_cell, start_cell);

    let goal_open = grid.node(goal_cell).is_some_and(|node| node.blocking <= 0);
    let mut budget = iteration_budget(grid, goal_open);

    let scaled_speed = max_agent_speed * MOMENTUM_SCALE;
    let agent_momentum = (scaled_speed.round() as i32).max(1);
    let movable_threshold = scaled_speed * MOVABLE_FRACTION;

    let mut current = start_cell;
    let mut current_travelled = 0.0f32;
    let mut nearest = start_cell;
    let mut nearest_distance = cell_distance(start_cell, goal_cell);
    let mut reached = false;

    loop {
        for neighbor in NavGrid::neighbors(current) {
            let offset = neighbor - current;
            let step = offset.as_vec2().length();
            let pushed = NavNode::from_momentum(offset * agent_momentum);

            let Some(node) = grid.node(neighbor) else {
                continue;
            };
            if movable_threshold * step > offset.dot(node.combine_scaled_momentum(&pushed)) as f32 {
                continue;
            }
            if step > DIAGONAL_STEP {
                // Both cells beside the diagonal must be open, or the step
                // would cut between two obstacles touching at a corner.
                let beside_a = IVec2::new(current.x, neighbor.y);
                let beside_b = IVec2::new(neighbor.x, current.y);
                if !corner_passable(grid, beside_a, offset, &pushed)
                    || !corner_passable(grid, beside_b, offset, &pushed)
                {
                    continue;
                }
            }

            if let Entry::Vacant(entry) = visited.entry(neighbor) {
                entry.insert(current);
                let distance_travelled = current_travelled + step;
                let distance_to_goal = cell_distance(neighbor, goal_cell);
                let score = SearchScore {
                    total_score: distance_travelled + distance_to_goal,
                    cell: neighbor,
                    distance_travelled,
                    distance_to_goal,
                };
                let at = candidates.partition_point(|c| *c <= score);
                candidates.insert(at, score);
            }
        }

        let Some(best) = candidates.pop() else {
            break;
        };
        current = best.cell;
        if current == goal_cell {
            reached = true;
            break;
        }
        if best.distance_to_goal < nearest_distance {
            nearest = current;
            nearest_distance = best.distance_to_goal;
        }
        current_travelled = best.distance_travelled;

        budget -= 1;
        if budget == 0 {
            break;
        }
    }

    let mut cursor = if reached { goal_cell } else { nearest };
    while cursor != start_cell {
        path.push(cursor);
        match visited.get(&cursor) {
            Some(&previous) => cursor = previous,
            None => break,
        }
    }
    path.push(start_cell);
    path.reverse();

    debug!(
        start = ?start_cell,
        goal = ?goal_cell,
        reached,
        visited = visited.len(),
        len = path.len(),
        "path search finished"
    );
    true
}

/// Number of cells a search may expand before it settles for the closest
/// cell found so far.
pub fn iteration_budget(grid: &NavGrid, goal_open: bool) -> usize {
    let budget = if goal_open {
        OPEN_GOAL_ITERATIONS
    } else {
        BLOCKED_GOAL_ITERATIONS
    };
    budget.min(grid.cell_count())
}

fn corner_passable(grid: &NavGrid, cell: IVec2, offset: IVec2, pushed: &NavNode) -> bool {
    grid.node(cell)
        .is_some_and(|node| offset.dot(node.combine_scaled_momentum(pushed)) > 0)
}

fn cell_distance(a: IVec2, b: IVec2) -> f32 {
    (a - b).as_vec2().length()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
