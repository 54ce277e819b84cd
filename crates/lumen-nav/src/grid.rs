//! Dynamic navigation grid.
//!
//! A [`NavGrid`] tiles a rectangular world area with `cols * rows` cells stored
//! row-major (`index = y * cols + x`). Each cell holds a [`NavNode`]. The grid
//! is rebuilt wholesale once per physics step by [`NavGrid::refresh`]; nothing
//! carries over between refreshes.
//!
//! Cell coordinates are `IVec2` and may lie outside the grid: conversions such
//! as [`NavGrid::world_to_cell`] do not clamp, so callers either check
//! [`NavGrid::in_range`], use the `try_*` helpers, or use the `round_clamp_*`
//! helpers when snapping to the nearest valid cell is acceptable.

use glam::{IVec2, Vec2};
use tracing::{debug, warn};

use crate::bounds::Bounds2D;
use crate::config::NavConfig;
use crate::node::NavNode;
use crate::query::{ColliderQuery, ColliderSample, LayerMask};
use crate::NavError;

/// Offsets of the eight neighbors of a cell, counter-clockwise from +x.
pub const NEIGHBOR_OFFSETS: [IVec2; 8] = [
    IVec2::new(1, 0),
    IVec2::new(1, 1),
    IVec2::new(0, 1),
    IVec2::new(-1, 1),
    IVec2::new(-1, 0),
    IVec2::new(-1, -1),
    IVec2::new(0, -1),
    IVec2::new(1, -1),
];

// ---------------------------------------------------------------------------
// NavGrid
// ---------------------------------------------------------------------------

/// Regular 2D grid of [`NavNode`]s over a bounded world area.
#[derive(Debug, Clone)]
pub struct NavGrid {
    bounds: Bounds2D,
    cols: i32,
    rows: i32,
    nodes: Vec<NavNode>,
    layers: LayerMask,
    /// Reused between refreshes so the bulk query does not reallocate.
    samples: Vec<ColliderSample>,
}

impl NavGrid {
    /// Create a grid covering `bounds` with cells of roughly `cell_size`.
    pub fn new(bounds: Bounds2D, cell_size: Vec2) -> Result<Self, NavError> {
        let mut grid = Self {
            bounds,
            cols: 0,
            rows: 0,
            nodes: Vec::new(),
            layers: LayerMask::ALL,
            samples: Vec::new(),
        };
        grid.configure(bounds, cell_size)?;
        Ok(grid)
    }

    pub fn from_config(config: &NavConfig) -> Result<Self, NavError> {
        let mut grid = Self::new(config.bounds, config.cell_size)?;
        grid.layers = config.layers;
        Ok(grid)
    }

    /// Resize the grid to cover `bounds` with cells of `desired_cell_size`.
    ///
    /// Dimensions are rounded up to whole cells and `max` is snapped outward
    /// so the cells tile the rounded area exactly. Every node is reset. On
    /// error the grid is left unchanged.
    pub fn configure(&mut self, bounds: Bounds2D, desired_cell_size: Vec2) -> Result<(), NavError> {
        if !desired_cell_size.is_finite() || desired_cell_size.cmple(Vec2::ZERO).any() {
            warn!(cell_size = ?desired_cell_size, "rejected navigation grid cell size");
            return Err(NavError::InvalidCellSize {
                x: desired_cell_size.x,
                y: desired_cell_size.y,
            });
        }
        if !bounds.has_area() {
            warn!(min = ?bounds.min, max = ?bounds.max, "rejected navigation grid bounds");
            return Err(NavError::EmptyBounds {
                min: bounds.min,
                max: bounds.max,
            });
        }

        let dims = (bounds.size() / desired_cell_size).ceil().as_ivec2().max(IVec2::ONE);
        if dims.x.checked_mul(dims.y).is_none() {
            warn!(cols = dims.x, rows = dims.y, "rejected navigation grid dimensions");
            return Err(NavError::GridTooLarge {
                cols: dims.x,
                rows: dims.y,
            });
        }
        self.cols = dims.x;
        self.rows = dims.y;
        self.bounds = Bounds2D::new(bounds.min, bounds.min + desired_cell_size * dims.as_vec2());
        self.nodes.clear();
        self.nodes.resize(self.cell_count(), NavNode::ZERO);

        debug!(
            cols = self.cols,
            rows = self.rows,
            min = ?self.bounds.min,
            max = ?self.bounds.max,
            "navigation grid configured"
        );
        Ok(())
    }

    /// Rebuild every node from a single bulk collider query.
    ///
    /// Nodes are zeroed, then each collider's node is added to every cell its
    /// bounds overlap. `fixed_dt` is the physics step length, used for the
    /// moving/blocking threshold.
    pub fn refresh<Q>(&mut self, query: &Q, fixed_dt: f32)
    where
        Q: ColliderQuery + ?Sized,
    {
        self.nodes.fill(NavNode::ZERO);

        let mut samples = std::mem::take(&mut self.samples);
        samples.clear();
        query.overlap_area(&self.bounds, self.layers, &mut samples);

        for sample in &samples {
            let node = NavNode::from_collider(sample, fixed_dt);
            self.add_bounds(&sample.bounds, node);
        }

        debug!(colliders = samples.len(), "navigation grid refreshed");
        self.samples = samples;
    }

    /// Add `node` to every cell overlapped by `bounds`. Pass a negated node to
    /// take a contribution back out.
    pub fn add_bounds(&mut self, bounds: &Bounds2D, node: NavNode) {
        let (min, max) = self.bounds_to_cells(bounds);
        let min = min.max(IVec2::ZERO);
        let max = max.min(IVec2::new(self.cols, self.rows));

        for y in min.y..max.y {
            let row = (y * self.cols) as usize;
            for x in min.x..max.x {
                self.nodes[row + x as usize] += node;
            }
        }
    }

    /// Cell range `[min, max)` overlapped by `bounds`, unclamped.
    pub fn bounds_to_cells(&self, bounds: &Bounds2D) -> (IVec2, IVec2) {
        let cell = self.cell_size();
        let min = ((bounds.min - self.bounds.min) / cell).floor().as_ivec2();
        let max = ((bounds.max - self.bounds.min) / cell).ceil().as_ivec2();
        (min, max)
    }

    // -- dimensions ---------------------------------------------------------

    /// Actual cell size, derived from the snapped bounds.
    pub fn cell_size(&self) -> Vec2 {
        self.bounds.size() / IVec2::new(self.cols, self.rows).as_vec2()
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cell_count(&self) -> usize {
        (self.cols * self.rows) as usize
    }

    pub fn bounds(&self) -> Bounds2D {
        self.bounds
    }

    pub fn layers(&self) -> LayerMask {
        self.layers
    }

    pub fn set_layers(&mut self, layers: LayerMask) {
        self.layers = layers;
    }

    pub fn nodes(&self) -> &[NavNode] {
        &self.nodes
    }

    // -- cell access --------------------------------------------------------

    pub fn in_range(&self, cell: IVec2) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.cols && cell.y < self.rows
    }

    /// Row-major index of `cell`, if it lies inside the grid.
    pub fn index(&self, cell: IVec2) -> Option<usize> {
        self.in_range(cell)
            .then(|| (cell.y * self.cols + cell.x) as usize)
    }

    pub fn node(&self, cell: IVec2) -> Option<&NavNode> {
        self.index(cell).map(|i| &self.nodes[i])
    }

    /// World rectangle covered by `cell`.
    pub fn cell_bounds(&self, cell: IVec2) -> Bounds2D {
        let size = self.cell_size();
        let min = self.bounds.min + cell.as_vec2() * size;
        Bounds2D::new(min, min + size)
    }

    /// The eight neighbors of `cell`, diagonals included, unfiltered.
    pub fn neighbors(cell: IVec2) -> [IVec2; 8] {
        NEIGHBOR_OFFSETS.map(|offset| cell + offset)
    }

    // -- coordinate conversion ----------------------------------------------

    /// Cell containing `position`. May be out of range.
    pub fn world_to_cell(&self, position: Vec2) -> IVec2 {
        ((position - self.bounds.min) / self.cell_size())
            .floor()
            .as_ivec2()
    }

    /// World-space center of `cell`.
    pub fn cell_to_world(&self, cell: IVec2) -> Vec2 {
        self.bounds.min + (cell.as_vec2() + Vec2::splat(0.5)) * self.cell_size()
    }

    /// Cell containing `position`, or `None` outside the grid.
    pub fn try_cell(&self, position: Vec2) -> Option<IVec2> {
        let cell = self.world_to_cell(position);
        self.in_range(cell).then_some(cell)
    }

    /// Center of the cell containing `position`, or `None` outside the grid.
    pub fn try_round_world(&self, position: Vec2) -> Option<Vec2> {
        self.try_cell(position).map(|cell| self.cell_to_world(cell))
    }

    /// Cell containing `position`, clamped to the nearest valid cell.
    pub fn round_clamp_to_cell(&self, position: Vec2) -> IVec2 {
        self.world_to_cell(position)
            .clamp(IVec2::ZERO, IVec2::new(self.cols - 1, self.rows - 1))
    }

    /// Center of the nearest valid cell to `position`.
    pub fn round_clamp_world(&self, position: Vec2) -> Vec2 {
        self.cell_to_world(self.round_clamp_to_cell(position))
    }

    /// Shift a box center so it lies on a cell center.
    ///
    /// A box spanning an even number of cells along an axis is centered on a
    /// cell boundary; an odd number, on a cell middle.
    pub fn box_to_cell_center(&self, box_center: Vec2, box_size: IVec2) -> Vec2 {
        let half = self.cell_size() * 0.5;
        Vec2::new(
            if box_size.x % 2 == 0 { box_center.x - half.x } else { box_center.x },
            if box_size.y % 2 == 0 { box_center.y - half.y } else { box_center.y },
        )
    }

    /// Inverse of [`box_to_cell_center`](Self::box_to_cell_center).
    pub fn cell_to_box_center(&self, cell_center: Vec2, box_size: IVec2) -> Vec2 {
        let half = self.cell_size() * 0.5;
        Vec2::new(
            if box_size.x % 2 == 0 { cell_center.x + half.x } else { cell_center.x },
            if box_size.y % 2 == 0 { cell_center.y + half.y } else { cell_center.y },
        )
    }

    // -- open cell search ---------------------------------------------------

    /// First non-blocking cell on the ring just outside a box.
    ///
    /// `box_size` is in cells. The ring is walked one cell at a time starting
    /// below the box's middle, then to the bottom-left corner, top-left,
    /// top-right, bottom-right and back to the start. Cells outside the grid
    /// are skipped. Returns `None` when the whole ring is blocked.
    pub fn find_open_cell_adjacent_to_box(&self, center: Vec2, box_size: IVec2) -> Option<IVec2> {
        let cell = self.cell_size();
        let half_cell = cell * 0.5;
        let half_box = box_size.as_vec2() * cell * 0.5;

        let start = self.world_to_cell(center + Vec2::new(0.0, -half_box.y - half_cell.y));
        let bottom_left = self.world_to_cell(center - half_box - half_cell);
        let targets = [
            bottom_left,
            bottom_left + IVec2::new(0, box_size.y + 1),
            bottom_left + IVec2::new(box_size.x + 1, box_size.y + 1),
            bottom_left + IVec2::new(box_size.x + 1, 0),
            start,
        ];

        let mut current = start;
        for target in targets {
            loop {
                if self.node(current).is_some_and(|node| node.blocking <= 0) {
                    return Some(current);
                }
                current += (target - current).signum();
                if current == target {
                    break;
                }
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
