use super::RoutingGrid;
use gridroute_common::db::design::Design;
use gridroute_common::error::CapacityConsistencyError;
use gridroute_common::geom::coord::{EdgeDir, EdgeRef};

/// Vias are modeled without a capacity limit; this sentinel keeps them out
/// of every overflow computation.
pub const UNCAPACITATED: u32 = u32::MAX;

// 16 bytes per edge, flat arrays for cache locality.
#[derive(Clone, Copy, Debug)]
pub struct EdgeState {
    pub capacity: u32,
    pub usage: u32,
    pub history: f32,
    pub cost: f32,
}

impl EdgeState {
    fn with_capacity(capacity: u32) -> Self {
        Self {
            capacity,
            usage: 0,
            history: 0.0,
            cost: 1.0,
        }
    }

    #[inline]
    pub fn overflow(&self) -> u32 {
        if self.capacity == UNCAPACITATED {
            return 0;
        }
        self.usage.saturating_sub(self.capacity)
    }
}

/// Dense 3D grid of routing edges: per-layer East and North blocks plus an
/// Up (via) block between adjacent layers. The single writable source of
/// congestion truth; everything else reads it or asks it to mutate.
pub struct GridGraph {
    width: u32,
    height: u32,
    layers: u8,
    east_per_layer: usize,
    north_per_layer: usize,
    east_total: usize,
    north_total: usize,
    edges: Vec<EdgeState>,
}

impl GridGraph {
    pub fn new(width: u32, height: u32, layers: u8) -> Self {
        assert!(width > 0 && height > 0 && layers > 0, "degenerate grid");
        let east_per_layer = (width as usize - 1) * height as usize;
        let north_per_layer = width as usize * (height as usize - 1);
        let east_total = east_per_layer * layers as usize;
        let north_total = north_per_layer * layers as usize;
        let via_total = width as usize * height as usize * (layers as usize - 1);
        let size = east_total + north_total + via_total;

        if size > 500_000_000 {
            log::warn!("Allocating large GridGraph: {} edges. Ensure sufficient RAM.", size);
        }

        let mut edges = vec![EdgeState::with_capacity(0); size];
        for e in edges[east_total + north_total..].iter_mut() {
            e.capacity = UNCAPACITATED;
        }
        Self {
            width,
            height,
            layers,
            east_per_layer,
            north_per_layer,
            east_total,
            north_total,
            edges,
        }
    }

    /// Build the grid from a loaded design: directional per-layer track
    /// capacities, then the benchmark's capacity adjustments.
    pub fn from_design(design: &Design) -> Self {
        let mut grid = Self::new(design.grid_width, design.grid_height, design.num_layers);

        for layer in &design.layers {
            let z = layer.index;
            let h_tracks = layer.horizontal_tracks();
            let v_tracks = layer.vertical_tracks();
            let east_base = z as usize * grid.east_per_layer;
            for e in grid.edges[east_base..east_base + grid.east_per_layer].iter_mut() {
                e.capacity = h_tracks;
            }
            let north_base = grid.east_total + z as usize * grid.north_per_layer;
            for e in grid.edges[north_base..north_base + grid.north_per_layer].iter_mut() {
                e.capacity = v_tracks;
            }
        }

        for adj in &design.adjustments {
            let (x1, y1, z1) = adj.from;
            let (x2, y2, z2) = adj.to;
            if z1 != z2 {
                log::warn!("Skipping cross-layer capacity adjustment {:?}", adj);
                continue;
            }
            let dx = x1.abs_diff(x2);
            let dy = y1.abs_diff(y2);
            if dx + dy != 1 {
                log::warn!("Skipping non-adjacent capacity adjustment {:?}", adj);
                continue;
            }
            let edge = if dx == 1 {
                EdgeRef::east(x1.min(x2), y1, z1)
            } else {
                EdgeRef::north(x1, y1.min(y2), z1)
            };
            let layer = &design.layers[z1 as usize];
            let layer_tracks = if dx == 1 {
                layer.horizontal_tracks()
            } else {
                layer.vertical_tracks()
            };
            let reduced_tracks = adj.reduced_capacity / layer.pitch();
            let delta = layer_tracks.saturating_sub(reduced_tracks) as i64;
            grid.adjust_capacity(edge, -delta);
        }

        grid
    }

    #[inline(always)]
    pub fn index(&self, e: EdgeRef) -> usize {
        match e.dir {
            EdgeDir::East => {
                debug_assert!(e.x + 1 < self.width && e.y < self.height);
                e.z as usize * self.east_per_layer
                    + e.y as usize * (self.width as usize - 1)
                    + e.x as usize
            }
            EdgeDir::North => {
                debug_assert!(e.x < self.width && e.y + 1 < self.height);
                self.east_total
                    + e.z as usize * self.north_per_layer
                    + e.y as usize * self.width as usize
                    + e.x as usize
            }
            EdgeDir::Up => {
                debug_assert!((e.z as usize) + 1 < self.layers as usize);
                self.east_total
                    + self.north_total
                    + e.z as usize * (self.width as usize * self.height as usize)
                    + e.y as usize * self.width as usize
                    + e.x as usize
            }
        }
    }

    #[inline]
    pub fn state_of(&self, e: EdgeRef) -> EdgeState {
        self.edges[self.index(e)]
    }

    #[inline]
    pub fn capacity_of(&self, e: EdgeRef) -> u32 {
        self.edges[self.index(e)].capacity
    }

    #[inline]
    pub fn usage_of(&self, e: EdgeRef) -> u32 {
        self.edges[self.index(e)].usage
    }

    #[inline]
    pub fn history_of(&self, e: EdgeRef) -> f32 {
        self.edges[self.index(e)].history
    }

    #[inline]
    pub fn is_overflowed(&self, e: EdgeRef) -> bool {
        self.edges[self.index(e)].overflow() > 0
    }

    /// Capacity delta for blockages; saturates at zero and leaves vias
    /// untouched (they carry no capacity to adjust).
    pub fn adjust_capacity(&mut self, e: EdgeRef, delta: i64) {
        if e.is_via() {
            return;
        }
        let idx = self.index(e);
        let cap = &mut self.edges[idx].capacity;
        *cap = (*cap as i64 + delta).clamp(0, u32::MAX as i64 - 1) as u32;
    }

    /// Occupy every edge of a committed path.
    pub fn commit(&mut self, path: &[EdgeRef]) {
        for &e in path {
            let idx = self.index(e);
            unsafe {
                self.edges.get_unchecked_mut(idx).usage += 1;
            }
        }
    }

    /// Release every edge of a previously committed path. Driving any
    /// usage below zero means the bookkeeping is corrupt; that is
    /// reported, never clamped.
    pub fn uncommit(&mut self, path: &[EdgeRef]) -> Result<(), CapacityConsistencyError> {
        for &e in path {
            let idx = self.index(e);
            let state = &mut self.edges[idx];
            if state.usage == 0 {
                return Err(CapacityConsistencyError { edge: e });
            }
            state.usage -= 1;
        }
        Ok(())
    }

    /// Accumulate history cost on every currently overflowed edge
    /// (the negotiated-congestion term carried into the next iteration).
    pub fn update_history(&mut self, increment: f64) {
        for e in self.edges[..self.east_total + self.north_total].iter_mut() {
            let of = e.overflow();
            if of > 0 {
                e.history += of as f32 * increment as f32;
            }
        }
    }

    pub fn total_overflow(&self) -> u64 {
        self.edges[..self.east_total + self.north_total]
            .iter()
            .map(|e| e.overflow() as u64)
            .sum()
    }

    pub fn max_overflow(&self) -> u32 {
        self.edges[..self.east_total + self.north_total]
            .iter()
            .map(|e| e.overflow())
            .max()
            .unwrap_or(0)
    }

    /// Total committed planar edge traversals (grid wirelength).
    pub fn planar_usage(&self) -> u64 {
        self.edges[..self.east_total + self.north_total]
            .iter()
            .map(|e| e.usage as u64)
            .sum()
    }

    /// Total committed via traversals.
    pub fn via_usage(&self) -> u64 {
        self.edges[self.east_total + self.north_total..]
            .iter()
            .map(|e| e.usage as u64)
            .sum()
    }

    #[inline]
    pub fn set_cost(&mut self, e: EdgeRef, cost: f64) {
        let idx = self.index(e);
        self.edges[idx].cost = cost as f32;
    }

    pub(crate) fn edges_mut(&mut self) -> &mut [EdgeState] {
        &mut self.edges
    }

    pub(crate) fn planar_len(&self) -> usize {
        self.east_total + self.north_total
    }
}

impl RoutingGrid for GridGraph {
    fn width(&self) -> u32 {
        self.width
    }
    fn height(&self) -> u32 {
        self.height
    }
    fn layers(&self) -> u8 {
        self.layers
    }

    #[inline(always)]
    fn cost_of(&self, edge: EdgeRef) -> f64 {
        let idx = self.index(edge);
        unsafe { self.edges.get_unchecked(idx).cost as f64 }
    }

    #[inline(always)]
    fn is_blocked(&self, edge: EdgeRef) -> bool {
        let idx = self.index(edge);
        unsafe { self.edges.get_unchecked(idx).capacity == 0 }
    }
}
