//! Maze routing kernel: best-first shortest path for one two-pin
//! connection over the grid's cached edge costs. Dijkstra by
//! construction (costs are non-negative); an admissible Manhattan
//! heuristic turns it into A* when the mode asks for it.
//!
//! The search never mutates the grid. Committing a found path is the
//! scheduler's decision.

use crate::graph::RoutingGrid;
use gridroute_common::geom::coord::{EdgeRef, GridCoord};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

// fixed-point scale for storing f64 costs in the heap
const SCALE: f64 = 100.0;

#[derive(Copy, Clone, Eq, PartialEq)]
struct State {
    f_score: i64,
    g_score: i64,
    index: u32,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| self.g_score.cmp(&other.g_score))
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Clone, Copy)]
struct RoutingWindow {
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
    width: u32,
    height: u32,
    layers: u8,
}

impl RoutingWindow {
    fn new(
        from: GridCoord,
        to: GridCoord,
        margin: u32,
        grid_w: u32,
        grid_h: u32,
        layers: u8,
    ) -> Self {
        let min_x = from.x.min(to.x).saturating_sub(margin);
        let max_x = (from.x.max(to.x) + margin).min(grid_w - 1);
        let min_y = from.y.min(to.y).saturating_sub(margin);
        let max_y = (from.y.max(to.y) + margin).min(grid_h - 1);
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
            layers,
        }
    }

    fn covers(&self, grid_w: u32, grid_h: u32) -> bool {
        self.min_x == 0 && self.min_y == 0 && self.max_x == grid_w - 1 && self.max_y == grid_h - 1
    }

    fn len(&self) -> usize {
        self.width as usize * self.height as usize * self.layers as usize
    }

    #[inline(always)]
    fn contains(&self, c: GridCoord) -> bool {
        c.x >= self.min_x && c.x <= self.max_x && c.y >= self.min_y && c.y <= self.max_y
    }

    #[inline(always)]
    fn local_idx(&self, c: GridCoord) -> usize {
        let lx = c.x - self.min_x;
        let ly = c.y - self.min_y;
        (c.z as u32 * self.width * self.height + ly * self.width + lx) as usize
    }

    #[inline(always)]
    fn coord(&self, idx: u32) -> GridCoord {
        let plane = self.width * self.height;
        let z = (idx / plane) as u8;
        let rem = idx % plane;
        GridCoord::new(rem % self.width + self.min_x, rem / self.width + self.min_y, z)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SearchLimits {
    /// 0.0 disables the heuristic (plain Dijkstra); 1.0 is admissible.
    pub heuristic_weight: f64,
    /// Per-hop cost of a via edge, used by the layer term of the heuristic.
    pub via_cost: f64,
    /// Initial half-width of the search window around the pin bounding box.
    pub base_margin: u32,
    /// Hard cap on node expansions per window before giving up.
    pub max_expansions: u32,
}

enum SearchFail {
    /// Frontier emptied: nothing reachable inside this window.
    Exhausted,
    /// Expansion budget blown; growing the window will not help.
    OverBudget,
}

/// Reusable search scratch. One instance per worker thread; the
/// generation tag makes clearing between searches O(1).
#[derive(Clone)]
pub struct MazeRouter {
    parents: Vec<u32>,
    g_score: Vec<i64>,
    visited_tag: Vec<u32>,
    current_tag: u32,
    capacity: usize,
}

impl Default for MazeRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl MazeRouter {
    pub fn new() -> Self {
        let cap = 65_536;
        Self {
            parents: vec![u32::MAX; cap],
            g_score: vec![i64::MAX; cap],
            visited_tag: vec![0; cap],
            current_tag: 1,
            capacity: cap,
        }
    }

    fn ensure_capacity(&mut self, size: usize) {
        if size > self.capacity {
            self.capacity = size.max(self.capacity * 2);
            self.parents.resize(self.capacity, u32::MAX);
            self.g_score.resize(self.capacity, i64::MAX);
            self.visited_tag.resize(self.capacity, 0);
        }
    }

    fn reset_window(&mut self) {
        self.current_tag += 1;
        if self.current_tag == 0 {
            self.visited_tag.fill(0);
            self.current_tag = 1;
        }
    }

    /// Find the cheapest path between two cells, or `None` when the sink
    /// is unreachable. Starts inside a windowed bounding box and regrows
    /// it before concluding unreachability, so windowing never fabricates
    /// an `Unroutable` verdict.
    pub fn route<G: RoutingGrid + ?Sized>(
        &mut self,
        grid: &G,
        from: GridCoord,
        to: GridCoord,
        limits: &SearchLimits,
    ) -> Option<Vec<EdgeRef>> {
        if from == to {
            return Some(Vec::new());
        }
        let mut margin = limits.base_margin;
        loop {
            let window =
                RoutingWindow::new(from, to, margin, grid.width(), grid.height(), grid.layers());
            match self.find_in_window(grid, from, to, limits, &window) {
                Ok(path) => return Some(path),
                Err(SearchFail::OverBudget) => return None,
                Err(SearchFail::Exhausted) => {
                    if window.covers(grid.width(), grid.height()) {
                        return None;
                    }
                    margin = margin.saturating_mul(4).max(4);
                }
            }
        }
    }

    fn find_in_window<G: RoutingGrid + ?Sized>(
        &mut self,
        grid: &G,
        from: GridCoord,
        to: GridCoord,
        limits: &SearchLimits,
        window: &RoutingWindow,
    ) -> Result<Vec<EdgeRef>, SearchFail> {
        self.ensure_capacity(window.len());
        self.reset_window();

        let h = |c: GridCoord| -> i64 {
            let planar = c.planar_dist(&to) as f64;
            let vias = c.z.abs_diff(to.z) as f64 * limits.via_cost;
            ((planar + vias) * limits.heuristic_weight * SCALE) as i64
        };

        let mut heap = BinaryHeap::new();
        let start_local = window.local_idx(from);
        self.g_score[start_local] = 0;
        self.visited_tag[start_local] = self.current_tag;
        self.parents[start_local] = u32::MAX;
        heap.push(State {
            f_score: h(from),
            g_score: 0,
            index: start_local as u32,
        });

        let mut expansions = 0u32;
        let mut buf = [(GridCoord::new(0, 0, 0), EdgeRef::east(0, 0, 0)); 6];

        while let Some(State { g_score, index, .. }) = heap.pop() {
            let curr_local = index as usize;
            if g_score > self.g_score[curr_local] {
                continue; // stale entry
            }
            let position = window.coord(index);
            if position == to {
                return Ok(self.reconstruct(to, window));
            }

            expansions += 1;
            if expansions > limits.max_expansions {
                return Err(SearchFail::OverBudget);
            }

            let n = grid.neighbors(position, &mut buf);
            for &(neighbor, edge) in &buf[..n] {
                if !window.contains(neighbor) {
                    continue;
                }
                if grid.is_blocked(edge) {
                    continue;
                }
                let step = (grid.cost_of(edge) * SCALE) as i64;
                let tentative = g_score + step;
                let local = window.local_idx(neighbor);
                if self.visited_tag[local] != self.current_tag || tentative < self.g_score[local] {
                    self.parents[local] = curr_local as u32;
                    self.g_score[local] = tentative;
                    self.visited_tag[local] = self.current_tag;
                    heap.push(State {
                        f_score: tentative + h(neighbor),
                        g_score: tentative,
                        index: local as u32,
                    });
                }
            }
        }
        Err(SearchFail::Exhausted)
    }

    fn reconstruct(&self, to: GridCoord, window: &RoutingWindow) -> Vec<EdgeRef> {
        let mut path = Vec::new();
        let mut curr_local = window.local_idx(to);
        let mut curr = to;
        loop {
            let parent = self.parents[curr_local];
            if parent == u32::MAX {
                break;
            }
            let prev = window.coord(parent);
            // adjacent by construction
            path.push(EdgeRef::between(curr, prev).unwrap());
            curr = prev;
            curr_local = parent as usize;
        }
        path.reverse();
        path
    }
}
