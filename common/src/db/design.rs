use crate::db::indices::NetId;
use crate::geom::coord::{EdgeRef, GridCoord};
use std::collections::HashMap;

/// Per-layer routing resources as read from the benchmark. Capacities are
/// in the benchmark's raw units; `tracks()` converts to routing tracks by
/// dividing out the wire pitch (minimum width + minimum spacing).
#[derive(Clone, Debug)]
pub struct LayerInfo {
    pub index: u8,
    pub vertical_capacity: u32,
    pub horizontal_capacity: u32,
    pub min_width: u32,
    pub min_spacing: u32,
    pub via_spacing: u32,
}

impl LayerInfo {
    #[inline]
    pub fn pitch(&self) -> u32 {
        (self.min_width + self.min_spacing).max(1)
    }

    #[inline]
    pub fn horizontal_tracks(&self) -> u32 {
        self.horizontal_capacity / self.pitch()
    }

    #[inline]
    pub fn vertical_tracks(&self) -> u32 {
        self.vertical_capacity / self.pitch()
    }
}

/// A pin position in benchmark (world) coordinates, layer 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinLocation {
    pub x: i32,
    pub y: i32,
    pub layer: u8,
}

/// A two-pin subdivision of a net, the atomic unit the maze router solves.
/// An empty `path` means the connection is not currently committed.
#[derive(Clone, Debug)]
pub struct Connection {
    pub net: NetId,
    pub from: GridCoord,
    pub to: GridCoord,
    pub path: Vec<EdgeRef>,
    pub reroutes: u32,
    pub unroutable: bool,
}

impl Connection {
    pub fn new(net: NetId, from: GridCoord, to: GridCoord) -> Self {
        Self {
            net,
            from,
            to,
            path: Vec::new(),
            reroutes: 0,
            unroutable: false,
        }
    }

    #[inline]
    pub fn is_routed(&self) -> bool {
        !self.path.is_empty()
    }

    #[inline]
    pub fn hpwl(&self) -> u32 {
        self.from.dist(&self.to)
    }
}

#[derive(Clone, Debug)]
pub struct NetData {
    pub name: String,
    pub id: u32,
    pub min_width: u32,
    pub pins: Vec<PinLocation>,
    /// Distinct pin cells after snapping to the grid.
    pub grid_pins: Vec<GridCoord>,
    /// Two-pin decomposition; populated by the router.
    pub connections: Vec<Connection>,
}

impl NetData {
    /// Half-perimeter of the planar bounding box of the net's grid pins.
    /// Used to order nets so the largest route first.
    pub fn bbox_half_perimeter(&self) -> u64 {
        if self.grid_pins.is_empty() {
            return 0;
        }
        let mut min_x = u32::MAX;
        let mut max_x = 0u32;
        let mut min_y = u32::MAX;
        let mut max_y = 0u32;
        for p in &self.grid_pins {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
        (max_x - min_x) as u64 + (max_y - min_y) as u64
    }
}

/// Capacity adjustment between two adjacent cells (a blockage or partial
/// blockage). Coordinates are grid cells, layer 0-based; `reduced_capacity`
/// is the remaining raw capacity of the edge.
#[derive(Clone, Copy, Debug)]
pub struct CapacityAdjustment {
    pub from: (u32, u32, u8),
    pub to: (u32, u32, u8),
    pub reduced_capacity: u32,
}

/// The loaded benchmark: grid geometry, per-layer resources, nets.
/// This is the single in-memory design database; the router decorates it
/// with connections and committed paths, the way a placed netlist carries
/// its route segments.
#[derive(Debug)]
pub struct Design {
    pub grid_width: u32,
    pub grid_height: u32,
    pub num_layers: u8,
    pub layers: Vec<LayerInfo>,

    pub origin_x: i32,
    pub origin_y: i32,
    pub tile_width: i32,
    pub tile_height: i32,

    pub nets: Vec<NetData>,
    pub adjustments: Vec<CapacityAdjustment>,

    pub net_name_map: HashMap<String, NetId>,
}

impl Design {
    pub fn num_nets(&self) -> usize {
        self.nets.len()
    }

    /// Snap a world coordinate to its grid cell, clamped to the grid.
    pub fn to_grid(&self, x: i32, y: i32, layer: u8) -> GridCoord {
        let tw = self.tile_width.max(1) as i64;
        let th = self.tile_height.max(1) as i64;
        let gx = ((x as i64 - self.origin_x as i64) / tw)
            .clamp(0, self.grid_width as i64 - 1) as u32;
        let gy = ((y as i64 - self.origin_y as i64) / th)
            .clamp(0, self.grid_height as i64 - 1) as u32;
        GridCoord::new(gx, gy, layer)
    }

    /// Center of a grid cell in world coordinates.
    pub fn to_world(&self, c: GridCoord) -> (i32, i32) {
        (
            self.origin_x + c.x as i32 * self.tile_width + self.tile_width / 2,
            self.origin_y + c.y as i32 * self.tile_height + self.tile_height / 2,
        )
    }

    /// Snap every net's pins to the grid and drop duplicates, preserving
    /// first-seen order so decomposition stays reproducible.
    pub fn populate_grid_pins(&mut self) {
        let tw = self.tile_width;
        let th = self.tile_height;
        let (ox, oy) = (self.origin_x, self.origin_y);
        let (w, h) = (self.grid_width, self.grid_height);
        for net in &mut self.nets {
            net.grid_pins.clear();
            for pin in &net.pins {
                let gx = ((pin.x as i64 - ox as i64) / tw.max(1) as i64)
                    .clamp(0, w as i64 - 1) as u32;
                let gy = ((pin.y as i64 - oy as i64) / th.max(1) as i64)
                    .clamp(0, h as i64 - 1) as u32;
                let cell = GridCoord::new(gx, gy, pin.layer);
                if !net.grid_pins.contains(&cell) {
                    net.grid_pins.push(cell);
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct RoutedNet {
    pub net: NetId,
    pub name: String,
    pub paths: Vec<Vec<EdgeRef>>,
}

/// Immutable snapshot of a finished routing pass: net → committed paths.
#[derive(Clone, Debug, Default)]
pub struct RoutingResult {
    pub nets: Vec<RoutedNet>,
}

impl RoutingResult {
    pub fn from_design(design: &Design) -> Self {
        let nets = design
            .nets
            .iter()
            .enumerate()
            .map(|(i, net)| RoutedNet {
                net: NetId::new(i),
                name: net.name.clone(),
                paths: net
                    .connections
                    .iter()
                    .filter(|c| c.is_routed())
                    .map(|c| c.path.clone())
                    .collect(),
            })
            .collect();
        Self { nets }
    }

    pub fn is_empty(&self) -> bool {
        self.nets.iter().all(|n| n.paths.is_empty())
    }

    pub fn total_edges(&self) -> usize {
        self.nets
            .iter()
            .map(|n| n.paths.iter().map(Vec::len).sum::<usize>())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_design() -> Design {
        Design {
            grid_width: 8,
            grid_height: 6,
            num_layers: 2,
            layers: Vec::new(),
            origin_x: 100,
            origin_y: 200,
            tile_width: 10,
            tile_height: 20,
            nets: Vec::new(),
            adjustments: Vec::new(),
            net_name_map: HashMap::new(),
        }
    }

    #[test]
    fn world_grid_snapping_clamps() {
        let d = empty_design();
        assert_eq!(d.to_grid(100, 200, 0), GridCoord::new(0, 0, 0));
        assert_eq!(d.to_grid(125, 245, 1), GridCoord::new(2, 2, 1));
        // far outside the die clamps to the boundary cell
        assert_eq!(d.to_grid(-5000, 99999, 0), GridCoord::new(0, 5, 0));
    }

    #[test]
    fn grid_pins_dedup_preserves_order() {
        let mut d = empty_design();
        d.nets.push(NetData {
            name: "n0".into(),
            id: 0,
            min_width: 1,
            pins: vec![
                PinLocation { x: 175, y: 290, layer: 0 },
                PinLocation { x: 101, y: 201, layer: 0 },
                PinLocation { x: 178, y: 295, layer: 0 }, // same tile as first
            ],
            grid_pins: Vec::new(),
            connections: Vec::new(),
        });
        d.populate_grid_pins();
        assert_eq!(
            d.nets[0].grid_pins,
            vec![GridCoord::new(7, 4, 0), GridCoord::new(0, 0, 0)]
        );
    }

    #[test]
    fn bbox_half_perimeter_matches_extent() {
        let mut d = empty_design();
        d.nets.push(NetData {
            name: "n0".into(),
            id: 0,
            min_width: 1,
            pins: Vec::new(),
            grid_pins: vec![
                GridCoord::new(1, 1, 0),
                GridCoord::new(4, 0, 0),
                GridCoord::new(2, 5, 0),
            ],
            connections: Vec::new(),
        });
        assert_eq!(d.nets[0].bbox_half_perimeter(), 3 + 5);
    }
}
