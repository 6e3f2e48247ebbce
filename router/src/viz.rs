//! Planar congestion projection: collapse the 3D grid to one cell per
//! (x, y) by taking the worst usage/capacity ratio over the cell's
//! incident planar edges across all layers. Cells whose every incident
//! edge is blocked render as blocked.

use crate::graph::dense::GridGraph;
use crate::graph::{planar_incident_edges, RoutingGrid};
use gridroute_common::geom::coord::{EdgeRef, GridCoord};
use gridroute_common::util::visualization::{CongestionCell, CongestionMap};

pub fn congestion_map(grid: &GridGraph) -> CongestionMap {
    let mut map = CongestionMap::new(grid.width(), grid.height());
    let mut buf = [EdgeRef::east(0, 0, 0); 4];

    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let mut best = CongestionCell::default();
            let mut best_ratio = -1.0f64;
            for z in 0..grid.layers() {
                let n = planar_incident_edges(
                    grid.width(),
                    grid.height(),
                    GridCoord::new(x, y, z),
                    &mut buf,
                );
                for &e in &buf[..n] {
                    let s = grid.state_of(e);
                    if s.capacity == 0 {
                        continue;
                    }
                    let ratio = s.usage as f64 / s.capacity as f64;
                    if ratio > best_ratio {
                        best_ratio = ratio;
                        best = CongestionCell {
                            usage: s.usage,
                            capacity: s.capacity,
                        };
                    }
                }
            }
            *map.at_mut(x, y) = best;
        }
    }
    map
}
