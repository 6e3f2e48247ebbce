pub mod dense;

pub use dense::{EdgeState, GridGraph};

use gridroute_common::geom::coord::{EdgeRef, GridCoord};

/// Read-only view of the routing grid used by the maze router's search.
/// Mutation stays on the concrete grid so a search can never change
/// congestion state behind the scheduler's back.
pub trait RoutingGrid: Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn layers(&self) -> u8;

    /// Cached traversal cost of an edge under the current cost model.
    fn cost_of(&self, edge: EdgeRef) -> f64;

    /// Zero-capacity edges are impassable, not merely expensive.
    fn is_blocked(&self, edge: EdgeRef) -> bool;

    /// Enumerate the ≤ 6 neighbors of a cell (4 planar + 2 via), filling
    /// `buf` with (neighbor, connecting edge) pairs.
    fn neighbors(&self, cell: GridCoord, buf: &mut [(GridCoord, EdgeRef); 6]) -> usize {
        let mut n = 0;
        if cell.x > 0 {
            buf[n] = (
                GridCoord::new(cell.x - 1, cell.y, cell.z),
                EdgeRef::east(cell.x - 1, cell.y, cell.z),
            );
            n += 1;
        }
        if cell.x + 1 < self.width() {
            buf[n] = (
                GridCoord::new(cell.x + 1, cell.y, cell.z),
                EdgeRef::east(cell.x, cell.y, cell.z),
            );
            n += 1;
        }
        if cell.y > 0 {
            buf[n] = (
                GridCoord::new(cell.x, cell.y - 1, cell.z),
                EdgeRef::north(cell.x, cell.y - 1, cell.z),
            );
            n += 1;
        }
        if cell.y + 1 < self.height() {
            buf[n] = (
                GridCoord::new(cell.x, cell.y + 1, cell.z),
                EdgeRef::north(cell.x, cell.y, cell.z),
            );
            n += 1;
        }
        if cell.z > 0 {
            buf[n] = (
                GridCoord::new(cell.x, cell.y, cell.z - 1),
                EdgeRef::up(cell.x, cell.y, cell.z - 1),
            );
            n += 1;
        }
        if cell.z + 1 < self.layers() {
            buf[n] = (
                GridCoord::new(cell.x, cell.y, cell.z + 1),
                EdgeRef::up(cell.x, cell.y, cell.z),
            );
            n += 1;
        }
        n
    }
}

/// Edges a cell touches within its own layer, for planar projections.
pub fn planar_incident_edges(
    width: u32,
    height: u32,
    cell: GridCoord,
    buf: &mut [EdgeRef; 4],
) -> usize {
    let mut n = 0;
    if cell.x > 0 {
        buf[n] = EdgeRef::east(cell.x - 1, cell.y, cell.z);
        n += 1;
    }
    if cell.x + 1 < width {
        buf[n] = EdgeRef::east(cell.x, cell.y, cell.z);
        n += 1;
    }
    if cell.y > 0 {
        buf[n] = EdgeRef::north(cell.x, cell.y - 1, cell.z);
        n += 1;
    }
    if cell.y + 1 < height {
        buf[n] = EdgeRef::north(cell.x, cell.y, cell.z);
        n += 1;
    }
    n
}
