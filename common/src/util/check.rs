use crate::db::design::{Connection, Design};
use crate::geom::coord::GridCoord;
use rayon::prelude::*;

/// Post-route verification: every committed path must be a contiguous
/// walk between its connection's endpoints, and each fully-routed net
/// must form one connected tree over its pins.
pub fn run(design: &Design) -> Result<(), String> {
    log::info!("Starting routing verification...");

    let errors: Vec<String> = design
        .nets
        .par_iter()
        .filter_map(|net| {
            for conn in &net.connections {
                if !conn.is_routed() {
                    continue;
                }
                if let Err(msg) = walk(conn) {
                    return Some(format!("Net '{}': {}", net.name, msg));
                }
            }

            if net.connections.iter().any(|c| c.unroutable) {
                // connectivity cannot hold for a net with open connections
                return None;
            }
            if net.grid_pins.len() < 2 {
                return None;
            }
            check_tree(net.grid_pins.len(), &net.connections, &net.grid_pins)
                .err()
                .map(|msg| format!("Net '{}': {}", net.name, msg))
        })
        .collect();

    if errors.is_empty() {
        log::info!("\x1b[32mPASS\x1b[0m: All committed routes are consistent.");
        Ok(())
    } else {
        for e in &errors {
            log::error!("FAIL: {}", e);
        }
        Err(errors.join("; "))
    }
}

fn walk(conn: &Connection) -> Result<(), String> {
    let mut cur = conn.from;
    for edge in &conn.path {
        cur = edge.other_end(cur).ok_or_else(|| {
            format!(
                "path breaks at {:?}: edge {:?} does not touch it",
                cur, edge
            )
        })?;
    }
    if cur != conn.to {
        return Err(format!(
            "path ends at {:?} instead of sink {:?}",
            cur, conn.to
        ));
    }
    Ok(())
}

fn check_tree(
    num_pins: usize,
    connections: &[Connection],
    pins: &[GridCoord],
) -> Result<(), String> {
    let pin_index = |c| pins.iter().position(|&p| p == c);
    let mut parent: Vec<usize> = (0..num_pins).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for conn in connections {
        if !conn.is_routed() {
            continue;
        }
        let (Some(a), Some(b)) = (pin_index(conn.from), pin_index(conn.to)) else {
            return Err(format!(
                "connection {:?} -> {:?} does not terminate on pins",
                conn.from, conn.to
            ));
        };
        let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
        parent[ra] = rb;
    }

    let root = find(&mut parent, 0);
    for i in 1..num_pins {
        if find(&mut parent, i) != root {
            return Err(format!("pin {:?} is disconnected from the tree", pins[i]));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::design::Connection;
    use crate::db::indices::NetId;
    use crate::geom::coord::{EdgeRef, GridCoord};

    fn conn(from: GridCoord, to: GridCoord, path: Vec<EdgeRef>) -> Connection {
        Connection {
            net: NetId::new(0),
            from,
            to,
            path,
            reroutes: 0,
            unroutable: false,
        }
    }

    #[test]
    fn accepts_contiguous_path() {
        let c = conn(
            GridCoord::new(0, 0, 0),
            GridCoord::new(2, 1, 0),
            vec![
                EdgeRef::east(0, 0, 0),
                EdgeRef::east(1, 0, 0),
                EdgeRef::north(2, 0, 0),
            ],
        );
        assert!(walk(&c).is_ok());
    }

    #[test]
    fn rejects_broken_path() {
        let c = conn(
            GridCoord::new(0, 0, 0),
            GridCoord::new(2, 0, 0),
            vec![EdgeRef::east(0, 0, 0), EdgeRef::east(5, 5, 0)],
        );
        assert!(walk(&c).is_err());
    }

    #[test]
    fn rejects_path_to_wrong_sink() {
        let c = conn(
            GridCoord::new(0, 0, 0),
            GridCoord::new(2, 0, 0),
            vec![EdgeRef::east(0, 0, 0)],
        );
        assert!(walk(&c).is_err());
    }

    #[test]
    fn tree_check_spots_disconnection() {
        let pins = vec![
            GridCoord::new(0, 0, 0),
            GridCoord::new(1, 0, 0),
            GridCoord::new(2, 0, 0),
        ];
        let routed = vec![conn(
            pins[0],
            pins[1],
            vec![EdgeRef::east(0, 0, 0)],
        )];
        assert!(check_tree(3, &routed, &pins).is_err());

        let mut full = routed;
        full.push(conn(pins[1], pins[2], vec![EdgeRef::east(1, 0, 0)]));
        assert!(check_tree(3, &full, &pins).is_ok());
    }
}
