//! Net decomposition: break each multi-pin net into two-pin connections
//! forming a spanning tree over its grid pins. Small nets get a Prim MST
//! under Manhattan distance; very large nets fall back to a greedy
//! nearest-neighbor chain so tree construction stays cheap. All ordering
//! is deterministic: ties always resolve to the lowest pin index.

use gridroute_common::db::design::{Connection, Design};
use gridroute_common::db::indices::NetId;
use gridroute_common::geom::coord::GridCoord;

/// Populate `net.connections` for every net. Returns the total number of
/// connections produced.
pub fn decompose(design: &mut Design, mst_pin_threshold: usize) -> usize {
    let mut total = 0;
    for (i, net) in design.nets.iter_mut().enumerate() {
        let id = NetId::new(i);
        net.connections.clear();
        let pins = &net.grid_pins;
        if pins.len() < 2 {
            continue;
        }
        let pairs = if pins.len() <= mst_pin_threshold {
            prim_tree(pins)
        } else {
            nearest_chain(pins)
        };
        for (a, b) in pairs {
            net.connections.push(Connection::new(id, pins[a], pins[b]));
        }
        total += net.connections.len();
    }
    log::info!(
        "Decomposed {} nets into {} two-pin connections",
        design.num_nets(),
        total
    );
    total
}

fn prim_tree(pins: &[GridCoord]) -> Vec<(usize, usize)> {
    let k = pins.len();
    let mut in_tree = vec![false; k];
    let mut best_dist = vec![u32::MAX; k];
    let mut best_parent = vec![0usize; k];

    in_tree[0] = true;
    for j in 1..k {
        best_dist[j] = pins[0].dist(&pins[j]);
    }

    let mut edges = Vec::with_capacity(k - 1);
    for _ in 1..k {
        let mut pick = k;
        let mut pick_dist = u32::MAX;
        for j in 0..k {
            if !in_tree[j] && best_dist[j] < pick_dist {
                pick_dist = best_dist[j];
                pick = j;
            }
        }
        in_tree[pick] = true;
        edges.push((best_parent[pick], pick));

        for j in 0..k {
            if !in_tree[j] {
                let d = pins[pick].dist(&pins[j]);
                // strict < keeps the earlier attachment on ties, so equal
                // alternatives never grow the longest tree edge
                if d < best_dist[j] {
                    best_dist[j] = d;
                    best_parent[j] = pick;
                }
            }
        }
    }
    edges
}

fn nearest_chain(pins: &[GridCoord]) -> Vec<(usize, usize)> {
    let k = pins.len();
    let mut remaining: Vec<usize> = (1..k).collect();
    let mut edges = Vec::with_capacity(k - 1);
    let mut cur = 0usize;
    while !remaining.is_empty() {
        let mut pick = 0usize;
        let mut pick_dist = u32::MAX;
        for (slot, &j) in remaining.iter().enumerate() {
            let d = pins[cur].dist(&pins[j]);
            if d < pick_dist {
                pick_dist = d;
                pick = slot;
            }
        }
        let next = remaining.remove(pick);
        edges.push((cur, next));
        cur = next;
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(pairs: &[(usize, usize)], k: usize) -> bool {
        let mut parent: Vec<usize> = (0..k).collect();
        fn find(p: &mut [usize], mut i: usize) -> usize {
            while p[i] != i {
                p[i] = p[p[i]];
                i = p[i];
            }
            i
        }
        for &(a, b) in pairs {
            let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
            parent[ra] = rb;
        }
        let root = find(&mut parent, 0);
        (1..k).all(|i| find(&mut parent, i) == root)
    }

    #[test]
    fn mst_spans_all_pins() {
        let pins = vec![
            GridCoord::new(0, 0, 0),
            GridCoord::new(9, 0, 0),
            GridCoord::new(9, 9, 0),
            GridCoord::new(0, 9, 0),
            GridCoord::new(5, 5, 0),
        ];
        let edges = prim_tree(&pins);
        assert_eq!(edges.len(), 4);
        assert!(spans(&edges, 5));
    }

    #[test]
    fn mst_picks_short_attachments() {
        // three collinear pins: the tree must chain them, never connect
        // the two far ends directly
        let pins = vec![
            GridCoord::new(0, 0, 0),
            GridCoord::new(10, 0, 0),
            GridCoord::new(5, 0, 0),
        ];
        let edges = prim_tree(&pins);
        let total: u32 = edges.iter().map(|&(a, b)| pins[a].dist(&pins[b])).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn chain_spans_and_is_a_path() {
        let pins: Vec<GridCoord> = (0..12).map(|i| GridCoord::new(i, i % 3, 0)).collect();
        let edges = nearest_chain(&pins);
        assert_eq!(edges.len(), 11);
        assert!(spans(&edges, 12));
        // every node except the ends appears exactly twice
        let mut degree = vec![0; 12];
        for &(a, b) in &edges {
            degree[a] += 1;
            degree[b] += 1;
        }
        assert_eq!(degree.iter().filter(|&&d| d == 1).count(), 2);
    }

    #[test]
    fn decomposition_is_reproducible() {
        let pins = vec![
            GridCoord::new(3, 3, 0),
            GridCoord::new(1, 3, 0), // tie distance with next pin
            GridCoord::new(5, 3, 0),
            GridCoord::new(3, 7, 1),
        ];
        let a = prim_tree(&pins);
        let b = prim_tree(&pins);
        assert_eq!(a, b);
    }

    #[test]
    fn single_pin_nets_produce_no_connections() {
        let mut design = gridroute_common::db::parser::ispd::parse_str(
            "grid 4 4 1\n\
             vertical capacity 4\n\
             horizontal capacity 4\n\
             minimum width 1\n\
             minimum spacing 0\n\
             via spacing 0\n\
             0 0 10 10\n\
             num net 2\n\
             lonely 0 1 1\n\
             5 5 1\n\
             pair 1 2 1\n\
             5 5 1\n\
             35 35 1\n\
             0\n",
        )
        .unwrap();
        let total = decompose(&mut design, 64);
        assert_eq!(total, 1);
        assert!(design.nets[0].connections.is_empty());
        assert_eq!(design.nets[1].connections.len(), 1);
    }
}
