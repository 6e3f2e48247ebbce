//! Rip-up & reroute control loop.
//!
//! The scheduler owns the run's state machine:
//! `InitialRoute -> Converging -> {Converged, BudgetExhausted}`. Each
//! converging iteration recomputes overflow from the settled grid, rips
//! up every connection touching an overflowed edge, bumps history costs,
//! re-tunes the cost model, and reroutes the victims. Searches inside a
//! batch run in parallel against the same grid snapshot; commits are
//! applied sequentially in a fixed order so identical inputs always
//! produce identical congestion state.

use crate::cost::CostModel;
use crate::decompose;
use crate::graph::dense::GridGraph;
use crate::maze::{MazeRouter, SearchLimits};
use gridroute_common::db::design::Design;
use gridroute_common::error::CapacityConsistencyError;
use gridroute_common::geom::coord::{EdgeRef, GridCoord};
use gridroute_common::util::config::{ModeParams, RouteConfig};
use gridroute_common::util::profiler::ScopedTimer;
use priority_queue::PriorityQueue;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::cmp::Reverse;
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    InitialRoute,
    Converging,
    Converged,
    BudgetExhausted,
}

#[derive(Clone, Debug)]
pub struct RouteStats {
    pub state: SchedulerState,
    pub iterations: usize,
    pub total_overflow: u64,
    pub max_overflow: u32,
    pub unroutable: usize,
    /// Total overflow observed at the top of each converging iteration,
    /// ending with the value the loop terminated on.
    pub overflow_trace: Vec<u64>,
}

#[derive(Clone, Copy)]
struct ConnHandle {
    net: usize,
    idx: usize,
}

pub fn run(
    design: &mut Design,
    grid: &mut GridGraph,
    cfg: &RouteConfig,
    params: ModeParams,
    adaptive: bool,
    history: bool,
) -> Result<RouteStats, CapacityConsistencyError> {
    let mut state = SchedulerState::InitialRoute;
    log::debug!("Scheduler entering {:?}", state);

    decompose::decompose(design, cfg.mst_pin_threshold);
    let handles = flatten(design);

    let limits = SearchLimits {
        heuristic_weight: params.heuristic_weight,
        via_cost: cfg.via_cost,
        base_margin: cfg.window_margin,
        max_expansions: cfg.max_expansions,
    };
    let mut cost = CostModel::new(&params, cfg);
    cost.build_cost(grid);

    {
        let _t = ScopedTimer::new("initial route");
        initial_route(design, grid, &cost, cfg, &limits, &handles);
    }

    state = SchedulerState::Converging;
    let mut iterations = 0usize;
    let mut prev_overflow = u64::MAX;
    let mut overflow_trace = Vec::new();

    loop {
        let overflow = grid.total_overflow();
        overflow_trace.push(overflow);
        if overflow == 0 {
            log::info!("Routing converged after {} iterations", iterations);
            state = SchedulerState::Converged;
            break;
        }
        if iterations >= params.max_iterations {
            log::warn!(
                "Iteration budget ({}) exhausted with overflow {}",
                params.max_iterations,
                overflow
            );
            state = SchedulerState::BudgetExhausted;
            break;
        }
        iterations += 1;
        let iter_start = Instant::now();

        if history {
            grid.update_history(cfg.history_increment);
        }
        if adaptive {
            cost.adapt(prev_overflow, overflow);
        }
        prev_overflow = overflow;

        // rip up everything touching an overflowed edge, plus previous
        // failures so they get another attempt under the new costs
        let mut victims = Vec::new();
        for (id, h) in handles.iter().enumerate() {
            let conn = &design.nets[h.net].connections[h.idx];
            if conn.is_routed() {
                if conn.path.iter().any(|&e| grid.is_overflowed(e)) {
                    victims.push(id);
                }
            } else if conn.unroutable {
                victims.push(id);
            }
        }
        for &id in &victims {
            let h = handles[id];
            let conn = &mut design.nets[h.net].connections[h.idx];
            if conn.is_routed() {
                grid.uncommit(&std::mem::take(&mut conn.path))?;
            }
            conn.reroutes += 1;
        }
        cost.build_cost(grid);

        let order = reroute_order(design, &handles, &victims, cfg.seed ^ iterations as u64);
        let ripped = order.len();

        if ripped < cfg.parallel_threshold {
            reroute_sequential(design, grid, &cost, &limits, &handles, &order);
        } else {
            reroute_parallel(design, grid, &cost, cfg, &limits, &handles, &order);
        }

        let (alpha, beta) = cost.weights();
        log::info!(
            "RRR iter {}: overflow {}, ripped {}, alpha {:.2}, beta {:.2}, time {}ms",
            iterations,
            overflow,
            ripped,
            alpha,
            beta,
            iter_start.elapsed().as_millis()
        );
    }

    let unroutable = handles
        .iter()
        .filter(|h| design.nets[h.net].connections[h.idx].unroutable)
        .count();
    if unroutable > 0 {
        log::warn!("{} connections remain unroutable at termination", unroutable);
    }

    Ok(RouteStats {
        state,
        iterations,
        total_overflow: grid.total_overflow(),
        max_overflow: grid.max_overflow(),
        unroutable,
        overflow_trace,
    })
}

fn flatten(design: &Design) -> Vec<ConnHandle> {
    let mut handles = Vec::new();
    for (net, data) in design.nets.iter().enumerate() {
        for idx in 0..data.connections.len() {
            handles.push(ConnHandle { net, idx });
        }
    }
    handles
}

/// Route every connection once, largest nets first — they need the most
/// freedom to avoid congestion, so they go while the grid is empty.
fn initial_route(
    design: &mut Design,
    grid: &mut GridGraph,
    cost: &CostModel,
    cfg: &RouteConfig,
    limits: &SearchLimits,
    handles: &[ConnHandle],
) {
    let mut order: Vec<usize> = (0..handles.len()).collect();
    order.sort_by_key(|&id| {
        let h = handles[id];
        (Reverse(design.nets[h.net].bbox_half_perimeter()), id)
    });

    log::info!("Initial route: {} connections", order.len());
    let mut failures = 0usize;
    for chunk in order.chunks(cfg.batch_size.max(1)) {
        let results = search_batch(design, grid, limits, handles, chunk);
        for (id, path) in results {
            let h = handles[id];
            let conn = &mut design.nets[h.net].connections[h.idx];
            match path {
                Some(p) => {
                    grid.commit(&p);
                    conn.path = p;
                    conn.unroutable = false;
                }
                None => {
                    conn.unroutable = true;
                    failures += 1;
                }
            }
        }
        cost.build_cost(grid);
    }
    if failures > 0 {
        log::warn!("Initial route: {} connections unroutable", failures);
    }
}

/// Parallel search over one batch. The searches all read the same settled
/// grid; the caller commits the results in `chunk` order.
fn search_batch(
    design: &Design,
    grid: &GridGraph,
    limits: &SearchLimits,
    handles: &[ConnHandle],
    chunk: &[usize],
) -> Vec<(usize, Option<Vec<EdgeRef>>)> {
    let endpoints: Vec<(usize, GridCoord, GridCoord)> = chunk
        .iter()
        .map(|&id| {
            let h = handles[id];
            let conn = &design.nets[h.net].connections[h.idx];
            (id, conn.from, conn.to)
        })
        .collect();

    endpoints
        .par_iter()
        .map_with(MazeRouter::new(), |solver, &(id, from, to)| {
            (id, solver.route(grid, from, to, limits))
        })
        .collect()
}

fn reroute_sequential(
    design: &mut Design,
    grid: &mut GridGraph,
    cost: &CostModel,
    limits: &SearchLimits,
    handles: &[ConnHandle],
    order: &[usize],
) {
    let mut solver = MazeRouter::new();
    for &id in order {
        let h = handles[id];
        let (from, to) = {
            let conn = &design.nets[h.net].connections[h.idx];
            (conn.from, conn.to)
        };
        let path = solver.route(grid, from, to, limits);
        let conn = &mut design.nets[h.net].connections[h.idx];
        match path {
            Some(p) => {
                grid.commit(&p);
                // keep the cache fresh so the next victim sees this commit
                for &e in &p {
                    let s = grid.state_of(e);
                    grid.set_cost(e, cost.edge_cost(s.capacity, s.usage, s.history));
                }
                conn.path = p;
                conn.unroutable = false;
            }
            None => conn.unroutable = true,
        }
    }
}

fn reroute_parallel(
    design: &mut Design,
    grid: &mut GridGraph,
    cost: &CostModel,
    cfg: &RouteConfig,
    limits: &SearchLimits,
    handles: &[ConnHandle],
    order: &[usize],
) {
    for chunk in order.chunks(cfg.batch_size.max(1)) {
        let results = search_batch(design, grid, limits, handles, chunk);
        for (id, path) in results {
            let h = handles[id];
            let conn = &mut design.nets[h.net].connections[h.idx];
            match path {
                Some(p) => {
                    grid.commit(&p);
                    conn.path = p;
                    conn.unroutable = false;
                }
                None => conn.unroutable = true,
            }
        }
        cost.build_cost(grid);
    }
}

/// Order ripped connections for rerouting: hardest first (large span,
/// chronic rerouters), with a seeded shuffle deciding among equal scores
/// so livelock cycles break differently each iteration while staying
/// reproducible across runs.
fn reroute_order(
    design: &Design,
    handles: &[ConnHandle],
    victims: &[usize],
    seed: u64,
) -> Vec<usize> {
    let mut shuffled = victims.to_vec();
    let mut rng = StdRng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);

    let mut queue: PriorityQueue<usize, (u64, Reverse<usize>)> = PriorityQueue::new();
    for (slot, &id) in shuffled.iter().enumerate() {
        let h = handles[id];
        let conn = &design.nets[h.net].connections[h.idx];
        let score = conn.hpwl() as u64 + conn.reroutes as u64 * 4;
        queue.push(id, (score, Reverse(slot)));
    }

    let mut order = Vec::with_capacity(queue.len());
    while let Some((id, _)) = queue.pop() {
        order.push(id);
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridroute_common::db::parser::ispd;
    use gridroute_common::util::check;
    use gridroute_common::util::config::Mode;

    fn route_bench(input: &str, mode: Mode) -> (Design, GridGraph, RouteStats) {
        let mut design = ispd::parse_str(input).unwrap();
        let mut grid = GridGraph::from_design(&design);
        let cfg = RouteConfig::default();
        let params = ModeParams::resolve(mode, &cfg);
        let stats = run(&mut design, &mut grid, &cfg, params, true, true).unwrap();
        (design, grid, stats)
    }

    const AMPLE: &str = "\
grid 8 8 2
vertical capacity 0 20
horizontal capacity 20 0
minimum width 1 1
minimum spacing 0 0
via spacing 0 0
0 0 10 10
num net 3
a 0 2 1
5 5 1
75 5 1
b 1 2 1
5 15 1
75 75 1
c 2 3 1
15 25 1
45 25 1
45 75 1
0
";

    #[test]
    fn empty_design_converges_trivially() {
        let (_, grid, stats) = route_bench(
            "grid 4 4 1\n\
             vertical capacity 8\n\
             horizontal capacity 8\n\
             minimum width 1\n\
             minimum spacing 0\n\
             via spacing 0\n\
             0 0 10 10\n\
             num net 0\n\
             0\n",
            Mode::Balanced,
        );
        assert_eq!(stats.state, SchedulerState::Converged);
        assert_eq!(stats.iterations, 0);
        assert_eq!(stats.total_overflow, 0);
        assert_eq!(grid.planar_usage(), 0);
    }

    #[test]
    fn ample_capacity_converges_in_initial_pass() {
        let (design, _, stats) = route_bench(AMPLE, Mode::Balanced);
        assert_eq!(stats.state, SchedulerState::Converged);
        assert_eq!(stats.iterations, 0);
        assert_eq!(stats.total_overflow, 0);
        assert_eq!(stats.unroutable, 0);
        assert!(check::run(&design).is_ok());
        for net in &design.nets {
            assert!(net.connections.iter().all(|c| c.is_routed()));
        }
    }

    #[test]
    fn contention_is_negotiated_away() {
        // four nets share a 2-track corridor; only rip-up and detours can
        // clear the overflow
        let input = "\
grid 8 5 2
vertical capacity 0 2
horizontal capacity 2 0
minimum width 1 1
minimum spacing 0 0
via spacing 0 0
0 0 10 10
num net 4
n0 0 2 1
5 25 1
75 25 1
n1 1 2 1
5 25 1
75 25 1
n2 2 2 1
5 25 1
75 25 1
n3 3 2 1
5 25 1
75 25 1
0
";
        let (design, grid, stats) = route_bench(input, Mode::Quality);
        assert_eq!(stats.state, SchedulerState::Converged);
        assert_eq!(stats.total_overflow, 0);
        assert_eq!(grid.total_overflow(), 0);
        assert!(stats.iterations >= 1);
        assert!(check::run(&design).is_ok());

        // overflow trends downward under history optimization: the later
        // half of the trace never averages worse than the earlier half
        let trace = &stats.overflow_trace;
        assert!(trace.len() >= 2);
        let mid = trace.len() / 2;
        let avg = |s: &[u64]| s.iter().sum::<u64>() as f64 / s.len() as f64;
        assert!(avg(&trace[mid..]) <= avg(&trace[..mid]));
        assert_eq!(*trace.last().unwrap(), 0);
    }

    #[test]
    fn blocked_net_is_reported_not_fatal() {
        // zero-capacity adjustments wall off every crossing between x=1
        // and x=2, so net `walled` spans the wall while `free` stays on
        // the open side
        let input = "\
grid 5 3 1
vertical capacity 4
horizontal capacity 4
minimum width 1
minimum spacing 0
via spacing 0
0 0 10 10
num net 2
walled 0 2 1
5 15 1
45 15 1
free 1 2 1
25 5 1
45 5 1
3
1 0 1 2 0 1 0
1 1 1 2 1 1 0
1 2 1 2 2 1 0
";
        let mut design = ispd::parse_str(input).unwrap();
        let mut grid = GridGraph::from_design(&design);
        for y in 0..3 {
            let e = EdgeRef::east(1, y, 0);
            assert_eq!(grid.capacity_of(e), 0);
        }
        let cfg = RouteConfig::default();
        let params = ModeParams::resolve(Mode::Balanced, &cfg);
        let stats = run(&mut design, &mut grid, &cfg, params, true, true).unwrap();

        assert_eq!(stats.unroutable, 1);
        assert!(design.nets[0].connections[0].unroutable);
        assert!(design.nets[1].connections[0].is_routed());
        assert_eq!(stats.total_overflow, 0);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let collect_paths = |design: &Design| -> Vec<Vec<EdgeRef>> {
            design
                .nets
                .iter()
                .flat_map(|n| n.connections.iter().map(|c| c.path.clone()))
                .collect()
        };
        let (d1, _, s1) = route_bench(AMPLE, Mode::Quality);
        let (d2, _, s2) = route_bench(AMPLE, Mode::Quality);
        assert_eq!(collect_paths(&d1), collect_paths(&d2));
        assert_eq!(s1.iterations, s2.iterations);
        assert_eq!(s1.total_overflow, s2.total_overflow);
    }
}
