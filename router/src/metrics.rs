use crate::graph::dense::GridGraph;
use crate::schedule::RouteStats;

/// Run metrics reported through the engine API. Counts use -1 as the
/// "not computed" sentinel until a routing pass has populated usage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Metrics {
    pub execution_time: f64,
    pub total_overflow: i64,
    pub max_overflow: i64,
    pub wirelength: i64,
    pub vias: i64,
    pub iterations: i64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            execution_time: 0.0,
            total_overflow: -1,
            max_overflow: -1,
            wirelength: -1,
            vias: -1,
            iterations: -1,
        }
    }
}

/// Pure aggregation over the settled grid and the scheduler's outcome.
pub fn collect(grid: &GridGraph, stats: &RouteStats, execution_time: f64) -> Metrics {
    Metrics {
        execution_time,
        total_overflow: stats.total_overflow as i64,
        max_overflow: stats.max_overflow as i64,
        wirelength: grid.planar_usage() as i64,
        vias: grid.via_usage() as i64,
        iterations: stats.iterations as i64,
    }
}
