use crate::graph::dense::{GridGraph, UNCAPACITATED};
use gridroute_common::util::config::{ModeParams, RouteConfig};

/// Cost assigned to a zero-capacity edge. The maze router hard-skips
/// blocked edges; this value is the backstop if one ever reaches scoring.
pub const BLOCKED_COST: f64 = 1e12;

const TABLE_SIZE: usize = 1024;
const TABLE_OFFSET: i64 = 256;
const PENALTY_CEILING: f64 = 200.0;

/// Adaptive edge scoring:
///
///   cost(e) = base + alpha * penalty(usage + 1 - capacity) + beta * history(e)
///
/// `penalty` is a precomputed logistic curve — near zero while an edge has
/// slack, rising steeply as demand crosses capacity. The +1 prices the
/// candidate path's own use of the edge. `alpha`/`beta` come from the mode
/// and may escalate between iterations when overflow stalls.
pub struct CostModel {
    alpha: f64,
    beta: f64,
    alpha_cap: f64,
    beta_cap: f64,
    escalation: f64,
    via_cost: f64,
    penalty_table: Box<[f64; TABLE_SIZE]>,
}

impl CostModel {
    pub fn new(params: &ModeParams, cfg: &RouteConfig) -> Self {
        let mut table = Box::new([0.0; TABLE_SIZE]);
        for (i, slot) in table.iter_mut().enumerate() {
            let of = i as i64 - TABLE_OFFSET;
            *slot = PENALTY_CEILING / (1.0 + (-params.slope * of as f64).exp());
        }
        Self {
            alpha: params.alpha,
            beta: params.beta,
            alpha_cap: params.alpha * cfg.max_escalation,
            beta_cap: params.beta * cfg.max_escalation,
            escalation: cfg.escalation,
            via_cost: cfg.via_cost,
            penalty_table: table,
        }
    }

    #[inline]
    pub fn penalty(&self, overflow: i64) -> f64 {
        let i = (overflow + TABLE_OFFSET).clamp(0, TABLE_SIZE as i64 - 1);
        self.penalty_table[i as usize]
    }

    #[inline]
    pub fn edge_cost(&self, capacity: u32, usage: u32, history: f32) -> f64 {
        if capacity == 0 {
            return BLOCKED_COST;
        }
        if capacity == UNCAPACITATED {
            return self.via_cost;
        }
        let of = usage as i64 + 1 - capacity as i64;
        1.0 + self.alpha * self.penalty(of) + self.beta * history as f64
    }

    /// Recompute the grid's cached cost for every edge.
    pub fn build_cost(&self, grid: &mut GridGraph) {
        let planar = grid.planar_len();
        for (i, e) in grid.edges_mut().iter_mut().enumerate() {
            e.cost = if i < planar {
                if e.capacity == 0 {
                    BLOCKED_COST as f32
                } else {
                    let of = e.usage as i64 + 1 - e.capacity as i64;
                    (1.0 + self.alpha * self.penalty(of) + self.beta * e.history as f64) as f32
                }
            } else {
                self.via_cost as f32
            };
        }
    }

    /// Overflow failed to improve: push both weights up (capped) so the
    /// next iteration leans harder on congestion avoidance.
    pub fn adapt(&mut self, prev_overflow: u64, overflow: u64) {
        if overflow > 0 && overflow >= prev_overflow {
            self.alpha = (self.alpha * self.escalation).min(self.alpha_cap);
            self.beta = (self.beta * self.escalation).min(self.beta_cap);
            log::debug!(
                "Adaptive scoring escalated: alpha={:.2} beta={:.2}",
                self.alpha,
                self.beta
            );
        }
    }

    pub fn weights(&self) -> (f64, f64) {
        (self.alpha, self.beta)
    }

    pub fn via_cost(&self) -> f64 {
        self.via_cost
    }
}
