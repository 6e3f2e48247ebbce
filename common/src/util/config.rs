use serde::Deserialize;

/// Routing effort preset. Resolved into a fixed `ModeParams` tuple once
/// per route call; never consulted again mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Fast,
    Balanced,
    Quality,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Balanced
    }
}

impl Mode {
    pub fn from_name(name: &str) -> Option<Mode> {
        match name.to_ascii_lowercase().as_str() {
            "fast" => Some(Mode::Fast),
            "balanced" => Some(Mode::Balanced),
            "quality" => Some(Mode::Quality),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Fast => "fast",
            Mode::Balanced => "balanced",
            Mode::Quality => "quality",
        }
    }
}

/// The numeric knobs a mode expands to: iteration budget, congestion and
/// history weights, penalty-curve slope, and the A* heuristic weight
/// (1.0 = admissible, > 1.0 trades quality for speed, 0.0 = plain
/// Dijkstra).
#[derive(Debug, Clone, Copy)]
pub struct ModeParams {
    pub max_iterations: usize,
    pub alpha: f64,
    pub beta: f64,
    pub slope: f64,
    pub heuristic_weight: f64,
}

impl ModeParams {
    pub fn resolve(mode: Mode, cfg: &RouteConfig) -> Self {
        let mut params = match mode {
            Mode::Fast => ModeParams {
                max_iterations: 8,
                alpha: 1.0,
                beta: 0.2,
                slope: 0.3,
                heuristic_weight: 1.3,
            },
            Mode::Balanced => ModeParams {
                max_iterations: 30,
                alpha: 2.0,
                beta: 0.5,
                slope: 0.5,
                heuristic_weight: 1.0,
            },
            Mode::Quality => ModeParams {
                max_iterations: 120,
                alpha: 3.0,
                beta: 1.0,
                slope: 0.7,
                heuristic_weight: 1.0,
            },
        };
        if cfg.max_iterations > 0 {
            params.max_iterations = cfg.max_iterations;
        }
        params
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub route: RouteConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            route: RouteConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RouteConfig {
    #[serde(default)]
    pub mode: Mode,
    /// 0 keeps the mode's own budget.
    #[serde(default)]
    pub max_iterations: usize,
    #[serde(default = "default_true")]
    pub adaptive_scoring: bool,
    #[serde(default = "default_true")]
    pub history_optimization: bool,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
    #[serde(default = "default_window_margin")]
    pub window_margin: u32,
    #[serde(default = "default_history_increment")]
    pub history_increment: f64,
    #[serde(default = "default_escalation")]
    pub escalation: f64,
    #[serde(default = "default_max_escalation")]
    pub max_escalation: f64,
    #[serde(default = "default_via_cost")]
    pub via_cost: f64,
    #[serde(default = "default_max_expansions")]
    pub max_expansions: u32,
    #[serde(default = "default_mst_pin_threshold")]
    pub mst_pin_threshold: usize,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            max_iterations: 0,
            adaptive_scoring: true,
            history_optimization: true,
            seed: default_seed(),
            batch_size: default_batch_size(),
            parallel_threshold: default_parallel_threshold(),
            window_margin: default_window_margin(),
            history_increment: default_history_increment(),
            escalation: default_escalation(),
            max_escalation: default_max_escalation(),
            via_cost: default_via_cost(),
            max_expansions: default_max_expansions(),
            mst_pin_threshold: default_mst_pin_threshold(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_seed() -> u64 {
    0x5eed
}

fn default_batch_size() -> usize {
    500
}

fn default_parallel_threshold() -> usize {
    500
}

fn default_window_margin() -> u32 {
    10
}

fn default_history_increment() -> f64 {
    1.0
}

fn default_escalation() -> f64 {
    1.15
}

fn default_max_escalation() -> f64 {
    8.0
}

fn default_via_cost() -> f64 {
    3.0
}

fn default_max_expansions() -> u32 {
    2_000_000
}

fn default_mst_pin_threshold() -> usize {
    64
}
