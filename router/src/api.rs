//! Engine facade consumed by the CLI and bindings: load a benchmark,
//! configure the effort mode, route, read metrics, render the congestion
//! map, clean up.

use crate::graph::dense::GridGraph;
use crate::metrics::{self, Metrics};
use crate::output;
use crate::schedule;
use crate::viz;
use gridroute_common::db::design::{Design, RoutingResult};
use gridroute_common::db::parser::ispd;
use gridroute_common::error::{FormatError, RouteError, VizError};
use gridroute_common::util::config::{Mode, ModeParams, RouteConfig};
use gridroute_common::util::visualization::{self, CongestionMap};
use std::io::BufRead;
use std::path::Path;
use std::time::Instant;

pub struct GlobalRouter {
    design: Option<Design>,
    grid: Option<GridGraph>,
    cfg: RouteConfig,
    mode: Mode,
    adaptive_scoring: bool,
    history_optimization: bool,
    result: Option<RoutingResult>,
    metrics: Metrics,
}

impl Default for GlobalRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalRouter {
    pub fn new() -> Self {
        Self::with_config(RouteConfig::default())
    }

    pub fn with_config(cfg: RouteConfig) -> Self {
        Self {
            design: None,
            grid: None,
            mode: cfg.mode,
            adaptive_scoring: cfg.adaptive_scoring,
            history_optimization: cfg.history_optimization,
            result: None,
            metrics: Metrics::default(),
            cfg,
        }
    }

    /// Parse an ISPD benchmark file and take it as the active design.
    /// On failure the router keeps no partial state.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), FormatError> {
        let design = ispd::parse_file(path)?;
        self.init(design);
        Ok(())
    }

    pub fn load_from<R: BufRead>(&mut self, reader: R) -> Result<(), FormatError> {
        let design = ispd::parse(reader)?;
        self.init(design);
        Ok(())
    }

    /// Adopt an already-loaded design, discarding any previous results.
    pub fn init(&mut self, design: Design) {
        self.design = Some(design);
        self.grid = None;
        self.result = None;
        self.metrics = Metrics::default();
    }

    pub fn configure(&mut self, mode: Mode, adaptive_scoring: bool, history_optimization: bool) {
        self.mode = mode;
        self.adaptive_scoring = adaptive_scoring;
        self.history_optimization = history_optimization;
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn enable_adaptive_scoring(&mut self, on: bool) {
        self.adaptive_scoring = on;
    }

    pub fn enable_history_optimization(&mut self, on: bool) {
        self.history_optimization = on;
    }

    /// Run the full routing flow on the loaded design. When
    /// `detailed_output` is given, the per-net path listing is persisted
    /// there in the ISPD result layout.
    pub fn route(&mut self, detailed_output: Option<&Path>) -> Result<&RoutingResult, RouteError> {
        let design = self.design.as_mut().ok_or(RouteError::NotLoaded)?;
        let start = Instant::now();
        let params = ModeParams::resolve(self.mode, &self.cfg);
        log::info!(
            "Routing {} nets in {} mode (adaptive={}, history={})",
            design.num_nets(),
            self.mode.name(),
            self.adaptive_scoring,
            self.history_optimization
        );

        let mut grid = GridGraph::from_design(design);
        let stats = schedule::run(
            design,
            &mut grid,
            &self.cfg,
            params,
            self.adaptive_scoring,
            self.history_optimization,
        )?;

        if let Some(path) = detailed_output {
            output::write_result_file(design, path)?;
        }

        let result = RoutingResult::from_design(design);
        self.metrics = metrics::collect(&grid, &stats, start.elapsed().as_secs_f64());
        self.grid = Some(grid);
        log::info!(
            "Routing finished: state {:?}, overflow {}, wirelength {}, vias {}, {:.2}s",
            stats.state,
            self.metrics.total_overflow,
            self.metrics.wirelength,
            self.metrics.vias,
            self.metrics.execution_time
        );
        Ok(self.result.insert(result))
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    pub fn result(&self) -> Option<&RoutingResult> {
        self.result.as_ref()
    }

    pub fn design(&self) -> Option<&Design> {
        self.design.as_ref()
    }

    /// Planar congestion snapshot: the routed grid when available, or
    /// the unrouted grid's capacity map before any route call.
    pub fn congestion_map(&self) -> Option<CongestionMap> {
        if let Some(grid) = &self.grid {
            return Some(viz::congestion_map(grid));
        }
        self.design
            .as_ref()
            .map(|d| viz::congestion_map(&GridGraph::from_design(d)))
    }

    /// Render the congestion map. `.png` paths go through the image
    /// stack; every other extension gets the text PPM contract.
    pub fn visualize(&self, path: &Path, scale: u32) -> Result<(), VizError> {
        let map = self.congestion_map().ok_or(VizError::EmptyGrid)?;
        visualization::render(&map, path, scale)
    }

    /// Drop all engine state. Idempotent.
    pub fn cleanup(&mut self) {
        self.design = None;
        self.grid = None;
        self.result = None;
        self.metrics = Metrics::default();
    }
}
