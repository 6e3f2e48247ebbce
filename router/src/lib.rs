pub mod api;
pub mod cost;
pub mod decompose;
pub mod graph;
pub mod maze;
pub mod metrics;
pub mod output;
pub mod schedule;
pub mod viz;

pub use api::GlobalRouter;
pub use gridroute_common::util::config::Mode;
pub use metrics::Metrics;
