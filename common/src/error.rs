use crate::geom::coord::EdgeRef;
use thiserror::Error;

/// Malformed or inconsistent benchmark input. Fatal: the loader leaves no
/// partial engine state behind when it returns one of these.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("i/o error reading benchmark: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {msg}")]
    Syntax { line: usize, msg: String },
    #[error("inconsistent benchmark: {0}")]
    Inconsistent(String),
}

impl FormatError {
    pub fn syntax(line: usize, msg: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            msg: msg.into(),
        }
    }
}

/// Internal invariant violation: an uncommit drove an edge's usage
/// negative. This means the congestion bookkeeping is corrupt; the run
/// must stop rather than clamp.
#[derive(Debug, Error)]
#[error("usage underflow on edge {edge:?} during uncommit")]
pub struct CapacityConsistencyError {
    pub edge: EdgeRef,
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("no benchmark loaded; call load() or init() first")]
    NotLoaded,
    #[error(transparent)]
    Consistency(#[from] CapacityConsistencyError),
    #[error("failed to write routing output: {0}")]
    Output(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum VizError {
    #[error("failed to write image: {0}")]
    Io(#[from] std::io::Error),
    #[error("image encode error: {0}")]
    Encode(String),
    #[error("nothing to draw: empty congestion map")]
    EmptyGrid,
}
