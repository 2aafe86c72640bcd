//! Error types for layout operations.
//!
//! Every stage validates its own inputs and outputs. Failures are never
//! retried or auto-recovered: a geometrically inconsistent diagram is worse
//! than no diagram, so the pipeline aborts loudly and emits no partial
//! output. The only recoverable condition is the per-node "skip if invalid"
//! filtering applied before spatial and force computations, which excludes
//! malformed nodes from geometry without resurrecting them.

use thiserror::Error;

use pantograph_core::{identifier::Id, model::ModelError};

/// The error type for layout pipeline operations.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// An empty node or link collection reached a stage entry point.
    #[error("layout requires a non-empty {what} collection")]
    EmptyNetwork { what: &'static str },

    /// A NaN or infinite coordinate survived into a stage that assumes
    /// finiteness.
    #[error("station {node} carries a non-finite coordinate")]
    NonFiniteCoordinate { node: Id },

    /// The coordinate range is too small to normalize against.
    #[error("degenerate coordinate range {width}x{height}; cannot normalize")]
    DegenerateExtent { width: f64, height: f64 },

    /// A cluster merge produced zero valid members.
    #[error("cluster for route group {group} has no valid members")]
    EmptyCluster { group: String },

    /// A station record violated a data-model invariant.
    #[error(transparent)]
    Model(#[from] ModelError),
}
