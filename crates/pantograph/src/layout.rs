//! Layout stages for the schematic transit map pipeline.
//!
//! The pipeline runs a fixed stage sequence over the canonical
//! (nodes, links) pair: near-duplicate clustering, schematic octilinear
//! optimization, then topology refinement. Each stage consumes one
//! [`crate::structure::Network`] and produces a replacement.

pub mod cluster;
pub mod force;
pub mod pipeline;
pub mod refine;
pub mod route;
pub mod schematic;
pub mod spatial;

pub use pipeline::Pipeline;
