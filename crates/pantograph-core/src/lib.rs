//! Pantograph Core Types and Definitions
//!
//! This crate provides the foundational types for the Pantograph transit map
//! layout engine. It includes:
//!
//! - **Identifiers**: Efficient string-interned identifiers ([`identifier::Id`])
//! - **Geometry**: 2D points, bounding boxes, and snapping helpers ([`geometry`] module)
//! - **Model**: Station and link records forming the network data model ([`model`] module)
//!
//! No algorithmic code lives here; the layout stages are in the `pantograph`
//! crate and consume these types.

pub mod geometry;
pub mod identifier;
pub mod model;
