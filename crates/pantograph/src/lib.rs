//! Pantograph - schematic layout for transit networks.
//!
//! Takes a transit network of stations and route links with geographic
//! positions and produces a metro-map style schematic layout: duplicate
//! stations merged, line segments pulled onto 45-degree directions,
//! stations spaced apart, and redundant pass-through nodes removed.

pub mod config;

mod error;
mod layout;
mod structure;

pub use pantograph_core::{geometry, identifier, model};

pub use config::LayoutOptions;
pub use error::LayoutError;
pub use layout::Pipeline;
pub use structure::Network;

use pantograph_core::model::{Link, StationNode};

/// Lays out a network in one call.
///
/// This wraps [`Pipeline`] for callers that do not need to hold on to the
/// pipeline between runs.
///
/// # Examples
///
/// ```rust,no_run
/// use pantograph::{layout, LayoutOptions};
/// use pantograph::geometry::Point;
/// use pantograph::identifier::Id;
/// use pantograph::model::{Link, StationKind, StationNode};
///
/// let nodes = vec![
///     StationNode::new(
///         Id::new("alexanderplatz"),
///         Id::new("U2:alexanderplatz"),
///         "Alexanderplatz".to_string(),
///         Point::new(13.4132, 52.5219),
///         StationKind::Transfer,
///     )?,
///     StationNode::new(
///         Id::new("klosterstr"),
///         Id::new("U2:klosterstr"),
///         "Klosterstr.".to_string(),
///         Point::new(13.4107, 52.5166),
///         StationKind::Regular,
///     )?,
/// ];
/// let links = vec![Link::new(
///     Id::new("u2-1"),
///     Id::new("alexanderplatz"),
///     Id::new("klosterstr"),
///     Id::new("U2"),
///     0.5,
/// )];
///
/// let schematic = layout(nodes, links, LayoutOptions::default())?;
/// for station in schematic.nodes() {
///     println!("{} -> {:?}", station.name(), station.position());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// # Errors
///
/// Returns a [`LayoutError`] when the input is empty, carries non-finite
/// coordinates, or spans a degenerate extent, or when a stage fails.
pub fn layout(
    nodes: Vec<StationNode>,
    links: Vec<Link>,
    options: LayoutOptions,
) -> Result<Network, LayoutError> {
    Pipeline::new(options).run(Network::new(nodes, links))
}
