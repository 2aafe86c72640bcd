//! Stage orchestration.
//!
//! The pipeline validates the incoming network, then runs the three
//! layout stages in their fixed order: clustering, schematic
//! optimization, topology refinement. Validation repeats between stages
//! so a stage that corrupts the network fails the run at the boundary
//! where the corruption appeared rather than deep inside the next stage.

use log::{debug, info, warn};

use pantograph_core::geometry::EXTENT_EPSILON;

use crate::{
    config::LayoutOptions,
    error::LayoutError,
    layout::{
        cluster::Clusterer,
        refine::TopologyRefiner,
        schematic::{self, SchematicOptimizer},
    },
    structure::Network,
};

/// Runs the full layout over a network.
#[derive(Debug, Default)]
pub struct Pipeline {
    options: LayoutOptions,
}

impl Pipeline {
    /// Creates a pipeline with the given options.
    pub fn new(options: LayoutOptions) -> Self {
        Self { options }
    }

    /// The options this pipeline runs with.
    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    /// Lays out the network and returns the schematic result.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::EmptyNetwork`] when the input has no nodes or
    /// no links, [`LayoutError::NonFiniteCoordinate`] when a position is NaN
    /// or infinite, and [`LayoutError::DegenerateExtent`] when all positions
    /// collapse onto a point or line. The same checks rerun between stages;
    /// after the last stage the geometric checks rerun, but an empty link
    /// list only warns.
    pub fn run(&self, network: Network) -> Result<Network, LayoutError> {
        info!(
            nodes = network.node_count(),
            links = network.link_count();
            "Starting layout pipeline"
        );
        validate_stage_input(&network)?;

        let network = Clusterer::new(&self.options).run(network)?;
        debug!(nodes = network.node_count(); "Clustering stage finished");
        validate_stage_input(&network)?;

        let network = SchematicOptimizer::new(&self.options).run(network)?;
        debug!(nodes = network.node_count(); "Schematic stage finished");
        validate_stage_input(&network)?;

        let network = TopologyRefiner::new(&self.options).run(network)?;
        debug!(nodes = network.node_count(); "Refinement stage finished");
        validate_output(&network)?;
        warn_residual_conflicts(&network);

        info!(
            nodes = network.node_count(),
            links = network.link_count();
            "Layout pipeline finished"
        );
        Ok(network)
    }
}

/// Warns about station pairs the stages could not fully separate. The
/// layout is still emitted; crowding is a quality concern, not an error.
fn warn_residual_conflicts(network: &Network) {
    let nodes: Vec<_> = network.nodes().collect();
    for (i, a) in nodes.iter().enumerate() {
        for b in nodes.iter().skip(i + 1) {
            let distance = a.position().distance(b.position());
            if distance < schematic::MIN_STATION_DISTANCE {
                warn!(
                    a = a.name(),
                    b = b.name(),
                    distance;
                    "Stations remain closer than the minimum distance"
                );
            }
        }
    }
}

/// Structural validation at a stage entry point. Stages assume at least one
/// link, so an empty link list is fatal here.
fn validate_stage_input(network: &Network) -> Result<(), LayoutError> {
    if network.node_count() == 0 {
        return Err(LayoutError::EmptyNetwork { what: "nodes" });
    }
    if network.link_count() == 0 {
        return Err(LayoutError::EmptyNetwork { what: "links" });
    }
    validate_geometry(network)
}

/// Validation of the final output. Simplification may legitimately drop the
/// last links of a fully straightened network, so an empty link list is
/// only worth a warning once no stage consumes the network anymore.
fn validate_output(network: &Network) -> Result<(), LayoutError> {
    if network.node_count() == 0 {
        return Err(LayoutError::EmptyNetwork { what: "nodes" });
    }
    if network.link_count() == 0 {
        warn!("Layout finished with no links; every segment was simplified away");
    }
    validate_geometry(network)
}

/// Geometric checks shared by entry and output validation.
fn validate_geometry(network: &Network) -> Result<(), LayoutError> {
    for node in network.nodes() {
        if !node.position().is_finite() {
            return Err(LayoutError::NonFiniteCoordinate { node: node.id() });
        }
    }
    let bounds = network.bounds().ok_or(LayoutError::DegenerateExtent {
        width: 0.0,
        height: 0.0,
    })?;
    if bounds.is_degenerate(EXTENT_EPSILON) {
        return Err(LayoutError::DegenerateExtent {
            width: bounds.width(),
            height: bounds.height(),
        });
    }
    Ok(())
}
