//! Configuration for the layout pipeline.
//!
//! [`LayoutOptions`] carries every tunable the pipeline recognizes. All
//! fields implement [`serde::Deserialize`] with per-field defaults so hosts
//! can load partial configurations from any serde source; the engine itself
//! performs no file I/O.

use serde::Deserialize;

/// Tunable options for a layout run.
///
/// `bend_penalty` and `overlap_penalty` are recognized for input
/// compatibility but consumed by no algorithm.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Radius (normalized units) for clustering and proximity queries.
    node_clustering_distance: f64,

    /// Target distance (normalized units) for the relaxer's attraction term.
    min_stop_distance: f64,

    /// Angle step in degrees for octilinear snapping.
    angle_snap: f64,

    /// Iteration cap for the iteration-bounded relaxation mode.
    force_directed_iterations: usize,

    /// Reserved: neighbor count above which an area counts as dense.
    dense_area_threshold: usize,

    /// Starting temperature for the threshold-bounded relaxation.
    initial_temperature: f64,

    /// Per-iteration temperature multiplier.
    cooling_factor: f64,

    /// Temperature / displacement threshold ending the relaxation.
    stop_criterion: f64,

    /// Declared but not consumed by any layout algorithm.
    bend_penalty: f64,

    /// Declared but not consumed by any layout algorithm.
    overlap_penalty: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            node_clustering_distance: 0.05,
            min_stop_distance: 0.05,
            angle_snap: 45.0,
            force_directed_iterations: 50,
            dense_area_threshold: 8,
            initial_temperature: 0.1,
            cooling_factor: 0.95,
            stop_criterion: 1e-4,
            bend_penalty: 1.0,
            overlap_penalty: 1.0,
        }
    }
}

impl LayoutOptions {
    /// Clustering and proximity query radius, in normalized units.
    pub fn node_clustering_distance(&self) -> f64 {
        self.node_clustering_distance
    }

    /// Attraction target distance for the relaxer, in normalized units.
    pub fn min_stop_distance(&self) -> f64 {
        self.min_stop_distance
    }

    /// Octilinear snapping step, in radians.
    pub fn angle_snap_radians(&self) -> f64 {
        self.angle_snap.to_radians()
    }

    /// Iteration cap for the schematic stage's relaxation.
    pub fn force_directed_iterations(&self) -> usize {
        self.force_directed_iterations
    }

    /// Reserved density threshold; recognized, not yet consumed.
    pub fn dense_area_threshold(&self) -> usize {
        self.dense_area_threshold
    }

    /// Starting temperature for threshold-bounded relaxation.
    pub fn initial_temperature(&self) -> f64 {
        self.initial_temperature
    }

    /// Temperature multiplier applied each relaxation iteration.
    pub fn cooling_factor(&self) -> f64 {
        self.cooling_factor
    }

    /// Stopping threshold for temperature and displacement.
    pub fn stop_criterion(&self) -> f64 {
        self.stop_criterion
    }

    /// Declared-only option; no algorithm reads it.
    pub fn bend_penalty(&self) -> f64 {
        self.bend_penalty
    }

    /// Declared-only option; no algorithm reads it.
    pub fn overlap_penalty(&self) -> f64 {
        self.overlap_penalty
    }

    /// Overrides the clustering radius.
    pub fn with_node_clustering_distance(mut self, distance: f64) -> Self {
        self.node_clustering_distance = distance;
        self
    }

    /// Overrides the angle snapping step (degrees).
    pub fn with_angle_snap(mut self, degrees: f64) -> Self {
        self.angle_snap = degrees;
        self
    }

    /// Overrides the iteration cap for iteration-bounded relaxation.
    pub fn with_force_directed_iterations(mut self, iterations: usize) -> Self {
        self.force_directed_iterations = iterations;
        self
    }

    /// Overrides the threshold-bounded relaxation schedule.
    pub fn with_cooling(
        mut self,
        initial_temperature: f64,
        cooling_factor: f64,
        stop_criterion: f64,
    ) -> Self {
        self.initial_temperature = initial_temperature;
        self.cooling_factor = cooling_factor;
        self.stop_criterion = stop_criterion;
        self
    }
}
