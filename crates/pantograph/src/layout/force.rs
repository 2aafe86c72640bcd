//! Shared force-directed relaxation.
//!
//! One physics simulation serves two call sites with different stopping
//! policies: the schematic optimizer smooths the freshly clustered layout
//! with a fixed iteration budget, and the topology refiner runs a
//! temperature-cooled pass that stops on its own convergence.
//!
//! Every iteration computes forces against a read-only snapshot of the
//! previous iteration's positions and applies them as one batch
//! (Jacobi-style): no node ever sees another node's already-updated
//! position within the same iteration. Force accumulation is data-parallel
//! because each node's forces depend only on the snapshot; the collect
//! barrier before batch-apply is the only synchronization point.
//!
//! Positions are normalized into the unit box for the duration of the pass
//! and denormalized afterward. Running the simulation at native coordinate
//! scales (geographic degrees) makes the `k / d²` repulsion blow up.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::debug;
use rayon::prelude::*;

use pantograph_core::{
    geometry::{Bounds, EXTENT_EPSILON, Point},
    identifier::Id,
};

use crate::{config::LayoutOptions, error::LayoutError};

/// Pairs closer than this are skipped during force accumulation to avoid
/// the repulsion singularity.
const MIN_SEPARATION: f64 = 1e-4;

/// Absolute ceiling on cooled iterations, independent of the temperature
/// schedule.
const MAX_COOLING_ITERATIONS: usize = 1000;

/// Stopping policy for a relaxation run.
#[derive(Debug, Clone, Copy)]
pub enum RelaxSchedule {
    /// Fixed iteration count; force scaled by a linearly decaying
    /// temperature `1 - i/N`.
    Bounded { iterations: usize },
    /// Temperature starts at `initial_temperature` and is multiplied by
    /// `cooling_factor` each iteration; the run stops when either the
    /// temperature or the iteration's maximum displacement drops below
    /// `stop_criterion`.
    Cooling {
        initial_temperature: f64,
        cooling_factor: f64,
        stop_criterion: f64,
    },
}

/// Force model constants, in normalized (unit box) units.
#[derive(Debug, Clone, Copy)]
pub struct RelaxParams {
    /// Repulsion constant `k` in `k / d²`.
    pub repulsion: f64,
    /// Attraction constant for the spring term along links.
    pub attraction: f64,
    /// Rest length of the spring between connected nodes.
    pub optimal_distance: f64,
    /// Clamp on the per-iteration displacement of a single node.
    pub max_step: f64,
}

impl Default for RelaxParams {
    fn default() -> Self {
        Self {
            repulsion: 1e-5,
            attraction: 0.1,
            optimal_distance: 0.05,
            max_step: 0.05,
        }
    }
}

/// Result of a relaxation run.
#[derive(Debug, Clone, Copy)]
pub struct RelaxOutcome {
    /// Iterations actually executed.
    pub iterations: usize,
    /// Maximum single-node displacement of the final iteration, in
    /// normalized units.
    pub max_displacement: f64,
}

/// The shared force-directed relaxer.
#[derive(Debug)]
pub struct Relaxer {
    params: RelaxParams,
    schedule: RelaxSchedule,
}

impl Relaxer {
    /// Creates a relaxer with explicit parameters and schedule.
    pub fn new(params: RelaxParams, schedule: RelaxSchedule) -> Self {
        Self { params, schedule }
    }

    /// The schematic stage's call site: iteration-bounded smoothing.
    pub fn for_smoothing(options: &LayoutOptions) -> Self {
        Self::new(
            RelaxParams {
                optimal_distance: options.min_stop_distance(),
                ..RelaxParams::default()
            },
            RelaxSchedule::Bounded {
                iterations: options.force_directed_iterations(),
            },
        )
    }

    /// The topology refiner's call site: threshold-bounded cooling.
    pub fn for_refinement(options: &LayoutOptions) -> Self {
        Self::new(
            RelaxParams {
                optimal_distance: options.min_stop_distance(),
                ..RelaxParams::default()
            },
            RelaxSchedule::Cooling {
                initial_temperature: options.initial_temperature(),
                cooling_factor: options.cooling_factor(),
                stop_criterion: options.stop_criterion(),
            },
        )
    }

    /// Relaxes the given positions in place.
    ///
    /// `adjacency` drives the attraction term; ids missing from `positions`
    /// are ignored. Positions with non-finite coordinates are excluded from
    /// the pass and left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::DegenerateExtent`] when the finite positions
    /// span a bounding box too small to normalize.
    pub fn run(
        &self,
        positions: &mut IndexMap<Id, Point>,
        adjacency: &IndexMap<Id, Vec<Id>>,
    ) -> Result<RelaxOutcome, LayoutError> {
        let bounds = Bounds::from_points(positions.values().copied())
            .ok_or(LayoutError::DegenerateExtent {
                width: 0.0,
                height: 0.0,
            })?;
        if bounds.is_degenerate(EXTENT_EPSILON) {
            return Err(LayoutError::DegenerateExtent {
                width: bounds.width(),
                height: bounds.height(),
            });
        }

        let origin = bounds.min_point();
        let width = bounds.width();
        let height = bounds.height();

        let mut normalized: IndexMap<Id, Point> = positions
            .iter()
            .filter(|(_, point)| point.is_finite())
            .map(|(&id, point)| {
                let shifted = point.sub(origin);
                (id, Point::new(shifted.x() / width, shifted.y() / height))
            })
            .collect();

        let outcome = self.run_normalized(&mut normalized, adjacency);

        for (id, unit) in normalized {
            let denormalized = Point::new(unit.x() * width, unit.y() * height).add(origin);
            positions.insert(id, denormalized);
        }
        Ok(outcome)
    }

    fn run_normalized(
        &self,
        positions: &mut IndexMap<Id, Point>,
        adjacency: &IndexMap<Id, Vec<Id>>,
    ) -> RelaxOutcome {
        let mut outcome = RelaxOutcome {
            iterations: 0,
            max_displacement: f64::INFINITY,
        };

        match self.schedule {
            RelaxSchedule::Bounded { iterations } => {
                for i in 0..iterations {
                    let temperature = 1.0 - i as f64 / iterations as f64;
                    outcome.max_displacement = self.step(positions, adjacency, temperature);
                    outcome.iterations = i + 1;
                }
            }
            RelaxSchedule::Cooling {
                initial_temperature,
                cooling_factor,
                stop_criterion,
            } => {
                let mut temperature = initial_temperature;
                for i in 0..MAX_COOLING_ITERATIONS {
                    if temperature < stop_criterion {
                        break;
                    }
                    outcome.max_displacement = self.step(positions, adjacency, temperature);
                    outcome.iterations = i + 1;
                    temperature *= cooling_factor;
                    if outcome.max_displacement < stop_criterion {
                        break;
                    }
                }
            }
        }

        debug!(
            iterations = outcome.iterations,
            max_displacement = outcome.max_displacement;
            "Relaxation finished"
        );
        outcome
    }

    /// Runs one Jacobi iteration and returns the maximum displacement.
    fn step(
        &self,
        positions: &mut IndexMap<Id, Point>,
        adjacency: &IndexMap<Id, Vec<Id>>,
        temperature: f64,
    ) -> f64 {
        // Read-only snapshot of the previous iteration.
        let snapshot: Vec<(Id, Point)> = positions.iter().map(|(&id, &p)| (id, p)).collect();
        let lookup: HashMap<Id, Point> = snapshot.iter().copied().collect();
        let params = self.params;

        // Data-parallel force accumulation; each node reads only the
        // snapshot. The collect below is the barrier before batch-apply.
        let forces: Vec<Point> = snapshot
            .par_iter()
            .map(|&(id, position)| {
                let mut force = Point::new(0.0, 0.0);

                for &(other_id, other_position) in &snapshot {
                    if other_id == id {
                        continue;
                    }
                    let away = position.sub(other_position);
                    let distance = away.hypot();
                    if distance < MIN_SEPARATION {
                        continue;
                    }
                    let magnitude = params.repulsion / (distance * distance);
                    force = force.add(away.scale(magnitude / distance));
                }

                if let Some(neighbors) = adjacency.get(&id) {
                    for neighbor in neighbors {
                        let Some(&neighbor_position) = lookup.get(neighbor) else {
                            continue;
                        };
                        let toward = neighbor_position.sub(position);
                        let distance = toward.hypot();
                        if distance < MIN_SEPARATION {
                            continue;
                        }
                        let magnitude = params.attraction * (distance - params.optimal_distance);
                        force = force.add(toward.scale(magnitude / distance));
                    }
                }

                force
            })
            .collect();

        // Batch-apply with temperature scaling and the step clamp.
        let mut max_displacement: f64 = 0.0;
        for ((id, previous), force) in snapshot.into_iter().zip(forces) {
            let mut step = force.scale(temperature);
            let step_length = step.hypot();
            if step_length > params.max_step {
                step = step.scale(params.max_step / step_length);
            }
            let updated = previous.add(step).clamp_unit();
            max_displacement = max_displacement.max(previous.distance(updated));
            positions.insert(id, updated);
        }
        max_displacement
    }
}
