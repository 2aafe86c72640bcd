//! Schematic octilinear optimization.
//!
//! This stage distorts the clustered network toward a metro-map look: line
//! segments are pulled onto 45°-multiple directions, stations keep a
//! minimum spacing, coincident stations are separated, and transfer hubs
//! settle at the weighted center of the lines converging on them.
//!
//! The stage works on a fixed drawing canvas. Grid cells and station
//! spacing are meaningless at geographic scale, so positions are first
//! scaled so the longest bounding dimension spans [`CANVAS_EXTENT`] grid
//! units. A bounded force-directed smoothing pass then runs before the
//! octilinear loop proper.
//!
//! All four per-iteration steps are sequential by design: each reads the
//! positions its predecessors just wrote (Gauss-Seidel), and the loop
//! converges on the largest single movement observed anywhere in the
//! iteration.

use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, warn};

use pantograph_core::{
    geometry::{EXTENT_EPSILON, Point, snap_angle},
    identifier::Id,
    model::StationKind,
};

use crate::{
    config::LayoutOptions,
    error::LayoutError,
    layout::{force::Relaxer, route},
    structure::Network,
};

/// Iteration ceiling for the octilinear loop.
const MAX_ITERATIONS: usize = 100;

/// The loop stops once no node moved farther than this in an iteration.
const CONVERGENCE_THRESHOLD: f64 = 0.01;

/// Minimum spacing between stations, in grid units.
pub(crate) const MIN_STATION_DISTANCE: f64 = 2.0;

/// Snapping grid cell size, in grid units.
const GRID_CELL: f64 = 1.0;

/// Blend weight of the octilinear target when straightening a node.
const STRAIGHTNESS: f64 = 0.7;

/// Blend weight of the spacing-correction term.
const SPACING_WEIGHT: f64 = 0.3;

/// Conflicting stations are pushed to 1.1x the minimum distance so a
/// following spacing pass does not immediately re-trigger on them.
const CONFLICT_PUSH: f64 = 1.1;

/// Longest bounding dimension of the drawing canvas, in grid units.
const CANVAS_EXTENT: f64 = 100.0;

/// One route line prepared for optimization.
struct Line {
    route: Id,
    members: Vec<Id>,
    importance: f64,
}

/// The octilinear schematic optimizer.
#[derive(Debug)]
pub struct SchematicOptimizer {
    angle_step: f64,
    relaxer: Relaxer,
}

impl SchematicOptimizer {
    /// Creates an optimizer from pipeline options.
    pub fn new(options: &LayoutOptions) -> Self {
        Self {
            angle_step: options.angle_snap_radians(),
            relaxer: Relaxer::for_smoothing(options),
        }
    }

    /// Runs smoothing plus the octilinear loop and returns the updated
    /// network in canvas coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::DegenerateExtent`] when the input extent
    /// cannot be scaled onto the canvas.
    pub fn run(&self, network: Network) -> Result<Network, LayoutError> {
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

        // Uniform scale onto the canvas; aspect ratio is preserved.
        let scale = CANVAS_EXTENT / bounds.width().max(bounds.height());
        let origin = bounds.min_point();
        let mut positions: IndexMap<Id, Point> = network
            .nodes()
            .map(|node| (node.id(), node.position().sub(origin).scale(scale)))
            .collect();

        let adjacency = network.adjacency();
        self.relaxer.run(&mut positions, &adjacency)?;

        let kinds: HashMap<Id, StationKind> = network
            .nodes()
            .map(|node| (node.id(), node.kind()))
            .collect();
        let lines = self.prepare_lines(&network);

        for iteration in 0..MAX_ITERATIONS {
            let mut max_movement: f64 = 0.0;

            let moved = self.straighten_lines(&mut positions, &lines, &adjacency);
            max_movement = max_movement.max(moved);

            let moved = self.place_transfer_hubs(&mut positions, &kinds, &lines);
            max_movement = max_movement.max(moved);

            let moved = self.resolve_conflicts(&mut positions, &kinds);
            max_movement = max_movement.max(moved);

            let moved = self.enforce_spacing(&mut positions);
            max_movement = max_movement.max(moved);

            if max_movement <= CONVERGENCE_THRESHOLD {
                debug!(iteration, max_movement; "Schematic optimization converged");
                break;
            }
        }

        self.warn_residual_conflicts(&positions);

        let nodes = network
            .nodes()
            .map(|node| {
                let position = positions[&node.id()];
                node.with_position(position)
            })
            .collect();
        let links = network.links().to_vec();
        Ok(Network::new(nodes, links)
            .with_recomputed_weights()
            .with_refreshed_connection_counts())
    }

    /// Routes with members and importance, in descending importance order.
    fn prepare_lines(&self, network: &Network) -> Vec<Line> {
        let members = network.route_members();
        let lines: Vec<Line> = route::rank_routes(network)
            .into_iter()
            .filter_map(|(route, metrics)| {
                let members = members.get(&route)?.clone();
                Some(Line {
                    route,
                    members,
                    importance: metrics.importance(),
                })
            })
            .collect();
        for line in &lines {
            debug!(
                route = line.route.as_string(),
                members = line.members.len(),
                importance = line.importance;
                "Prepared line for optimization"
            );
        }
        lines
    }

    /// Step 1: per-line octilinear straightening.
    fn straighten_lines(
        &self,
        positions: &mut IndexMap<Id, Point>,
        lines: &[Line],
        adjacency: &IndexMap<Id, Vec<Id>>,
    ) -> f64 {
        let mut max_movement: f64 = 0.0;
        for line in lines {
            let order = self.traversal_order(line, positions, adjacency);
            for window in 0..order.len().saturating_sub(2) {
                let (prev_id, node_id, next_id) =
                    (order[window], order[window + 1], order[window + 2]);
                let prev = positions[&prev_id];
                let current = positions[&node_id];
                let next = positions[&next_id];

                let updated = self.straighten_node(prev, current, next);
                max_movement = max_movement.max(current.distance(updated));
                positions.insert(node_id, updated);
            }
        }
        max_movement
    }

    /// Octilinear target for one interior node, blended with spacing
    /// correction and snapped to the grid.
    fn straighten_node(&self, prev: Point, current: Point, next: Point) -> Point {
        // Each leg direction is snapped independently; the node target is
        // where both snapped legs would place it.
        let incoming = snap_angle(prev.angle_to(current), self.angle_step);
        let outgoing = snap_angle(current.angle_to(next), self.angle_step);
        let target_in = prev.add(Point::from_polar(incoming, prev.distance(current)));
        let target_out = next.sub(Point::from_polar(outgoing, current.distance(next)));
        let octilinear = target_in.midpoint(target_out);

        // Spacing correction pushes away from the closer leg neighbor when
        // it is inside the minimum distance.
        let (near, near_distance) = if prev.distance(current) <= next.distance(current) {
            (prev, prev.distance(current))
        } else {
            (next, next.distance(current))
        };
        let spacing = if near_distance < MIN_STATION_DISTANCE {
            let direction = if near_distance > f64::EPSILON {
                current.sub(near).scale(1.0 / near_distance)
            } else {
                Point::new(1.0, 0.0)
            };
            current.add(direction.scale(MIN_STATION_DISTANCE - near_distance))
        } else {
            current
        };

        octilinear
            .scale(STRAIGHTNESS)
            .add(spacing.scale(SPACING_WEIGHT))
            .snap_to_grid(GRID_CELL)
    }

    /// Greedy nearest-neighbor walk over a line's members, starting from a
    /// terminal. This is a heuristic ordering, not a shortest-path tour.
    fn traversal_order(
        &self,
        line: &Line,
        positions: &IndexMap<Id, Point>,
        adjacency: &IndexMap<Id, Vec<Id>>,
    ) -> Vec<Id> {
        let mut remaining: Vec<Id> = line
            .members
            .iter()
            .copied()
            .filter(|id| positions.contains_key(id))
            .collect();
        if remaining.len() < 3 {
            return remaining;
        }

        // Prefer an explicit terminal; otherwise the member with the fewest
        // in-line neighbors is an endpoint in practice.
        let member_set: std::collections::HashSet<Id> = remaining.iter().copied().collect();
        let start = remaining
            .iter()
            .position(|id| {
                adjacency
                    .get(id)
                    .map(|neighbors| {
                        neighbors.iter().filter(|n| member_set.contains(n)).count() <= 1
                    })
                    .unwrap_or(false)
            })
            .unwrap_or(0);

        let mut order = Vec::with_capacity(remaining.len());
        let mut tail = remaining.swap_remove(start);
        order.push(tail);
        while !remaining.is_empty() {
            let tail_position = positions[&tail];
            let nearest = remaining
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    tail_position
                        .distance(positions[*a])
                        .partial_cmp(&tail_position.distance(positions[*b]))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(index, _)| index);
            let Some(nearest) = nearest else {
                break;
            };
            tail = remaining.swap_remove(nearest);
            order.push(tail);
        }
        order
    }

    /// Step 2: transfer hubs move to the importance-weighted centroid of
    /// the geometric centers of the lines passing through them.
    fn place_transfer_hubs(
        &self,
        positions: &mut IndexMap<Id, Point>,
        kinds: &HashMap<Id, StationKind>,
        lines: &[Line],
    ) -> f64 {
        let mut max_movement: f64 = 0.0;
        let hub_ids: Vec<Id> = positions
            .keys()
            .copied()
            .filter(|id| kinds.get(id) == Some(&StationKind::Transfer))
            .collect();

        for hub in hub_ids {
            let connected: Vec<&Line> = lines
                .iter()
                .filter(|line| line.members.contains(&hub))
                .collect();
            if connected.len() < 2 {
                continue;
            }

            let mut weighted = Point::new(0.0, 0.0);
            let mut total_weight = 0.0;
            for line in &connected {
                let center = line_center(line, positions);
                let weight = line.importance;
                weighted = weighted.add(center.scale(weight));
                total_weight += weight;
            }
            if total_weight <= f64::EPSILON {
                continue;
            }

            let target = weighted.scale(1.0 / total_weight);
            let current = positions[&hub];
            max_movement = max_movement.max(current.distance(target));
            positions.insert(hub, target);
        }
        max_movement
    }

    /// Step 3: separate node pairs closer than the minimum distance.
    ///
    /// Transfer hubs are pinned: when exactly one side of a conflict is a
    /// hub, the other node absorbs the whole move. Otherwise both sides
    /// move half, symmetric about their midpoint.
    fn resolve_conflicts(
        &self,
        positions: &mut IndexMap<Id, Point>,
        kinds: &HashMap<Id, StationKind>,
    ) -> f64 {
        let mut max_movement: f64 = 0.0;
        let ids: Vec<Id> = positions.keys().copied().collect();

        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let (a, b) = (ids[i], ids[j]);
                let (pa, pb) = (positions[&a], positions[&b]);
                let distance = pa.distance(pb);
                if distance >= MIN_STATION_DISTANCE {
                    continue;
                }

                let required = MIN_STATION_DISTANCE * CONFLICT_PUSH;
                let shortfall = required - distance;
                let direction = if distance > f64::EPSILON {
                    pb.sub(pa).scale(1.0 / distance)
                } else {
                    // Coincident nodes have no direction; default to X.
                    Point::new(1.0, 0.0)
                };

                let a_is_hub = kinds.get(&a) == Some(&StationKind::Transfer);
                let b_is_hub = kinds.get(&b) == Some(&StationKind::Transfer);
                match (a_is_hub, b_is_hub) {
                    (true, false) => {
                        positions.insert(b, pb.add(direction.scale(shortfall)));
                        max_movement = max_movement.max(shortfall);
                    }
                    (false, true) => {
                        positions.insert(a, pa.sub(direction.scale(shortfall)));
                        max_movement = max_movement.max(shortfall);
                    }
                    _ => {
                        let half = shortfall / 2.0;
                        positions.insert(a, pa.sub(direction.scale(half)));
                        positions.insert(b, pb.add(direction.scale(half)));
                        max_movement = max_movement.max(half);
                    }
                }
            }
        }
        max_movement
    }

    /// Step 4: push any pair still under the minimum distance apart by half
    /// the shortfall each. Candidates are gathered within twice the minimum.
    fn enforce_spacing(&self, positions: &mut IndexMap<Id, Point>) -> f64 {
        let mut max_movement: f64 = 0.0;
        let ids: Vec<Id> = positions.keys().copied().collect();

        for &a in &ids {
            let pa = positions[&a];
            let candidates: Vec<Id> = ids
                .iter()
                .copied()
                .filter(|&b| b != a)
                .filter(|b| pa.distance(positions[b]) < 2.0 * MIN_STATION_DISTANCE)
                .collect();

            for b in candidates {
                let pa = positions[&a];
                let pb = positions[&b];
                let distance = pa.distance(pb);
                if distance >= MIN_STATION_DISTANCE {
                    continue;
                }

                let half = (MIN_STATION_DISTANCE - distance) / 2.0;
                let direction = if distance > f64::EPSILON {
                    pb.sub(pa).scale(1.0 / distance)
                } else {
                    Point::new(1.0, 0.0)
                };
                positions.insert(a, pa.sub(direction.scale(half)));
                positions.insert(b, pb.add(direction.scale(half)));
                max_movement = max_movement.max(half);
            }
        }
        max_movement
    }

    /// Soft warning for stations the loop could not fully separate.
    fn warn_residual_conflicts(&self, positions: &IndexMap<Id, Point>) {
        let ids: Vec<Id> = positions.keys().copied().collect();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                let distance = positions[&ids[i]].distance(positions[&ids[j]]);
                if distance < MIN_STATION_DISTANCE {
                    warn!(
                        a = ids[i].as_string(),
                        b = ids[j].as_string(),
                        distance;
                        "Stations remain closer than the minimum distance after optimization"
                    );
                }
            }
        }
    }
}

/// Geometric center of a line's member positions.
fn line_center(line: &Line, positions: &IndexMap<Id, Point>) -> Point {
    let members: Vec<Point> = line
        .members
        .iter()
        .filter_map(|id| positions.get(id))
        .copied()
        .collect();
    if members.is_empty() {
        return Point::new(0.0, 0.0);
    }
    members
        .iter()
        .fold(Point::new(0.0, 0.0), |acc, p| acc.add(*p))
        .scale(1.0 / members.len() as f64)
}
