//! Post-schematic topology refinement.
//!
//! The schematic loop leaves three kinds of residue: distinct nodes for
//! stops that belong to the same physical complex, edges sitting just off
//! the snapped directions, and redundant degree-2 nodes on straight runs.
//! This stage cleans all three up, in order: a constrained transitive
//! merge grouped by stop-id prefix, a cooling force-directed settling
//! pass, sequential angle alignment, and collinear-node simplification.
//!
//! Merge distances are compared in normalized space (positions scaled to
//! the unit box) so the threshold keeps one meaning across input scales.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexMap;
use log::debug;

use pantograph_core::{
    geometry::{AREA_EPSILON, EXTENT_EPSILON, Point, snap_angle, triangle_area},
    identifier::Id,
    model::{StationKind, StationNode},
};

use crate::{
    config::LayoutOptions,
    error::LayoutError,
    layout::force::Relaxer,
    structure::{self, Network},
};

/// Merges same-complex stops, settles, and straightens the final topology.
#[derive(Debug)]
pub struct TopologyRefiner {
    clustering_distance: f64,
    angle_step: f64,
    relaxer: Relaxer,
}

impl TopologyRefiner {
    /// Creates a refiner from pipeline options.
    pub fn new(options: &LayoutOptions) -> Self {
        Self {
            clustering_distance: options.node_clustering_distance(),
            angle_step: options.angle_snap_radians(),
            relaxer: Relaxer::for_refinement(options),
        }
    }

    /// Runs the refinement stages and returns the final network.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::DegenerateExtent`] when positions collapse to
    /// a line or point, and [`LayoutError::EmptyCluster`] when a merge group
    /// has no valid members.
    pub fn run(&self, network: Network) -> Result<Network, LayoutError> {
        let network = self.merge_by_prefix(network)?;

        let mut positions: IndexMap<Id, Point> = network
            .nodes()
            .map(|node| (node.id(), node.position()))
            .collect();
        let adjacency = network.adjacency();
        let outcome = self.relaxer.run(&mut positions, &adjacency)?;
        debug!(
            iterations = outcome.iterations,
            max_displacement = outcome.max_displacement;
            "Refinement settling pass finished"
        );

        self.align_angles(&mut positions, &adjacency);

        let nodes: Vec<StationNode> = network
            .nodes()
            .map(|node| node.with_position(positions[&node.id()]))
            .collect();
        let network = Network::new(nodes, network.links().to_vec());
        let network = self.simplify(network);

        Ok(network
            .with_recomputed_weights()
            .with_refreshed_connection_counts())
    }

    /// Transitive merge of adjacent nodes that share a stop-id prefix and
    /// sit within the clustering distance of each other.
    ///
    /// Unlike the initial clusterer this walks the link graph, not the
    /// plane: a node joins a cluster only through an adjacent member, and
    /// membership grows until no adjacent candidate qualifies.
    fn merge_by_prefix(&self, network: Network) -> Result<Network, LayoutError> {
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
        let scale = 1.0 / bounds.width().max(bounds.height());

        let prefixes: HashMap<Id, String> = network
            .nodes()
            .map(|node| {
                let stop_id = node.stop_id().as_string();
                (node.id(), structure::route_prefix(&stop_id).to_owned())
            })
            .collect();
        let adjacency = network.adjacency();

        let mut visited: HashSet<Id> = HashSet::new();
        let mut merge_map: HashMap<Id, Id> = HashMap::new();
        let mut merged: HashMap<Id, StationNode> = HashMap::new();

        for seed in network.nodes() {
            let seed_id = seed.id();
            if visited.contains(&seed_id) {
                continue;
            }
            visited.insert(seed_id);
            let prefix = &prefixes[&seed_id];

            let mut cluster: Vec<Id> = vec![seed_id];
            let mut queue: VecDeque<Id> = VecDeque::from([seed_id]);
            while let Some(current) = queue.pop_front() {
                let Some(neighbors) = adjacency.get(&current) else {
                    continue;
                };
                let current_position = match network.node(current) {
                    Some(node) => node.position(),
                    None => continue,
                };
                for &neighbor in neighbors {
                    if visited.contains(&neighbor) {
                        continue;
                    }
                    if prefixes.get(&neighbor) != Some(prefix) {
                        continue;
                    }
                    let Some(node) = network.node(neighbor) else {
                        continue;
                    };
                    let distance = current_position.distance(node.position()) * scale;
                    if distance > self.clustering_distance {
                        continue;
                    }
                    visited.insert(neighbor);
                    cluster.push(neighbor);
                    queue.push_back(neighbor);
                }
            }

            if cluster.len() < 2 {
                continue;
            }

            let members: Vec<&StationNode> = cluster
                .iter()
                .filter_map(|id| network.node(*id))
                .filter(|node| node.position().is_finite())
                .collect();
            if members.is_empty() {
                return Err(LayoutError::EmptyCluster {
                    group: prefix.clone(),
                });
            }

            let centroid = members
                .iter()
                .fold(Point::new(0.0, 0.0), |acc, node| acc.add(node.position()))
                .scale(1.0 / members.len() as f64);

            debug!(
                prefix = prefix.as_str(),
                seed = seed_id.as_string(),
                members = cluster.len();
                "Merging stop-complex cluster"
            );

            for &member in cluster.iter().skip(1) {
                merge_map.insert(member, seed_id);
            }
            merged.insert(
                seed_id,
                seed.with_position(centroid).with_kind(StationKind::Transfer),
            );
        }

        let nodes: IndexMap<Id, StationNode> = network
            .nodes()
            .filter(|node| !merge_map.contains_key(&node.id()))
            .map(|node| {
                let node = merged.remove(&node.id()).unwrap_or_else(|| node.clone());
                (node.id(), node)
            })
            .collect();
        let links = Network::rebuild_links(network.links(), &merge_map, &nodes);
        Ok(Network::new(nodes.into_values().collect(), links))
    }

    /// Sequential angle alignment.
    ///
    /// Each node is rotated about its first adjacency neighbor so the edge
    /// between them meets the nearest snap-angle multiple, keeping the edge
    /// length. Later nodes see positions already moved by earlier ones.
    fn align_angles(&self, positions: &mut IndexMap<Id, Point>, adjacency: &IndexMap<Id, Vec<Id>>) {
        let ids: Vec<Id> = positions.keys().copied().collect();
        for id in ids {
            let Some(anchor_id) = adjacency.get(&id).and_then(|n| n.first()) else {
                continue;
            };
            let Some(anchor) = positions.get(anchor_id).copied() else {
                continue;
            };
            let current = positions[&id];
            let length = anchor.distance(current);
            if length <= f64::EPSILON {
                continue;
            }
            let snapped = snap_angle(anchor.angle_to(current), self.angle_step);
            positions.insert(id, anchor.add(Point::from_polar(snapped, length)));
        }
    }

    /// Removes degree-2 nodes that are collinear with both neighbors.
    ///
    /// Incident links are dropped with the node; the neighbors are not
    /// reconnected. Removal candidates are decided against the adjacency of
    /// the incoming network in one pass.
    fn simplify(&self, network: Network) -> Network {
        let adjacency = network.adjacency();
        let removable: HashSet<Id> = adjacency
            .iter()
            .filter_map(|(id, neighbors)| {
                let [first, second] = neighbors.as_slice() else {
                    return None;
                };
                let node = network.node(*id)?;
                let a = network.node(*first)?;
                let b = network.node(*second)?;
                let area = triangle_area(a.position(), node.position(), b.position());
                (area <= AREA_EPSILON).then_some(*id)
            })
            .collect();

        if removable.is_empty() {
            return network;
        }
        debug!(removed = removable.len(); "Simplifying collinear pass-through nodes");

        let (nodes, links) = network.into_parts();
        let nodes: Vec<StationNode> = nodes
            .into_iter()
            .filter(|node| !removable.contains(&node.id()))
            .collect();
        let links = links
            .into_iter()
            .filter(|link| {
                !removable.contains(&link.source()) && !removable.contains(&link.target())
            })
            .collect();
        Network::new(nodes, links)
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use pantograph_core::model::Link;

    use super::*;

    fn station(id: &str, stop_id: &str, x: f64, y: f64) -> StationNode {
        StationNode::new(
            Id::new(id),
            Id::new(stop_id),
            id.to_string(),
            Point::new(x, y),
            StationKind::Regular,
        )
        .unwrap()
    }

    fn link(id: &str, source: &str, target: &str, route: &str) -> Link {
        Link::new(Id::new(id), Id::new(source), Id::new(target), Id::new(route), 0.5)
    }

    fn refiner() -> TopologyRefiner {
        TopologyRefiner::new(&LayoutOptions::default())
    }

    #[test]
    fn test_prefix_merge_is_transitive() {
        // a-b and b-c are each within the threshold; the walk pulls all
        // three into one cluster even though a-c alone would not qualify.
        let network = Network::new(
            vec![
                station("a", "U1:a", 0.0, 0.0),
                station("b", "U1:b", 0.03, 0.0),
                station("c", "U1:c", 0.06, 0.0),
                station("anchor", "U9:x", 1.0, 1.0),
            ],
            vec![
                link("l1", "a", "b", "U1"),
                link("l2", "b", "c", "U1"),
                link("l3", "c", "anchor", "U1"),
            ],
        );

        let result = refiner().merge_by_prefix(network).unwrap();

        assert_eq!(result.node_count(), 2);
        let merged = result.node(Id::new("a")).expect("seed id survives");
        assert_eq!(merged.kind(), StationKind::Transfer);
        assert_approx_eq!(f64, merged.position().x(), 0.03);
        // The surviving link connects the representative to the anchor.
        assert_eq!(result.link_count(), 1);
        assert_eq!(result.links()[0].source(), Id::new("a"));
        assert_eq!(result.links()[0].target(), Id::new("anchor"));
    }

    #[test]
    fn test_prefix_merge_respects_prefix_boundary() {
        // Same spot, different stop-id prefixes: never merged.
        let network = Network::new(
            vec![
                station("a", "U1:a", 0.0, 0.0),
                station("b", "U2:b", 0.01, 0.0),
                station("anchor", "U9:x", 1.0, 1.0),
            ],
            vec![link("l1", "a", "b", "U1"), link("l2", "b", "anchor", "U1")],
        );

        let result = refiner().merge_by_prefix(network).unwrap();
        assert_eq!(result.node_count(), 3);
    }

    #[test]
    fn test_prefix_merge_requires_adjacency() {
        // Same prefix and close together, but no link between them: the
        // graph walk never reaches b from a.
        let network = Network::new(
            vec![
                station("a", "U1:a", 0.0, 0.0),
                station("b", "U1:b", 0.01, 0.0),
                station("anchor", "U9:x", 1.0, 1.0),
            ],
            vec![link("l1", "a", "anchor", "U1"), link("l2", "b", "anchor", "U1")],
        );

        let result = refiner().merge_by_prefix(network).unwrap();
        assert_eq!(result.node_count(), 3);
    }

    #[test]
    fn test_angle_alignment_snaps_and_is_idempotent() {
        let refiner = refiner();
        let mut positions: IndexMap<Id, Point> = IndexMap::new();
        positions.insert(Id::new("a"), Point::new(0.0, 0.0));
        positions.insert(Id::new("b"), Point::new(1.0, 0.1));
        let mut adjacency: IndexMap<Id, Vec<Id>> = IndexMap::new();
        adjacency.insert(Id::new("a"), vec![Id::new("b")]);
        adjacency.insert(Id::new("b"), vec![Id::new("a")]);

        refiner.align_angles(&mut positions, &adjacency);
        let after_first = positions.clone();

        // b snaps onto the horizontal through a, length preserved. a then
        // snaps relative to the moved b and stays on the same axis.
        let b = positions[&Id::new("b")];
        let a = positions[&Id::new("a")];
        assert_approx_eq!(f64, a.angle_to(b).sin(), 0.0, epsilon = 1e-9);
        assert_approx_eq!(f64, a.distance(b), (1.0f64.powi(2) + 0.1f64.powi(2)).sqrt());

        refiner.align_angles(&mut positions, &adjacency);
        for (id, point) in &after_first {
            assert_approx_eq!(f64, point.distance(positions[id]), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_simplify_removes_collinear_degree_two_node() {
        let network = Network::new(
            vec![
                station("a", "U1:a", 0.0, 0.0),
                station("b", "U1:b", 1.0, 0.0),
                station("c", "U1:c", 2.0, 0.0),
            ],
            vec![link("l1", "a", "b", "U1"), link("l2", "b", "c", "U1")],
        );

        let result = refiner().simplify(network);

        assert_eq!(result.node_count(), 2);
        assert!(!result.contains_node(Id::new("b")));
        // Incident links are dropped without reconnecting a and c.
        assert_eq!(result.link_count(), 0);
    }

    #[test]
    fn test_simplify_keeps_bent_degree_two_node() {
        let network = Network::new(
            vec![
                station("a", "U1:a", 0.0, 0.0),
                station("b", "U1:b", 1.0, 1.0),
                station("c", "U1:c", 2.0, 0.0),
            ],
            vec![link("l1", "a", "b", "U1"), link("l2", "b", "c", "U1")],
        );

        let result = refiner().simplify(network);
        assert_eq!(result.node_count(), 3);
        assert_eq!(result.link_count(), 2);
    }

    #[test]
    fn test_run_preserves_or_reduces_node_count() {
        let network = Network::new(
            vec![
                station("a", "U1:a", 0.0, 0.0),
                station("b", "U1:b", 40.0, 30.0),
                station("c", "U1:c", 80.0, 10.0),
                station("d", "U2:d", 20.0, 70.0),
            ],
            vec![
                link("l1", "a", "b", "U1"),
                link("l2", "b", "c", "U1"),
                link("l3", "b", "d", "U2"),
            ],
        );
        let before = network.node_count();

        let result = refiner().run(network).unwrap();

        assert!(result.node_count() <= before);
        for node in result.nodes() {
            assert!(node.position().is_finite());
        }
    }

    #[test]
    fn test_run_rejects_degenerate_extent() {
        let network = Network::new(
            vec![station("a", "U1:a", 0.0, 0.0), station("b", "U1:b", 1.0, 0.0)],
            vec![link("l1", "a", "b", "U1")],
        );

        let err = refiner().run(network);
        assert!(matches!(err, Err(LayoutError::DegenerateExtent { .. })));
    }
}
