//! Near-duplicate station clustering.
//!
//! Source feeds frequently carry the same physical station several times
//! (one platform record per direction, per operator, or per feed version).
//! This stage merges stations of the same route that sit within the
//! clustering radius into a single node, producing the normalized network
//! the later stages consume.
//!
//! The merge is a single pass: a cluster is a node plus its immediate
//! radius neighbors, not a transitively grown component. Transitive growth
//! happens later, in the topology refiner, under stricter constraints.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::{debug, warn};

use pantograph_core::{
    geometry::Point,
    identifier::Id,
    model::{StationKind, StationNode},
};

use crate::{
    config::LayoutOptions, error::LayoutError, layout::spatial::SpatialIndex, structure::Network,
};

/// Merges near-duplicate stations per route.
#[derive(Debug)]
pub struct Clusterer {
    clustering_distance: f64,
}

impl Clusterer {
    /// Creates a clusterer from pipeline options.
    pub fn new(options: &LayoutOptions) -> Self {
        Self {
            clustering_distance: options.node_clustering_distance(),
        }
    }

    /// Runs the merge pass, returning the normalized network.
    ///
    /// Nodes with non-finite coordinates are excluded before any spatial
    /// query and do not reappear in the output. Links are rebuilt against
    /// the merged node set with recomputed weights; links that lose an
    /// endpoint are dropped silently.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::EmptyCluster`] when a merge produces zero
    /// valid members.
    pub fn run(&self, network: Network) -> Result<Network, LayoutError> {
        let dropped: Vec<Id> = network
            .nodes()
            .filter(|node| !node.position().is_finite())
            .map(|node| node.id())
            .collect();
        for id in &dropped {
            warn!(node = id.as_string(); "Excluding station with non-finite position");
        }

        let index = SpatialIndex::build(network.nodes());
        let route_members = network.route_members();

        let mut visited: HashSet<Id> = HashSet::new();
        let mut merge_map: HashMap<Id, Id> = HashMap::new();
        let mut merged: HashMap<Id, StationNode> = HashMap::new();

        for (route, members) in &route_members {
            let member_set: HashSet<Id> = members.iter().copied().collect();
            for &seed_id in members {
                if visited.contains(&seed_id) {
                    continue;
                }
                let Some(seed) = network.node(seed_id) else {
                    continue;
                };
                if !seed.position().is_finite() {
                    continue;
                }

                // Immediate neighbors only: same route, not yet merged.
                let neighbors: Vec<Id> = index
                    .within_radius(seed.position(), self.clustering_distance)
                    .filter(|id| *id != seed_id)
                    .filter(|id| member_set.contains(id))
                    .filter(|id| !visited.contains(id))
                    .collect();
                if neighbors.is_empty() {
                    continue;
                }

                let cluster: Vec<&StationNode> = std::iter::once(seed_id)
                    .chain(neighbors.iter().copied())
                    .filter_map(|id| network.node(id))
                    .collect();
                let valid: Vec<&StationNode> = cluster
                    .iter()
                    .copied()
                    .filter(|node| node.position().is_finite())
                    .collect();
                if valid.is_empty() {
                    return Err(LayoutError::EmptyCluster {
                        group: route.as_string(),
                    });
                }

                let centroid = valid
                    .iter()
                    .fold(Point::new(0.0, 0.0), |acc, node| acc.add(node.position()))
                    .scale(1.0 / valid.len() as f64);

                let kind = if cluster.len() > 1 {
                    StationKind::Transfer
                } else {
                    seed.kind()
                };

                debug!(
                    route = route.as_string(),
                    seed = seed_id.as_string(),
                    members = cluster.len();
                    "Merging station cluster"
                );

                visited.insert(seed_id);
                for neighbor in &neighbors {
                    visited.insert(*neighbor);
                    merge_map.insert(*neighbor, seed_id);
                }
                merged.insert(seed_id, seed.with_position(centroid).with_kind(kind));
            }
        }

        // Replacement node list in the original order: merged representatives,
        // untouched survivors, and nothing for merged-away or invalid nodes.
        let nodes: IndexMap<Id, StationNode> = network
            .nodes()
            .filter(|node| !merge_map.contains_key(&node.id()))
            .filter(|node| node.position().is_finite())
            .map(|node| {
                let node = merged.remove(&node.id()).unwrap_or_else(|| node.clone());
                (node.id(), node)
            })
            .collect();

        let links = Network::rebuild_links(network.links(), &merge_map, &nodes);
        let (nodes, links) = (nodes.into_values().collect(), links);
        Ok(Network::new(nodes, links).with_refreshed_connection_counts())
    }
}
