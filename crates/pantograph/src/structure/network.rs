//! The canonical node/link pair threaded through the pipeline.
//!
//! Stages never mutate a network in place; each consumes one and produces a
//! replacement. Node storage is an [`IndexMap`] keyed by id so sequential
//! geometry passes iterate in a deterministic order.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

use pantograph_core::{
    geometry::Bounds,
    identifier::Id,
    model::{Link, StationNode},
};

/// A transit network: stations keyed by id plus the inter-station links.
#[derive(Debug, Clone, Default)]
pub struct Network {
    nodes: IndexMap<Id, StationNode>,
    links: Vec<Link>,
}

impl Network {
    /// Builds a network from ingested node and link records.
    ///
    /// Input is expected to be deduplicated by the ingestion collaborator; a
    /// repeated node id replaces the earlier record.
    pub fn new(nodes: Vec<StationNode>, links: Vec<Link>) -> Self {
        let nodes = nodes.into_iter().map(|node| (node.id(), node)).collect();
        Self { nodes, links }
    }

    /// Number of stations.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Looks up a station by id.
    pub fn node(&self, id: Id) -> Option<&StationNode> {
        self.nodes.get(&id)
    }

    /// True when a station with this id exists.
    pub fn contains_node(&self, id: Id) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Iterates stations in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &StationNode> {
        self.nodes.values()
    }

    /// The node map itself, for stages that index positions by id.
    pub fn node_map(&self) -> &IndexMap<Id, StationNode> {
        &self.nodes
    }

    /// All links.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Consumes the network into its parts.
    pub fn into_parts(self) -> (Vec<StationNode>, Vec<Link>) {
        (self.nodes.into_values().collect(), self.links)
    }

    /// Undirected adjacency lists, deduplicated, for every station.
    ///
    /// Stations without links get an empty list, so "exactly two neighbors"
    /// queries need no missing-key handling.
    pub fn adjacency(&self) -> IndexMap<Id, Vec<Id>> {
        let mut adjacency: IndexMap<Id, IndexSet<Id>> = self
            .nodes
            .keys()
            .map(|&id| (id, IndexSet::new()))
            .collect();

        for link in &self.links {
            if link.is_self_loop() {
                continue;
            }
            if !self.nodes.contains_key(&link.source()) || !self.nodes.contains_key(&link.target())
            {
                continue;
            }
            if let Some(neighbors) = adjacency.get_mut(&link.source()) {
                neighbors.insert(link.target());
            }
            if let Some(neighbors) = adjacency.get_mut(&link.target()) {
                neighbors.insert(link.source());
            }
        }

        adjacency
            .into_iter()
            .map(|(id, neighbors)| (id, neighbors.into_iter().collect()))
            .collect()
    }

    /// Groups station ids by the route of the links touching them.
    ///
    /// A station connected by links of several routes appears in each group.
    pub fn route_members(&self) -> IndexMap<Id, Vec<Id>> {
        let mut members: IndexMap<Id, IndexSet<Id>> = IndexMap::new();
        for link in &self.links {
            let group = members.entry(link.route()).or_default();
            if self.nodes.contains_key(&link.source()) {
                group.insert(link.source());
            }
            if self.nodes.contains_key(&link.target()) {
                group.insert(link.target());
            }
        }
        members
            .into_iter()
            .map(|(route, ids)| (route, ids.into_iter().collect()))
            .collect()
    }

    /// Bounding box over finite station positions.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.nodes.values().map(|node| node.position()))
    }

    /// Rebuilds the link list after a merge pass.
    ///
    /// Endpoints are remapped through `merge_map` (ids absent from the map
    /// stand for themselves). Links with an endpoint that no longer resolves
    /// are dropped silently, as are links whose endpoints collapse onto the
    /// same merged station. Weights are recomputed from the current endpoint
    /// distance.
    pub fn rebuild_links(
        links: &[Link],
        merge_map: &HashMap<Id, Id>,
        nodes: &IndexMap<Id, StationNode>,
    ) -> Vec<Link> {
        links
            .iter()
            .filter_map(|link| {
                let source = *merge_map.get(&link.source()).unwrap_or(&link.source());
                let target = *merge_map.get(&link.target()).unwrap_or(&link.target());
                if source == target {
                    return None;
                }
                let source_node = nodes.get(&source)?;
                let target_node = nodes.get(&target)?;
                let distance = source_node.position().distance(target_node.position());
                Some(
                    link.with_endpoints(source, target)
                        .with_weight(Link::weight_for(distance)),
                )
            })
            .collect()
    }

    /// Recomputes link weights from current endpoint positions, dropping
    /// links whose endpoints no longer resolve.
    pub fn with_recomputed_weights(self) -> Self {
        let links = Self::rebuild_links(&self.links, &HashMap::new(), &self.nodes);
        Self {
            nodes: self.nodes,
            links,
        }
    }

    /// Updates every station's connection count from current adjacency.
    pub fn with_refreshed_connection_counts(self) -> Self {
        let adjacency = self.adjacency();
        let nodes = self
            .nodes
            .into_iter()
            .map(|(id, node)| {
                let count = adjacency.get(&id).map_or(0, Vec::len);
                let node = node.with_connection_count(count);
                (id, node)
            })
            .collect();
        Self {
            nodes,
            links: self.links,
        }
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use pantograph_core::{geometry::Point, model::StationKind};

    use super::*;

    fn station(id: &str, x: f64, y: f64) -> StationNode {
        StationNode::new(
            Id::new(id),
            Id::new(&format!("R:{id}")),
            id.to_string(),
            Point::new(x, y),
            StationKind::Regular,
        )
        .unwrap()
    }

    fn link(id: &str, source: &str, target: &str, route: &str) -> Link {
        Link::new(Id::new(id), Id::new(source), Id::new(target), Id::new(route), 0.5)
    }

    fn sample_network() -> Network {
        Network::new(
            vec![
                station("a", 0.0, 0.0),
                station("b", 1.0, 0.0),
                station("c", 2.0, 0.0),
                station("d", 0.0, 1.0),
            ],
            vec![
                link("l1", "a", "b", "red"),
                link("l2", "b", "c", "red"),
                link("l3", "a", "d", "blue"),
            ],
        )
    }

    #[test]
    fn test_adjacency_is_undirected_and_complete() {
        let network = sample_network();
        let adjacency = network.adjacency();

        assert_eq!(adjacency[&Id::new("a")], vec![Id::new("b"), Id::new("d")]);
        assert_eq!(adjacency[&Id::new("b")], vec![Id::new("a"), Id::new("c")]);
        assert_eq!(adjacency[&Id::new("c")], vec![Id::new("b")]);
        assert_eq!(adjacency[&Id::new("d")], vec![Id::new("a")]);
    }

    #[test]
    fn test_adjacency_dedups_parallel_links() {
        let network = Network::new(
            vec![station("a", 0.0, 0.0), station("b", 1.0, 0.0)],
            vec![link("l1", "a", "b", "red"), link("l2", "a", "b", "blue")],
        );
        let adjacency = network.adjacency();
        assert_eq!(adjacency[&Id::new("a")], vec![Id::new("b")]);
    }

    #[test]
    fn test_route_members() {
        let network = sample_network();
        let members = network.route_members();

        assert_eq!(
            members[&Id::new("red")],
            vec![Id::new("a"), Id::new("b"), Id::new("c")]
        );
        assert_eq!(members[&Id::new("blue")], vec![Id::new("a"), Id::new("d")]);
    }

    #[test]
    fn test_rebuild_links_remaps_and_reweights() {
        let network = sample_network();
        // Merge b into a.
        let merge_map = HashMap::from([(Id::new("b"), Id::new("a"))]);
        let nodes: IndexMap<Id, StationNode> = network
            .nodes()
            .filter(|node| node.id() != Id::new("b"))
            .map(|node| (node.id(), node.clone()))
            .collect();

        let links = Network::rebuild_links(network.links(), &merge_map, &nodes);

        // l1 collapses to a self-loop and is dropped; l2 now runs a-c.
        assert_eq!(links.len(), 2);
        let ac = links
            .iter()
            .find(|l| l.source() == Id::new("a") && l.target() == Id::new("c"))
            .expect("remapped link a-c");
        assert_approx_eq!(f64, ac.weight(), 1.0); // distance 2.0, clamped
    }

    #[test]
    fn test_rebuild_links_drops_missing_endpoints() {
        let network = sample_network();
        let mut nodes = network.node_map().clone();
        nodes.shift_remove(&Id::new("d"));

        let links = Network::rebuild_links(network.links(), &HashMap::new(), &nodes);

        assert_eq!(links.len(), 2);
        assert!(links.iter().all(|l| l.other_endpoint(Id::new("d")).is_none()));
    }

    #[test]
    fn test_refreshed_connection_counts() {
        let network = sample_network().with_refreshed_connection_counts();

        assert_eq!(network.node(Id::new("a")).unwrap().connection_count(), 2);
        assert_eq!(network.node(Id::new("c")).unwrap().connection_count(), 1);
    }

    #[test]
    fn test_bounds() {
        let bounds = sample_network().bounds().unwrap();
        assert_approx_eq!(f64, bounds.width(), 2.0);
        assert_approx_eq!(f64, bounds.height(), 1.0);
    }
}
