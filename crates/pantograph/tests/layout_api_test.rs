//! Integration tests for the layout API.
//!
//! These run the full pipeline through the public surface and check the
//! structural guarantees the layout makes about its output.

use pantograph::geometry::Point;
use pantograph::identifier::Id;
use pantograph::model::{Link, StationKind, StationNode};
use pantograph::{LayoutError, LayoutOptions, Network, Pipeline, layout};

fn station(id: &str, stop_id: &str, x: f64, y: f64, kind: StationKind) -> StationNode {
    StationNode::new(Id::new(id), Id::new(stop_id), id.to_string(), Point::new(x, y), kind)
        .expect("finite test position")
}

fn link(id: &str, source: &str, target: &str, route: &str) -> Link {
    Link::new(Id::new(id), Id::new(source), Id::new(target), Id::new(route), 0.5)
}

/// A small two-line network around one interchange, on geographic
/// coordinates roughly the size of a city.
fn city_network() -> Network {
    Network::new(
        vec![
            station("west-end", "U1:west-end", 13.28, 52.51, StationKind::Terminal),
            station("park", "U1:park", 13.33, 52.52, StationKind::Regular),
            station("central", "U1:central", 13.38, 52.52, StationKind::Transfer),
            station("market", "U1:market", 13.43, 52.53, StationKind::Regular),
            station("east-end", "U1:east-end", 13.47, 52.54, StationKind::Terminal),
            station("north-gate", "U2:north-gate", 13.37, 52.56, StationKind::Terminal),
            station("central-2", "U2:central", 13.381, 52.521, StationKind::Regular),
            station("south-gate", "U2:south-gate", 13.39, 52.48, StationKind::Terminal),
        ],
        vec![
            link("u1-1", "west-end", "park", "U1"),
            link("u1-2", "park", "central", "U1"),
            link("u1-3", "central", "market", "U1"),
            link("u1-4", "market", "east-end", "U1"),
            link("u2-1", "north-gate", "central-2", "U2"),
            link("u2-2", "central-2", "south-gate", "U2"),
        ],
    )
}

#[test]
fn test_pipeline_output_is_finite() {
    let result = Pipeline::default().run(city_network()).expect("layout succeeds");

    for node in result.nodes() {
        assert!(node.position().is_finite(), "{} has a non-finite position", node.name());
    }
    for link in result.links() {
        assert!(link.weight().is_finite());
    }
}

#[test]
fn test_pipeline_never_invents_stations() {
    let input = city_network();
    let input_ids: Vec<Id> = input.nodes().map(|node| node.id()).collect();
    let before = input.node_count();

    let result = Pipeline::default().run(input).expect("layout succeeds");

    assert!(result.node_count() <= before);
    for node in result.nodes() {
        assert!(
            input_ids.contains(&node.id()),
            "{} was not in the input",
            node.name()
        );
    }
}

#[test]
fn test_pipeline_preserves_original_positions() {
    let result = Pipeline::default().run(city_network()).expect("layout succeeds");

    // Schematic positions move; the geographic original stays readable.
    for node in result.nodes() {
        let original = node.original_position();
        assert!((13.0..14.0).contains(&original.x()));
        assert!((52.0..53.0).contains(&original.y()));
    }
}

#[test]
fn test_link_endpoints_reference_surviving_nodes() {
    let result = Pipeline::default().run(city_network()).expect("layout succeeds");

    for link in result.links() {
        assert!(result.contains_node(link.source()));
        assert!(result.contains_node(link.target()));
        assert!(!link.is_self_loop());
    }
}

#[test]
fn test_convenience_function_matches_pipeline() {
    let (nodes, links) = city_network().into_parts();
    let result = layout(nodes, links, LayoutOptions::default());
    assert!(result.is_ok());
}

#[test]
fn test_empty_input_is_rejected() {
    let result = layout(vec![], vec![], LayoutOptions::default());
    assert!(matches!(result, Err(LayoutError::EmptyNetwork { .. })));
}

#[test]
fn test_wider_clustering_radius_merges_more() {
    let narrow = Pipeline::new(LayoutOptions::default().with_node_clustering_distance(0.0001))
        .run(city_network())
        .expect("layout succeeds");
    let wide = Pipeline::new(LayoutOptions::default().with_node_clustering_distance(0.06))
        .run(city_network())
        .expect("layout succeeds");

    assert!(wide.node_count() <= narrow.node_count());
}
