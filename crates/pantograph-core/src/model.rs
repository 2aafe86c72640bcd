//! Station and link records forming the network data model.
//!
//! Nodes are value-immutable: a position or kind change produces a new value
//! that shares the same `id` and `original_position`. Stages replace whole
//! node lists instead of mutating nodes in place, which keeps every
//! intermediate network a consistent snapshot.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{geometry::Point, identifier::Id};

/// Link weights are clamped into this interval.
pub const WEIGHT_MIN: f64 = 0.1;
/// Upper clamp for link weights.
pub const WEIGHT_MAX: f64 = 1.0;
/// Distance divisor feeding the weight clamp.
const WEIGHT_DISTANCE_SCALE: f64 = 0.1;

/// Errors raised at the data-model boundary.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A station was constructed with a NaN or infinite coordinate.
    ///
    /// Violated positions are rejected outright, never silently coerced.
    #[error("station {id} has a non-finite position")]
    NonFinitePosition { id: Id },
}

/// Classification of a station within the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationKind {
    /// An ordinary through station.
    #[default]
    Regular,
    /// A station where two or more distinct routes meet.
    Transfer,
    /// An end-of-line station.
    Terminal,
}

/// A station in the transit network.
///
/// Equality and hashing consider only `id`; two values with the same `id`
/// represent the same station at different pipeline stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationNode {
    id: Id,
    stop_id: Id,
    name: String,
    position: Point,
    original_position: Point,
    kind: StationKind,
    connection_count: usize,
}

impl StationNode {
    /// Creates a station, snapshotting `position` as `original_position`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NonFinitePosition`] when either coordinate is
    /// NaN or infinite.
    pub fn new(
        id: Id,
        stop_id: Id,
        name: impl Into<String>,
        position: Point,
        kind: StationKind,
    ) -> Result<Self, ModelError> {
        if !position.is_finite() {
            return Err(ModelError::NonFinitePosition { id });
        }
        Ok(Self {
            id,
            stop_id,
            name: name.into(),
            position,
            original_position: position,
            kind,
            connection_count: 0,
        })
    }

    /// Stable identity, unchanged across stages unless the node is merged away.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Source feed identifier, used for route-prefix grouping.
    pub fn stop_id(&self) -> Id {
        self.stop_id
    }

    /// Human-readable station name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current layout position.
    pub fn position(&self) -> Point {
        self.position
    }

    /// Immutable snapshot of the position the node was created with.
    pub fn original_position(&self) -> Point {
        self.original_position
    }

    /// Station classification.
    pub fn kind(&self) -> StationKind {
        self.kind
    }

    /// Number of adjacency neighbors, refreshed after link rebuilds.
    pub fn connection_count(&self) -> usize {
        self.connection_count
    }

    /// Returns a new value at `position`, keeping id and original position.
    pub fn with_position(&self, position: Point) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }

    /// Returns a new value with the given kind.
    pub fn with_kind(&self, kind: StationKind) -> Self {
        Self {
            kind,
            ..self.clone()
        }
    }

    /// Returns a new value with the given connection count.
    pub fn with_connection_count(&self, connection_count: usize) -> Self {
        Self {
            connection_count,
            ..self.clone()
        }
    }
}

impl PartialEq for StationNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for StationNode {}

impl std::hash::Hash for StationNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// An inter-station link, attributed to one route.
///
/// Links carry value equality on all fields. The layout stages recompute
/// `weight` but never restructure endpoints; a link whose endpoint no longer
/// resolves is dropped, not errored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    id: Id,
    source: Id,
    target: Id,
    route: Id,
    weight: f64,
}

impl Link {
    /// Creates a link with the weight clamped into [`WEIGHT_MIN`, `WEIGHT_MAX`].
    pub fn new(id: Id, source: Id, target: Id, route: Id, weight: f64) -> Self {
        Self {
            id,
            source,
            target,
            route,
            weight: weight.clamp(WEIGHT_MIN, WEIGHT_MAX),
        }
    }

    /// Derives the clamped weight for a Euclidean distance between endpoints.
    pub fn weight_for(distance: f64) -> f64 {
        (distance / WEIGHT_DISTANCE_SCALE).clamp(WEIGHT_MIN, WEIGHT_MAX)
    }

    /// Link identity.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Source station id.
    pub fn source(&self) -> Id {
        self.source
    }

    /// Target station id.
    pub fn target(&self) -> Id {
        self.target
    }

    /// Route this link belongs to.
    pub fn route(&self) -> Id {
        self.route
    }

    /// Clamped weight derived from endpoint distance.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Returns a new value with the given weight, clamped.
    pub fn with_weight(&self, weight: f64) -> Self {
        Self {
            weight: weight.clamp(WEIGHT_MIN, WEIGHT_MAX),
            ..self.clone()
        }
    }

    /// Returns a new value with remapped endpoints (after a merge pass).
    pub fn with_endpoints(&self, source: Id, target: Id) -> Self {
        Self {
            source,
            target,
            ..self.clone()
        }
    }

    /// The opposite endpoint of `id`, or `None` when `id` is not an endpoint.
    pub fn other_endpoint(&self, id: Id) -> Option<Id> {
        if self.source == id {
            Some(self.target)
        } else if self.target == id {
            Some(self.source)
        } else {
            None
        }
    }

    /// True when the link starts and ends at the same station.
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;

    fn station(id: &str, x: f64, y: f64) -> StationNode {
        StationNode::new(
            Id::new(id),
            Id::new(&format!("stop:{id}")),
            id.to_string(),
            Point::new(x, y),
            StationKind::Regular,
        )
        .unwrap()
    }

    #[test]
    fn test_station_snapshots_original_position() {
        let node = station("a", 1.0, 2.0);
        let moved = node.with_position(Point::new(5.0, 6.0));

        assert_eq!(moved.position(), Point::new(5.0, 6.0));
        assert_eq!(moved.original_position(), Point::new(1.0, 2.0));
        assert_eq!(moved.id(), node.id());
    }

    #[test]
    fn test_station_rejects_non_finite() {
        let err = StationNode::new(
            Id::new("bad"),
            Id::new("stop:bad"),
            "bad",
            Point::new(f64::NAN, 0.0),
            StationKind::Regular,
        );
        assert!(matches!(err, Err(ModelError::NonFinitePosition { .. })));
    }

    #[test]
    fn test_station_equality_is_by_id() {
        let a = station("same", 0.0, 0.0);
        let b = a.with_position(Point::new(9.0, 9.0)).with_kind(StationKind::Transfer);
        let c = station("other", 0.0, 0.0);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_with_kind_preserves_identity() {
        let node = station("x", 0.0, 0.0);
        let transfer = node.with_kind(StationKind::Transfer);
        assert_eq!(transfer.kind(), StationKind::Transfer);
        assert_eq!(transfer.id(), node.id());
        assert_eq!(transfer.original_position(), node.original_position());
    }

    #[test]
    fn test_station_serde_round_trip() {
        let node = station("alexanderplatz", 13.4132, 52.5219)
            .with_position(Point::new(48.0, 21.0))
            .with_kind(StationKind::Transfer);

        let json = serde_json::to_string(&node).expect("station should serialize");
        let restored: StationNode = serde_json::from_str(&json).expect("station should deserialize");

        assert_eq!(restored.id(), node.id());
        assert_eq!(restored.kind(), StationKind::Transfer);
        assert_eq!(restored.position(), Point::new(48.0, 21.0));
        assert_eq!(restored.original_position(), node.original_position());
    }

    #[test]
    fn test_weight_for_clamps() {
        assert_approx_eq!(f64, Link::weight_for(0.0), WEIGHT_MIN);
        assert_approx_eq!(f64, Link::weight_for(0.005), WEIGHT_MIN);
        assert_approx_eq!(f64, Link::weight_for(0.05), 0.5);
        assert_approx_eq!(f64, Link::weight_for(10.0), WEIGHT_MAX);
    }

    #[test]
    fn test_link_value_equality() {
        let link = Link::new(Id::new("l1"), Id::new("a"), Id::new("b"), Id::new("r"), 0.5);
        let same = Link::new(Id::new("l1"), Id::new("a"), Id::new("b"), Id::new("r"), 0.5);
        let reweighted = link.with_weight(0.7);

        assert_eq!(link, same);
        assert_ne!(link, reweighted);
    }

    #[test]
    fn test_other_endpoint() {
        let link = Link::new(Id::new("l"), Id::new("a"), Id::new("b"), Id::new("r"), 0.5);
        assert_eq!(link.other_endpoint(Id::new("a")), Some(Id::new("b")));
        assert_eq!(link.other_endpoint(Id::new("b")), Some(Id::new("a")));
        assert_eq!(link.other_endpoint(Id::new("c")), None);
    }

    #[test]
    fn test_self_loop_detection() {
        let link = Link::new(Id::new("l"), Id::new("a"), Id::new("a"), Id::new("r"), 0.5);
        assert!(link.is_self_loop());
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn weight_is_always_clamped(distance in 0.0..1e6f64) {
                let weight = Link::weight_for(distance);
                prop_assert!(weight >= WEIGHT_MIN);
                prop_assert!(weight <= WEIGHT_MAX);
            }
        }
    }
}
