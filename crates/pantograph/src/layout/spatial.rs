//! Spatial index over station positions.
//!
//! A thin wrapper around an R-tree supporting the radius queries the
//! clusterer issues. The index is built once per optimization pass over the
//! currently valid (finite) nodes and is read-only afterwards; positions
//! moved by a later stage require a rebuild.

use rstar::{RTree, primitives::GeomWithData};

use pantograph_core::{geometry::Point, identifier::Id, model::StationNode};

type IndexedPoint = GeomWithData<[f64; 2], Id>;

/// Read-only range/radius query structure over 2D node positions.
#[derive(Debug)]
pub struct SpatialIndex {
    tree: RTree<IndexedPoint>,
}

impl SpatialIndex {
    /// Bulk-loads the index from station nodes.
    ///
    /// Nodes with non-finite coordinates are excluded before insertion, so
    /// queries never see a malformed position.
    pub fn build<'a>(nodes: impl IntoIterator<Item = &'a StationNode>) -> Self {
        let items: Vec<IndexedPoint> = nodes
            .into_iter()
            .filter(|node| node.position().is_finite())
            .map(|node| GeomWithData::new(node.position().to_array(), node.id()))
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    /// Number of indexed positions.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// True when nothing was indexed.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Ids of indexed nodes within Euclidean distance `radius` of `center`.
    ///
    /// The query node itself is included when it was indexed; callers filter
    /// it out as needed.
    pub fn within_radius(&self, center: Point, radius: f64) -> impl Iterator<Item = Id> + '_ {
        self.tree
            .locate_within_distance(center.to_array(), radius * radius)
            .map(|item| item.data)
    }
}
