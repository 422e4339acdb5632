//! In-memory index of one fetched OSM document.
//!
//! Points and ways are kept in document order. Points are additionally indexed
//! by id so way vertex lists can be resolved into coordinates. Relations are
//! counted but never resolved.

use std::collections::HashMap;

use geo::Coord;
use thiserror::Error;

/// OSM tags keyed by tag name.
pub type Tags = HashMap<String, String>;

/// Raw OSM element category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// An OSM node.
    Point,
    /// An OSM way.
    Way,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Point => "point",
            Self::Way => "way",
        })
    }
}

/// An OSM node with its coordinate (`x = lon`, `y = lat`).
#[derive(Debug, Clone, PartialEq)]
pub struct OsmPoint {
    /// OSM node id.
    pub id: i64,
    /// Position in degrees.
    pub location: Coord<f64>,
    /// Element tags.
    pub tags: Tags,
}

/// An OSM way referencing its vertices by node id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsmWay {
    /// OSM way id.
    pub id: i64,
    /// Ordered vertex node ids.
    pub refs: Vec<i64>,
    /// Element tags.
    pub tags: Tags,
}

/// Borrowed view of either element kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawEntity<'a> {
    /// A node.
    Point(&'a OsmPoint),
    /// A way.
    Way(&'a OsmWay),
}

impl<'a> RawEntity<'a> {
    /// Element id.
    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Point(point) => point.id,
            Self::Way(way) => way.id,
        }
    }

    /// Element category.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Point(_) => EntityKind::Point,
            Self::Way(_) => EntityKind::Way,
        }
    }

    /// Element tags.
    #[must_use]
    pub fn tags(&self) -> &'a Tags {
        match self {
            Self::Point(point) => &point.tags,
            Self::Way(way) => &way.tags,
        }
    }
}

/// Errors raised while resolving dataset references.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatasetError {
    /// A way referenced a node absent from the document.
    #[error("way {way_id} references node {point_id}, which is not in the dataset")]
    DanglingReference {
        /// Referencing way.
        way_id: i64,
        /// Missing node.
        point_id: i64,
    },
}

/// Points, ways and a node-id lookup for one OSM document.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use tiletex_core::{OsmDatasetIndex, OsmPoint, OsmWay, Tags};
///
/// # fn main() -> Result<(), tiletex_core::DatasetError> {
/// let mut index = OsmDatasetIndex::default();
/// index.push_point(OsmPoint { id: 1, location: Coord { x: 11.0, y: 48.0 }, tags: Tags::new() });
/// index.push_point(OsmPoint { id: 2, location: Coord { x: 11.1, y: 48.1 }, tags: Tags::new() });
/// let way = OsmWay { id: 10, refs: vec![2, 1], tags: Tags::new() };
/// let vertices = index.resolve_way_vertices(&way)?;
/// assert_eq!(vertices.iter().map(|p| p.id).collect::<Vec<_>>(), vec![2, 1]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct OsmDatasetIndex {
    points: Vec<OsmPoint>,
    ways: Vec<OsmWay>,
    point_lookup: HashMap<i64, usize>,
    relation_count: usize,
}

impl OsmDatasetIndex {
    /// Append a node; a repeated id replaces the earlier lookup entry.
    pub fn push_point(&mut self, point: OsmPoint) {
        self.point_lookup.insert(point.id, self.points.len());
        self.points.push(point);
    }

    /// Append a way.
    pub fn push_way(&mut self, way: OsmWay) {
        self.ways.push(way);
    }

    /// Record that a relation was present in the source.
    pub fn note_relation(&mut self) {
        self.relation_count += 1;
    }

    /// Nodes in document order.
    #[must_use]
    pub fn points(&self) -> &[OsmPoint] {
        &self.points
    }

    /// Ways in document order.
    #[must_use]
    pub fn ways(&self) -> &[OsmWay] {
        &self.ways
    }

    /// Relations seen while building the index.
    #[must_use]
    pub const fn relation_count(&self) -> usize {
        self.relation_count
    }

    /// Whether neither points nor ways were indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.ways.is_empty()
    }

    /// Look up a node by id.
    #[must_use]
    pub fn point(&self, id: i64) -> Option<&OsmPoint> {
        self.point_lookup
            .get(&id)
            .and_then(|&slot| self.points.get(slot))
    }

    /// Every element, points first then ways, each in document order.
    pub fn entities(&self) -> impl Iterator<Item = RawEntity<'_>> {
        self.points
            .iter()
            .map(RawEntity::Point)
            .chain(self.ways.iter().map(RawEntity::Way))
    }

    /// Resolve a way's vertex ids into nodes, preserving order.
    ///
    /// # Errors
    /// Returns [`DatasetError::DanglingReference`] for the first id that is
    /// not indexed.
    pub fn resolve_way_vertices(&self, way: &OsmWay) -> Result<Vec<&OsmPoint>, DatasetError> {
        way.refs
            .iter()
            .map(|&point_id| {
                self.point(point_id)
                    .ok_or(DatasetError::DanglingReference {
                        way_id: way.id,
                        point_id,
                    })
            })
            .collect()
    }
}
