//! Turning an indexed dataset into ordered render containers.

use log::debug;
use thiserror::Error;

use crate::{
    DatasetError, EntityDef, EntityKind, GeometryKind, MatcherError, OsmDatasetIndex, RawEntity,
    RenderContainer, RenderPrimitive, TagMatcher,
};

/// Errors raised while filtering and converting entities.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A definition could not be compiled into a matcher.
    #[error(transparent)]
    Matcher(#[from] MatcherError),
    /// A way could not be resolved into coordinates.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    /// An entity reached conversion with the wrong kind for its definition.
    #[error("entity {entity_id} is a {actual} but its definition expects a {expected}")]
    KindMismatch {
        /// Offending entity.
        entity_id: i64,
        /// Kind the definition selects.
        expected: EntityKind,
        /// Kind the entity has.
        actual: EntityKind,
    },
}

/// Applies an ordered list of [`EntityDef`] values to a dataset.
///
/// Every entity is tested against every definition, so one entity may appear
/// in several containers. Containers are emitted in definition order and
/// definitions without matches produce none.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use tiletex_core::{
///     EntityDef, EntityFilterEngine, OsmDatasetIndex, OsmPoint, Rgba, Tags, ValueMatch,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut index = OsmDatasetIndex::default();
/// index.push_point(OsmPoint {
///     id: 1,
///     location: Coord { x: 11.0, y: 48.0 },
///     tags: Tags::from([("amenity".to_owned(), "cafe".to_owned())]),
/// });
/// let defs = vec![EntityDef::point("amenity", ValueMatch::Any, Rgba::BLACK, 3.0)?];
/// let containers = EntityFilterEngine::new(defs)?.apply(&index)?;
/// assert_eq!(containers.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EntityFilterEngine {
    defs: Vec<EntityDef>,
    matchers: Vec<TagMatcher>,
}

impl EntityFilterEngine {
    /// Compile a matcher for every definition.
    pub fn new(defs: Vec<EntityDef>) -> Result<Self, FilterError> {
        let matchers = defs
            .iter()
            .map(TagMatcher::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { defs, matchers })
    }

    /// Definitions in declaration order.
    #[must_use]
    pub fn defs(&self) -> &[EntityDef] {
        &self.defs
    }

    /// Match every entity, then convert the matches per definition.
    pub fn apply(&self, index: &OsmDatasetIndex) -> Result<Vec<RenderContainer>, FilterError> {
        let matches = self.collect_matches(index);
        let mut containers = Vec::new();
        for (def_index, (def, entities)) in self.defs.iter().zip(matches).enumerate() {
            if entities.is_empty() {
                continue;
            }
            let primitives = entities
                .iter()
                .map(|entity| to_primitive(def, entity, index))
                .collect::<Result<Vec<_>, _>>()?;
            debug!(
                "definition {def_index} ({}) produced {} primitives",
                def.key(),
                primitives.len()
            );
            containers.push(RenderContainer {
                def_index,
                kind: def.kind(),
                primitives,
            });
        }
        Ok(containers)
    }

    fn collect_matches<'a>(&self, index: &'a OsmDatasetIndex) -> Vec<Vec<RawEntity<'a>>> {
        let mut matches = vec![Vec::new(); self.matchers.len()];
        for entity in index.entities() {
            for (matcher, bucket) in self.matchers.iter().zip(matches.iter_mut()) {
                if matcher.matches(&entity) {
                    bucket.push(entity);
                }
            }
        }
        matches
    }
}

/// Convert one matched entity using its definition's drawing parameters.
///
/// # Errors
/// Returns [`FilterError::KindMismatch`] when the entity kind disagrees with
/// the definition and [`FilterError::Dataset`] when a way cannot be resolved.
pub fn to_primitive(
    def: &EntityDef,
    entity: &RawEntity<'_>,
    index: &OsmDatasetIndex,
) -> Result<RenderPrimitive, FilterError> {
    let color = def.color();
    let size = def.size();
    match (def.kind(), entity) {
        (GeometryKind::Point, RawEntity::Point(point)) => Ok(RenderPrimitive::Point {
            coord: point.location,
            color,
            radius: size,
        }),
        (GeometryKind::Polyline, RawEntity::Way(way)) => Ok(RenderPrimitive::Polyline {
            coords: vertex_coords(index, way)?,
            color,
            stroke_width: size,
        }),
        (GeometryKind::Polygon, RawEntity::Way(way)) => Ok(RenderPrimitive::Polygon {
            coords: vertex_coords(index, way)?,
            color,
            stroke_width: size,
        }),
        (kind, entity) => Err(FilterError::KindMismatch {
            entity_id: entity.id(),
            expected: kind.source_kind(),
            actual: entity.kind(),
        }),
    }
}

fn vertex_coords(
    index: &OsmDatasetIndex,
    way: &crate::OsmWay,
) -> Result<Vec<geo::Coord<f64>>, DatasetError> {
    Ok(index
        .resolve_way_vertices(way)?
        .into_iter()
        .map(|point| point.location)
        .collect())
}
