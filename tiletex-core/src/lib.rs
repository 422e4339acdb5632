//! Core domain types for the tiletex ground-texture pipeline.
//!
//! A render request is a [`GeoArea`] plus an ordered list of [`EntityDef`]
//! rules. From those the crate derives a [`CacheKey`], builds the Overpass
//! query with [`QueryBuilder`], matches the entities of an
//! [`OsmDatasetIndex`] with [`TagMatcher`] and groups them into
//! [`RenderContainer`] values with [`EntityFilterEngine`].
//!
//! Fetching, document parsing and rasterisation live in sibling crates and
//! depend on the [`Cache`] trait defined here.

mod area;
mod cache;
mod cache_key;
mod dataset;
mod entity;
mod filter;
mod matcher;
mod primitive;
mod query;

pub use area::{GeoArea, GeoAreaError};
pub use cache::{Cache, CacheError};
pub use cache_key::{
    CacheKey, CacheKeyDeriver, CacheKeyError, DigestFunction, ENTITY_HASH_BYTES, FIELD_BITS,
    FULL_DATASET_TOKEN, LOCATION_HASH_LEN, LOCATION_MULTIPLIER, Xxh3Digest, decode_location,
    encode_location,
};
pub use dataset::{DatasetError, EntityKind, OsmDatasetIndex, OsmPoint, OsmWay, RawEntity, Tags};
pub use entity::{EntityDef, EntityDefError, GeometryKind, Rgba, ValueMatch};
pub use filter::{EntityFilterEngine, FilterError, to_primitive};
pub use matcher::{MatcherError, TagMatcher};
pub use primitive::{RenderContainer, RenderPrimitive};
pub use query::{QueryBuilder, escape as escape_query_string};

#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod test_support;
