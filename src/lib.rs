//! Facade crate for tiletex, which turns OpenStreetMap data for a bounding
//! box into a rasterised ground-texture tile.
//!
//! The domain types live in `tiletex-core`, data access in `tiletex-data` and
//! rasterisation in `tiletex-render`. [`TilePipeline`] wires them together
//! for one render request.

#![forbid(unsafe_code)]

mod pipeline;

pub use pipeline::{
    DEFAULT_TILE_SIZE, FetchScope, PipelineError, RenderedTile, TilePipeline, TileSettings,
};
pub use tiletex_core::{
    Cache, CacheError, CacheKey, CacheKeyDeriver, CacheKeyError, EntityDef, EntityDefError,
    EntityFilterEngine, GeoArea, GeoAreaError, GeometryKind, OsmDatasetIndex, QueryBuilder,
    RenderContainer, RenderPrimitive, Rgba, ValueMatch,
};
pub use tiletex_data::{
    DEFAULT_ENDPOINTS, DatasetFetcher, DirectoryCache, FetchError, FetcherConfig,
    ReqwestTransport, Transport, TransportConfig, TransportError, parse_document,
};
pub use tiletex_render::{RasterError, RasterStats, TileRasterizer};
