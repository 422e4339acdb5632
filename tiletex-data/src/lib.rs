//! Data access for tiletex: Overpass transport, the on-disk cache, cached
//! fetching with endpoint failover and OSM XML parsing.
//!
//! The pipeline pieces compose as follows:
//!
//! - [`DatasetFetcher`] resolves a [`tiletex_core::CacheKey`] to a local
//!   document, consulting a [`tiletex_core::Cache`] before any
//!   [`Transport`].
//! - [`parse_document`] turns that document into an
//!   [`tiletex_core::OsmDatasetIndex`].

mod archive;
mod cache;
mod document;
mod fetcher;
mod transport;

pub use archive::{ArchiveError, compress_file, extract_single, publish, stage_beside};
pub use cache::DirectoryCache;
pub use document::{
    BadCoordinate, Compression, DocumentError, ReadError, parse_document, parse_reader,
};
pub use fetcher::{DEFAULT_ENDPOINTS, DatasetFetcher, FetchError, FetcherConfig};
pub use transport::{
    DEFAULT_USER_AGENT, ReqwestTransport, Transport, TransportBuildError, TransportConfig,
    TransportError,
};

#[doc(hidden)]
pub mod test_support;
