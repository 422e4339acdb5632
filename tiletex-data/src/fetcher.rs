//! Cache-first retrieval of Overpass documents with endpoint failover.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use thiserror::Error;
use tiletex_core::{Cache, CacheError, CacheKey};
use tiletex_fs::ensure_dir;
use url::Url;

use crate::archive::{ArchiveError, compress_file, extract_single, publish, stage_beside};
use crate::transport::{Transport, TransportError};

/// Public Overpass API interpreters, tried in order.
pub const DEFAULT_ENDPOINTS: [&str; 3] = [
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
    "https://maps.mail.ru/osm/tools/overpass/api/interpreter",
];

/// Query parameter carrying the Overpass QL text.
const QUERY_PARAMETER: &str = "data";

/// Errors surfaced by [`DatasetFetcher::fetch`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// The endpoint list was empty.
    #[error("no Overpass endpoints are configured")]
    NoEndpoints,
    /// An endpoint was not a valid URL.
    #[error("invalid endpoint {endpoint:?}: {source}")]
    InvalidEndpoint {
        /// Endpoint as configured.
        endpoint: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },
    /// Every endpoint failed; `last` is the final attempt's failure.
    #[error("all {attempts} Overpass endpoints failed; last error: {last}")]
    AllEndpointsFailed {
        /// Endpoints tried.
        attempts: usize,
        /// Failure of the final attempt.
        #[source]
        last: TransportError,
    },
    /// A cache entry reported present could not be read.
    #[error("cache entry {name} could not be read: {source}")]
    CacheRead {
        /// Entry name.
        name: String,
        /// Underlying failure.
        #[source]
        source: CacheError,
    },
    /// A cache entry could not be decompressed.
    #[error("cache entry {name} is corrupt: {source}")]
    CacheEntry {
        /// Entry name.
        name: String,
        /// Underlying failure.
        #[source]
        source: ArchiveError,
    },
    /// The work directory could not be prepared or written.
    #[error("work directory access failed at {path}: {source}")]
    WorkDir {
        /// Path being accessed.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
enum StoreError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Behaviour of a [`DatasetFetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Endpoint base URLs in priority order.
    pub endpoints: Vec<String>,
    /// Directory decompressed and downloaded documents are written to.
    pub work_dir: Utf8PathBuf,
    /// Whether downloads are written back to the cache.
    pub cache_writes: bool,
}

impl FetcherConfig {
    /// Configuration using the public endpoints and writing into `work_dir`.
    #[must_use]
    pub fn new(work_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            endpoints: DEFAULT_ENDPOINTS.iter().map(|&e| e.to_owned()).collect(),
            work_dir: work_dir.into(),
            cache_writes: true,
        }
    }

    /// Replace the endpoint list.
    #[must_use]
    pub fn with_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable writing downloads back to the cache.
    #[must_use]
    pub fn with_cache_writes(mut self, enabled: bool) -> Self {
        self.cache_writes = enabled;
        self
    }
}

/// Resolves a [`CacheKey`] and query to a local OSM document.
///
/// The cache is consulted first; a hit never touches the network. On a miss
/// each endpoint is tried once, in order, until one returns a body. The
/// download is written to a staged file, renamed to its working name and
/// then, unless disabled, compressed into the cache. A failed cache write is
/// logged and does not fail the fetch.
///
/// # Examples
/// ```no_run
/// use tiletex_core::{CacheKeyDeriver, GeoArea, QueryBuilder};
/// use tiletex_data::{
///     DatasetFetcher, DirectoryCache, FetcherConfig, ReqwestTransport, TransportConfig,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let area = GeoArea::new(48.0, 11.0, 48.01, 11.01)?;
/// let key = CacheKeyDeriver::default().derive_full(&area)?;
/// let query = QueryBuilder::new(&area).build_full();
///
/// let cache = DirectoryCache::open("cache")?;
/// let transport = ReqwestTransport::new(TransportConfig::default())?;
/// let mut fetcher = DatasetFetcher::new(cache, transport, FetcherConfig::new("work"));
/// let document = fetcher.fetch(&key, &query)?;
/// println!("{document}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DatasetFetcher<C, T> {
    cache: C,
    transport: T,
    config: FetcherConfig,
}

impl<C: Cache, T: Transport> DatasetFetcher<C, T> {
    /// Assemble a fetcher from its collaborators.
    pub fn new(cache: C, transport: T, config: FetcherConfig) -> Self {
        Self {
            cache,
            transport,
            config,
        }
    }

    /// The cache collaborator.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// The transport collaborator.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Active configuration.
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Return the path of the decompressed document for `key`.
    ///
    /// `query` is only sent when the cache has no entry for `key`.
    pub fn fetch(&mut self, key: &CacheKey, query: &str) -> Result<Utf8PathBuf, FetchError> {
        let entry_name = key.file_name();
        let document = self.config.work_dir.join(key.working_file_name());
        if self.cache.has(&entry_name) {
            info!("cache hit for {key}");
            return self.read_cached(&entry_name, &document);
        }
        info!("cache miss for {key}; querying Overpass");
        debug!("overpass query for {key}: {query}");
        self.download(query, &document)?;
        if self.config.cache_writes {
            if let Err(err) = self.store(&entry_name, &document) {
                warn!("failed to cache {entry_name}; continuing with {document}: {err}");
            }
        }
        Ok(document)
    }

    fn read_cached(&self, name: &str, document: &Utf8Path) -> Result<Utf8PathBuf, FetchError> {
        let entry = self.cache.get(name).map_err(|source| FetchError::CacheRead {
            name: name.to_owned(),
            source,
        })?;
        extract_single(&entry, document).map_err(|source| FetchError::CacheEntry {
            name: name.to_owned(),
            source,
        })?;
        Ok(document.to_owned())
    }

    fn endpoint_urls(&self, query: &str) -> Result<Vec<Url>, FetchError> {
        if self.config.endpoints.is_empty() {
            return Err(FetchError::NoEndpoints);
        }
        self.config
            .endpoints
            .iter()
            .map(|endpoint| {
                let mut url =
                    Url::parse(endpoint).map_err(|source| FetchError::InvalidEndpoint {
                        endpoint: endpoint.clone(),
                        source,
                    })?;
                url.query_pairs_mut().append_pair(QUERY_PARAMETER, query);
                Ok(url)
            })
            .collect()
    }

    fn download(&self, query: &str, document: &Utf8Path) -> Result<(), FetchError> {
        let urls = self.endpoint_urls(query)?;
        let work_dir = &self.config.work_dir;
        ensure_dir(work_dir).map_err(|source| FetchError::WorkDir {
            path: work_dir.clone(),
            source,
        })?;
        let work_dir_error = |source| FetchError::WorkDir {
            path: document.to_owned(),
            source,
        };
        let attempts = urls.len();
        let mut last = None;
        for (attempt, url) in urls.iter().enumerate() {
            let endpoint = self
                .config
                .endpoints
                .get(attempt)
                .map_or("<unknown>", String::as_str);
            info!("requesting {endpoint} ({}/{attempts})", attempt + 1);
            let mut staged = stage_beside(document).map_err(work_dir_error)?;
            match self.transport.fetch(url, &mut staged) {
                Ok(bytes) => {
                    staged.flush().map_err(work_dir_error)?;
                    publish(staged, document).map_err(work_dir_error)?;
                    info!("downloaded {bytes} bytes from {endpoint} into {document}");
                    return Ok(());
                }
                Err(err) => {
                    warn!("endpoint {endpoint} failed, trying the next one: {err}");
                    last = Some(err);
                }
            }
        }
        match last {
            Some(last) => Err(FetchError::AllEndpointsFailed { attempts, last }),
            None => Err(FetchError::NoEndpoints),
        }
    }

    fn store(&mut self, name: &str, document: &Utf8Path) -> Result<(), StoreError> {
        let staged = self.cache.allocate(name)?;
        let entry_name = document.file_name().unwrap_or(name);
        let stored = compress_file(document, &staged, entry_name)
            .map_err(StoreError::from)
            .and_then(|_| self.cache.commit(&staged, true).map_err(StoreError::from));
        if let Err(err) = stored {
            if let Err(discard) = self.cache.discard(&staged) {
                debug!("failed to discard staged entry {staged}: {discard}");
            }
            return Err(err);
        }
        info!("cached {name}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DirectoryCache;
    use crate::test_support::{StubReply, StubTransport};
    use rstest::{fixture, rstest};
    use std::fs;
    use tiletex_core::test_support::CommitFailingCache;
    use tiletex_core::{CacheKeyDeriver, GeoArea};

    const BODY: &str = r#"<osm version="0.6"><node id="1" lat="48.005" lon="11.005"/></osm>"#;

    struct Workspace {
        _temp: tempfile::TempDir,
        root: Utf8PathBuf,
    }

    impl Workspace {
        fn config(&self) -> FetcherConfig {
            FetcherConfig::new(self.root.join("work"))
                .with_endpoints(["https://one.example/api", "https://two.example/api"])
        }

        fn cache(&self) -> DirectoryCache {
            DirectoryCache::open(self.root.join("cache")).expect("open cache")
        }
    }

    #[fixture]
    fn workspace() -> Workspace {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8");
        Workspace { _temp: temp, root }
    }

    #[fixture]
    fn key() -> CacheKey {
        let area = GeoArea::new(48.0, 11.0, 48.01, 11.01).expect("valid area");
        CacheKeyDeriver::default().derive_full(&area).expect("derives")
    }

    #[rstest]
    fn fails_over_to_the_next_endpoint(workspace: Workspace, key: CacheKey) {
        let transport = StubTransport::new()
            .reply("https://one.example", StubReply::Timeout)
            .reply("https://two.example", StubReply::Body(BODY.into()));
        let mut fetcher = DatasetFetcher::new(workspace.cache(), &transport, workspace.config());
        let document = fetcher.fetch(&key, "(node;);out;").expect("second endpoint serves");
        assert_eq!(fs::read_to_string(&document).expect("read"), BODY);
        assert_eq!(transport.calls().len(), 2);
        assert!(fetcher.cache().has(&key.file_name()));
    }

    #[rstest]
    fn query_travels_as_the_data_parameter(workspace: Workspace, key: CacheKey) {
        let transport =
            StubTransport::new().reply("https://one.example", StubReply::Body(BODY.into()));
        let mut fetcher = DatasetFetcher::new(workspace.cache(), &transport, workspace.config());
        fetcher.fetch(&key, "way[\"a\"=\"b\"];").expect("fetch");
        let calls = transport.calls();
        let url = calls.first().expect("one call");
        let (name, value) = url.query_pairs().next().expect("one parameter");
        assert_eq!(name, "data");
        assert_eq!(value, "way[\"a\"=\"b\"];");
    }

    #[rstest]
    fn disabled_cache_writes_leave_the_cache_empty(workspace: Workspace, key: CacheKey) {
        let transport =
            StubTransport::new().reply("https://one.example", StubReply::Body(BODY.into()));
        let config = workspace.config().with_cache_writes(false);
        let mut fetcher = DatasetFetcher::new(workspace.cache(), &transport, config);
        fetcher.fetch(&key, "q").expect("fetch");
        assert!(!fetcher.cache().has(&key.file_name()));
    }

    #[rstest]
    fn cache_write_failure_does_not_fail_the_fetch(workspace: Workspace, key: CacheKey) {
        let transport =
            StubTransport::new().reply("https://one.example", StubReply::Body(BODY.into()));
        let cache = CommitFailingCache::new(workspace.root.clone());
        let mut fetcher = DatasetFetcher::new(cache, &transport, workspace.config());
        let document = fetcher.fetch(&key, "q").expect("download still succeeds");
        assert_eq!(fs::read_to_string(document).expect("read"), BODY);
        assert_eq!(fetcher.cache().commit_attempts(), 1);
        assert_eq!(fetcher.cache().discards(), 1);
        assert!(!workspace.root.join(format!("{}.staged", key.file_name())).exists());
    }

    #[rstest]
    fn failed_compression_discards_the_staged_entry(workspace: Workspace, key: CacheKey) {
        let mut fetcher =
            DatasetFetcher::new(workspace.cache(), StubTransport::new(), workspace.config());
        let missing = workspace.root.join("work").join(key.working_file_name());
        let err = fetcher
            .store(&key.file_name(), &missing)
            .expect_err("missing document cannot be compressed");
        assert!(matches!(err, StoreError::Archive(_)));
        let staging = workspace.root.join("cache/.staging");
        assert_eq!(fs::read_dir(staging).expect("list staging").count(), 0);
        assert!(!fetcher.cache().has(&key.file_name()));
    }

    #[rstest]
    fn truncated_download_leaves_no_document(workspace: Workspace, key: CacheKey) {
        let transport = StubTransport::new()
            .reply("https://one.example", StubReply::Truncated(BODY[..10].into()))
            .reply("https://two.example", StubReply::Status(504));
        let mut fetcher = DatasetFetcher::new(workspace.cache(), &transport, workspace.config());
        let err = fetcher.fetch(&key, "q").expect_err("both endpoints fail");
        match err {
            FetchError::AllEndpointsFailed { attempts, last } => {
                assert_eq!(attempts, 2);
                assert!(matches!(last, TransportError::Http { status: 504, .. }));
            }
            other => panic!("expected AllEndpointsFailed, got {other:?}"),
        }
        let work = workspace.root.join("work");
        assert_eq!(fs::read_dir(work).expect("list").count(), 0);
    }

    #[rstest]
    fn empty_endpoint_list_is_rejected(workspace: Workspace, key: CacheKey) {
        let config = workspace.config().with_endpoints(Vec::<String>::new());
        let mut fetcher = DatasetFetcher::new(workspace.cache(), StubTransport::new(), config);
        assert!(matches!(
            fetcher.fetch(&key, "q"),
            Err(FetchError::NoEndpoints)
        ));
    }

    #[rstest]
    fn invalid_endpoint_is_rejected_before_any_request(workspace: Workspace, key: CacheKey) {
        let transport = StubTransport::new();
        let config = workspace.config().with_endpoints(["not a url"]);
        let mut fetcher = DatasetFetcher::new(workspace.cache(), &transport, config);
        assert!(matches!(
            fetcher.fetch(&key, "q"),
            Err(FetchError::InvalidEndpoint { .. })
        ));
        assert!(transport.calls().is_empty());
    }

    #[rstest]
    fn corrupt_cache_entry_is_fatal(workspace: Workspace, key: CacheKey) {
        let mut cache = workspace.cache();
        let staged = cache.allocate(&key.file_name()).expect("allocate");
        fs::write(&staged, b"not a zip").expect("write");
        cache.commit(&staged, true).expect("commit");
        let transport = StubTransport::new();
        let mut fetcher = DatasetFetcher::new(cache, &transport, workspace.config());
        assert!(matches!(
            fetcher.fetch(&key, "q"),
            Err(FetchError::CacheEntry { .. })
        ));
        assert!(transport.calls().is_empty());
    }

    #[rstest]
    fn default_endpoints_are_the_public_interpreters() {
        let config = FetcherConfig::new("work");
        assert_eq!(config.endpoints.len(), 3);
        assert!(config.cache_writes);
        assert_eq!(
            config.endpoints.first().map(String::as_str),
            Some("https://overpass-api.de/api/interpreter")
        );
    }
}
