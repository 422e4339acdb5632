//! Behavioural tests for [`DatasetFetcher`].
//!
//! Requests are answered by [`StubTransport`], so no Overpass server is
//! needed.

use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::{cell::RefCell, fs, path::PathBuf};
use tempfile::TempDir;
use tiletex_core::test_support::CommitFailingCache;
use tiletex_core::{Cache, CacheKey, CacheKeyDeriver, GeoArea, QueryBuilder};
use tiletex_data::test_support::{StubReply, StubTransport};
use tiletex_data::{DatasetFetcher, DirectoryCache, FetchError, FetcherConfig, compress_file};

const ENDPOINTS: [&str; 3] = [
    "https://first.example/api/interpreter",
    "https://second.example/api/interpreter",
    "https://third.example/api/interpreter",
];

struct World {
    _temp: TempDir,
    root: Utf8PathBuf,
    directory: Option<DirectoryCache>,
    failing: Option<CommitFailingCache>,
    transport: StubTransport,
    result: Option<Result<Utf8PathBuf, FetchError>>,
}

impl World {
    fn work_dir(&self) -> Utf8PathBuf {
        self.root.join("work")
    }
}

#[fixture]
fn world() -> RefCell<World> {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 temp dir");
    RefCell::new(World {
        _temp: temp,
        root,
        directory: None,
        failing: None,
        transport: StubTransport::new(),
        result: None,
    })
}

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/munich_sample.osm")
}

fn sample_bytes() -> Vec<u8> {
    let path = fixture_path();
    fs::read(&path).unwrap_or_else(|err| panic!("failed to read fixture {path:?}: {err}"))
}

fn sample_area() -> GeoArea {
    GeoArea::new(48.0, 11.0, 48.01, 11.01).expect("valid area")
}

fn sample_key() -> CacheKey {
    CacheKeyDeriver::default()
        .derive_full(&sample_area())
        .expect("key derives")
}

// --- Given steps ---

#[given("a fresh cache and work directory")]
fn fresh_cache(#[from(world)] world: &RefCell<World>) {
    let mut world = world.borrow_mut();
    let cache = DirectoryCache::open(world.root.join("cache")).expect("open cache");
    world.directory = Some(cache);
}

#[given("a cache that refuses commits")]
fn refusing_cache(#[from(world)] world: &RefCell<World>) {
    let mut world = world.borrow_mut();
    let cache = CommitFailingCache::new(world.root.join("refusing"));
    world.failing = Some(cache);
}

#[given("the sample document is already cached")]
fn already_cached(#[from(world)] world: &RefCell<World>) {
    let mut world = world.borrow_mut();
    let key = sample_key();
    let cache = world.directory.as_mut().expect("cache prepared");
    let staged = cache.allocate(&key.file_name()).expect("allocate");
    let source = Utf8PathBuf::from_path_buf(fixture_path()).expect("utf-8 fixture path");
    compress_file(&source, &staged, &key.working_file_name()).expect("compress fixture");
    cache.commit(&staged, false).expect("commit fixture");
}

#[given("three endpoints that all time out")]
fn all_time_out(#[from(world)] world: &RefCell<World>) {
    let mut world = world.borrow_mut();
    world.transport = ENDPOINTS
        .iter()
        .fold(StubTransport::new(), |stub, endpoint| {
            stub.reply(*endpoint, StubReply::Timeout)
        });
}

#[given("a first endpoint that times out and a second that serves the sample")]
fn second_serves(#[from(world)] world: &RefCell<World>) {
    let mut world = world.borrow_mut();
    let [first, second, _] = ENDPOINTS;
    world.transport = StubTransport::new()
        .reply(first, StubReply::Timeout)
        .reply(second, StubReply::Body(sample_bytes()));
}

// --- When steps ---

#[when("I fetch the sample area")]
fn fetch_sample(#[from(world)] world: &RefCell<World>) {
    let mut world = world.borrow_mut();
    let world = &mut *world;
    let config = FetcherConfig::new(world.work_dir()).with_endpoints(ENDPOINTS);
    let key = sample_key();
    let query = QueryBuilder::new(&sample_area()).build_full();
    let result = match (world.directory.as_mut(), world.failing.as_mut()) {
        (Some(cache), _) => DatasetFetcher::new(cache, &world.transport, config).fetch(&key, &query),
        (None, Some(cache)) => {
            DatasetFetcher::new(cache, &world.transport, config).fetch(&key, &query)
        }
        (None, None) => panic!("no cache prepared"),
    };
    world.result = Some(result);
}

// --- Then steps ---

#[then("the fetch fails after three attempts")]
fn fails_after_three(#[from(world)] world: &RefCell<World>) {
    let world = world.borrow();
    match world.result.as_ref().expect("fetch ran") {
        Err(FetchError::AllEndpointsFailed { attempts, .. }) => assert_eq!(*attempts, 3),
        other => panic!("expected AllEndpointsFailed, got {other:?}"),
    }
    assert_eq!(world.transport.calls().len(), 3);
}

#[then("no document or cache entry exists")]
fn nothing_written(#[from(world)] world: &RefCell<World>) {
    let world = world.borrow();
    let key = sample_key();
    let cache = world.directory.as_ref().expect("cache prepared");
    assert!(!cache.has(&key.file_name()));
    let work_dir = world.work_dir();
    assert!(!work_dir.join(key.working_file_name()).exists());
    let leftovers = fs::read_dir(&work_dir).map_or(0, Iterator::count);
    assert_eq!(leftovers, 0, "staged downloads left in {work_dir}");
}

#[then("the document matches the sample byte for byte")]
fn matches_sample(#[from(world)] world: &RefCell<World>) {
    let world = world.borrow();
    let document = match world.result.as_ref().expect("fetch ran") {
        Ok(path) => path.clone(),
        Err(err) => panic!("fetch failed: {err}"),
    };
    assert_eq!(fs::read(&document).expect("read document"), sample_bytes());
}

#[then("no endpoint was contacted")]
fn no_calls(#[from(world)] world: &RefCell<World>) {
    assert!(world.borrow().transport.calls().is_empty());
}

#[then("the cache now holds the sample area")]
fn cache_populated(#[from(world)] world: &RefCell<World>) {
    let world = world.borrow();
    let cache = world.directory.as_ref().expect("cache prepared");
    assert!(cache.has(&sample_key().file_name()));
    assert_eq!(world.transport.calls().len(), 2);
}

#[then("the cache saw one commit attempt")]
fn one_commit(#[from(world)] world: &RefCell<World>) {
    let world = world.borrow();
    let cache = world.failing.as_ref().expect("refusing cache prepared");
    assert_eq!(cache.commit_attempts(), 1);
}

#[test]
fn scenario_indices_follow_feature_order() {
    let feature =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/features/dataset_fetcher.feature");
    let contents = fs::read_to_string(&feature).unwrap_or_else(|err| {
        panic!("failed to read feature file {feature:?}: {err}");
    });
    let titles: Vec<&str> = contents
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Scenario: "))
        .collect();
    assert_eq!(
        titles,
        [
            "every endpoint timing out yields one aggregated error",
            "a cached entry is served without the network",
            "a timed out endpoint fails over to the next",
            "a failed cache write still returns the document",
        ]
    );
}

#[scenario(path = "tests/features/dataset_fetcher.feature", index = 0)]
fn all_endpoints_time_out(world: RefCell<World>) {
    let _ = world;
}

#[scenario(path = "tests/features/dataset_fetcher.feature", index = 1)]
fn cached_entry_skips_network(world: RefCell<World>) {
    let _ = world;
}

#[scenario(path = "tests/features/dataset_fetcher.feature", index = 2)]
fn timeout_fails_over(world: RefCell<World>) {
    let _ = world;
}

#[scenario(path = "tests/features/dataset_fetcher.feature", index = 3)]
fn cache_write_failure_is_tolerated(world: RefCell<World>) {
    let _ = world;
}
