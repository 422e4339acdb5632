//! Behavioural tests for turning an indexed dataset into render containers.

use geo::Coord;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::{cell::RefCell, fs, path::PathBuf};
use tiletex_core::{
    DatasetError, EntityDef, EntityFilterEngine, FilterError, GeometryKind, OsmDatasetIndex,
    OsmPoint, OsmWay, RenderContainer, Rgba, Tags, ValueMatch,
};

type Outcome = Option<Result<Vec<RenderContainer>, FilterError>>;

fn tagged(key: &str, value: &str) -> Tags {
    Tags::from([(key.to_owned(), value.to_owned())])
}

fn sample_index(road_refs: Vec<i64>) -> OsmDatasetIndex {
    let mut index = OsmDatasetIndex::default();
    for (id, x, y) in [(1, 11.001, 48.001), (2, 11.005, 48.009), (3, 11.009, 48.001)] {
        index.push_point(OsmPoint {
            id,
            location: Coord { x, y },
            tags: Tags::new(),
        });
    }
    index.push_way(OsmWay {
        id: 20,
        refs: road_refs,
        tags: tagged("highway", "primary"),
    });
    index.push_way(OsmWay {
        id: 21,
        refs: vec![1, 2, 3, 1],
        tags: tagged("landuse", "forest"),
    });
    index
}

#[fixture]
fn dataset() -> RefCell<OsmDatasetIndex> {
    RefCell::new(OsmDatasetIndex::default())
}

#[fixture]
fn definitions() -> RefCell<Vec<EntityDef>> {
    RefCell::new(Vec::new())
}

#[fixture]
fn outcome() -> RefCell<Outcome> {
    RefCell::new(None)
}

fn expect_containers(outcome: &RefCell<Outcome>) -> Vec<RenderContainer> {
    outcome
        .borrow()
        .as_ref()
        .expect("filter engine was applied")
        .as_ref()
        .expect("filtering succeeds")
        .clone()
}

#[given("a dataset listing a primary road before a forest")]
fn road_before_forest(#[from(dataset)] dataset: &RefCell<OsmDatasetIndex>) {
    *dataset.borrow_mut() = sample_index(vec![1, 2, 3]);
}

#[given("a dataset whose primary road references a missing node")]
fn road_with_missing_node(#[from(dataset)] dataset: &RefCell<OsmDatasetIndex>) {
    *dataset.borrow_mut() = sample_index(vec![1, 77, 3]);
}

#[given("definitions for forests then primary roads")]
fn forest_then_roads(#[from(definitions)] definitions: &RefCell<Vec<EntityDef>>) {
    *definitions.borrow_mut() = vec![
        EntityDef::polygon(
            "landuse",
            ValueMatch::Exact("forest".into()),
            Rgba::opaque(0, 128, 0),
            1.0,
        )
        .expect("valid def"),
        EntityDef::polyline(
            "highway",
            ValueMatch::Exact("primary".into()),
            Rgba::opaque(255, 0, 0),
            1.0,
        )
        .expect("valid def"),
    ];
}

#[given("definitions for railways then primary roads")]
fn railways_then_roads(#[from(definitions)] definitions: &RefCell<Vec<EntityDef>>) {
    *definitions.borrow_mut() = vec![
        EntityDef::polyline("railway", ValueMatch::Any, Rgba::BLACK, 1.0).expect("valid def"),
        EntityDef::polyline(
            "highway",
            ValueMatch::Regex("^primary".into()),
            Rgba::opaque(255, 0, 0),
            1.0,
        )
        .expect("valid def"),
    ];
}

#[when("I apply the filter engine")]
fn apply_engine(
    #[from(dataset)] dataset: &RefCell<OsmDatasetIndex>,
    #[from(definitions)] definitions: &RefCell<Vec<EntityDef>>,
    #[from(outcome)] outcome: &RefCell<Outcome>,
) {
    let engine = EntityFilterEngine::new(definitions.borrow().clone()).expect("matchers compile");
    *outcome.borrow_mut() = Some(engine.apply(&dataset.borrow()));
}

#[then("the containers are a polygon container then a polyline container")]
fn polygon_then_polyline(#[from(outcome)] outcome: &RefCell<Outcome>) {
    let containers = expect_containers(outcome);
    let kinds: Vec<GeometryKind> = containers.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![GeometryKind::Polygon, GeometryKind::Polyline],
        "containers must follow definition order, not document order"
    );
}

#[then("only the primary road container is produced")]
fn only_roads(#[from(outcome)] outcome: &RefCell<Outcome>) {
    let containers = expect_containers(outcome);
    assert_eq!(containers.len(), 1, "empty definitions produce no container");
    let container = containers.first().expect("one container");
    assert_eq!(container.def_index, 1);
    assert_eq!(container.len(), 1);
}

#[then("a dangling reference error names the road and the missing node")]
fn dangling_error(#[from(outcome)] outcome: &RefCell<Outcome>) {
    let borrowed = outcome.borrow();
    match borrowed.as_ref().expect("filter engine was applied") {
        Err(FilterError::Dataset(DatasetError::DanglingReference { way_id, point_id })) => {
            assert_eq!(*way_id, 20);
            assert_eq!(*point_id, 77);
        }
        other => panic!("expected a dangling reference, got {other:?}"),
    }
}

#[test]
fn scenario_indices_follow_feature_order() {
    let feature =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/features/entity_filter.feature");
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
            "containers follow definition order",
            "unmatched definitions are skipped",
            "dangling vertices are reported",
        ]
    );
}

#[scenario(path = "tests/features/entity_filter.feature", index = 0)]
fn containers_follow_definition_order(
    dataset: RefCell<OsmDatasetIndex>,
    definitions: RefCell<Vec<EntityDef>>,
    outcome: RefCell<Outcome>,
) {
    let _ = (dataset, definitions, outcome);
}

#[scenario(path = "tests/features/entity_filter.feature", index = 1)]
fn unmatched_definitions_are_skipped(
    dataset: RefCell<OsmDatasetIndex>,
    definitions: RefCell<Vec<EntityDef>>,
    outcome: RefCell<Outcome>,
) {
    let _ = (dataset, definitions, outcome);
}

#[scenario(path = "tests/features/entity_filter.feature", index = 2)]
fn dangling_vertices_are_reported(
    dataset: RefCell<OsmDatasetIndex>,
    definitions: RefCell<Vec<EntityDef>>,
    outcome: RefCell<Outcome>,
) {
    let _ = (dataset, definitions, outcome);
}
