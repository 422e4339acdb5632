//! Focused unit tests covering render request validation.

use super::helpers::ROAD_REQUEST;
use super::*;
use rstest::{fixture, rstest};
use tiletex::FetchScope;
use tiletex_core::{GeometryKind, Rgba, ValueMatch};

#[fixture]
fn request() -> RenderRequest {
    serde_json::from_str(ROAD_REQUEST).expect("sample request parses")
}

#[rstest]
fn resolves_palette_references(request: RenderRequest) {
    let resolved = request.resolve().expect("request resolves");
    assert_eq!(resolved.background, Rgba::opaque(0x7f, 0xa3, 0x5b));
    assert_eq!(resolved.scope, FetchScope::Filtered);
    let [road] = resolved.defs.as_slice() else {
        panic!("expected one definition, got {}", resolved.defs.len());
    };
    assert_eq!(road.kind(), GeometryKind::Polyline);
    assert_eq!(road.key(), "highway");
    assert_eq!(road.value(), &ValueMatch::Exact("primary".into()));
    assert_eq!(road.color(), Rgba::opaque(255, 0, 0));
    assert_eq!(road.size(), 3.0);
}

#[rstest]
fn hex_literals_need_no_palette(mut request: RenderRequest) {
    request.palette.clear();
    request.background = "#00000080".into();
    if let Some(entity) = request.entities.first_mut() {
        entity.color = "#0000ff".into();
    }
    let resolved = request.resolve().expect("request resolves");
    assert_eq!(resolved.background, Rgba::new(0, 0, 0, 0x80));
    assert_eq!(
        resolved.defs.first().map(|def| def.color()),
        Some(Rgba::opaque(0, 0, 255))
    );
}

#[rstest]
#[case("asphalt")]
#[case("#zzzzzz")]
fn unknown_colours_are_rejected(mut request: RenderRequest, #[case] reference: &str) {
    if let Some(entity) = request.entities.first_mut() {
        entity.color = reference.into();
    }
    match request.resolve() {
        Err(RequestError::UnknownColor { reference: found }) => assert_eq!(found, reference),
        other => panic!("expected UnknownColor, found {other:?}"),
    }
}

#[rstest]
fn malformed_palette_entries_are_rejected(mut request: RenderRequest) {
    request.palette.insert("road".into(), "red".into());
    assert!(matches!(
        request.resolve(),
        Err(RequestError::InvalidPaletteColor { .. })
    ));
}

#[rstest]
#[case(0.0)]
#[case(-1.0)]
fn non_positive_sizes_are_rejected(mut request: RenderRequest, #[case] size: f32) {
    if let Some(entity) = request.entities.first_mut() {
        entity.size = size;
    }
    match request.resolve() {
        Err(RequestError::Entity { index, key, .. }) => {
            assert_eq!(index, 0);
            assert_eq!(key, "highway");
        }
        other => panic!("expected Entity error, found {other:?}"),
    }
}

#[rstest]
fn inverted_area_is_rejected(mut request: RenderRequest) {
    request.area.max_lat = request.area.min_lat;
    assert!(matches!(request.resolve(), Err(RequestError::Area(_))));
}

#[rstest]
fn omitted_entities_and_full_dataset_flag() {
    let json = r#"{
        "area": { "min_lat": 1.0, "min_lon": 2.0, "max_lat": 1.5, "max_lon": 2.5 },
        "full_dataset": true
    }"#;
    let request: RenderRequest = serde_json::from_str(json).expect("parses");
    let resolved = request.resolve().expect("resolves");
    assert!(resolved.defs.is_empty());
    assert_eq!(resolved.scope, FetchScope::Full);
    assert_eq!(resolved.background, Rgba::WHITE);
}

#[rstest]
#[case(r#""any""#, ValueMatch::Any)]
#[case(r#"{"regex": "^primary"}"#, ValueMatch::Regex("^primary".into()))]
fn value_match_forms(#[case] raw: &str, #[case] expected: ValueMatch) {
    let json = format!(
        r#"{{ "kind": "polygon", "key": "landuse", "match": {raw}, "color": "x", "size": 1.0 }}"#
    );
    let spec: EntitySpec = serde_json::from_str(&json).expect("entity parses");
    assert_eq!(spec.value, expected);
}

#[rstest]
fn unknown_geometry_kind_fails_to_parse() {
    let json = r#"{ "kind": "hexagon", "key": "a", "color": "x", "size": 1.0 }"#;
    assert!(serde_json::from_str::<EntitySpec>(json).is_err());
}
