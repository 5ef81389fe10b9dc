//! Integration tests: document JSON → store reducers → geometry.

use cmap_core::config::StoreConfig;
use cmap_core::geometry::{Chrome, SceneLayout};
use cmap_core::{
    ConceptId, ConceptMapStore, ConnectionId, Endpoint, Length, Point, ProjectDocument,
};
use pretty_assertions::assert_eq;

fn load(json: &str) -> ConceptMapStore {
    let doc = ProjectDocument::from_json(json).expect("fixture should parse");
    ConceptMapStore::in_memory(doc.into_map(), StoreConfig::default())
}

// ─── Loading ─────────────────────────────────────────────────────────────

#[test]
fn fixture_lengths_and_kinds_are_read() {
    let store = load(include_str!("fixtures/biology.json"));
    let map = store.map();
    assert_eq!(map.concepts.len(), 4);
    assert_eq!(map.concept(ConceptId(1)).unwrap().width, Length(140.0));
    let explains = map.connection(ConnectionId(2)).unwrap();
    assert_eq!(explains.target(), Endpoint::Connection(ConnectionId(1)));
    assert_eq!(explains.width, Length(70.0));
}

#[test]
fn document_survives_save_and_reload() {
    let doc = ProjectDocument::from_json(include_str!("fixtures/biology.json")).unwrap();
    let saved = doc.to_json_pretty().unwrap();
    let reloaded = ProjectDocument::from_json(&saved).unwrap();
    assert_eq!(reloaded, doc);
}

// ─── Cascade delete ──────────────────────────────────────────────────────

#[test]
fn deleting_concept_cascades_to_connections_and_extra_targets() {
    let mut store = load(include_str!("fixtures/cascade.json"));
    assert!(store.delete_concept(ConceptId(2)));

    let map = store.map();
    assert_eq!(map.connections.len(), 1, "connection 0 ended on the deleted concept");
    let survivor = &map.connections[0];
    assert_eq!(survivor.id, ConnectionId(1));
    assert!(survivor.extra_targets.is_empty());
}

#[test]
fn deleting_referenced_connection_leaves_dependent_unrendered() {
    let mut store = load(include_str!("fixtures/biology.json"));
    assert!(store.delete_connection(ConnectionId(1)));

    let layout = SceneLayout::compute(store.map(), Chrome::SCREEN);
    assert!(store.map().connection(ConnectionId(2)).is_some());
    assert!(layout.connection(ConnectionId(2)).is_none());
    assert_eq!(layout.skipped.len(), 1);
}

// ─── Geometry over a loaded map ──────────────────────────────────────────

#[test]
fn connection_to_connection_targets_label_box() {
    let store = load(include_str!("fixtures/biology.json"));
    let layout = SceneLayout::compute(store.map(), Chrome::SCREEN);

    let stores = layout.connection(ConnectionId(1)).expect("stores resolves");
    let explains = layout.connection(ConnectionId(2)).expect("explains resolves");

    // The arrow ends on the boundary of the "stores" label box.
    let end = explains.line.p1;
    let b = stores.label_box;
    let on_vertical = (end.x - b.x0).abs() < 1e-9 || (end.x - b.x1).abs() < 1e-9;
    let on_horizontal = (end.y - b.y0).abs() < 1e-9 || (end.y - b.y1).abs() < 1e-9;
    assert!(on_vertical || on_horizontal, "{end:?} not on {b:?}");
}

#[test]
fn extra_target_line_starts_at_connection_center() {
    let store = load(include_str!("fixtures/biology.json"));
    let layout = SceneLayout::compute(store.map(), Chrome::SCREEN);
    let stores = layout.connection(ConnectionId(1)).unwrap();

    assert_eq!(stores.extra_lines.len(), 1);
    let (target, line) = stores.extra_lines[0];
    assert_eq!(target, ConceptId(4));
    assert_eq!(line.p0, stores.center);
    // Concept 4 spans y 200..268; the fan-out arrow stops at its bottom edge.
    assert!((line.p1.y - 268.0).abs() < 1e-9, "got {:?}", line.p1);
}

#[test]
fn dragging_moves_dependent_geometry() {
    let mut store = load(include_str!("fixtures/cascade.json"));
    let before = SceneLayout::compute(store.map(), Chrome::SCREEN);
    store.drag_concept(ConceptId(2), 0.0, 100.0);
    let after = SceneLayout::compute(store.map(), Chrome::SCREEN);

    let c0 = before.connection(ConnectionId(0)).unwrap().center;
    let c1 = after.connection(ConnectionId(0)).unwrap().center;
    assert_eq!(c1 - c0, Point::new(0.0, 50.0).to_vec2());
}
