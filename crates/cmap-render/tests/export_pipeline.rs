//! Integration tests: document → snapshot → encoded export.

use cmap_core::config::ExportConfig;
use cmap_core::{ConceptMap, ProjectDocument};
use cmap_render::{
    ExportError, ExportFormat, SnapshotOptions, Theme, build_snapshot, export, thumbnail_data_uri,
};
use pretty_assertions::{assert_eq, assert_ne};

fn biology() -> ConceptMap {
    ProjectDocument::from_json(include_str!("fixtures/biology.json"))
        .expect("fixture should parse")
        .into_map()
}

// ─── Refusal ─────────────────────────────────────────────────────────────

#[test]
fn every_format_refuses_an_empty_map() {
    let config = ExportConfig::default();
    for format in [ExportFormat::Png, ExportFormat::Jpeg, ExportFormat::Pdf] {
        let result = export(&ConceptMap::new(), format, &config, Theme::Light);
        assert!(
            matches!(result, Err(ExportError::NothingToExport)),
            "{format:?} should refuse"
        );
    }
}

#[test]
fn connections_without_concepts_still_refuse() {
    let mut map = biology();
    map.concepts.clear();
    assert!(matches!(
        build_snapshot(&map, &SnapshotOptions::default()),
        Err(ExportError::NothingToExport)
    ));
}

// ─── Encoded output ──────────────────────────────────────────────────────

#[test]
fn png_export_is_supersampled() {
    let map = biology();
    let config = ExportConfig::default();
    let snapshot = build_snapshot(&map, &SnapshotOptions::export(&config, Theme::Light)).unwrap();
    let artifact = export(&map, ExportFormat::Png, &config, Theme::Light).unwrap();

    assert_eq!(artifact.mime, "image/png");
    assert_eq!(artifact.file_name, "Cell biology.png");
    let width = u32::from_be_bytes(artifact.bytes[16..20].try_into().unwrap());
    assert_eq!(width, (snapshot.width as f32 * 2.0).ceil() as u32);
}

#[test]
fn jpeg_and_pdf_have_signatures() {
    let map = biology();
    let config = ExportConfig::default();
    let jpeg = export(&map, ExportFormat::Jpeg, &config, Theme::Dark).unwrap();
    assert!(jpeg.bytes.starts_with(&[0xFF, 0xD8, 0xFF]));
    assert_eq!(jpeg.file_name, "Cell biology.jpg");
    let pdf = export(&map, ExportFormat::Pdf, &config, Theme::Light).unwrap();
    assert!(pdf.bytes.starts_with(b"%PDF-"));
}

// ─── Thumbnails ──────────────────────────────────────────────────────────

#[test]
fn thumbnail_frame_is_sixteen_by_nine() {
    let config = ExportConfig::default();
    let snapshot = build_snapshot(&biology(), &SnapshotOptions::thumbnail(&config, Theme::Dark)).unwrap();
    let ratio = snapshot.width / snapshot.height;
    assert!((ratio - 16.0 / 9.0).abs() < 1e-9, "ratio {ratio}");
}

#[test]
fn thumbnails_differ_by_theme() {
    let map = biology();
    let config = ExportConfig::default();
    let light = thumbnail_data_uri(&map, &config, Theme::Light).unwrap();
    let dark = thumbnail_data_uri(&map, &config, Theme::Dark).unwrap();
    assert!(light.starts_with("data:image/png;base64,"));
    assert_ne!(light, dark);
}

#[test]
fn export_lines_touch_inset_concepts() {
    let map = biology();
    let snapshot = build_snapshot(&map, &SnapshotOptions::default()).unwrap();
    // Concept 0 is drawn from x = 150 + 34 in canvas space.
    assert!(snapshot.svg.contains(r#"<g transform="translate(184, 200)">"#));
}
