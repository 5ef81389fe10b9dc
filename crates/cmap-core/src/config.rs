//! Tunable constants for the canvas, grouped by the component that reads them.
//!
//! Every section is `#[serde(default)]`, so a partial JSON object overrides
//! only the keys it names.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasConfig {
    pub store: StoreConfig,
    pub viewport: ViewportConfig,
    pub export: ExportConfig,
}

impl CanvasConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ─── Store ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    pub min_concept_width: f64,
    pub min_concept_height: f64,
    pub default_concept_width: f64,
    pub default_concept_height: f64,
    pub default_concept_label: String,
    pub default_connection_label: String,
    pub default_connection_width: f64,
    pub default_title: String,
    pub default_description: String,
    /// Local-storage key holding the in-progress document.
    pub storage_key: String,
    pub dirty_key: String,
    pub cloud_project_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            min_concept_width: 100.0,
            min_concept_height: 50.0,
            default_concept_width: 100.0,
            default_concept_height: 50.0,
            default_concept_label: "New concept".into(),
            default_connection_label: "New connection".into(),
            default_connection_width: 90.0,
            default_title: "New concept map".into(),
            default_description: "New concept map description".into(),
            storage_key: "concept-map-data".into(),
            dirty_key: "conceptify-is-dirty".into(),
            cloud_project_key: "conceptify-cloud-project-id".into(),
        }
    }
}

// ─── Viewport ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewportConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    pub zoom_sensitivity: f64,
    /// Wheel `deltaY` is divided by this before the sensitivity is applied.
    pub wheel_divisor: f64,
    /// Pointer travel (screen px) below which a press-release counts as a click.
    pub click_threshold: f64,
    /// Distance (screen px) from a selected concept's edge that starts a resize.
    pub resize_edge_tolerance: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 5.0,
            zoom_sensitivity: 2.0,
            wheel_divisor: 1500.0,
            click_threshold: 5.0,
            resize_edge_tolerance: 8.0,
        }
    }
}

// ─── Export ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportConfig {
    /// Margin added on every side of the content bounds.
    pub margin: f64,
    /// Width of the on-screen connection-handle gutter removed from concepts.
    pub handle_gutter: f64,
    pub raster_scale: f32,
    pub jpeg_quality: u8,
    pub thumbnail_scale: f32,
    /// Width / height.
    pub thumbnail_aspect: f64,
    pub thumbnail_padding_ratio: f64,
    pub font_family: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            margin: 40.0,
            handle_gutter: 34.0,
            raster_scale: 2.0,
            jpeg_quality: 95,
            thumbnail_scale: 0.5,
            thumbnail_aspect: 16.0 / 9.0,
            thumbnail_padding_ratio: 1.15,
            font_family: "Arial".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_overrides_named_keys_only() {
        let config =
            CanvasConfig::from_json(r#"{"viewport":{"maxScale":8},"export":{"margin":10}}"#).unwrap();
        assert_eq!(config.viewport.max_scale, 8.0);
        assert_eq!(config.viewport.min_scale, 0.1);
        assert_eq!(config.export.margin, 10.0);
        assert_eq!(config.store.min_concept_width, 100.0);
    }

    #[test]
    fn empty_object_is_default() {
        assert_eq!(CanvasConfig::from_json("{}").unwrap(), CanvasConfig::default());
    }
}
