pub mod hit;
pub mod measure;
pub mod raster;
pub mod svg;
pub mod theme;

pub use hit::{Edges, Hit, HitOptions, concept_at, hit_test};
pub use measure::{ApproxMeasurer, TextMeasurer, concept_footprint, connection_label_width};
pub use raster::{ExportFormat, RasterOptions};
pub use svg::{Snapshot, SnapshotOptions, build_snapshot};
pub use theme::{Palette, Theme};

use cmap_core::ConceptMap;
use cmap_core::config::ExportConfig;
use cmap_core::document::safe_filename;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("nothing to export: the map has no concepts")]
    NothingToExport,
    #[error("failed to parse snapshot SVG")]
    SvgParse,
    #[error("failed to allocate pixmap for raster rendering")]
    PixmapAlloc,
    #[error("failed to encode PNG")]
    PngEncode,
    #[error("JPEG rendering requires an opaque background color")]
    JpegBackground,
    #[error("failed to encode JPEG")]
    JpegEncode,
    #[error("failed to convert snapshot to PDF")]
    PdfConvert,
}

/// A finished export, ready to hand to a download.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub file_name: String,
}

/// Snapshot `map` in `theme` and encode it as `format`.
pub fn export(
    map: &ConceptMap,
    format: ExportFormat,
    config: &ExportConfig,
    theme: Theme,
) -> Result<ExportArtifact, ExportError> {
    let snapshot = build_snapshot(map, &SnapshotOptions::export(config, theme))?;
    let raster = RasterOptions {
        scale: config.raster_scale,
        background: Some(theme.palette().background.to_string()),
        jpeg_quality: config.jpeg_quality,
        font_family: config.font_family.clone(),
    };
    let bytes = match format {
        ExportFormat::Png => raster::snapshot_to_png(&snapshot, &raster)?,
        ExportFormat::Jpeg => raster::snapshot_to_jpeg(&snapshot, &raster)?,
        ExportFormat::Pdf => raster::snapshot_to_pdf(&snapshot, &raster)?,
    };
    log::debug!("exported {} bytes as {}", bytes.len(), format.extension());
    Ok(ExportArtifact {
        bytes,
        mime: format.mime(),
        file_name: safe_filename(&map.title, format.extension()),
    })
}

/// Small 16:9 PNG preview as a data URI.
pub fn thumbnail_data_uri(map: &ConceptMap, config: &ExportConfig, theme: Theme) -> Result<String, ExportError> {
    let snapshot = build_snapshot(map, &SnapshotOptions::thumbnail(config, theme))?;
    let raster = RasterOptions {
        scale: config.thumbnail_scale,
        background: Some(theme.palette().background.to_string()),
        jpeg_quality: config.jpeg_quality,
        font_family: config.font_family.clone(),
    };
    let png = raster::snapshot_to_png(&snapshot, &raster)?;
    Ok(raster::png_data_uri(&png))
}
