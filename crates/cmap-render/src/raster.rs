//! Rasterization of snapshots: PNG, JPEG, single-page PDF, data URIs.

use crate::ExportError;
use crate::svg::Snapshot;
use base64::Engine;
use cmap_core::Color;

pub type Result<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Png,
    Jpeg,
    Pdf,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            "pdf" => Some(ExportFormat::Pdf),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RasterOptions {
    /// Device pixels per canvas unit.
    pub scale: f32,
    /// Fill behind the SVG; JPEG requires an opaque one.
    pub background: Option<String>,
    pub jpeg_quality: u8,
    pub font_family: String,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            background: None,
            jpeg_quality: 95,
            font_family: "Arial".to_string(),
        }
    }
}

fn usvg_options(font_family: &str) -> usvg::Options<'static> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    opt.font_family = font_family.to_string();
    opt
}

fn snapshot_to_pixmap(snapshot: &Snapshot, options: &RasterOptions) -> Result<tiny_skia::Pixmap> {
    let tree = usvg::Tree::from_str(&snapshot.svg, &usvg_options(&options.font_family))
        .map_err(|_| ExportError::SvgParse)?;

    let scale = options.scale;
    let width_px = (snapshot.width as f32 * scale).ceil().max(1.0) as u32;
    let height_px = (snapshot.height as f32 * scale).ceil().max(1.0) as u32;
    let mut pixmap = tiny_skia::Pixmap::new(width_px, height_px).ok_or(ExportError::PixmapAlloc)?;

    if let Some(color) = options.background.as_deref().and_then(parse_tiny_skia_color) {
        pixmap.fill(color);
    }

    resvg::render(&tree, tiny_skia::Transform::from_scale(scale, scale), &mut pixmap.as_mut());
    Ok(pixmap)
}

pub fn snapshot_to_png(snapshot: &Snapshot, options: &RasterOptions) -> Result<Vec<u8>> {
    let pixmap = snapshot_to_pixmap(snapshot, options)?;
    pixmap.encode_png().map_err(|_| ExportError::PngEncode)
}

pub fn snapshot_to_jpeg(snapshot: &Snapshot, options: &RasterOptions) -> Result<Vec<u8>> {
    let bg = options.background.as_deref().unwrap_or("#FFFFFF");
    let Some(color) = parse_tiny_skia_color(bg) else {
        return Err(ExportError::JpegBackground);
    };
    if color.alpha() != 1.0 {
        return Err(ExportError::JpegBackground);
    }

    let opaque = RasterOptions {
        background: Some(bg.to_string()),
        ..options.clone()
    };
    let pixmap = snapshot_to_pixmap(snapshot, &opaque)?;
    let (w, h) = (pixmap.width(), pixmap.height());

    // The background fill is opaque, so alpha is always 255.
    let mut rgb = vec![0u8; (w as usize) * (h as usize) * 3];
    for (src, dst) in pixmap.data().chunks_exact(4).zip(rgb.chunks_exact_mut(3)) {
        dst.copy_from_slice(&src[..3]);
    }

    let mut out = Vec::new();
    let mut enc = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, options.jpeg_quality);
    enc.encode(&rgb, w, h, image::ExtendedColorType::Rgb8)
        .map_err(|_| ExportError::JpegEncode)?;
    Ok(out)
}

/// One page, sized to the snapshot, holding the supersampled PNG.
pub fn snapshot_to_pdf(snapshot: &Snapshot, options: &RasterOptions) -> Result<Vec<u8>> {
    let png = snapshot_to_png(snapshot, options)?;
    let (w, h) = (snapshot.width, snapshot.height);
    let page = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><image x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none" xlink:href="{}"/></svg>"#,
        png_data_uri(&png)
    );

    let mut opt = svg2pdf::usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    opt.font_family = options.font_family.clone();
    let tree = svg2pdf::usvg::Tree::from_str(&page, &opt).map_err(|_| ExportError::SvgParse)?;

    svg2pdf::to_pdf(
        &tree,
        svg2pdf::ConversionOptions::default(),
        svg2pdf::PageOptions::default(),
    )
    .map_err(|_| ExportError::PdfConvert)
}

pub fn png_data_uri(png: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    )
}

fn parse_tiny_skia_color(text: &str) -> Option<tiny_skia::Color> {
    let s = text.trim();
    match s.to_ascii_lowercase().as_str() {
        "transparent" => return Some(tiny_skia::Color::from_rgba8(0, 0, 0, 0)),
        "white" => return Some(tiny_skia::Color::WHITE),
        "black" => return Some(tiny_skia::Color::BLACK),
        _ => {}
    }
    let [r, g, b, a] = Color::from_hex(s)?.to_rgba8();
    Some(tiny_skia::Color::from_rgba8(r, g, b, a))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Snapshot {
        Snapshot {
            svg: r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10" viewBox="0 0 10 10"><rect width="10" height="10" fill="black"/></svg>"#.to_string(),
            width: 10.0,
            height: 10.0,
        }
    }

    #[test]
    fn png_signature_and_supersampled_size() {
        let bytes = snapshot_to_png(&square(), &RasterOptions::default()).unwrap();
        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
        // IHDR width/height (big endian) follow the 16-byte signature+chunk header.
        assert_eq!(&bytes[16..20], &20u32.to_be_bytes());
        assert_eq!(&bytes[20..24], &20u32.to_be_bytes());
    }

    #[test]
    fn jpeg_signature() {
        let bytes = snapshot_to_jpeg(&square(), &RasterOptions::default()).unwrap();
        assert!(bytes.starts_with(&[0xFF, 0xD8, 0xFF]));
    }

    #[test]
    fn jpeg_rejects_translucent_background() {
        let options = RasterOptions {
            background: Some("#FFFFFF80".to_string()),
            ..RasterOptions::default()
        };
        assert!(matches!(
            snapshot_to_jpeg(&square(), &options),
            Err(ExportError::JpegBackground)
        ));
    }

    #[test]
    fn pdf_signature() {
        let bytes = snapshot_to_pdf(&square(), &RasterOptions::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn data_uri_prefix() {
        assert!(png_data_uri(&[1, 2, 3]).starts_with("data:image/png;base64,AQID"));
    }
}
