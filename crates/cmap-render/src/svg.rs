//! Snapshot serializer: concept map → standalone, cropped SVG.
//!
//! The document is written from the graph and the geometry kernel alone.
//! Export space differs from screen space: concepts lose their handle
//! gutter, label boxes lose their handle padding, and every line is
//! re-resolved against those export shapes.

use crate::ExportError;
use crate::measure::{CONCEPT_FONT_SIZE, CONNECTION_FONT_SIZE, LINE_HEIGHT};
use crate::theme::{Palette, Theme};
use cmap_core::config::ExportConfig;
use cmap_core::geometry::{Chrome, ConnectionGeometry, SceneLayout};
use cmap_core::{ColorTarget, Concept, ConceptMap, Line, Rect};
use std::fmt::Write;

const CONCEPT_TEXT_X: f64 = 15.0;
const CONCEPT_TEXT_Y: f64 = 27.0;
const CONCEPT_CORNER: f64 = 2.0;
const LABEL_CORNER: f64 = 17.0;
const DOT_SPACING: f64 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotOptions {
    pub theme: Theme,
    /// Margin around the content bounds.
    pub margin: f64,
    /// Handle gutter removed from each concept's left side.
    pub gutter: f64,
    /// Force width / height by growing the shorter side.
    pub aspect: Option<f64>,
    /// Grow both sides around the center by this factor.
    pub padding_ratio: f64,
    pub font_family: String,
}

impl SnapshotOptions {
    pub fn export(config: &ExportConfig, theme: Theme) -> Self {
        Self {
            theme,
            margin: config.margin,
            gutter: config.handle_gutter,
            aspect: None,
            padding_ratio: 1.0,
            font_family: config.font_family.clone(),
        }
    }

    pub fn thumbnail(config: &ExportConfig, theme: Theme) -> Self {
        Self {
            aspect: Some(config.thumbnail_aspect),
            padding_ratio: config.thumbnail_padding_ratio,
            ..Self::export(config, theme)
        }
    }
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self::export(&ExportConfig::default(), Theme::Light)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub svg: String,
    pub width: f64,
    pub height: f64,
}

/// Build the export SVG. Refuses maps without concepts.
pub fn build_snapshot(map: &ConceptMap, opts: &SnapshotOptions) -> Result<Snapshot, ExportError> {
    if map.concepts.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    let chrome = Chrome::export(opts.gutter);
    let layout = SceneLayout::compute(map, chrome);
    let content = layout.content_bounds().ok_or(ExportError::NothingToExport)?;
    let frame = frame_bounds(content, opts);
    let palette = opts.theme.palette();

    let width = frame.width();
    let height = frame.height();
    let mut svg = String::with_capacity(4096);
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    write_defs(&mut svg, &palette);
    let _ = writeln!(
        svg,
        r#"<rect width="{width}" height="{height}" fill="{}"/>"#,
        palette.background
    );
    let _ = writeln!(
        svg,
        r##"<rect width="{width}" height="{height}" fill="url(#export-dot-pattern)"/>"##
    );
    let _ = writeln!(svg, r#"<g transform="translate({}, {})">"#, -frame.x0, -frame.y0);

    for conn in &layout.connections {
        let label = map
            .connection(conn.id)
            .map(|c| c.label.as_str())
            .unwrap_or_default();
        write_connection(&mut svg, conn, label, &palette, &opts.font_family, chrome);
    }
    for concept in &map.concepts {
        write_concept(&mut svg, concept, chrome.concept_bounds(concept), &palette, &opts.font_family);
    }

    svg.push_str("</g>\n</svg>\n");
    log::debug!(
        "snapshot {}x{} ({} concepts, {} connections, {} skipped)",
        width,
        height,
        layout.concepts.len(),
        layout.connections.len(),
        layout.skipped.len()
    );
    Ok(Snapshot { svg, width, height })
}

/// Content bounds grown by the margin, then to the aspect ratio, then by
/// the padding ratio. Every step keeps the center fixed.
pub fn frame_bounds(content: Rect, opts: &SnapshotOptions) -> Rect {
    let mut frame = content.inflate(opts.margin, opts.margin);
    if let Some(aspect) = opts.aspect.filter(|a| a.is_finite() && *a > 0.0) {
        let (w, h) = (frame.width(), frame.height());
        if w / h < aspect {
            let grow = (h * aspect - w) / 2.0;
            frame = frame.inflate(grow, 0.0);
        } else {
            let grow = (w / aspect - h) / 2.0;
            frame = frame.inflate(0.0, grow);
        }
    }
    if opts.padding_ratio > 0.0 && opts.padding_ratio != 1.0 {
        let size = frame.size() * opts.padding_ratio;
        frame = Rect::from_center_size(frame.center(), size);
    }
    frame
}

fn write_defs(svg: &mut String, palette: &Palette) {
    let _ = writeln!(
        svg,
        concat!(
            "<defs>",
            r#"<pattern id="export-dot-pattern" x="0" y="0" width="{s}" height="{s}" patternUnits="userSpaceOnUse">"#,
            r#"<circle cx="2" cy="2" r="1" fill="{dot}"/></pattern>"#,
            r#"<marker id="arrow" viewBox="0 0 10 10" refX="9" refY="5" markerWidth="6" markerHeight="6" orient="auto-start-reverse">"#,
            r#"<path d="M 0 0 L 10 5 L 0 10 z" fill="{fg}"/></marker>"#,
            "</defs>"
        ),
        s = DOT_SPACING,
        dot = palette.dot,
        fg = palette.foreground,
    );
}

fn write_line(svg: &mut String, line: Line, stroke: &str) {
    let _ = writeln!(
        svg,
        r##"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{stroke}" stroke-width="1" marker-end="url(#arrow)"/>"##,
        line.p0.x, line.p0.y, line.p1.x, line.p1.y
    );
}

fn write_connection(
    svg: &mut String,
    conn: &ConnectionGeometry,
    label: &str,
    palette: &Palette,
    font_family: &str,
    chrome: Chrome,
) {
    write_line(svg, conn.line, palette.foreground);
    for (_, line) in &conn.extra_lines {
        write_line(svg, *line, palette.foreground);
    }
    let b = conn.label_box;
    let _ = writeln!(
        svg,
        r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{LABEL_CORNER}" ry="{LABEL_CORNER}" fill="{}" stroke="{}" stroke-width="1"/>"#,
        b.x0,
        b.y0,
        b.width(),
        b.height(),
        palette.card,
        palette.border
    );
    let x = b.x0 + chrome.label_padding_left;
    write_text(
        svg,
        TextRun {
            x,
            y: conn.center.y,
            font_size: CONNECTION_FONT_SIZE,
            baseline: "middle",
            fill: palette.foreground,
            font_family,
        },
        label,
    );
}

fn write_concept(svg: &mut String, concept: &Concept, rect: Rect, palette: &Palette, font_family: &str) {
    let fill = override_or(concept, ColorTarget::Background, palette.card);
    let text_fill = override_or(concept, ColorTarget::Text, palette.foreground);
    let _ = writeln!(svg, r#"<g transform="translate({}, {})">"#, rect.x0, rect.y0);
    let _ = writeln!(
        svg,
        r#"<rect width="{}" height="{}" rx="{CONCEPT_CORNER}" fill="{fill}" stroke="{}" stroke-width="1"/>"#,
        rect.width(),
        rect.height(),
        palette.border
    );
    write_text(
        svg,
        TextRun {
            x: CONCEPT_TEXT_X,
            y: CONCEPT_TEXT_Y,
            font_size: CONCEPT_FONT_SIZE,
            baseline: "central",
            fill: &text_fill,
            font_family,
        },
        &concept.label,
    );
    svg.push_str("</g>\n");
}

fn override_or(concept: &Concept, target: ColorTarget, fallback: &str) -> String {
    concept
        .resolved_color(target)
        .map(|c| c.to_hex())
        .unwrap_or_else(|| fallback.to_owned())
}

struct TextRun<'a> {
    x: f64,
    y: f64,
    font_size: f64,
    baseline: &'a str,
    fill: &'a str,
    font_family: &'a str,
}

fn write_text(svg: &mut String, run: TextRun<'_>, label: &str) {
    let _ = write!(
        svg,
        r#"<text x="{}" y="{}" font-size="{}" font-weight="500" font-family="{}" dominant-baseline="{}" fill="{}" xml:space="preserve">"#,
        run.x,
        run.y,
        run.font_size,
        escape_xml(run.font_family),
        run.baseline,
        run.fill
    );
    for (i, line) in label.split('\n').enumerate() {
        let dy = if i == 0 { "0".to_owned() } else { format!("{LINE_HEIGHT}em") };
        let line = if line.is_empty() { " " } else { line };
        let _ = write!(svg, r#"<tspan x="{}" dy="{dy}">{}</tspan>"#, run.x, escape_xml(line));
    }
    svg.push_str("</text>\n");
}

pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
