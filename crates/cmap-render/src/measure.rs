//! Label footprint measurement.
//!
//! Shape sizes follow their labels, but only a text layout engine knows how
//! wide a label really is. [`TextMeasurer`] is that seam; [`ApproxMeasurer`]
//! estimates from display-column widths when no real font metrics exist.

use cmap_core::Size;
use unicode_width::UnicodeWidthStr;

pub const CONCEPT_FONT_SIZE: f64 = 14.0;
pub const CONNECTION_FONT_SIZE: f64 = 12.0;
/// Multiple of the font size between successive label lines.
pub const LINE_HEIGHT: f64 = 1.2;

const CONCEPT_TEXT_PADDING: f64 = 64.0;
const CONCEPT_TEXT_PADDING_NO_HANDLES: f64 = 30.0;
const CONCEPT_MIN_HEIGHT: f64 = 54.0;
const CONCEPT_VERTICAL_PADDING: f64 = 20.0;
const MULTILINE_EXTRA: f64 = 14.0;

pub trait TextMeasurer {
    /// Bounding box of `text` (lines split on `\n`) at `font_size`.
    fn measure(&self, text: &str, font_size: f64) -> Size;
}

/// Column-width estimate: each display column is `advance` ems wide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproxMeasurer {
    pub advance: f64,
}

impl Default for ApproxMeasurer {
    fn default() -> Self {
        Self { advance: 0.55 }
    }
}

impl TextMeasurer for ApproxMeasurer {
    fn measure(&self, text: &str, font_size: f64) -> Size {
        let lines: Vec<&str> = text.split('\n').collect();
        let columns = lines.iter().map(|l| l.width()).max().unwrap_or(0);
        let width = columns as f64 * font_size * self.advance;
        let height = lines.len() as f64 * font_size * LINE_HEIGHT;
        Size::new(width, height)
    }
}

/// Size a concept must have to fit `label`.
pub fn concept_footprint(measurer: &dyn TextMeasurer, label: &str, handles_hidden: bool) -> Size {
    let text = measurer.measure(label, CONCEPT_FONT_SIZE);
    let padding = if handles_hidden {
        CONCEPT_TEXT_PADDING_NO_HANDLES
    } else {
        CONCEPT_TEXT_PADDING
    };
    let extra = if label.contains('\n') { MULTILINE_EXTRA } else { 0.0 };
    Size::new(
        text.width + padding,
        CONCEPT_MIN_HEIGHT.max(text.height + CONCEPT_VERTICAL_PADDING + extra),
    )
}

/// Width of a connection label without box chrome.
pub fn connection_label_width(measurer: &dyn TextMeasurer, label: &str) -> f64 {
    measurer.measure(label, CONNECTION_FONT_SIZE).width.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl TextMeasurer for Fixed {
        fn measure(&self, text: &str, _font_size: f64) -> Size {
            let lines = text.split('\n').count() as f64;
            Size::new(80.0, 17.0 * lines)
        }
    }

    #[test]
    fn single_line_concept_uses_minimum_height() {
        let size = concept_footprint(&Fixed, "Cell", false);
        assert_eq!(size, Size::new(144.0, 54.0));
    }

    #[test]
    fn hidden_handles_shrink_padding() {
        assert_eq!(concept_footprint(&Fixed, "Cell", true).width, 110.0);
    }

    #[test]
    fn multiline_adds_extra_height() {
        let size = concept_footprint(&Fixed, "a\nb", false);
        assert_eq!(size.height, 34.0 + 20.0 + 14.0);
    }

    #[test]
    fn approx_measurer_counts_wide_glyphs() {
        let m = ApproxMeasurer::default();
        let narrow = m.measure("ab", 10.0).width;
        let wide = m.measure("日本", 10.0).width;
        assert!((wide - 2.0 * narrow).abs() < 1e-9);
    }
}
