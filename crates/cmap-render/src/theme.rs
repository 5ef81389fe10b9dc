//! Resolved color tables for the two UI themes.
//!
//! Exports never sample live styles; they read one of these tables so a
//! snapshot looks the same whichever theme the user currently has active.

/// The UI theme a snapshot is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn palette(self) -> Palette {
        match self {
            Theme::Light => Palette::light(),
            Theme::Dark => Palette::dark(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Concrete colors, all `#RRGGBB` so every SVG consumer can read them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Page background behind the dot grid.
    pub background: &'static str,
    pub dot: &'static str,
    /// Concept and label-box fill.
    pub card: &'static str,
    /// Text, lines and arrowheads.
    pub foreground: &'static str,
    pub border: &'static str,
    /// Selection outline (on-screen only).
    pub primary: &'static str,
    /// Connection handles (on-screen only).
    pub ring: &'static str,
}

impl Palette {
    pub fn light() -> Self {
        Self {
            background: "#FFFFFF",
            dot: "#737373",
            card: "#FFFFFF",
            foreground: "#0A0A0A",
            border: "#E5E5E5",
            primary: "#171717",
            ring: "#A1A1A1",
        }
    }

    pub fn dark() -> Self {
        Self {
            background: "#0A0A0A",
            dot: "#A1A1A1",
            card: "#171717",
            foreground: "#FAFAFA",
            border: "#2E2E2E",
            primary: "#E5E5E5",
            ring: "#737373",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmap_core::Color;

    #[test]
    fn palettes_are_plain_hex() {
        for palette in [Palette::light(), Palette::dark()] {
            for c in [
                palette.background,
                palette.dot,
                palette.card,
                palette.foreground,
                palette.border,
                palette.primary,
                palette.ring,
            ] {
                assert!(Color::from_hex(c).is_some(), "{c} is not hex");
            }
        }
    }

    #[test]
    fn parse_theme_names() {
        assert_eq!(Theme::parse("Dark"), Some(Theme::Dark));
        assert_eq!(Theme::parse("sepia"), None);
        assert_eq!(Theme::Light.other(), Theme::Dark);
    }
}
