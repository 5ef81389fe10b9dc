//! Light and dark thumbnail capture.
//!
//! Capturing a theme means switching the live page to it, letting layout
//! settle for [`SETTLE_FRAMES`] animation frames, and only then sampling.
//! [`ThumbnailCapture`] is the state machine a frame-driven host steps
//! through; it ends by handing back the user's own theme to restore.

use cmap_core::ConceptMap;
use cmap_core::config::ExportConfig;
use cmap_render::{Theme, thumbnail_data_uri};

/// Animation frames to wait after a theme switch before sampling.
pub const SETTLE_FRAMES: u8 = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Thumbnails {
    pub light: Option<String>,
    pub dark: Option<String>,
}

impl Thumbnails {
    fn set(&mut self, theme: Theme, uri: Option<String>) {
        match theme {
            Theme::Light => self.light = uri,
            Theme::Dark => self.dark = uri,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStep {
    /// Switch the page to this theme, then call [`ThumbnailCapture::frame`]
    /// once per animation frame.
    ApplyTheme(Theme),
    WaitFrame,
    /// Layout is settled: sample now and report via
    /// [`ThumbnailCapture::captured`].
    Capture(Theme),
    /// All themes sampled. Switch back to `restore`.
    Finished { restore: Theme, thumbnails: Thumbnails },
}

#[derive(Debug, Clone)]
pub struct ThumbnailCapture {
    restore: Theme,
    queue: Vec<Theme>,
    current: Option<Theme>,
    frames: u8,
    thumbnails: Thumbnails,
}

impl ThumbnailCapture {
    pub fn new(user_theme: Theme) -> Self {
        Self {
            restore: user_theme,
            // Popped from the back: light first.
            queue: vec![Theme::Dark, Theme::Light],
            current: None,
            frames: 0,
            thumbnails: Thumbnails::default(),
        }
    }

    pub fn start(&mut self) -> CaptureStep {
        self.advance()
    }

    pub fn frame(&mut self) -> CaptureStep {
        let Some(theme) = self.current else {
            return self.advance();
        };
        self.frames = self.frames.saturating_add(1);
        if self.frames < SETTLE_FRAMES {
            CaptureStep::WaitFrame
        } else {
            CaptureStep::Capture(theme)
        }
    }

    /// Report the sample for the current theme. A failed capture is `None`
    /// and does not stop the others.
    pub fn captured(&mut self, uri: Option<String>) -> CaptureStep {
        if let Some(theme) = self.current.take() {
            if uri.is_none() {
                log::warn!("{} thumbnail capture failed", theme.as_str());
            }
            self.thumbnails.set(theme, uri);
        }
        self.advance()
    }

    fn advance(&mut self) -> CaptureStep {
        self.frames = 0;
        match self.queue.pop() {
            Some(theme) => {
                self.current = Some(theme);
                CaptureStep::ApplyTheme(theme)
            }
            None => CaptureStep::Finished {
                restore: self.restore,
                thumbnails: std::mem::take(&mut self.thumbnails),
            },
        }
    }

    /// Drive the machine to completion with a synchronous sampler, for
    /// hosts that render off-page and need no settling.
    pub fn run(mut self, mut sample: impl FnMut(Theme) -> Option<String>) -> Thumbnails {
        let mut step = self.start();
        loop {
            step = match step {
                CaptureStep::ApplyTheme(_) | CaptureStep::WaitFrame => self.frame(),
                CaptureStep::Capture(theme) => {
                    let uri = sample(theme);
                    self.captured(uri)
                }
                CaptureStep::Finished { thumbnails, .. } => return thumbnails,
            };
        }
    }
}

/// Render both thumbnails from the graph alone.
pub fn capture_thumbnails(map: &ConceptMap, config: &ExportConfig, user_theme: Theme) -> Thumbnails {
    ThumbnailCapture::new(user_theme).run(|theme| match thumbnail_data_uri(map, config, theme) {
        Ok(uri) => Some(uri),
        Err(err) => {
            log::debug!("no {} thumbnail: {err}", theme.as_str());
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn waits_two_frames_per_theme_and_restores() {
        let mut capture = ThumbnailCapture::new(Theme::Dark);
        assert_eq!(capture.start(), CaptureStep::ApplyTheme(Theme::Light));
        assert_eq!(capture.frame(), CaptureStep::WaitFrame);
        assert_eq!(capture.frame(), CaptureStep::Capture(Theme::Light));
        assert_eq!(
            capture.captured(Some("light".into())),
            CaptureStep::ApplyTheme(Theme::Dark)
        );
        assert_eq!(capture.frame(), CaptureStep::WaitFrame);
        assert_eq!(capture.frame(), CaptureStep::Capture(Theme::Dark));
        assert_eq!(
            capture.captured(Some("dark".into())),
            CaptureStep::Finished {
                restore: Theme::Dark,
                thumbnails: Thumbnails {
                    light: Some("light".into()),
                    dark: Some("dark".into()),
                },
            }
        );
    }

    #[test]
    fn failed_capture_is_none() {
        let thumbs = ThumbnailCapture::new(Theme::Light).run(|theme| match theme {
            Theme::Light => None,
            Theme::Dark => Some("d".into()),
        });
        assert_eq!(
            thumbs,
            Thumbnails {
                light: None,
                dark: Some("d".into()),
            }
        );
    }

    #[test]
    fn empty_map_has_no_thumbnails() {
        let thumbs = capture_thumbnails(&ConceptMap::new(), &ExportConfig::default(), Theme::Light);
        assert_eq!(thumbs, Thumbnails::default());
    }
}
