//! Composer: normalizes input, resolves geometry and runs the chosen paginator.
//!
//! Composition is synchronous and pure given its inputs. HTTP handlers run it
//! inside `tokio::task::spawn_blocking`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fonts::ReadyFont;
use crate::layout::features::FeatureSet;
use crate::layout::geometry::{resolve_content_box, ContentBox, LayoutError, PageGeometry};
use crate::layout::measure::{ScaledFont, WrappingBox};
use crate::layout::normalize::normalize_line_endings;
use crate::layout::paginator::{paginate_by_height, paginate_by_lines, Page};
use crate::layout::typography::TypographyConfig;

/// Measurement strategy, fixed when the composer is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Height read-back from a self-wrapping container.
    #[default]
    EngineWrapped,
    /// Width measurement plus explicit greedy word wrap.
    Explicit,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "engine_wrapped" | "engine" => Ok(Strategy::EngineWrapped),
            "explicit" => Ok(Strategy::Explicit),
            other => Err(format!("unknown composition strategy '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompositionInput {
    pub text: String,
    pub typography: TypographyConfig,
    pub geometry: PageGeometry,
    pub features: FeatureSet,
    /// Page budget; values below 1 are treated as 1.
    pub max_pages: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompositionResult {
    pub pages: Vec<Page>,
    pub truncated: bool,
    pub content_box: ContentBox,
    pub max_pages: usize,
    pub strategy: Strategy,
    pub typography: TypographyConfig,
    pub font_name: String,
    pub font_family_css: String,
    pub feature_settings: String,
    pub features_label: String,
}

impl CompositionResult {
    /// One-line page count, e.g. `Pages: 3 / 10 (text truncated by limit)`.
    pub fn summary(&self) -> String {
        let mut info = format!("Pages: {} / {}", self.pages.len(), self.max_pages);
        if self.truncated {
            info.push_str(" (text truncated by limit)");
        }
        info
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Composer {
    strategy: Strategy,
    dpi: f32,
}

impl Composer {
    pub fn new(strategy: Strategy, dpi: f32) -> Self {
        Self { strategy, dpi }
    }

    /// Lays `input` out into pages measured with `font`.
    ///
    /// Fails only on degenerate geometry or an invalid DPI factor. Running out
    /// of pages is reported through `truncated`, never as an error.
    pub fn compose(&self, input: &CompositionInput, font: &ReadyFont) -> Result<CompositionResult, LayoutError> {
        let content_box = resolve_content_box(&input.geometry, self.dpi)?;
        let text = normalize_line_endings(Some(&input.text));
        let max_pages = input.max_pages.max(1);

        let measurer = ScaledFont::new(font, input.typography.font_size_px(self.dpi));
        let line_height_px = input.typography.line_height_px(self.dpi);

        let pagination = match self.strategy {
            Strategy::EngineWrapped => {
                let container = WrappingBox::new(&measurer, content_box.width_px, line_height_px);
                paginate_by_height(&text, &container, content_box.height_px, max_pages)
            }
            Strategy::Explicit => paginate_by_lines(
                &text,
                &measurer,
                content_box.width_px,
                content_box.height_px,
                line_height_px,
                max_pages,
            ),
        };

        debug!(
            strategy = ?self.strategy,
            chars = text.chars().count(),
            pages = pagination.pages.len(),
            max_pages,
            truncated = pagination.truncated,
            "Composition finished"
        );

        Ok(CompositionResult {
            pages: pagination.pages,
            truncated: pagination.truncated,
            content_box,
            max_pages,
            strategy: self.strategy,
            font_name: font.display_name().to_string(),
            font_family_css: input.typography.css_font_family(),
            feature_settings: input.features.to_feature_settings(),
            features_label: input.features.label(),
            typography: input.typography.clone(),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
