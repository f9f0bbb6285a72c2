//! Typography settings, clamped to the range the preview pages support.

use serde::{Deserialize, Serialize};

pub const MIN_FONT_SIZE_PT: f32 = 10.0;
pub const MAX_FONT_SIZE_PT: f32 = 40.0;
pub const DEFAULT_FONT_SIZE_PT: f32 = 18.0;

pub const MIN_LINE_HEIGHT: f32 = 1.1;
pub const MAX_LINE_HEIGHT: f32 = 2.2;
pub const DEFAULT_LINE_HEIGHT: f32 = 1.55;

const POINTS_PER_INCH: f32 = 72.0;

/// CSS generic family keywords are emitted unquoted.
const GENERIC_KEYWORDS: &[&str] = &[
    "serif",
    "sans-serif",
    "monospace",
    "cursive",
    "fantasy",
    "system-ui",
    "ui-serif",
    "ui-sans-serif",
    "ui-monospace",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypographyConfig {
    /// Ordered fallback list, most preferred first.
    pub font_family: Vec<String>,
    pub font_size_pt: f32,
    /// Multiplier of the font size.
    pub line_height: f32,
}

impl TypographyConfig {
    /// Builds a config with size rounded to whole points and clamped into
    /// [10, 40], line height clamped into [1.1, 2.2]. Non-finite inputs take
    /// the lower bound.
    pub fn clamped(font_family: Vec<String>, font_size_pt: f32, line_height: f32) -> Self {
        let font_size_pt = if font_size_pt.is_finite() {
            font_size_pt.round().clamp(MIN_FONT_SIZE_PT, MAX_FONT_SIZE_PT)
        } else {
            MIN_FONT_SIZE_PT
        };
        let line_height = if line_height.is_finite() {
            line_height.clamp(MIN_LINE_HEIGHT, MAX_LINE_HEIGHT)
        } else {
            MIN_LINE_HEIGHT
        };
        Self {
            font_family,
            font_size_pt,
            line_height,
        }
    }

    pub fn font_size_px(&self, dpi: f32) -> f32 {
        self.font_size_pt * dpi / POINTS_PER_INCH
    }

    pub fn line_height_px(&self, dpi: f32) -> f32 {
        self.font_size_px(dpi) * self.line_height
    }

    /// CSS `font-family` value: named families quoted, generic keywords bare.
    pub fn css_font_family(&self) -> String {
        self.font_family
            .iter()
            .map(|name| {
                if GENERIC_KEYWORDS.contains(&name.as_str()) {
                    name.clone()
                } else {
                    format!("'{}'", name.replace('\'', ""))
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
