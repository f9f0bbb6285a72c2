//! Page geometry: physical page size + margins resolved to a pixel content box.
//!
//! Pages are US Letter (8.5" × 11"). Margins are clamped into [0.3", 1.5"]
//! before use, so for Letter the content box can never collapse; custom page
//! sizes still go through the degenerate-geometry check.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LETTER_WIDTH_IN: f32 = 8.5;
pub const LETTER_HEIGHT_IN: f32 = 11.0;

pub const MIN_MARGIN_IN: f32 = 0.3;
pub const MAX_MARGIN_IN: f32 = 1.5;
pub const DEFAULT_MARGIN_IN: f32 = 0.85;

/// CSS reference pixel density. Used when the caller does not supply one.
pub const DEFAULT_DPI: f32 = 96.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("degenerate page geometry: content box is {width_px:.1}px × {height_px:.1}px")]
    DegenerateGeometry { width_px: f32, height_px: f32 },

    #[error("invalid pixels-per-inch factor: {0}")]
    InvalidDpi(f32),
}

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Margins in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub fn uniform(inches: f32) -> Self {
        Self {
            top: inches,
            right: inches,
            bottom: inches,
            left: inches,
        }
    }

    /// Every side clamped into [`MIN_MARGIN_IN`, `MAX_MARGIN_IN`].
    /// Non-finite sides fall back to the minimum.
    pub fn clamped(&self) -> Self {
        Self {
            top: clamp_margin(self.top),
            right: clamp_margin(self.right),
            bottom: clamp_margin(self.bottom),
            left: clamp_margin(self.left),
        }
    }

    fn scaled(&self, dpi: f32) -> Self {
        Self {
            top: self.top * dpi,
            right: self.right * dpi,
            bottom: self.bottom * dpi,
            left: self.left * dpi,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(DEFAULT_MARGIN_IN)
    }
}

/// Physical page description, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_in: f32,
    pub height_in: f32,
    pub margins: Margins,
}

impl PageGeometry {
    pub fn us_letter(margins: Margins) -> Self {
        Self {
            width_in: LETTER_WIDTH_IN,
            height_in: LETTER_HEIGHT_IN,
            margins,
        }
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::us_letter(Margins::default())
    }
}

/// The printable area of one page, in pixels.
///
/// `padding` holds the clamped margins in pixels so the renderer can reproduce
/// the exact box the paginator measured against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentBox {
    pub width_px: f32,
    pub height_px: f32,
    pub padding: Margins,
}

// ────────────────────────────────────────────────────────────────────────────
// Resolver
// ────────────────────────────────────────────────────────────────────────────

/// Converts page geometry into a pixel content box.
///
/// `content = (page - clamped margins) × dpi` on each axis. A non-positive
/// result is a configuration error and is never turned into an empty page set.
pub fn resolve_content_box(geometry: &PageGeometry, dpi: f32) -> Result<ContentBox, LayoutError> {
    if !dpi.is_finite() || dpi <= 0.0 {
        return Err(LayoutError::InvalidDpi(dpi));
    }

    let margins = geometry.margins.clamped();
    let width_px = (geometry.width_in - margins.left - margins.right) * dpi;
    let height_px = (geometry.height_in - margins.top - margins.bottom) * dpi;

    if !(width_px > 0.0 && height_px > 0.0) {
        return Err(LayoutError::DegenerateGeometry { width_px, height_px });
    }

    Ok(ContentBox {
        width_px,
        height_px,
        padding: margins.scaled(dpi),
    })
}

fn clamp_margin(inches: f32) -> f32 {
    if inches.is_finite() {
        inches.clamp(MIN_MARGIN_IN, MAX_MARGIN_IN)
    } else {
        MIN_MARGIN_IN
    }
}
