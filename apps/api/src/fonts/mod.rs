//! Font source: loaded handwriting fonts plus the always-available fallbacks.
//!
//! A [`ReadyFont`] is the only thing the composer measures with. It is either a
//! static fallback table or a font whose bytes were fully parsed into an advance
//! map, so holding one means measurement will not drift from an unloaded face.

pub mod handlers;
mod woff;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::layout::font_metrics::{get_metrics, GenericFamily};
use crate::layout::measure::GlyphAdvance;

/// Upper bound on the codepoint range sampled for advance widths.
const MAX_SAMPLED_CODEPOINT: u32 = 0xFFFF;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("font data is empty")]
    Empty,

    #[error("unsupported font container: {0} (upload a TrueType, OpenType or WOFF file)")]
    UnsupportedFormat(FontFormat),

    #[error("font could not be parsed: {0}")]
    Parse(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Container sniffing
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFormat {
    Ttf,
    Otf,
    Collection,
    Woff,
    Woff2,
    Unknown,
}

impl FontFormat {
    /// Identifies the container from its leading tag.
    pub fn sniff(data: &[u8]) -> Self {
        match data.get(..4) {
            Some([0x00, 0x01, 0x00, 0x00]) | Some(b"true") => FontFormat::Ttf,
            Some(b"OTTO") => FontFormat::Otf,
            Some(b"ttcf") => FontFormat::Collection,
            Some(b"wOFF") => FontFormat::Woff,
            Some(b"wOF2") => FontFormat::Woff2,
            _ => FontFormat::Unknown,
        }
    }
}

impl std::fmt::Display for FontFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FontFormat::Ttf => "ttf",
            FontFormat::Otf => "otf",
            FontFormat::Collection => "ttc",
            FontFormat::Woff => "woff",
            FontFormat::Woff2 => "woff2",
            FontFormat::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Loaded font
// ────────────────────────────────────────────────────────────────────────────

/// A parsed font reduced to what layout needs: per-character advances in em.
#[derive(Debug)]
pub struct LoadedFont {
    pub id: Uuid,
    pub family: String,
    pub format: FontFormat,
    pub glyph_count: u16,
    pub loaded_at: DateTime<Utc>,
    advances: HashMap<char, f32>,
    default_advance: f32,
}

impl LoadedFont {
    /// Parses TrueType/OpenType bytes, unwrapping WOFF and WOFF2 first.
    /// `suggested_name` wins over the family name stored in the font; with
    /// neither, a generated name is used.
    pub fn parse(data: &[u8], suggested_name: Option<&str>) -> Result<Self, FontError> {
        if data.is_empty() {
            return Err(FontError::Empty);
        }
        let format = FontFormat::sniff(data);
        let sfnt = woff::to_sfnt(format, data)?;

        let face = ttf_parser::Face::parse(&sfnt, 0).map_err(|e| FontError::Parse(e.to_string()))?;
        let units_per_em = face.units_per_em() as f32;

        let mut advances = HashMap::new();
        for code in 32u32..=MAX_SAMPLED_CODEPOINT {
            let Some(ch) = char::from_u32(code) else {
                continue;
            };
            if let Some(glyph_id) = face.glyph_index(ch) {
                let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                advances.insert(ch, advance as f32 / units_per_em);
            }
        }

        let default_advance = match advances.get(&' ') {
            Some(&w) if w > 0.0 => w,
            _ => 0.5,
        };

        let id = Uuid::new_v4();
        let family = suggested_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| family_name(&face))
            .unwrap_or_else(|| format!("InkReplica-{}", &id.simple().to_string()[..8]));

        Ok(Self {
            id,
            family,
            format,
            glyph_count: face.number_of_glyphs(),
            loaded_at: Utc::now(),
            advances,
            default_advance,
        })
    }

    pub fn mapped_chars(&self) -> usize {
        self.advances.len()
    }
}

impl GlyphAdvance for LoadedFont {
    fn advance_em(&self, ch: char) -> f32 {
        if ch == '\t' {
            return self.default_advance * 4.0;
        }
        self.advances.get(&ch).copied().unwrap_or(self.default_advance)
    }
}

fn family_name(face: &ttf_parser::Face) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|n| n.name_id == ttf_parser::name_id::FAMILY)
        .find_map(|n| n.to_string())
        .filter(|name| !name.trim().is_empty())
}

// ────────────────────────────────────────────────────────────────────────────
// Ready font token
// ────────────────────────────────────────────────────────────────────────────

/// A font that is fully available for measurement.
#[derive(Debug, Clone)]
pub enum ReadyFont {
    Fallback(GenericFamily),
    Loaded(Arc<LoadedFont>),
}

impl ReadyFont {
    pub fn display_name(&self) -> &str {
        match self {
            ReadyFont::Fallback(family) => family.display_name(),
            ReadyFont::Loaded(font) => &font.family,
        }
    }

    /// Ordered CSS fallback list; a loaded font sits in front of the serif stack.
    pub fn family_stack(&self) -> Vec<String> {
        match self {
            ReadyFont::Fallback(family) => family.css_stack().iter().map(|s| s.to_string()).collect(),
            ReadyFont::Loaded(font) => std::iter::once(font.family.clone())
                .chain(GenericFamily::Serif.css_stack().iter().map(|s| s.to_string()))
                .collect(),
        }
    }
}

impl GlyphAdvance for ReadyFont {
    fn advance_em(&self, ch: char) -> f32 {
        match self {
            ReadyFont::Fallback(family) => get_metrics(*family).advance_em(ch),
            ReadyFont::Loaded(font) => font.advance_em(ch),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Registry
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct FontSummary {
    pub font_id: Uuid,
    pub family: String,
    pub format: FontFormat,
    pub glyph_count: u16,
    pub mapped_chars: usize,
    pub loaded_at: DateTime<Utc>,
}

impl From<&LoadedFont> for FontSummary {
    fn from(font: &LoadedFont) -> Self {
        Self {
            font_id: font.id,
            family: font.family.clone(),
            format: font.format,
            glyph_count: font.glyph_count,
            mapped_chars: font.mapped_chars(),
            loaded_at: font.loaded_at,
        }
    }
}

/// In-memory store of loaded fonts, shared across handlers and job drivers.
#[derive(Debug, Default)]
pub struct FontRegistry {
    fonts: RwLock<HashMap<Uuid, Arc<LoadedFont>>>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses on the blocking pool and registers the result.
    pub async fn load(&self, data: bytes::Bytes, suggested_name: Option<String>) -> Result<Arc<LoadedFont>, FontError> {
        let font = tokio::task::spawn_blocking(move || LoadedFont::parse(&data, suggested_name.as_deref()))
            .await
            .map_err(|e| FontError::Parse(format!("font parsing task failed: {e}")))??;

        let font = Arc::new(font);
        info!(
            font_id = %font.id,
            family = %font.family,
            glyphs = font.glyph_count,
            "Font loaded"
        );
        self.fonts.write().await.insert(font.id, Arc::clone(&font));
        Ok(font)
    }

    #[cfg(test)]
    pub async fn insert(&self, font: LoadedFont) -> Arc<LoadedFont> {
        let font = Arc::new(font);
        self.fonts.write().await.insert(font.id, Arc::clone(&font));
        font
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<LoadedFont>> {
        self.fonts.read().await.get(&id).cloned()
    }

    /// A ready token for `font_id`, or the generic fallback when none is named.
    /// `None` means the named font was never loaded.
    pub async fn resolve(&self, font_id: Option<Uuid>, fallback: GenericFamily) -> Option<ReadyFont> {
        match font_id {
            Some(id) => self.get(id).await.map(ReadyFont::Loaded),
            None => Some(ReadyFont::Fallback(fallback)),
        }
    }

    /// Summaries, oldest first.
    pub async fn list(&self) -> Vec<FontSummary> {
        let fonts = self.fonts.read().await;
        let mut summaries: Vec<FontSummary> = fonts.values().map(|f| FontSummary::from(f.as_ref())).collect();
        summaries.sort_by_key(|s| s.loaded_at);
        summaries
    }
}
