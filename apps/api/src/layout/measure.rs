//! Measurement backends.
//!
//! Two interchangeable contracts:
//! - [`WidthMeasure`]: pixel width of a single-line run. Used with the explicit
//!   greedy wrap in [`wrap_line`].
//! - [`HeightMeasure`]: rendered height of a text block inside a fixed-width
//!   container that does its own wrapping. [`WrappingBox`] provides one on top
//!   of any width measurer, behaving like a `pre-wrap` / `break-word` box.
//!
//! Both are deterministic for a given font; building a [`ScaledFont`] requires a
//! [`ReadyFont`](crate::fonts::ReadyFont) so nothing is measured against a font
//! that has not finished loading.

/// Horizontal advance of one character, in em units.
pub trait GlyphAdvance {
    fn advance_em(&self, ch: char) -> f32;
}

pub trait WidthMeasure {
    fn measure_width(&self, text: &str) -> f32;
}

pub trait HeightMeasure {
    fn measure_height(&self, text: &str) -> f32;
}

/// A glyph source scaled to a pixel font size.
pub struct ScaledFont<'a, G: GlyphAdvance + ?Sized> {
    glyphs: &'a G,
    size_px: f32,
}

impl<'a, G: GlyphAdvance + ?Sized> ScaledFont<'a, G> {
    pub fn new(glyphs: &'a G, size_px: f32) -> Self {
        Self { glyphs, size_px }
    }
}

impl<G: GlyphAdvance + ?Sized> WidthMeasure for ScaledFont<'_, G> {
    fn measure_width(&self, text: &str) -> f32 {
        text.chars().map(|c| self.glyphs.advance_em(c)).sum::<f32>() * self.size_px
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Greedy word wrap
// ────────────────────────────────────────────────────────────────────────────

/// Wraps one source line (no `\n`) into display lines no wider than `max_width`.
///
/// Words are whitespace runs; consecutive words on a line are joined by a single
/// space. A candidate exactly `max_width` wide still fits. A line with no words
/// yields one empty line so blank lines survive. A word wider than `max_width`
/// is broken at character boundaries, each piece holding at least one character.
pub fn wrap_line<M: WidthMeasure + ?Sized>(line: &str, measurer: &M, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in line.split_whitespace() {
        if !current.is_empty() {
            let candidate = format!("{current} {word}");
            if measurer.measure_width(&candidate) <= max_width {
                current = candidate;
                continue;
            }
            lines.push(std::mem::take(&mut current));
        }

        if measurer.measure_width(word) <= max_width {
            current = word.to_string();
        } else {
            let mut pieces = break_word(word, measurer, max_width);
            // The last piece stays open so following words can join it.
            current = pieces.pop().unwrap_or_default();
            lines.extend(pieces);
        }
    }

    lines.push(current);
    lines
}

/// Splits `word` into the longest prefixes that fit `max_width`.
fn break_word<M: WidthMeasure + ?Sized>(word: &str, measurer: &M, max_width: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = word;

    while !rest.is_empty() {
        let mut end = 0;
        for (idx, ch) in rest.char_indices() {
            let next = idx + ch.len_utf8();
            if measurer.measure_width(&rest[..next]) > max_width {
                break;
            }
            end = next;
        }
        if end == 0 {
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        pieces.push(rest[..end].to_string());
        rest = &rest[end..];
    }
    pieces
}

// ────────────────────────────────────────────────────────────────────────────
// Engine-wrapped container
// ────────────────────────────────────────────────────────────────────────────

/// Offscreen text container of fixed width whose height is read back per
/// candidate, the way a browser `div` with `white-space: pre-wrap` would be.
pub struct WrappingBox<'a, M: WidthMeasure + ?Sized> {
    measurer: &'a M,
    content_width: f32,
    line_height_px: f32,
}

impl<'a, M: WidthMeasure + ?Sized> WrappingBox<'a, M> {
    pub fn new(measurer: &'a M, content_width: f32, line_height_px: f32) -> Self {
        Self {
            measurer,
            content_width,
            line_height_px,
        }
    }

    /// Number of visual lines `text` occupies. Empty text occupies none.
    pub fn line_count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        text.split('\n')
            .map(|segment| pre_wrap_rows(segment, self.measurer, self.content_width))
            .sum()
    }
}

/// Rows one source line takes when whitespace is preserved.
///
/// Unlike [`wrap_line`], whitespace runs keep their width and can wrap on their
/// own. The single space at a word-to-word break is consumed by the break, so
/// ordinary prose counts the same rows as the greedy wrap. Words break only at
/// whitespace, or per character when wider than the box.
fn pre_wrap_rows<M: WidthMeasure + ?Sized>(line: &str, measurer: &M, max_width: f32) -> usize {
    let mut rows = 1;
    let mut width = 0.0f32;
    let mut after_word = false;
    let mut buf = [0u8; 4];

    for (is_space, run) in whitespace_runs(line) {
        if is_space {
            for (i, ch) in run.chars().enumerate() {
                let advance = measurer.measure_width(ch.encode_utf8(&mut buf));
                if width + advance <= max_width || width == 0.0 {
                    width += advance;
                } else if i == 0 && after_word {
                    rows += 1;
                    width = 0.0;
                } else {
                    rows += 1;
                    width = advance;
                }
            }
            after_word = false;
            continue;
        }

        let word_width = measurer.measure_width(run);
        if width > 0.0 && width + word_width > max_width {
            rows += 1;
            width = 0.0;
        }
        if width + word_width <= max_width {
            width += word_width;
        } else {
            let pieces = break_word(run, measurer, max_width);
            rows += pieces.len().saturating_sub(1);
            width = pieces.last().map_or(0.0, |piece| measurer.measure_width(piece));
        }
        after_word = true;
    }
    rows
}

/// Splits `line` into alternating whitespace and non-whitespace runs.
fn whitespace_runs(line: &str) -> impl Iterator<Item = (bool, &str)> {
    let mut rest = line;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let is_space = first.is_whitespace();
        let end = rest
            .char_indices()
            .find(|&(_, c)| c.is_whitespace() != is_space)
            .map_or(rest.len(), |(idx, _)| idx);
        let (run, tail) = rest.split_at(end);
        rest = tail;
        Some((is_space, run))
    })
}

impl<M: WidthMeasure + ?Sized> HeightMeasure for WrappingBox<'_, M> {
    fn measure_height(&self, text: &str) -> f32 {
        self.line_count(text) as f32 * self.line_height_px
    }
}
