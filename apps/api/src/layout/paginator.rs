//! Paginator: lays normalized text into at most `max_pages` fixed-size pages.
//!
//! # Strategies
//! - [`paginate_by_height`]: line-by-line accumulation against a container that
//!   wraps on its own. A page is flushed as soon as the next source line would
//!   overflow it. A single source line taller than a whole page is split one
//!   character at a time.
//! - [`paginate_by_lines`]: every source line is word-wrapped up front, then the
//!   flat line list is cut into chunks of `floor(content_height / line_height)`.
//!
//! Both guarantee `pages.len() <= max_pages`, keep source order, and produce no
//! pages for empty text. Rendering a blank page for empty text is the renderer's
//! job.

use serde::{Deserialize, Serialize};

use crate::layout::measure::{wrap_line, HeightMeasure, WidthMeasure};

/// Appended to the last line when the explicit strategy runs out of pages.
pub const TRUNCATION_MARKER: &str = "…";

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

/// One finished page. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum Page {
    /// Text block; line wrapping is left to the renderer.
    Block(String),
    /// Pre-wrapped display lines.
    Lines(Vec<String>),
}

impl Page {
    /// Page content as a single string, lines separated by `\n`.
    pub fn text(&self) -> String {
        match self {
            Page::Block(text) => text.clone(),
            Page::Lines(lines) => lines.join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub pages: Vec<Page>,
    /// True exactly when some input could not be placed within `max_pages`.
    pub truncated: bool,
}

impl Pagination {
    fn empty() -> Self {
        Self {
            pages: Vec::new(),
            truncated: false,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Engine-wrapped strategy
// ────────────────────────────────────────────────────────────────────────────

/// Fills pages by measured height. A candidate exactly `content_height` tall
/// is accepted.
pub fn paginate_by_height<H: HeightMeasure + ?Sized>(
    text: &str,
    container: &H,
    content_height: f32,
    max_pages: usize,
) -> Pagination {
    if text.is_empty() {
        return Pagination::empty();
    }

    let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
    let mut pages = Vec::new();
    // `Some("")` is a page holding one blank line, distinct from no page at all.
    let mut current: Option<String> = None;
    let mut i = 0;

    while i < lines.len() && pages.len() < max_pages {
        let next_line = &lines[i];
        let candidate = match &current {
            Some(acc) => format!("{acc}\n{next_line}"),
            None => next_line.clone(),
        };

        if container.measure_height(&candidate) <= content_height {
            current = Some(candidate);
            i += 1;
            continue;
        }

        // Retry the same line against a fresh page.
        if let Some(page) = current.take() {
            pages.push(Page::Block(page));
            continue;
        }

        // Not even this one line fits on an empty page.
        let (head, rest) = fill_by_characters(next_line, container, content_height);
        pages.push(Page::Block(head));
        if rest.is_empty() {
            i += 1;
        } else {
            lines[i] = rest;
        }
    }

    if pages.len() < max_pages {
        if let Some(page) = current {
            pages.push(Page::Block(page));
        }
    }

    Pagination {
        pages,
        truncated: i < lines.len(),
    }
}

/// Longest prefix of `line` whose height fits, and the remainder. The prefix
/// always holds at least one character so every call makes progress.
fn fill_by_characters<H: HeightMeasure + ?Sized>(
    line: &str,
    container: &H,
    content_height: f32,
) -> (String, String) {
    let mut end = 0;
    for (idx, ch) in line.char_indices() {
        let next = idx + ch.len_utf8();
        if container.measure_height(&line[..next]) > content_height {
            break;
        }
        end = next;
    }
    if end == 0 {
        end = line.chars().next().map_or(line.len(), char::len_utf8);
    }
    (line[..end].to_string(), line[end..].to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// Explicit wrap-then-paginate strategy
// ────────────────────────────────────────────────────────────────────────────

/// Lines that fit one page, never less than one.
pub fn lines_per_page(content_height: f32, line_height_px: f32) -> usize {
    if !(line_height_px > 0.0) || !content_height.is_finite() {
        return 1;
    }
    ((content_height / line_height_px).floor() as usize).max(1)
}

/// Wraps every source line, then cuts the result into pages of
/// [`lines_per_page`] lines. On overflow the last kept line loses its trailing
/// whitespace and gets [`TRUNCATION_MARKER`].
pub fn paginate_by_lines<W: WidthMeasure + ?Sized>(
    text: &str,
    measurer: &W,
    content_width: f32,
    content_height: f32,
    line_height_px: f32,
    max_pages: usize,
) -> Pagination {
    if text.is_empty() {
        return Pagination::empty();
    }

    let wrapped: Vec<String> = text
        .split('\n')
        .flat_map(|line| wrap_line(line, measurer, content_width))
        .collect();

    let per_page = lines_per_page(content_height, line_height_px);
    let overflow = wrapped.len() > max_pages.saturating_mul(per_page);

    let mut pages: Vec<Page> = wrapped
        .chunks(per_page)
        .take(max_pages)
        .map(|chunk| Page::Lines(chunk.to_vec()))
        .collect();

    if overflow {
        if let Some(Page::Lines(last_page)) = pages.last_mut() {
            if let Some(last_line) = last_page.last_mut() {
                let kept = last_line.trim_end().len();
                last_line.truncate(kept);
                last_line.push_str(TRUNCATION_MARKER);
            }
        }
    }

    Pagination {
        pages,
        truncated: overflow,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::measure::testing::Monospace;
    use crate::layout::measure::WrappingBox;

    const COLUMNS: f32 = 10.0;

    /// Container 10 columns wide with 1-unit lines: height == visual line count.
    fn container() -> WrappingBox<'static, Monospace> {
        WrappingBox::new(&Monospace, COLUMNS, 1.0)
    }

    fn numbered_lines(n: usize) -> String {
        (1..=n).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n")
    }

    fn block(page: &Page) -> &str {
        match page {
            Page::Block(text) => text,
            Page::Lines(_) => panic!("expected a block page"),
        }
    }

    // ── engine-wrapped ──────────────────────────────────────────────────────

    #[test]
    fn test_height_empty_text_has_no_pages() {
        let result = paginate_by_height("", &container(), 5.0, 10);
        assert!(result.pages.is_empty());
        assert!(!result.truncated);
    }

    #[test]
    fn test_height_short_text_is_one_page_in_order() {
        let text = numbered_lines(4);
        let result = paginate_by_height(&text, &container(), 5.0, 10);
        assert_eq!(result.pages, vec![Page::Block(text.clone())]);
        assert!(!result.truncated);
    }

    #[test]
    fn test_height_exact_fit_is_accepted() {
        let text = numbered_lines(5);
        let result = paginate_by_height(&text, &container(), 5.0, 10);
        assert_eq!(result.pages.len(), 1);
    }

    #[test]
    fn test_height_breaks_between_lines() {
        let text = numbered_lines(12);
        let result = paginate_by_height(&text, &container(), 5.0, 10);
        assert_eq!(result.pages.len(), 3);
        assert_eq!(block(&result.pages[0]), numbered_lines(5));
        assert!(block(&result.pages[1]).starts_with("line 6\n"));
        assert_eq!(block(&result.pages[2]), "line 11\nline 12");
        assert!(!result.truncated);
    }

    #[test]
    fn test_height_wrapped_line_moves_whole_to_next_page() {
        // 4 short lines fill 4 rows; the 2-row paragraph goes to page 2.
        let text = "a\nb\nc\nd\nthe quick brown fox";
        let result = paginate_by_height(text, &container(), 5.0, 10);
        assert_eq!(result.pages.len(), 2);
        assert_eq!(block(&result.pages[1]), "the quick brown fox");
    }

    #[test]
    fn test_height_max_pages_truncates_with_prefix_stability() {
        let text = numbered_lines(12);
        let full = paginate_by_height(&text, &container(), 5.0, 10);
        let capped = paginate_by_height(&text, &container(), 5.0, 1);
        assert_eq!(capped.pages.len(), 1);
        assert!(capped.truncated);
        assert_eq!(capped.pages[0], full.pages[0]);
    }

    #[test]
    fn test_height_exactly_enough_pages_is_not_truncated() {
        let text = numbered_lines(10);
        let result = paginate_by_height(&text, &container(), 5.0, 2);
        assert_eq!(result.pages.len(), 2);
        assert!(!result.truncated);
    }

    #[test]
    fn test_height_blank_lines_are_kept() {
        let text = "\n\nafter blanks\n";
        let result = paginate_by_height(text, &container(), 10.0, 10);
        assert_eq!(result.pages, vec![Page::Block(text.to_string())]);
    }

    #[test]
    fn test_height_character_fallback_loses_nothing() {
        // 23 characters, no spaces: 3 visual rows of 10 columns, page holds 2.
        let line = "abcdefghijklmnopqrstuvw";
        let result = paginate_by_height(line, &container(), 2.0, 10);
        let texts: Vec<&str> = result.pages.iter().map(block).collect();
        assert_eq!(texts, vec!["abcdefghijklmnopqrst", "uvw"]);
        assert!(!result.truncated);
    }

    #[test]
    fn test_height_character_fallback_when_nothing_fits() {
        // Page shorter than a single row: one character per page, none empty.
        let result = paginate_by_height("xyz\nw", &container(), 0.5, 10);
        let texts: Vec<&str> = result.pages.iter().map(block).collect();
        assert_eq!(texts, vec!["x", "y", "z", "w"]);
        assert!(!result.truncated);

        let capped = paginate_by_height("xyz", &container(), 0.5, 2);
        assert_eq!(capped.pages.len(), 2);
        assert!(capped.truncated);
    }

    #[test]
    fn test_height_is_idempotent() {
        let text = format!("{}\n{}", "word ".repeat(40), numbered_lines(30));
        let a = paginate_by_height(&text, &container(), 7.0, 4);
        let b = paginate_by_height(&text, &container(), 7.0, 4);
        assert_eq!(a, b);
    }

    #[test]
    fn test_height_pages_reassemble_source_prefix() {
        let text = numbered_lines(40);
        let result = paginate_by_height(&text, &container(), 6.0, 3);
        assert!(result.truncated);
        let joined = result
            .pages
            .iter()
            .map(Page::text)
            .collect::<Vec<_>>()
            .join("\n");
        assert!(text.starts_with(&joined));
    }

    // ── explicit ────────────────────────────────────────────────────────────

    #[test]
    fn test_lines_per_page_floor_and_minimum() {
        assert_eq!(lines_per_page(100.0, 30.0), 3);
        assert_eq!(lines_per_page(10.0, 30.0), 1);
        assert_eq!(lines_per_page(10.0, 0.0), 1);
    }

    #[test]
    fn test_lines_empty_text_has_no_pages() {
        let result = paginate_by_lines("", &Monospace, COLUMNS, 5.0, 1.0, 10);
        assert!(result.pages.is_empty());
        assert!(!result.truncated);
    }

    #[test]
    fn test_lines_chunks_wrapped_lines() {
        let text = "the quick brown fox jumps\n\nover";
        let result = paginate_by_lines(text, &Monospace, COLUMNS, 2.0, 1.0, 10);
        assert_eq!(
            result.pages,
            vec![
                Page::Lines(vec!["the quick".into(), "brown fox".into()]),
                Page::Lines(vec!["jumps".into(), "".into()]),
                Page::Lines(vec!["over".into()]),
            ]
        );
        assert!(!result.truncated);
    }

    #[test]
    fn test_lines_overflow_marks_last_line() {
        let text = "alpha   \nbeta\ngamma";
        let result = paginate_by_lines(text, &Monospace, COLUMNS, 1.0, 1.0, 1);
        assert_eq!(result.pages, vec![Page::Lines(vec![format!("alpha{TRUNCATION_MARKER}")])]);
        assert!(result.truncated);
    }

    #[test]
    fn test_lines_exact_capacity_is_not_overflow() {
        let text = "a\nb\nc\nd";
        let result = paginate_by_lines(text, &Monospace, COLUMNS, 2.0, 1.0, 2);
        assert_eq!(result.pages.len(), 2);
        assert!(!result.truncated);
        assert_eq!(result.pages[1], Page::Lines(vec!["c".into(), "d".into()]));
    }

    #[test]
    fn test_lines_prefix_stability() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let full = paginate_by_lines(text, &Monospace, COLUMNS, 2.0, 1.0, 10);
        let capped = paginate_by_lines(text, &Monospace, COLUMNS, 2.0, 1.0, 1);
        assert!(full.pages.len() >= 3);
        assert_eq!(capped.pages.len(), 1);
        assert!(capped.truncated);
        let (Page::Lines(full_first), Page::Lines(capped_first)) = (&full.pages[0], &capped.pages[0]) else {
            panic!("expected line pages");
        };
        // Same lines except the marker on the final one.
        assert_eq!(full_first[0], capped_first[0]);
        assert_eq!(
            capped_first[1].trim_end_matches(TRUNCATION_MARKER),
            full_first[1].trim_end()
        );
    }

    #[test]
    fn test_lines_reassemble_words_in_order() {
        let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit";
        let result = paginate_by_lines(text, &Monospace, 12.0, 3.0, 1.0, 10);
        let words: Vec<String> = result
            .pages
            .iter()
            .flat_map(|p| match p {
                Page::Lines(lines) => lines.clone(),
                Page::Block(_) => vec![],
            })
            .flat_map(|l| l.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .collect();
        let expected: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        assert_eq!(words, expected);
    }
}
