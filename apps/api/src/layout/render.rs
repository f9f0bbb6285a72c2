//! Standalone HTML export of a composition.
//!
//! Each page is a fixed 8.5in × 11in block padded by the same margins the
//! paginator measured against. With no pages, one blank page is emitted.

use crate::layout::composer::CompositionResult;
use crate::layout::paginator::Page;

const PAGE_CSS: &str = "body{margin:0;padding:24px;background:#fff;}\
.pages{display:flex;flex-direction:column;gap:0;align-items:center;}\
.page{position:relative;box-sizing:border-box;width:8.5in;height:11in;background:#fff;color:#000;overflow:hidden;page-break-after:always;}\
.page__content{white-space:pre-wrap;word-break:break-word;}\
.page__watermark{position:absolute;right:0.3in;bottom:0.2in;font:10px sans-serif;color:#999;}\
@media print{body{padding:0;}.page__watermark{display:none;}}";

/// Renders the whole document.
pub fn render_html(result: &CompositionResult, title: &str) -> String {
    let blank = [Page::Block(String::new())];
    let pages: &[Page] = if result.pages.is_empty() {
        &blank
    } else {
        &result.pages
    };

    let body: String = pages
        .iter()
        .enumerate()
        .map(|(idx, page)| render_page(result, page, idx + 1))
        .collect();

    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title><style>{PAGE_CSS}</style></head>\
<body><div class=\"pages\">{body}</div></body></html>",
        title = escape_html(title),
    )
}

fn render_page(result: &CompositionResult, page: &Page, number: usize) -> String {
    let pad = &result.content_box.padding;
    let typography = &result.typography;
    let content_style = format!(
        "font-family:{};font-size:{}pt;line-height:{};font-feature-settings:{};",
        result.font_family_css, typography.font_size_pt, typography.line_height, result.feature_settings
    );

    format!(
        "<div class=\"page\" aria-label=\"Page {number}\" style=\"padding:{:.2}px {:.2}px {:.2}px {:.2}px;\">\
<div class=\"page__content\" style=\"{}\">{}</div>\
<div class=\"page__watermark\">Page {number}</div></div>",
        pad.top,
        pad.right,
        pad.bottom,
        pad.left,
        escape_html(&content_style),
        escape_html(&page.text()),
    )
}

/// Escapes text for element content and double-quoted attributes.
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
