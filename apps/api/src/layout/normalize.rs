//! Line-ending normalization applied before any measurement.

/// Collapses CRLF and lone CR into LF. Nothing else is touched: no trimming,
/// no whitespace collapsing. `None` is treated as empty text.
pub fn normalize_line_endings(raw: Option<&str>) -> String {
    let raw = raw.unwrap_or_default();
    if !raw.contains('\r') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}
