//! Inline math detection for node text.
//!
//! Math spans (`$...$`) are detected so callers can decide how to place
//! the text; no typesetting backend is wired in, so rendering always
//! falls back to the plain-text form with the delimiters stripped.

/// Find the first `$...$` span with a non-empty body.
fn find_math_span(text: &str) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let open = bytes.iter().position(|&b| b == b'$')?;
    let close = bytes[open + 1..].iter().position(|&b| b == b'$')? + open + 1;
    (close > open + 1).then_some((open, close))
}

/// Whether the text contains an inline math span.
pub fn has_math(text: &str) -> bool {
    find_math_span(text).is_some()
}

/// Best-effort math rendering. Returns the text to show plus an optional
/// typeset sub-document; with no backend available the sub-document is
/// always absent and the caller gets the plain-text fallback.
pub fn render(text: &str) -> (String, Option<String>) {
    (extract_plain_text(text), None)
}

/// Strip math delimiters, keeping their content.
pub fn extract_plain_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some((open, close)) = find_math_span(rest) {
        out.push_str(&rest[..open]);
        out.push_str(&rest[open + 1..close]);
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_math_span() {
        assert!(has_math("value is $x^2$"));
        assert!(!has_math("plain text"));
        assert!(!has_math("empty $$ span"));
        assert!(!has_math("unclosed $x"));
    }

    #[test]
    fn strips_delimiters() {
        assert_eq!(extract_plain_text("$a$ and $b$"), "a and b");
        assert_eq!(extract_plain_text("no math"), "no math");
    }

    #[test]
    fn render_falls_back_to_plain_text() {
        let (plain, typeset) = render("sum $x+y$");
        assert_eq!(plain, "sum x+y");
        assert!(typeset.is_none());
    }
}
