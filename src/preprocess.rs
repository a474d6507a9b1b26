//! Input preprocessing: comment stripping, environment extraction and
//! whitespace normalization.
//!
//! Runs before macro expansion and parsing so the grammar only ever sees
//! bare drawing commands. All three passes are plain string scans; the
//! input is small and this is nowhere near the hot path.

/// Prepare raw source for the macro expander and parser.
pub fn preprocess(source: &str) -> String {
    let stripped = strip_comments(source);
    let extracted = extract_pictures(&stripped);
    normalize_whitespace(&extracted)
}

/// Remove `%` comments (to end of line). A `\%` escape is kept as-is and
/// does not start a comment.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for (i, line) in source.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(uncommented(line));
    }
    out
}

fn uncommented(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'%' && (i == 0 || bytes[i - 1] != b'\\') {
            return &line[..i];
        }
    }
    line
}

/// Pull out every `\begin{tikzpicture} ... \end{tikzpicture}` block. If a
/// full LaTeX document was supplied, this drops the preamble; if the input
/// has no environment markers it passes through unchanged so bare fragments
/// still parse.
pub fn extract_pictures(source: &str) -> String {
    const BEGIN: &str = "\\begin{tikzpicture}";
    const END: &str = "\\end{tikzpicture}";

    let mut pictures = Vec::new();
    let mut rest = source;
    while let Some(start) = rest.find(BEGIN) {
        let tail = &rest[start..];
        match tail.find(END) {
            Some(end) => {
                let stop = end + END.len();
                pictures.push(&tail[..stop]);
                rest = &tail[stop..];
            }
            None => break,
        }
    }

    if pictures.is_empty() {
        source.to_string()
    } else {
        pictures.join("\n")
    }
}

/// Trim every line and drop blank ones.
pub fn normalize_whitespace(source: &str) -> String {
    source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_to_end_of_line() {
        let out = strip_comments("\\draw (0,0) -- (1,1); % a line\nnext");
        assert_eq!(out, "\\draw (0,0) -- (1,1); \nnext");
    }

    #[test]
    fn escaped_percent_is_not_a_comment() {
        let out = strip_comments("\\node {50\\%}; % note");
        assert_eq!(out, "\\node {50\\%}; ");
    }

    #[test]
    fn percent_at_line_start() {
        let out = strip_comments("% whole line comment\n\\draw (0,0);");
        assert_eq!(out, "\n\\draw (0,0);");
    }

    #[test]
    fn extracts_environment_from_document() {
        let doc = "\\documentclass{article}\n\\begin{document}\n\
                   \\begin{tikzpicture}\n\\draw (0,0) -- (1,1);\n\\end{tikzpicture}\n\
                   \\end{document}";
        let out = extract_pictures(doc);
        assert!(out.starts_with("\\begin{tikzpicture}"));
        assert!(out.ends_with("\\end{tikzpicture}"));
        assert!(!out.contains("documentclass"));
    }

    #[test]
    fn concatenates_multiple_environments() {
        let doc = "\\begin{tikzpicture}a\\end{tikzpicture}text\
                   \\begin{tikzpicture}b\\end{tikzpicture}";
        let out = extract_pictures(doc);
        assert_eq!(
            out,
            "\\begin{tikzpicture}a\\end{tikzpicture}\n\\begin{tikzpicture}b\\end{tikzpicture}"
        );
    }

    #[test]
    fn bare_fragment_passes_through() {
        let frag = "\\draw (0,0) -- (1,1);";
        assert_eq!(extract_pictures(frag), frag);
    }

    #[test]
    fn normalize_drops_blank_lines_and_trims() {
        let out = normalize_whitespace("  a  \n\n\t\n  b");
        assert_eq!(out, "a\nb");
    }

    #[test]
    fn full_pipeline() {
        let src = "\\begin{tikzpicture} % picture\n\n  \\draw (0,0) -- (1,1);\n\\end{tikzpicture}";
        let out = preprocess(src);
        assert_eq!(
            out,
            "\\begin{tikzpicture}\n\\draw (0,0) -- (1,1);\n\\end{tikzpicture}"
        );
    }
}
