//! Pre-parse macro expansion for `\def` and `\newcommand`
//!
//! Runs on the preprocessed text, before the grammar sees it. Definitions
//! are removed from the text and stored; every later reference is replaced
//! textually. Expansion repeats until the text stops changing or the depth
//! cap is hit, so mutually recursive macros cannot loop forever.

use std::collections::HashMap;

use crate::log::debug;

const MAX_EXPANSION_DEPTH: usize = 20;

/// A stored macro definition
#[derive(Debug, Clone)]
struct StoredMacro {
    params: usize,
    body: String,
}

/// Textual macro expander for `\def\name{body}` and
/// `\newcommand{\name}[n]{body}`.
#[derive(Debug, Default)]
pub struct MacroExpander {
    macros: HashMap<String, StoredMacro>,
}

impl MacroExpander {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition directly, bypassing text extraction.
    pub fn define(&mut self, name: impl Into<String>, body: impl Into<String>, params: usize) {
        self.macros.insert(
            name.into(),
            StoredMacro {
                params,
                body: body.into(),
            },
        );
    }

    /// Strip definitions out of `text`, stash them, then expand every
    /// reference. Unknown `\commands` are left untouched for the parser.
    pub fn extract_and_expand(&mut self, text: &str) -> String {
        let text = self.extract_definitions(text);
        self.expand_all(&text, 0)
    }

    /// Remove `\def` and `\newcommand` statements from the text, recording
    /// each definition.
    pub fn extract_definitions(&mut self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(pos) = rest.find('\\') {
            let (before, tail) = rest.split_at(pos);
            out.push_str(before);

            if let Some((name, params, body, consumed)) = parse_def(tail) {
                debug!(%name, params, "extracted macro definition");
                self.macros.insert(name, StoredMacro { params, body });
                rest = &tail[consumed..];
            } else if let Some((name, params, body, consumed)) = parse_newcommand(tail) {
                debug!(%name, params, "extracted macro definition");
                self.macros.insert(name, StoredMacro { params, body });
                rest = &tail[consumed..];
            } else {
                out.push('\\');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }

    /// Replace macro references until a fixed point (or the depth cap).
    fn expand_all(&self, text: &str, depth: usize) -> String {
        if depth >= MAX_EXPANSION_DEPTH {
            return text.to_string();
        }

        let mut result = self.expand_once(text);
        if result != text {
            result = self.expand_all(&result, depth + 1);
        }
        result
    }

    fn expand_once(&self, text: &str) -> String {
        let mut current = text.to_string();
        for (name, mac) in &self.macros {
            current = if mac.params == 0 {
                expand_simple(&current, name, &mac.body)
            } else {
                expand_parametric(&current, name, mac.params, &mac.body)
            };
        }
        current
    }
}

/// Replace `\name` with `body` wherever it is not followed by an argument
/// list or a longer identifier (`\pt` must not fire inside `\ptlabel`).
fn expand_simple(text: &str, name: &str, body: &str) -> String {
    let needle = format!("\\{name}");
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(&needle) {
        let after = &rest[pos + needle.len()..];
        let next = after.chars().next();
        let boundary = !matches!(next, Some(c) if c.is_ascii_alphanumeric() || c == '{' || c == '[');
        out.push_str(&rest[..pos]);
        if boundary {
            out.push_str(body);
            rest = after;
        } else {
            out.push_str(&needle);
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

/// Replace `\name{a}{b}...` with the body after substituting `#1`, `#2`, ...
fn expand_parametric(text: &str, name: &str, params: usize, body: &str) -> String {
    let needle = format!("\\{name}");
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    'outer: while let Some(pos) = rest.find(&needle) {
        let after = &rest[pos + needle.len()..];

        // Longer identifiers starting with the same letters are not calls.
        if matches!(after.chars().next(), Some(c) if c.is_ascii_alphanumeric()) {
            out.push_str(&rest[..pos + needle.len()]);
            rest = after;
            continue;
        }

        let mut args = Vec::with_capacity(params);
        let mut cursor = after;
        for _ in 0..params {
            match braced_group(cursor) {
                Some((arg, consumed)) => {
                    args.push(arg);
                    cursor = &cursor[consumed..];
                }
                None => {
                    // Not enough arguments: leave the reference alone.
                    out.push_str(&rest[..pos + needle.len()]);
                    rest = after;
                    continue 'outer;
                }
            }
        }

        let mut expanded = body.to_string();
        for (i, arg) in args.iter().enumerate() {
            expanded = expanded.replace(&format!("#{}", i + 1), arg);
        }
        out.push_str(&rest[..pos]);
        out.push_str(&expanded);
        rest = cursor;
    }
    out.push_str(rest);
    out
}

/// Parse `\def\name{body}` at the start of `tail`. Returns the definition
/// and how many bytes were consumed.
fn parse_def(tail: &str) -> Option<(String, usize, String, usize)> {
    let rest = tail.strip_prefix("\\def\\")?;
    let name_len = ident_len(rest);
    if name_len == 0 {
        return None;
    }
    let name = &rest[..name_len];
    let (body, body_consumed) = braced_group(&rest[name_len..])?;
    Some((
        name.to_string(),
        0,
        body,
        "\\def\\".len() + name_len + body_consumed,
    ))
}

/// Parse `\newcommand{\name}[n]{body}` or `\newcommand{\name}{body}`.
fn parse_newcommand(tail: &str) -> Option<(String, usize, String, usize)> {
    let rest = tail.strip_prefix("\\newcommand")?;
    let mut consumed = "\\newcommand".len();

    let (name_group, group_len) = braced_group(rest)?;
    let name = name_group.strip_prefix('\\')?;
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    consumed += group_len;
    let mut rest = &rest[group_len..];

    let mut params = 0usize;
    if let Some(after_bracket) = rest.strip_prefix('[') {
        let close = after_bracket.find(']')?;
        params = after_bracket[..close].trim().parse().ok()?;
        consumed += 1 + close + 1;
        rest = &after_bracket[close + 1..];
    }

    let (body, body_consumed) = braced_group(rest)?;
    consumed += body_consumed;
    Some((name.to_string(), params, body, consumed))
}

/// Match a balanced `{...}` group at the start of `s`. Returns the inner
/// text and total bytes consumed including both braces.
fn braced_group(s: &str) -> Option<(String, usize)> {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, '{')) => {}
        _ => return None,
    }
    let mut depth = 1usize;
    for (i, c) in chars {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((s[1..i].to_string(), i + 1));
                }
            }
            _ => {}
        }
    }
    None
}

fn ident_len(s: &str) -> usize {
    s.chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .map(char::len_utf8)
        .sum()
}
