//! Hand-rolled single-pass template parser.
//!
//! A simple regex substitution would work for a flat `{key}`/`{key:fmt}`
//! grammar, but this grammar nests capture hints, alignment and format
//! inside one placeholder and must run on every cache-miss on the hot
//! path, so it is a character-array walker that builds a `Vec<Token>` in
//! one pass without backtracking.

use super::token::{is_valid_property_name, CaptureHint, Token};

/// A non-fatal parse anomaly, reported to self-log by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseWarning {
    /// A `{` was never closed; the rest of the template was kept as text.
    UnclosedBrace { at: usize },
    /// Text inside `{}` was not a valid property name; it was kept as
    /// literal text instead of becoming a placeholder.
    InvalidPropertyName { raw: String, at: usize },
}

/// Tokenize `raw` into a `Vec<Token>`. Always succeeds (lenient mode):
/// anomalies are reported via the returned warnings, not by failing.
pub fn tokenize(raw: &str) -> (Vec<Token>, Vec<ParseWarning>) {
    let chars: Vec<char> = raw.chars().collect();
    let mut tokens = Vec::new();
    let mut warnings = Vec::new();
    let mut text = String::new();
    let mut i = 0usize;
    let n = chars.len();

    while i < n {
        let c = chars[i];
        if c == '{' {
            // Doubled-brace forms: escape ("{{...", no leading dot) or the
            // alternate Go-template placeholder ("{{.Name[:format]}}").
            if i + 1 < n && chars[i + 1] == '{' {
                if i + 2 < n && chars[i + 2] == '.' {
                    match read_go_placeholder(&chars, i) {
                        Some((token, next_i)) => {
                            flush_text(&mut tokens, &mut text);
                            tokens.push(token);
                            i = next_i;
                            continue;
                        }
                        None => {
                            warnings.push(ParseWarning::UnclosedBrace { at: i });
                            // Best effort: keep the rest as literal text.
                            for &ch in &chars[i..] {
                                text.push(ch);
                            }
                            i = n;
                            continue;
                        }
                    }
                }
                text.push('{');
                i += 2;
                continue;
            }
            // Single-brace placeholder.
            let start = i;
            match read_until_close(&chars, i + 1) {
                Some((body, next_i)) => match parse_placeholder(&body) {
                    Some(token) => {
                        flush_text(&mut tokens, &mut text);
                        tokens.push(token);
                        i = next_i;
                    }
                    None => {
                        warnings.push(ParseWarning::InvalidPropertyName {
                            raw: body.clone(),
                            at: start,
                        });
                        text.push('{');
                        text.push_str(&body);
                        text.push('}');
                        i = next_i;
                    }
                },
                None => {
                    warnings.push(ParseWarning::UnclosedBrace { at: start });
                    for &ch in &chars[start..] {
                        text.push(ch);
                    }
                    i = n;
                }
            }
        } else if c == '}' {
            if i + 1 < n && chars[i + 1] == '}' {
                text.push('}');
                i += 2;
            } else {
                // A stray `}` with no opener renders literally.
                text.push('}');
                i += 1;
            }
        } else {
            text.push(c);
            i += 1;
        }
    }
    flush_text(&mut tokens, &mut text);
    (tokens, warnings)
}

fn flush_text(tokens: &mut Vec<Token>, text: &mut String) {
    if !text.is_empty() {
        tokens.push(Token::text(std::mem::take(text)));
    }
}

/// Reads characters from `start` up to (and consuming) the closing `}`.
/// Returns `(body, index_after_close_brace)`, or `None` on unclosed input.
fn read_until_close(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut body = String::new();
    let mut i = start;
    while i < chars.len() {
        if chars[i] == '}' {
            return Some((body, i + 1));
        }
        body.push(chars[i]);
        i += 1;
    }
    None
}

/// Reads a `{{.Name[:format]}}` placeholder starting at the first `{` of
/// `chars[start..]`. Returns `(token, index_after_closing_}})`.
fn read_go_placeholder(chars: &[char], start: usize) -> Option<(Token, usize)> {
    // chars[start] == '{', chars[start+1] == '{', chars[start+2] == '.'
    let body_start = start + 3;
    let mut i = body_start;
    while i + 1 < chars.len() {
        if chars[i] == '}' && chars[i + 1] == '}' {
            let body: String = chars[body_start..i].iter().collect();
            let (name, format) = match body.split_once(':') {
                Some((n, f)) => (n, Some(f.to_string())),
                None => (body.as_str(), None),
            };
            if !is_valid_property_name(name) {
                return None;
            }
            return Some((
                Token::Property {
                    name: name.to_string(),
                    capture: CaptureHint::Default,
                    format,
                    align: None,
                },
                i + 2,
            ));
        }
        i += 1;
    }
    None
}

/// Parses one placeholder body (the text between `{` and `}`, exclusive)
/// into a `Property` token, or `None` if the name portion is invalid.
fn parse_placeholder(body: &str) -> Option<Token> {
    let (hint, rest) = match body.as_bytes().first() {
        Some(b'@') => (CaptureHint::Capture, &body[1..]),
        Some(b'$') => (CaptureHint::Scalar, &body[1..]),
        _ => (CaptureHint::Default, body),
    };

    // Split off an optional `:format` suffix first (format may contain `,`).
    let (name_and_align, format) = match rest.split_once(':') {
        Some((left, fmt)) => (left, Some(fmt.to_string())),
        None => (rest, None),
    };

    let (name, align) = match name_and_align.split_once(',') {
        Some((left, align_str)) => {
            let align_str = align_str.trim();
            match align_str.parse::<i32>() {
                Ok(a) => (left, Some(a)),
                Err(_) => return None,
            }
        }
        None => (name_and_align, None),
    };

    let name = name.trim();
    if !is_valid_property_name(name) {
        return None;
    }

    Some(Token::Property {
        name: name.to_string(),
        capture: hint,
        format,
        align,
    })
}
