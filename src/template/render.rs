//! Rendering: substitutes each placeholder with its formatted value,
//! applying format then alignment. Missing placeholders
//! render as `{Name}` literally.

use std::collections::BTreeMap;

use crate::value::Value;

use super::token::{CaptureHint, Token};

/// Render `tokens` against `props`, producing the final message string.
pub fn render(tokens: &[Token], props: &BTreeMap<String, Value>) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Text(text) => out.push_str(text),
            Token::Property {
                name,
                format,
                align,
                ..
            } => match props.get(name) {
                Some(value) => {
                    let formatted = format_value(value, format.as_deref());
                    out.push_str(&apply_alignment(&formatted, *align));
                }
                None => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            },
        }
    }
    out
}

/// Render one token's contribution in isolation, used by the
/// `render(T, P) == concat(render(token, P))` invariant test.
pub fn render_token(token: &Token, props: &BTreeMap<String, Value>) -> String {
    render(std::slice::from_ref(token), props)
}

/// Positive alignment right-justifies (pads with spaces on the left) to
/// `align` characters wide; negative alignment left-justifies (pads on the
/// right) to `|align|` characters. A `None` alignment is a no-op.
fn apply_alignment(content: &str, align: Option<i32>) -> String {
    let Some(align) = align else {
        return content.to_string();
    };
    let width = align.unsigned_abs() as usize;
    let len = content.chars().count();
    if len >= width {
        return content.to_string();
    }
    let pad = " ".repeat(width - len);
    if align > 0 {
        format!("{pad}{content}")
    } else {
        format!("{content}{pad}")
    }
}

fn format_value(value: &Value, format: Option<&str>) -> String {
    match value {
        Value::Int64(_) | Value::UInt64(_) => format_integer(value, format),
        Value::Float64(f) => format_float(*f, format),
        Value::Timestamp(ts) => format_time(*ts, format),
        Value::String(s) => format_string(s, format, value),
        _ => match format {
            Some("j") => value.to_json().to_string(),
            _ => value.to_display_string(),
        },
    }
}

fn format_integer(value: &Value, format: Option<&str>) -> String {
    let as_i64 = match value {
        Value::Int64(i) => *i,
        Value::UInt64(u) => *u as i64,
        _ => unreachable!(),
    };
    match format {
        Some(fmt) if !fmt.is_empty() && fmt.bytes().all(|b| b == b'0') => {
            let width = fmt.len();
            if as_i64 < 0 {
                format!("-{:0width$}", -as_i64, width = width.saturating_sub(1))
            } else {
                format!("{as_i64:0width$}")
            }
        }
        Some("x") => format!("{as_i64:x}"),
        Some("X") => format!("{as_i64:X}"),
        _ => as_i64.to_string(),
    }
}

fn format_float(f: f64, format: Option<&str>) -> String {
    match format {
        Some(fmt) if fmt.starts_with('F') || fmt.starts_with('f') => {
            let n = fmt[1..].parse::<usize>().unwrap_or(2);
            format!("{f:.n$}")
        }
        Some(fmt) if fmt.starts_with('E') || fmt.starts_with('e') => {
            let n = fmt[1..].parse::<usize>().unwrap_or(6);
            format!("{f:.n$e}")
        }
        Some(fmt) if fmt.starts_with('G') || fmt.starts_with('g') => {
            let n = fmt[1..].parse::<usize>().unwrap_or(15).max(1);
            format_general(f, n)
        }
        Some(fmt) if fmt.starts_with('P') || fmt.starts_with('p') => {
            let n = fmt[1..].parse::<usize>().unwrap_or(2);
            format!("{:.n$}%", f * 100.0)
        }
        _ => format!("{f}"),
    }
}

/// `G<n>`: shortest representation carrying `n` significant digits, with
/// trailing fractional zeros trimmed (but never the point itself left
/// dangling, e.g. "20" not "20.").
fn format_general(f: f64, sig_digits: usize) -> String {
    if f == 0.0 {
        return "0".to_string();
    }
    let magnitude = f.abs().log10().floor() as i32;
    let decimals = (sig_digits as i32 - 1 - magnitude).max(0) as usize;
    let s = format!("{f:.decimals$}");
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0');
        let trimmed = trimmed.trim_end_matches('.');
        trimmed.to_string()
    } else {
        s
    }
}

fn format_string(s: &str, format: Option<&str>, value: &Value) -> String {
    match format {
        Some("q") => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        Some("j") => value.to_json().to_string(),
        _ => s.to_string(), // "l" (literal) and the unhinted default are identical.
    }
}

/// .NET-style time tokens mapped onto `chrono` strftime specifiers.
/// Absence of a format defaults to RFC-3339 (handled by the caller).
fn format_time(ts: chrono::DateTime<chrono::Utc>, format: Option<&str>) -> String {
    let Some(pattern) = format else {
        return ts.to_rfc3339();
    };
    let chrono_pattern = convert_net_time_pattern(pattern);
    ts.format(&chrono_pattern).to_string()
}

/// Longest-token-first replacement so, e.g., `yyyy` is matched before a
/// bare `y` would be (not itself supported, but keeps the algorithm
/// deterministic and easy to extend).
fn convert_net_time_pattern(pattern: &str) -> String {
    let mut out = String::new();
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if let Some((token, len)) = match_token(&chars[i..]) {
            out.push_str(token);
            i += len;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

fn match_token(rest: &[char]) -> Option<(&'static str, usize)> {
    const TOKENS: &[(&str, &str)] = &[
        ("yyyy", "%Y"),
        ("yy", "%y"),
        ("MM", "%m"),
        ("dd", "%d"),
        ("HH", "%H"),
        ("mm", "%M"),
        ("ss", "%S"),
        ("tt", "%p"),
    ];
    for (net, chrono) in TOKENS {
        let net_chars: Vec<char> = net.chars().collect();
        if rest.len() >= net_chars.len() && rest[..net_chars.len()] == net_chars[..] {
            return Some((chrono, net_chars.len()));
        }
    }
    // Runs of `f` map to fractional-second digits; chrono has exact
    // specifiers for 3/6/9 digits and a variable-width fallback otherwise.
    if rest[0] == 'f' {
        let run = rest.iter().take_while(|&&c| c == 'f').count();
        let chrono = match run {
            3 => "%3f",
            6 => "%6f",
            9 => "%9f",
            _ => "%f",
        };
        return Some((chrono, run));
    }
    None
}

/// `$`-hinted or default stringification applied at capture time, kept
/// here since it shares `to_display_string`'s rules with rendering.
pub fn stringify(value: &Value) -> String {
    value.to_display_string()
}

/// The `@` hint forces deep capture regardless of value shape (handled by
/// `capture::destructure`); this helper only tells the pipeline whether a
/// token requested it.
pub fn wants_capture(token: &Token) -> bool {
    matches!(
        token,
        Token::Property {
            capture: CaptureHint::Capture,
            ..
        }
    )
}

pub fn wants_scalar(token: &Token) -> bool {
    matches!(
        token,
        Token::Property {
            capture: CaptureHint::Scalar,
            ..
        }
    )
}
