//! The token model produced by the template parser.

/// How a bound argument should be captured when it reaches the pipeline's
/// capture stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureHint {
    /// No hint: scalars pass through, complex values fall back to the
    /// sink's default (this crate: `Opaque(stringified)`).
    Default,
    /// `@name` — force deep structural capture.
    Capture,
    /// `$name` — force scalar stringification regardless of structure.
    Scalar,
    /// Reserved for a future `Stringify`-only-on-sink-request mode; kept
    /// distinct from `Scalar` in the type so a future binding-site syntax
    /// doesn't need to renumber the enum. Unused by the parser today.
    Stringify,
}

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Text(String),
    Property {
        name: String,
        capture: CaptureHint,
        format: Option<String>,
        /// `> 0` right-justifies (padding goes before the content), `< 0`
        /// left-justifies (padding goes after); magnitude is the target
        /// width. A field narrower than its content is left unpadded.
        align: Option<i32>,
    },
}

impl Token {
    pub fn text<S: Into<String>>(s: S) -> Token {
        Token::Text(s.into())
    }

    pub fn property(name: impl Into<String>) -> Token {
        Token::Property {
            name: name.into(),
            capture: CaptureHint::Default,
            format: None,
            align: None,
        }
    }

    pub fn is_property(&self) -> bool {
        matches!(self, Token::Property { .. })
    }

    pub fn property_name(&self) -> Option<&str> {
        match self {
            Token::Property { name, .. } => Some(name.as_str()),
            Token::Text(_) => None,
        }
    }
}

/// Validates a property name: starts with a letter or `_`; continues
/// with letters/digits/`_`/`-`/`.`; or is a pure non-negative integer index.
pub fn is_valid_property_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    if name.bytes().all(|b| b.is_ascii_digit()) {
        return true;
    }
    let mut chars = name.chars();
    let first = chars.next().unwrap();
    if !(first.is_alphabetic() || first == '_') {
        return false;
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
