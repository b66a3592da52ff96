//! Scanner and interpolator for placeholders embedded in `str` attribute text.
//!
//! Text is a run of literal characters and brace-delimited fields:
//! - `{key}` substitutes the value supplied for `key`
//! - `{key:spec}` formats it first (`s`, `d`, `f`, `e`, `.Nf`, `.Ne`)
//! - `{{` and `}}` stand for literal braces
//!
//! Attribute access, indexing, conversions and positional fields are
//! rejected rather than silently passed through.

use std::fmt;

use thiserror::Error;

use crate::model::value::float_repr;
use crate::model::Substitution;

/// Precision used by `f` and `e` when none is given.
pub const DEFAULT_PRECISION: usize = 6;

/// A literal text run optionally followed by a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub literal: String,
    pub field: Option<Field>,
}

impl Token {
    /// A token holding only literal text.
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            literal: text.into(),
            field: None,
        }
    }
}

/// A named field within template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub spec: FormatSpec,
}

/// How a substituted value is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSpec {
    /// Plain stringification.
    Default,
    /// `s`: strings only.
    Str,
    /// `d`: integers only.
    Decimal,
    /// `f` / `.Nf`: fixed point.
    Fixed(usize),
    /// `e` / `.Ne`: scientific notation.
    Exponent(usize),
}

impl fmt::Display for FormatSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatSpec::Default => Ok(()),
            FormatSpec::Str => f.write_str("s"),
            FormatSpec::Decimal => f.write_str("d"),
            FormatSpec::Fixed(p) => write!(f, ".{}f", p),
            FormatSpec::Exponent(p) => write!(f, ".{}e", p),
        }
    }
}

/// Malformed placeholder text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("single '{{' at position {position} is not closed")]
    UnmatchedOpen { position: usize },

    #[error("single '}}' at position {position} has no opening brace")]
    UnmatchedClose { position: usize },

    #[error("field at position {position} has no name")]
    EmptyField { position: usize },

    #[error("field '{name}' is positional; only named fields are supported")]
    Positional { name: String },

    #[error("field '{name}' uses attribute or index access")]
    FieldAccess { name: String },

    #[error("field '{name}' uses a conversion")]
    Conversion { name: String },

    #[error("field '{name}' has unsupported format specification '{spec}'")]
    UnsupportedFormat { name: String, spec: String },

    #[error("field at position {position} contains a nested field")]
    NestedField { position: usize },
}

/// A value that does not suit a field's format specification.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("value {value:?} cannot be formatted with '{spec}'")]
pub struct FormatError {
    pub value: Substitution,
    pub spec: FormatSpec,
}

/// A field that could not be interpolated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpolationError {
    #[error("no value for '{key}'")]
    Missing { key: String },

    #[error("'{key}': {error}")]
    Format {
        key: String,
        #[source]
        error: FormatError,
    },
}

impl InterpolationError {
    pub fn key(&self) -> &str {
        match self {
            InterpolationError::Missing { key } | InterpolationError::Format { key, .. } => key,
        }
    }
}

// =============================================================================
// SCANNING
// =============================================================================

/// Splits text into literal runs and fields.
///
/// Empty text yields no tokens. Trailing literal text yields a final token
/// without a field.
pub fn scan(text: &str) -> Result<Vec<Token>, ScanError> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = text.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    literal.push('{');
                    continue;
                }
                let mut body = String::new();
                let mut closed = false;
                for (_, n) in chars.by_ref() {
                    match n {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => return Err(ScanError::NestedField { position }),
                        _ => body.push(n),
                    }
                }
                if !closed {
                    return Err(ScanError::UnmatchedOpen { position });
                }
                let field = parse_field(&body, position)?;
                tokens.push(Token {
                    literal: std::mem::take(&mut literal),
                    field: Some(field),
                });
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    literal.push('}');
                } else {
                    return Err(ScanError::UnmatchedClose { position });
                }
            }
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() {
        tokens.push(Token::literal(literal));
    }
    Ok(tokens)
}

fn parse_field(body: &str, position: usize) -> Result<Field, ScanError> {
    let split = body.find(|c: char| c == '!' || c == ':');
    let (name, rest) = match split {
        Some(i) => (&body[..i], Some(&body[i..])),
        None => (body, None),
    };

    if name.is_empty() {
        return Err(ScanError::EmptyField { position });
    }
    if name.contains('.') || name.contains('[') {
        return Err(ScanError::FieldAccess {
            name: name.to_string(),
        });
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(ScanError::Positional {
            name: name.to_string(),
        });
    }

    let spec = match rest {
        None => FormatSpec::Default,
        Some(r) if r.starts_with('!') => {
            return Err(ScanError::Conversion {
                name: name.to_string(),
            })
        }
        Some(r) => parse_spec(&r[1..]).ok_or_else(|| ScanError::UnsupportedFormat {
            name: name.to_string(),
            spec: r[1..].to_string(),
        })?,
    };

    Ok(Field {
        name: name.to_string(),
        spec,
    })
}

fn parse_spec(spec: &str) -> Option<FormatSpec> {
    match spec {
        "" => return Some(FormatSpec::Default),
        "s" => return Some(FormatSpec::Str),
        "d" => return Some(FormatSpec::Decimal),
        "f" => return Some(FormatSpec::Fixed(DEFAULT_PRECISION)),
        "e" => return Some(FormatSpec::Exponent(DEFAULT_PRECISION)),
        _ => {}
    }

    let rest = spec.strip_prefix('.')?;
    let kind = rest.chars().last()?;
    let digits = &rest[..rest.len() - kind.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let precision = digits.parse().ok()?;
    match kind {
        'f' => Some(FormatSpec::Fixed(precision)),
        'e' => Some(FormatSpec::Exponent(precision)),
        _ => None,
    }
}

/// Names of the fields in scanned text, in order, with repeats.
pub fn field_names(tokens: &[Token]) -> impl Iterator<Item = &str> {
    tokens
        .iter()
        .filter_map(|t| t.field.as_ref().map(|f| f.name.as_str()))
}

// =============================================================================
// FORMATTING
// =============================================================================

/// Renders a substitution value according to a format specification.
///
/// Numeric specifications parse string values first.
pub fn format_value(value: &Substitution, spec: FormatSpec) -> Result<String, FormatError> {
    let fail = || FormatError {
        value: value.clone(),
        spec,
    };

    match spec {
        FormatSpec::Default => Ok(value.to_text()),
        FormatSpec::Str => match value {
            Substitution::Str(s) => Ok(s.clone()),
            _ => Err(fail()),
        },
        FormatSpec::Decimal => match value {
            Substitution::Int(v) => Ok(v.to_string()),
            Substitution::Str(s) => s
                .trim()
                .parse::<i64>()
                .map(|v| v.to_string())
                .map_err(|_| fail()),
            Substitution::Float(_) => Err(fail()),
        },
        FormatSpec::Fixed(precision) => {
            let v = as_float(value).ok_or_else(fail)?;
            if !v.is_finite() {
                return Ok(float_repr(v));
            }
            Ok(format!("{:.*}", precision, v))
        }
        FormatSpec::Exponent(precision) => {
            let v = as_float(value).ok_or_else(fail)?;
            if !v.is_finite() {
                return Ok(float_repr(v));
            }
            Ok(exponent_notation(v, precision))
        }
    }
}

fn as_float(value: &Substitution) -> Option<f64> {
    match value {
        Substitution::Int(v) => Some(*v as f64),
        Substitution::Float(v) => Some(*v),
        Substitution::Str(s) => s.trim().parse().ok(),
    }
}

/// Scientific notation with a signed exponent of at least two digits.
fn exponent_notation(v: f64, precision: usize) -> String {
    let s = format!("{:.*e}", precision, v);
    match s.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(d) => ('-', d),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => s,
    }
}

// =============================================================================
// INTERPOLATION
// =============================================================================

/// Replaces every field with its formatted value.
///
/// All failing fields are reported, not just the first.
pub fn interpolate<'s, F>(tokens: &[Token], lookup: F) -> Result<String, Vec<InterpolationError>>
where
    F: Fn(&str) -> Option<&'s Substitution>,
{
    let mut out = String::new();
    let mut errors = Vec::new();

    for token in tokens {
        out.push_str(&token.literal);
        let Some(field) = &token.field else {
            continue;
        };
        match lookup(&field.name) {
            None => errors.push(InterpolationError::Missing {
                key: field.name.clone(),
            }),
            Some(value) => match format_value(value, field.spec) {
                Ok(text) => out.push_str(&text),
                Err(error) => errors.push(InterpolationError::Format {
                    key: field.name.clone(),
                    error,
                }),
            },
        }
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(errors)
    }
}
