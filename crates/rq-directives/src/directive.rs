//! Directive model: classification, object ids, payload shapes.

use std::ops::Range;

use serde_json::{Map, Value};

use crate::codec::DecodeError;

/// Type name of the document info directive.
pub const DOCUMENT_INFO: &str = "#document_info";

/// Type name of the built-in pragma directive.
pub const PRAGMA: &str = "#pragma";

/// Schema name under which shortform directives are validated.
pub const SHORTFORM: &str = "#shortform";

/// Classification of a decoded directive payload, resolved once at scan
/// time so downstream code never re-inspects raw keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DirectiveKind {
    /// One requirement entry, identified by an `"id"` field.
    Shortform,
    /// A typed directive; the single `#`-prefixed key names the type.
    Extended(String),
}

impl DirectiveKind {
    /// Classify a payload object.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Shape`] when the object has neither an `"id"`
    /// field nor exactly one `#`-prefixed key.
    pub fn classify(payload: &Map<String, Value>) -> Result<Self, DecodeError> {
        if payload.contains_key("id") {
            return Ok(Self::Shortform);
        }
        if payload.len() == 1 {
            if let Some(key) = payload.keys().next() {
                if key.starts_with('#') {
                    return Ok(Self::Extended(key.clone()));
                }
            }
        }
        Err(DecodeError::Shape {
            json: Value::Object(payload.clone()).to_string(),
        })
    }

    /// Whether this is the shortform classification.
    #[must_use]
    pub fn is_shortform(&self) -> bool {
        matches!(self, Self::Shortform)
    }

    /// Whether this is the document info directive type.
    #[must_use]
    pub fn is_document_info(&self) -> bool {
        matches!(self, Self::Extended(name) if name == DOCUMENT_INFO)
    }

    /// The name this directive is validated under: the extended type name,
    /// or `#shortform` for shortform directives.
    #[must_use]
    pub fn schema_name(&self) -> &str {
        match self {
            Self::Shortform => SHORTFORM,
            Self::Extended(name) => name,
        }
    }
}

/// A directive reconstructed from the block stream.
///
/// `blocks` indexes into the stream the directive was scanned from and is
/// invalidated by any structural mutation of that stream.
#[derive(Clone, Debug)]
pub struct Directive {
    /// Contiguous block range the directive was captured from.
    pub blocks: Range<usize>,
    /// Classification, resolved at scan time.
    pub kind: DirectiveKind,
    /// Decoded payload; key insertion order is preserved.
    pub payload: Map<String, Value>,
}

/// Wrap a shortform payload in its explicit extended form:
/// `{"#shortform": payload}`.
#[must_use]
pub fn expand_shortform(payload: Map<String, Value>) -> Map<String, Value> {
    let mut wrapped = Map::new();
    wrapped.insert(SHORTFORM.to_owned(), Value::Object(payload));
    wrapped
}

/// Suffix of an object id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdSuffix {
    /// The literal `?`: not yet numerically assigned.
    Placeholder,
    /// A decimal numeral.
    Number(u64),
    /// Anything else (flagged by validation).
    Other(String),
}

impl IdSuffix {
    /// Whether this is the `?` placeholder.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }
}

/// An object id split into its prefix (which keeps its trailing `-`) and
/// suffix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectId {
    /// Leading portion, ending in `-`.
    pub prefix: String,
    /// Trailing portion after the last `-`.
    pub suffix: IdSuffix,
}

impl ObjectId {
    /// Split an id string at its last `-`.
    ///
    /// Ids without a `-` get the degenerate prefix `"-"`; validation
    /// rejects them because no declared prefix can match.
    #[must_use]
    pub fn parse(id: &str) -> Self {
        let (prefix, suffix) = match id.rsplit_once('-') {
            Some((head, tail)) => (format!("{head}-"), tail),
            None => ("-".to_owned(), id),
        };
        let suffix = if suffix == "?" {
            IdSuffix::Placeholder
        } else if let Ok(number) = suffix.parse::<u64>() {
            IdSuffix::Number(number)
        } else {
            IdSuffix::Other(suffix.to_owned())
        };
        Self { prefix, suffix }
    }
}
