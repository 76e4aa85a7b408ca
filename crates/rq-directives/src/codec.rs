//! Directive sentinel syntax and JSON rendering.
//!
//! A serialized directive is always `${<json-object-body>}$`: a JSON object
//! literal whose enclosing braces are supplied by the sentinel characters.
//! Decoding preserves key insertion order (`serde_json` with
//! `preserve_order`), so a decode → re-encode round-trip leaves untouched
//! fields byte-identical.

use serde_json::{Map, Value};

/// Opening sentinel of a serialized directive.
pub const OPEN: &str = "${";

/// Closing sentinel of a serialized directive.
pub const CLOSE: &str = "}$";

/// Fatal decode failures. Any of these aborts the operation that was
/// scanning the document; nothing is written back.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The captured span does not contain both sentinels.
    #[error("expected directive text to contain \"${{\" and \"}}$\"")]
    MissingSentinel,

    /// The directive body is not valid JSON.
    #[error("could not decode directive: {message}\n   JSON being parsed: {json}")]
    Json {
        /// Decoder message including line/column position.
        message: String,
        /// The text that failed to parse.
        json: String,
    },

    /// The directive body parsed but is not a JSON object.
    #[error("expected directive body to be a JSON object: {json}")]
    NotAnObject {
        /// The offending body.
        json: String,
    },

    /// The object is neither shortform (an `"id"` key) nor extended
    /// (exactly one `#`-prefixed key).
    #[error("directive must carry an \"id\" field or a single \"#\"-prefixed key: {json}")]
    Shape {
        /// The offending object, serialized.
        json: String,
    },
}

/// Extract the JSON object text from a span of the form
/// `<junk>${<body>}$<junk>`, re-wrapping the body in braces.
///
/// # Errors
///
/// Returns [`DecodeError::MissingSentinel`] if either sentinel is absent.
pub fn extract_json(text: &str) -> Result<String, DecodeError> {
    let Some((_, tail)) = text.split_once(OPEN) else {
        return Err(DecodeError::MissingSentinel);
    };
    let Some((body, _)) = tail.split_once(CLOSE) else {
        return Err(DecodeError::MissingSentinel);
    };
    Ok(format!("{{{body}}}"))
}

/// Normalize typographic double quotes to ASCII double quotes.
///
/// Word processors routinely auto-substitute `“` and `”` while a directive
/// is being edited; both must decode as JSON string delimiters.
#[must_use]
pub fn normalize_quotes(text: &str) -> String {
    text.replace('\u{201c}', "\"").replace('\u{201d}', "\"")
}

/// Decode a captured directive span into its payload object.
///
/// # Errors
///
/// Fails if the sentinels are missing, the body is not valid JSON, or the
/// body is not a JSON object.
pub fn decode(text: &str) -> Result<Map<String, Value>, DecodeError> {
    let json = extract_json(&normalize_quotes(text))?;
    let value: Value = serde_json::from_str(&json).map_err(|err| DecodeError::Json {
        message: err.to_string(),
        json: json.clone(),
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(DecodeError::NotAnObject { json }),
    }
}

/// Render a payload with the default format heuristic: single-line when the
/// payload has at most one entry and that entry's value is not an object.
#[must_use]
pub fn render(payload: &Map<String, Value>) -> String {
    let simple = payload.len() <= 1 && !payload.values().any(Value::is_object);
    render_with(payload, simple)
}

/// Render a payload in an explicitly chosen format.
#[must_use]
pub fn render_with(payload: &Map<String, Value>, simple: bool) -> String {
    let mut body = String::new();
    if simple {
        write_simple(&Value::Object(payload.clone()), &mut body);
        return format!("${body}$");
    }
    write_indented(&Value::Object(payload.clone()), 0, &mut body);
    // Fuse the opening brace line onto the sentinel; the wrap consumes the
    // line break and two of the four indent spaces.
    format!("${body}$").replacen("${\n  ", "${", 1)
}

/// Render a payload with the classification-aware format used by the
/// rewriter.
///
/// Extended payloads always render multi-line. Shortform payloads render
/// single-line unless they carry more than one `satisfies` entry; in the
/// multi-line form the line break between the `"id"` and `"method"` fields
/// is removed for compactness.
#[must_use]
pub fn render_auto(payload: &Map<String, Value>) -> String {
    if !payload.contains_key("id") {
        return render_with(payload, false);
    }
    let multi = matches!(
        payload.get("satisfies"),
        Some(Value::Array(items)) if items.len() > 1
    );
    if !multi {
        return render_with(payload, true);
    }
    render_with(payload, false).replacen(",\n    \"method\"", ", \"method\"", 1)
}

fn scalar(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

fn write_simple(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            out.push('{');
            for (index, (key, item)) in map.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                out.push_str(&scalar(&Value::String(key.clone())));
                out.push(':');
                write_simple(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                write_simple(item, out);
            }
            out.push(']');
        }
        _ => out.push_str(&scalar(value)),
    }
}

fn write_indented(value: &Value, level: usize, out: &mut String) {
    let pad = "    ".repeat(level + 1);
    match value {
        Value::Object(map) if !map.is_empty() => {
            out.push_str("{\n");
            for (index, (key, item)) in map.iter().enumerate() {
                if index > 0 {
                    out.push_str(",\n");
                }
                out.push_str(&pad);
                out.push_str(&scalar(&Value::String(key.clone())));
                out.push(':');
                write_indented(item, level + 1, out);
            }
            out.push('\n');
            out.push_str(&"    ".repeat(level));
            out.push('}');
        }
        Value::Object(_) => out.push_str("{}"),
        Value::Array(items) if !items.is_empty() => {
            out.push_str("[\n");
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push_str(",\n");
                }
                out.push_str(&pad);
                write_indented(item, level + 1, out);
            }
            out.push('\n');
            out.push_str(&"    ".repeat(level));
            out.push(']');
        }
        Value::Array(_) => out.push_str("[]"),
        _ => out.push_str(&scalar(value)),
    }
}
