//! Document check: schema-driven validation with collect-all semantics.
//!
//! A document declares, in its `#document_info` directive, the id prefixes
//! it allocates from and the schemas its directives must satisfy. The
//! [`check`] entry point validates every directive against that
//! declaration plus the built-in `#pragma` schema, verifies id integrity
//! (prefix membership, suffix form, uniqueness, the `next_id` bound), and
//! flags leftover legacy bracketed ids in body text.
//!
//! A single failing directive never stops the run: findings accumulate as
//! [`CheckEvent`]s and the verdict is the conjunction of all checks. Only
//! decode failures (and a missing or structurally invalid
//! `#document_info`) end the run early.

mod legacy;
mod report;
pub mod schema;

pub use legacy::legacy_object_id;
pub use report::{CheckEvent, Reporter, Severity};
pub use schema::SchemaViolation;

use indexmap::IndexMap;
use rq_blocks::{BlockStream, snippet};
use rq_directives::{
    DOCUMENT_INFO, DecodeError, Directive, DirectiveStyles, IdSuffix, ObjectId, PRAGMA, scan,
};
use serde::Deserialize;
use serde_json::{Value, json};

/// Per-prefix usage gathered over one check run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrefixUsage {
    /// Declared next available number.
    pub next_id: u64,
    /// Highest numeric suffix observed in the document, if any.
    pub max: Option<u64>,
    /// Count of placeholder (`?`) ids under this prefix.
    pub unassigned: usize,
}

/// Outcome of a document check.
#[derive(Debug)]
pub struct CheckReport {
    /// Overall verdict: the conjunction of every individual check.
    pub passed: bool,
    /// Structured findings, in the order they were made.
    pub events: Vec<CheckEvent>,
    /// Usage per declared prefix, in declaration order.
    pub prefixes: IndexMap<String, PrefixUsage>,
}

impl CheckReport {
    /// Error-severity messages, for callers that only display failures.
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.events
            .iter()
            .filter(|event| event.severity == Severity::Error)
            .map(|event| event.message.as_str())
    }
}

/// Declared document metadata, deserialized once the payload has passed
/// the fixed `#document_info` schema.
#[derive(Debug, Deserialize)]
struct DocumentInfo {
    object_ids: Vec<ObjectIdDecl>,
    schemas: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ObjectIdDecl {
    prefix: String,
    next_id: u64,
}

/// The fixed schema every `#document_info` payload must satisfy.
fn document_info_schema() -> Value {
    json!({
        "title": "(HEAD)",
        "type": "object",
        "properties": {
            "#document_info": {
                "type": "object",
                "properties": {
                    "object_ids": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "prefix": {"type": "string", "pattern": "^.+-$"},
                                "next_id": {"type": "integer"}
                            },
                            "required": ["prefix", "next_id"],
                            "additionalProperties": false
                        }
                    },
                    "schemas": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": {
                                    "type": "string",
                                    "pattern": "^(#shortform|#section|#requirement)$"
                                }
                            },
                            "required": ["title"]
                        }
                    }
                },
                "required": ["object_ids", "schemas"],
                "additionalProperties": false
            }
        },
        "required": ["#document_info"],
        "additionalProperties": false
    })
}

/// The built-in `#pragma` schema, implicitly declared for every document.
fn pragma_schema() -> Value {
    json!({"title": "#pragma", "type": "string"})
}

/// Check a document for directive compliance and id integrity.
///
/// Returns the collected report; individual failures are events, not
/// errors.
///
/// # Errors
///
/// Only scan failures (malformed JSON or an invalid directive shape) are
/// returned as errors; they make the rest of the document unreadable.
pub fn check(stream: &BlockStream, styles: &DirectiveStyles) -> Result<CheckReport, DecodeError> {
    let mut reporter = Reporter::new();
    let result = scan(stream)?;

    let Some(info) = result.document_info_directive() else {
        reporter.error("expected \"#document_info\" directive not found in document");
        return Ok(finish(reporter, IndexMap::new()));
    };

    check_styles(stream, styles, &mut reporter);

    let info_payload = Value::Object(info.payload.clone());
    let violations = schema::validate(&info_payload, &document_info_schema());
    if !violations.is_empty() {
        for violation in violations {
            reporter.error(format!("\"#document_info\" validation failed {violation}"));
        }
        return Ok(finish(reporter, IndexMap::new()));
    }

    for &index in &result.duplicate_document_info {
        let blocks = &result.directives[index].blocks;
        reporter.error(format!(
            "more than one \"#document_info\" directive (another begins at block {})",
            blocks.start
        ));
    }

    let declared: DocumentInfo = match serde_json::from_value(
        info.payload
            .get(DOCUMENT_INFO)
            .cloned()
            .unwrap_or(Value::Null),
    ) {
        Ok(declared) => declared,
        Err(err) => {
            reporter.error(format!("could not read \"#document_info\" directive: {err}"));
            return Ok(finish(reporter, IndexMap::new()));
        }
    };

    let mut prefixes: IndexMap<String, PrefixUsage> = declared
        .object_ids
        .iter()
        .map(|decl| {
            (
                decl.prefix.clone(),
                PrefixUsage {
                    next_id: decl.next_id,
                    ..PrefixUsage::default()
                },
            )
        })
        .collect();

    let mut schemas: IndexMap<String, Value> = IndexMap::new();
    for schema in declared.schemas {
        let title = schema
            .get("title")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned);
        if let Some(title) = title {
            schemas.insert(title, schema);
        }
    }
    // #pragma is always allowed; its form is fixed here, not declared by
    // the document.
    schemas.insert(PRAGMA.to_owned(), pragma_schema());

    for (prefix, usage) in &prefixes {
        reporter.info(format!(
            "using object id prefix {prefix:?} (next id: {})",
            usage.next_id
        ));
    }
    for title in schemas.keys() {
        reporter.info(format!("using schema {title:?}"));
    }

    let mut all_ids: Vec<String> = Vec::new();

    for directive in &result.directives {
        let name = directive.kind.schema_name();
        if directive.kind.is_document_info() {
            // Already validated against the fixed schema.
        } else if let Some(schema) = schemas.get(name) {
            let target = if directive.kind.is_shortform() {
                Value::Object(directive.payload.clone())
            } else {
                directive.payload.get(name).cloned().unwrap_or(Value::Null)
            };
            let violations = schema::validate(&target, schema);
            if violations.is_empty() {
                if directive.kind.is_shortform() {
                    check_shortform_id(directive, &mut prefixes, &mut all_ids, &mut reporter);
                }
            } else {
                for violation in violations {
                    reporter.error(format!("{name} directive failed validation {violation}"));
                }
            }
        } else {
            reporter.error(format!(
                "unexpected directive {name:?}: a schema must be declared in the \
                 \"#document_info\" directive for each directive type appearing in the document"
            ));
        }

        check_directive_style(stream, directive, styles, &mut reporter);
    }

    for block in stream.blocks() {
        let text = block.text();
        if legacy_object_id(&text, true).is_some() {
            reporter.error(format!(
                "unexpected old-style object id: {text:?}; use directive form"
            ));
        }
    }

    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for id in &all_ids {
        *counts.entry(id.as_str()).or_default() += 1;
    }
    for (id, count) in counts {
        if count > 1 {
            reporter.error(format!("object id {id} appears {count} times"));
        }
    }

    for (prefix, usage) in &prefixes {
        match usage.max {
            Some(max) => {
                reporter.info(format!("max id appearing in document is {prefix}{max}"));
                if usage.unassigned > 0 {
                    reporter.info(format!(
                        "{} unassigned object id(s) of the form {prefix}?",
                        usage.unassigned
                    ));
                }
            }
            None => reporter.info(format!("prefix {prefix:?} does not appear in document")),
        }
    }

    if reporter.passed() {
        reporter.info("check passed");
    }
    Ok(finish(reporter, prefixes))
}

fn finish(reporter: Reporter, prefixes: IndexMap<String, PrefixUsage>) -> CheckReport {
    CheckReport {
        passed: reporter.passed(),
        events: reporter.into_events(),
        prefixes,
    }
}

/// Both directive styles must exist in the document's style catalog.
fn check_styles(stream: &BlockStream, styles: &DirectiveStyles, reporter: &mut Reporter) {
    for required in [&styles.visible, &styles.hidden] {
        if !stream.has_style(required) {
            reporter.error(format!(
                "the required style {required:?} was not found in the document"
            ));
        }
    }
}

fn check_shortform_id(
    directive: &Directive,
    prefixes: &mut IndexMap<String, PrefixUsage>,
    all_ids: &mut Vec<String>,
    reporter: &mut Reporter,
) {
    let Some(id) = directive.payload.get("id").and_then(Value::as_str) else {
        reporter.error("shortform directive \"id\" must be a string");
        return;
    };
    let object_id = ObjectId::parse(id);
    tracing::debug!(
        "found object id {id:?} (prefix {:?})",
        object_id.prefix
    );

    let Some(usage) = prefixes.get_mut(&object_id.prefix) else {
        reporter.error(format!(
            "prefix in object id {id} does not match any declared object id prefix: {:?}",
            prefixes.keys().collect::<Vec<_>>()
        ));
        return;
    };
    match object_id.suffix {
        IdSuffix::Placeholder => usage.unassigned += 1,
        IdSuffix::Other(_) => reporter.error(format!(
            "suffix in object id {id} should be a number or a single \"?\""
        )),
        IdSuffix::Number(number) => {
            usage.max = Some(usage.max.map_or(number, |max| max.max(number)));
            all_ids.push(id.to_owned());
            if number >= usage.next_id {
                reporter.error(format!(
                    "suffix number in object id {id} violates \"next_id\" (should be < {})",
                    usage.next_id
                ));
            }
        }
    }
}

/// Per-directive style conformance: a mismatch is logged as a warning and
/// never affects the verdict.
fn check_directive_style(
    stream: &BlockStream,
    directive: &Directive,
    styles: &DirectiveStyles,
    reporter: &mut Reporter,
) {
    let expected = if directive.kind.is_shortform() {
        &styles.visible
    } else {
        &styles.hidden
    };
    for index in directive.blocks.clone() {
        let block = stream.block(index);
        if block.style != *expected {
            reporter.warning(format!(
                "in {:?} directive, expected style {expected:?} but found {:?}; text: {:?}",
                directive.kind.schema_name(),
                block.style,
                snippet(&block.text(), 40)
            ));
        }
    }
}
