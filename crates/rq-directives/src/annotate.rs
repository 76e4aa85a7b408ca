//! Per-prefix object id allocation.
//!
//! The allocator state is a prefix → next_id map loaded from, and written
//! back into, the `#document_info` directive; there is no counter state
//! outside the document. [`annotate`] assigns numbers to placeholder ids in
//! document order; [`annotate_reset`] clears every assigned id back to the
//! placeholder and zeroes every counter. `annotate` followed by
//! `annotate_reset` restores the floor state regardless of where the
//! document started.

use indexmap::IndexMap;
use rq_blocks::BlockStream;
use serde_json::{Map, Value};

use crate::codec::DecodeError;
use crate::directive::{DOCUMENT_INFO, Directive, ObjectId};
use crate::rewrite::{DirectiveStyles, RewriteError, rewrite_directive};
use crate::scan::scan;

/// Minimum digit count of freshly allocated id numbers.
pub const DEFAULT_PAD_WIDTH: usize = 4;

/// Error type for the annotate operations.
#[derive(Debug, thiserror::Error)]
pub enum AnnotateError {
    /// No `#document_info` directive in the document.
    #[error("expected \"#document_info\" directive not found in document")]
    MissingDocumentInfo,

    /// The `#document_info` payload does not have the declared structure.
    /// Running the document check first reports the schema details.
    #[error("\"#document_info\" directive is malformed: {0}")]
    MalformedDocumentInfo(String),

    /// A placeholder id uses a prefix with no declared `object_ids` entry,
    /// so no counter exists to allocate from.
    #[error("prefix of object id {0:?} does not match any declared \"object_ids\" prefix")]
    UndeclaredPrefix(String),

    /// Scanning the document failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Writing a mutated directive back failed.
    #[error(transparent)]
    Rewrite(#[from] RewriteError),
}

/// One id assignment or reset performed by an annotate operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdChange {
    /// The id as it appeared in the document.
    pub from: String,
    /// The id as written back.
    pub to: String,
}

/// Result of an annotate operation.
#[derive(Debug, Default)]
pub struct AnnotateOutcome {
    /// Ids that changed, in document order.
    pub changes: Vec<IdChange>,
    /// Final per-prefix counters, in declaration order.
    pub next_ids: IndexMap<String, u64>,
}

/// Assign numbers to every placeholder id, in document order.
///
/// Ids already numeric are left untouched. Freshly assigned numbers are
/// zero-padded to at least `pad_width` digits. If any counter advanced,
/// the `#document_info` directive is rewritten with the updated `next_id`
/// values; otherwise the document is left untouched.
///
/// # Errors
///
/// Fails on scan errors, a missing or malformed `#document_info`
/// directive, an undeclared prefix, or a rewrite precondition violation.
pub fn annotate(
    stream: &mut BlockStream,
    styles: &DirectiveStyles,
    pad_width: usize,
) -> Result<AnnotateOutcome, AnnotateError> {
    run(stream, styles, pad_width, false)
}

/// Replace every assigned id suffix with the placeholder and reset every
/// prefix counter to zero.
///
/// Running it twice is idempotent: the second pass finds nothing to
/// change and rewrites nothing.
///
/// # Errors
///
/// Same failure modes as [`annotate`].
pub fn annotate_reset(
    stream: &mut BlockStream,
    styles: &DirectiveStyles,
) -> Result<AnnotateOutcome, AnnotateError> {
    run(stream, styles, DEFAULT_PAD_WIDTH, true)
}

fn run(
    stream: &mut BlockStream,
    styles: &DirectiveStyles,
    pad_width: usize,
    reset: bool,
) -> Result<AnnotateOutcome, AnnotateError> {
    let result = scan(stream)?;
    let info_index = result
        .document_info
        .ok_or(AnnotateError::MissingDocumentInfo)?;
    let mut next_ids = load_next_ids(&result.directives[info_index].payload)?;

    let mut changes = Vec::new();
    let mut rewrites: Vec<(usize, Map<String, Value>)> = Vec::new();
    let mut counters_changed = false;

    for (index, directive) in result.directives.iter().enumerate() {
        if !directive.kind.is_shortform() {
            continue;
        }
        let Some(id) = directive.payload.get("id").and_then(Value::as_str) else {
            // Non-string ids are reported by the document check.
            tracing::warn!("skipping shortform directive with non-string id");
            continue;
        };
        let object_id = ObjectId::parse(id);
        tracing::debug!("processing {id}");

        let new_suffix = if reset {
            if object_id.suffix.is_placeholder() {
                tracing::debug!("{id} is already reset");
                None
            } else {
                Some("?".to_owned())
            }
        } else if object_id.suffix.is_placeholder() {
            let next = next_ids
                .get_mut(&object_id.prefix)
                .ok_or_else(|| AnnotateError::UndeclaredPrefix(id.to_owned()))?;
            let number = *next;
            *next += 1;
            counters_changed = true;
            Some(format!("{number:0pad_width$}"))
        } else {
            None
        };

        if let Some(suffix) = new_suffix {
            let new_id = format!("{}{suffix}", object_id.prefix);
            let mut payload = directive.payload.clone();
            payload.insert("id".to_owned(), Value::String(new_id.clone()));
            rewrites.push((index, payload));
            tracing::info!("{id} --> {new_id}");
            changes.push(IdChange {
                from: id.to_owned(),
                to: new_id,
            });
        }
    }

    if reset {
        for next in next_ids.values_mut() {
            if *next != 0 {
                *next = 0;
                counters_changed = true;
            }
        }
    }

    // Re-serialize the declaration whenever any id or any counter changed;
    // otherwise leave the document info directive untouched to avoid a
    // spurious rewrite.
    if counters_changed || !changes.is_empty() {
        let declared: Vec<Value> = next_ids
            .iter()
            .map(|(prefix, next)| {
                let mut entry = Map::new();
                entry.insert("prefix".to_owned(), Value::String(prefix.clone()));
                entry.insert("next_id".to_owned(), Value::from(*next));
                Value::Object(entry)
            })
            .collect();
        let mut payload = result.directives[info_index].payload.clone();
        if let Some(info) = payload.get_mut(DOCUMENT_INFO).and_then(Value::as_object_mut) {
            info.insert("object_ids".to_owned(), Value::Array(declared));
        }
        rewrites.push((info_index, payload));
    }

    // Apply rewrites back to front so earlier spans never shift pending
    // positions.
    rewrites.sort_by(|a, b| {
        result.directives[b.0]
            .blocks
            .start
            .cmp(&result.directives[a.0].blocks.start)
    });
    for (index, payload) in rewrites {
        let directive = Directive {
            payload,
            ..result.directives[index].clone()
        };
        rewrite_directive(stream, &directive, styles)?;
    }

    Ok(AnnotateOutcome { changes, next_ids })
}

fn load_next_ids(
    payload: &Map<String, Value>,
) -> Result<IndexMap<String, u64>, AnnotateError> {
    let malformed =
        |detail: &str| AnnotateError::MalformedDocumentInfo(detail.to_owned());
    let info = payload
        .get(DOCUMENT_INFO)
        .and_then(Value::as_object)
        .ok_or_else(|| malformed("missing \"#document_info\" object"))?;
    let declared = info
        .get("object_ids")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("missing \"object_ids\" array"))?;

    let mut next_ids = IndexMap::new();
    for entry in declared {
        let prefix = entry
            .get("prefix")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("\"object_ids\" entry without a string \"prefix\""))?;
        let next_id = entry
            .get("next_id")
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed("\"object_ids\" entry without an integer \"next_id\""))?;
        next_ids.insert(prefix.to_owned(), next_id);
    }
    Ok(next_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rq_blocks::Block;
    use serde_json::json;

    fn document(next_id: u64, ids: &[&str]) -> BlockStream {
        let mut blocks = vec![Block::new(
            "Rq Hidden Directive",
            format!(
                "${{\"#document_info\":{{\"object_ids\":[{{\"prefix\":\"SRD-\", \"next_id\":{next_id}}}], \"schemas\":[{{\"title\":\"#shortform\"}}]}}}}$"
            ),
        )];
        for id in ids {
            blocks.push(Block::new("Heading 1", "Section"));
            blocks.push(Block::new(
                "Rq Directive",
                format!("${{\"id\":\"{id}\", \"method\":\"X\"}}$"),
            ));
        }
        blocks.push(Block::new("Normal", "trailing body"));
        BlockStream::from_blocks(blocks)
    }

    fn scanned_ids(stream: &BlockStream) -> Vec<String> {
        scan(stream)
            .unwrap()
            .directives
            .iter()
            .filter(|d| d.kind.is_shortform())
            .map(|d| d.payload["id"].as_str().unwrap().to_owned())
            .collect()
    }

    fn declared_next_id(stream: &BlockStream) -> u64 {
        let result = scan(stream).unwrap();
        let info = result.document_info_directive().unwrap();
        info.payload["#document_info"]["object_ids"][0]["next_id"]
            .as_u64()
            .unwrap()
    }

    #[test]
    fn test_annotate_assigns_in_document_order() {
        let mut stream = document(5, &["SRD-?", "SRD-?"]);
        let outcome =
            annotate(&mut stream, &DirectiveStyles::default(), DEFAULT_PAD_WIDTH).unwrap();

        assert_eq!(
            outcome.changes,
            vec![
                IdChange {
                    from: "SRD-?".to_owned(),
                    to: "SRD-0005".to_owned()
                },
                IdChange {
                    from: "SRD-?".to_owned(),
                    to: "SRD-0006".to_owned()
                },
            ]
        );
        assert_eq!(scanned_ids(&stream), ["SRD-0005", "SRD-0006"]);
        assert_eq!(declared_next_id(&stream), 7);
    }

    #[test]
    fn test_annotate_leaves_numeric_ids_untouched() {
        let mut stream = document(10, &["SRD-0002", "SRD-?"]);
        let outcome =
            annotate(&mut stream, &DirectiveStyles::default(), DEFAULT_PAD_WIDTH).unwrap();
        assert_eq!(outcome.changes.len(), 1);
        assert_eq!(scanned_ids(&stream), ["SRD-0002", "SRD-0010"]);
        assert_eq!(declared_next_id(&stream), 11);
    }

    #[test]
    fn test_annotate_without_placeholders_is_noop() {
        let mut stream = document(5, &["SRD-0001", "SRD-0002"]);
        let before: Vec<String> = (0..stream.len()).map(|i| stream.text(i)).collect();
        let outcome =
            annotate(&mut stream, &DirectiveStyles::default(), DEFAULT_PAD_WIDTH).unwrap();
        assert!(outcome.changes.is_empty());
        let after: Vec<String> = (0..stream.len()).map(|i| stream.text(i)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_annotate_reset_clears_ids_and_counters() {
        let mut stream = document(7, &["SRD-0005", "SRD-?", "SRD-0006"]);
        let outcome = annotate_reset(&mut stream, &DirectiveStyles::default()).unwrap();
        assert_eq!(outcome.changes.len(), 2);
        assert_eq!(scanned_ids(&stream), ["SRD-?", "SRD-?", "SRD-?"]);
        assert_eq!(declared_next_id(&stream), 0);
    }

    #[test]
    fn test_annotate_reset_twice_is_idempotent() {
        let mut stream = document(7, &["SRD-0005"]);
        annotate_reset(&mut stream, &DirectiveStyles::default()).unwrap();
        let before: Vec<String> = (0..stream.len()).map(|i| stream.text(i)).collect();

        let outcome = annotate_reset(&mut stream, &DirectiveStyles::default()).unwrap();
        assert!(outcome.changes.is_empty());
        let after: Vec<String> = (0..stream.len()).map(|i| stream.text(i)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_reset_then_annotate_is_deterministic() {
        let mut first = document(3, &["SRD-?", "SRD-0001", "SRD-?"]);
        annotate(&mut first, &DirectiveStyles::default(), DEFAULT_PAD_WIDTH).unwrap();
        let direct = scanned_ids(&first);

        let mut second = document(3, &["SRD-?", "SRD-0001", "SRD-?"]);
        annotate(&mut second, &DirectiveStyles::default(), DEFAULT_PAD_WIDTH).unwrap();
        annotate_reset(&mut second, &DirectiveStyles::default()).unwrap();
        // After a reset, every id is a placeholder and counters are zero;
        // re-annotating assigns from zero in document order.
        annotate(&mut second, &DirectiveStyles::default(), DEFAULT_PAD_WIDTH).unwrap();
        let replayed = scanned_ids(&second);

        assert_eq!(replayed, ["SRD-0000", "SRD-0001", "SRD-0002"]);
        assert_eq!(direct, ["SRD-0003", "SRD-0001", "SRD-0004"]);
        assert_eq!(replayed.len(), direct.len());
    }

    #[test]
    fn test_annotate_undeclared_prefix_is_error() {
        let mut stream = document(5, &["OTHER-?"]);
        let err = annotate(&mut stream, &DirectiveStyles::default(), DEFAULT_PAD_WIDTH)
            .unwrap_err();
        assert!(matches!(err, AnnotateError::UndeclaredPrefix(_)));
    }

    #[test]
    fn test_annotate_missing_document_info_is_error() {
        let mut stream = BlockStream::from_blocks(vec![
            Block::new("Rq Directive", "${\"id\":\"SRD-?\", \"method\":\"X\"}$"),
            Block::new("Normal", "end"),
        ]);
        let err = annotate(&mut stream, &DirectiveStyles::default(), DEFAULT_PAD_WIDTH)
            .unwrap_err();
        assert!(matches!(err, AnnotateError::MissingDocumentInfo));
    }

    #[test]
    fn test_annotate_pad_width() {
        let mut stream = document(12345, &["SRD-?"]);
        annotate(&mut stream, &DirectiveStyles::default(), DEFAULT_PAD_WIDTH).unwrap();
        assert_eq!(scanned_ids(&stream), ["SRD-12345"]);

        let mut stream = document(7, &["SRD-?"]);
        annotate(&mut stream, &DirectiveStyles::default(), 6).unwrap();
        assert_eq!(scanned_ids(&stream), ["SRD-000007"]);
    }

    #[test]
    fn test_annotate_preserves_document_info_schemas() {
        let mut stream = document(1, &["SRD-?"]);
        annotate(&mut stream, &DirectiveStyles::default(), DEFAULT_PAD_WIDTH).unwrap();
        let result = scan(&stream).unwrap();
        let info = result.document_info_directive().unwrap();
        assert_eq!(
            info.payload["#document_info"]["schemas"],
            json!([{"title": "#shortform"}])
        );
    }
}
