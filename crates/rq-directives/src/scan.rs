//! Single-pass directive scanner.
//!
//! Walks the block stream once with a two-state machine (idle / capturing).
//! A block containing `${` opens a span; text accumulates across blocks
//! until `}$` closes it, at which point the span is decoded and classified.
//! Span detection is independent of heading styles.
//!
//! The scan also harvests requirements: each shortform directive is
//! associated with the text of the most recent heading and the body text
//! following it, up to the next heading or shortform directive.

use rq_blocks::{BlockStream, snippet};

use crate::codec::{self, DecodeError};
use crate::directive::{DOCUMENT_INFO, Directive, DirectiveKind};

/// A shortform directive together with its surrounding prose context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Requirement {
    /// Index of the shortform directive in [`ScanResult::directives`].
    pub directive: usize,
    /// Text of the nearest preceding heading block.
    pub heading: String,
    /// Newline-joined text of the body blocks following the directive.
    pub text: String,
}

/// Everything one scan pass produces.
///
/// All block ranges are positions in the scanned stream and are invalidated
/// by any structural mutation; re-scan after rewriting.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// All directives, in document order.
    pub directives: Vec<Directive>,
    /// Index of the first `#document_info` directive, if any.
    pub document_info: Option<usize>,
    /// Indices of any further `#document_info` directives (at most one is
    /// legal per document; validation reports the rest).
    pub duplicate_document_info: Vec<usize>,
    /// Harvested requirement entries, in document order.
    pub requirements: Vec<Requirement>,
}

impl ScanResult {
    /// The document info directive, if one was found.
    #[must_use]
    pub fn document_info_directive(&self) -> Option<&Directive> {
        self.document_info.map(|index| &self.directives[index])
    }
}

/// Scan a block stream for directives.
///
/// Pure read over the stream; nothing is mutated.
///
/// # Errors
///
/// A JSON decode failure or an invalid directive shape anywhere in the
/// document is fatal for the whole scan: it signals a document integrity
/// error, not a per-directive validation failure.
pub fn scan(stream: &BlockStream) -> Result<ScanResult, DecodeError> {
    tracing::debug!("finding directives");
    let mut result = ScanResult::default();

    let mut capturing = false;
    let mut span_start = 0;
    let mut raw = String::new();
    let mut heading = String::new();
    let mut pending: Option<Requirement> = None;

    for (index, block) in stream.blocks().iter().enumerate() {
        let text = block.text();
        let is_heading = block.heading_level().is_some();
        if is_heading {
            heading = text.trim().to_owned();
        }

        if !capturing {
            if text.contains(codec::OPEN) {
                capturing = true;
                span_start = index;
                raw.clear();
            }
            if pending.is_some() {
                if is_heading {
                    // A heading closes the requirement in progress.
                    if let Some(requirement) = pending.take() {
                        result.requirements.push(requirement);
                    }
                } else if !text.is_empty() && !text.contains(codec::OPEN) {
                    if let Some(requirement) = pending.as_mut() {
                        if !requirement.text.is_empty() {
                            requirement.text.push('\n');
                        }
                        requirement.text.push_str(&text);
                    }
                }
            }
        }

        if capturing {
            raw.push_str(&text);
            if text.contains(codec::CLOSE) {
                let payload = codec::decode(&raw)?;
                let kind = DirectiveKind::classify(&payload)?;
                tracing::debug!("found directive: {}", snippet(&raw, 60));

                let directive_index = result.directives.len();
                if payload.contains_key(DOCUMENT_INFO) {
                    if result.document_info.is_none() {
                        result.document_info = Some(directive_index);
                    } else {
                        result.duplicate_document_info.push(directive_index);
                    }
                }
                if kind.is_shortform() {
                    if let Some(requirement) = pending.take() {
                        result.requirements.push(requirement);
                    }
                    pending = Some(Requirement {
                        directive: directive_index,
                        heading: heading.clone(),
                        text: String::new(),
                    });
                }

                result.directives.push(Directive {
                    blocks: span_start..index + 1,
                    kind,
                    payload,
                });
                capturing = false;
                raw.clear();
            }
        }
    }

    if let Some(requirement) = pending.take() {
        result.requirements.push(requirement);
    }

    tracing::debug!(
        directives = result.directives.len(),
        requirements = result.requirements.len(),
        "scan complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rq_blocks::Block;
    use serde_json::json;

    fn stream(lines: &[(&str, &str)]) -> BlockStream {
        BlockStream::from_blocks(
            lines
                .iter()
                .map(|(style, text)| Block::new(*style, *text))
                .collect(),
        )
    }

    #[test]
    fn test_scan_single_block_directive() {
        let stream = stream(&[
            ("Normal", "intro"),
            ("Rq Directive", "${\"id\":\"SRD-0001\", \"method\":\"X\"}$"),
            ("Normal", "outro"),
        ]);
        let result = scan(&stream).unwrap();
        assert_eq!(result.directives.len(), 1);
        assert_eq!(result.directives[0].blocks, 1..2);
        assert_eq!(result.directives[0].kind, DirectiveKind::Shortform);
        assert_eq!(result.directives[0].payload["id"], json!("SRD-0001"));
    }

    #[test]
    fn test_scan_directive_spanning_blocks() {
        let stream = stream(&[
            ("Rq Hidden Directive", "${  \"#document_info\":{"),
            ("Rq Hidden Directive", "    \"object_ids\":[],"),
            ("Rq Hidden Directive", "    \"schemas\":[]"),
            ("Rq Hidden Directive", "}"),
            ("Rq Hidden Directive", "}$"),
            ("Normal", "after"),
        ]);
        let result = scan(&stream).unwrap();
        assert_eq!(result.directives.len(), 1);
        assert_eq!(result.directives[0].blocks, 0..5);
        assert_eq!(result.document_info, Some(0));
        assert_eq!(
            result.directives[0].kind,
            DirectiveKind::Extended("#document_info".to_owned())
        );
    }

    #[test]
    fn test_scan_duplicate_document_info_is_recorded() {
        let stream = stream(&[
            ("Normal", "${\"#document_info\":{\"object_ids\":[], \"schemas\":[]}}$"),
            ("Normal", "${\"#document_info\":{\"object_ids\":[], \"schemas\":[]}}$"),
            ("Normal", "end"),
        ]);
        let result = scan(&stream).unwrap();
        assert_eq!(result.document_info, Some(0));
        assert_eq!(result.duplicate_document_info, [1]);
    }

    #[test]
    fn test_scan_decode_failure_is_fatal() {
        let stream = stream(&[("Normal", "${not json}$")]);
        assert!(matches!(scan(&stream), Err(DecodeError::Json { .. })));
    }

    #[test]
    fn test_scan_invalid_shape_is_fatal() {
        let stream = stream(&[("Normal", "${\"a\":1, \"b\":2}$")]);
        assert!(matches!(scan(&stream), Err(DecodeError::Shape { .. })));
    }

    #[test]
    fn test_scan_typographic_quotes() {
        let stream = stream(&[(
            "Normal",
            "${\u{201c}id\u{201d}:\u{201c}SRD-?\u{201d}, \u{201c}method\u{201d}:\u{201c}X\u{201d}}$",
        )]);
        let result = scan(&stream).unwrap();
        assert_eq!(result.directives[0].payload["id"], json!("SRD-?"));
    }

    #[test]
    fn test_requirement_harvesting() {
        let stream = stream(&[
            ("Heading 1", "Receiver"),
            ("Rq Directive", "${\"id\":\"SRD-0001\", \"method\":\"X\"}$"),
            ("Normal", "The receiver shall lock."),
            ("Normal", "Within 2 seconds."),
            ("Normal", ""),
            ("Heading 2", "Transmitter"),
            ("Rq Directive", "${\"id\":\"SRD-0002\", \"method\":\"T\"}$"),
            ("Normal", "The transmitter shall key."),
            ("Normal", "tail"),
        ]);
        let result = scan(&stream).unwrap();
        assert_eq!(result.requirements.len(), 2);
        assert_eq!(result.requirements[0].heading, "Receiver");
        assert_eq!(
            result.requirements[0].text,
            "The receiver shall lock.\nWithin 2 seconds."
        );
        assert_eq!(result.requirements[1].heading, "Transmitter");
        assert_eq!(
            result.requirements[1].text,
            "The transmitter shall key.\ntail"
        );
    }

    #[test]
    fn test_requirement_committed_by_next_shortform() {
        let stream = stream(&[
            ("Heading 1", "Section"),
            ("Rq Directive", "${\"id\":\"SRD-0001\", \"method\":\"X\"}$"),
            ("Normal", "First body."),
            ("Rq Directive", "${\"id\":\"SRD-0002\", \"method\":\"X\"}$"),
            ("Normal", "Second body."),
            ("Normal", "after"),
        ]);
        let result = scan(&stream).unwrap();
        assert_eq!(result.requirements.len(), 2);
        assert_eq!(result.requirements[0].text, "First body.");
        assert_eq!(result.requirements[1].text, "Second body.\nafter");
    }

    #[test]
    fn test_scan_empty_stream() {
        let result = scan(&BlockStream::default()).unwrap();
        assert!(result.directives.is_empty());
        assert!(result.document_info.is_none());
        assert!(result.requirements.is_empty());
    }
}
