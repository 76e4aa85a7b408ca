//! Heading / body / directive clustering of a block stream.
//!
//! An alternate traversal for callers that need structural navigation
//! rather than decoded content: every block lands in exactly one cluster.
//! Unlike the scanner, non-directive blocks are split into heading clusters
//! and body clusters (maximal runs of contiguous non-heading blocks), and
//! shortform directive payloads are normalized into their extended form so
//! all directive clusters present a uniform shape.

use std::collections::BTreeMap;
use std::ops::Range;

use rq_blocks::BlockStream;
use serde_json::{Map, Value};

use crate::codec::{self, DecodeError};
use crate::directive::expand_shortform;

/// One cluster of the partition.
#[derive(Clone, Debug, PartialEq)]
pub enum Cluster {
    /// A single heading block with its numeric level.
    Heading {
        /// Block index.
        block: usize,
        /// Heading level from the style name.
        level: u32,
    },
    /// A maximal run of contiguous body blocks.
    Body {
        /// Block range.
        blocks: Range<usize>,
    },
    /// One directive span; the payload is always in extended shape
    /// (shortform payloads are wrapped as `{"#shortform": ...}`).
    Directive {
        /// Block range of the span.
        blocks: Range<usize>,
        /// Normalized payload.
        payload: Map<String, Value>,
    },
}

/// Partition the stream into heading, body, and directive clusters.
///
/// # Errors
///
/// A JSON decode failure inside a directive span is fatal.
pub fn clusters(stream: &BlockStream) -> Result<Vec<Cluster>, DecodeError> {
    let mut clusters = Vec::new();
    let mut body_start: Option<usize> = None;
    let mut capturing = false;
    let mut span_start = 0;
    let mut raw = String::new();

    for (index, block) in stream.blocks().iter().enumerate() {
        let text = block.text();

        if !capturing {
            if text.contains(codec::OPEN) {
                flush_body(&mut clusters, &mut body_start, index);
                capturing = true;
                span_start = index;
                raw.clear();
            } else if let Some(level) = block.heading_level() {
                flush_body(&mut clusters, &mut body_start, index);
                clusters.push(Cluster::Heading {
                    block: index,
                    level,
                });
            } else if body_start.is_none() {
                body_start = Some(index);
            }
        }

        if capturing {
            raw.push_str(&text);
            if text.contains(codec::CLOSE) {
                let payload = codec::decode(&raw)?;
                let payload = if payload.contains_key("id") {
                    expand_shortform(payload)
                } else {
                    payload
                };
                clusters.push(Cluster::Directive {
                    blocks: span_start..index + 1,
                    payload,
                });
                capturing = false;
                raw.clear();
            }
        }
    }
    flush_body(&mut clusters, &mut body_start, stream.len());

    if tracing::enabled!(tracing::Level::DEBUG) {
        let mut stats: BTreeMap<&str, usize> = BTreeMap::new();
        for cluster in &clusters {
            let key = match cluster {
                Cluster::Heading { .. } => "heading",
                Cluster::Body { .. } => "body",
                Cluster::Directive { .. } => "directive",
            };
            *stats.entry(key).or_default() += 1;
        }
        tracing::debug!(?stats, total = clusters.len(), "cluster stats");
    }

    Ok(clusters)
}

fn flush_body(clusters: &mut Vec<Cluster>, body_start: &mut Option<usize>, end: usize) {
    if let Some(start) = body_start.take() {
        clusters.push(Cluster::Body { blocks: start..end });
    }
}
