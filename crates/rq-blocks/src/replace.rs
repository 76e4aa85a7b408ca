//! Format-preserving find/replace over a block's runs.
//!
//! [`replace_first`] substitutes the first occurrence of a literal search
//! string in a block's logical text while preserving the run segmentation:
//! runs not touched by the match keep their text, and when a match spans
//! several runs the replacement text lands in the first touched run (whose
//! formatting therefore "wins"). [`search_replace`] sweeps a whole stream
//! with a list of find/replace pairs and tallies per-pair counts.

use indexmap::IndexMap;

use crate::{Block, BlockStream};

/// A literal find/replace pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FindReplace {
    /// Literal text to search for.
    pub find: String,
    /// Replacement text.
    pub replace: String,
}

impl FindReplace {
    /// Create a find/replace pair.
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            find: find.into(),
            replace: replace.into(),
        }
    }
}

/// Error type for run-level replacement.
#[derive(Debug, thiserror::Error)]
pub enum ReplaceError {
    /// The search text does not occur in the block. Callers are expected to
    /// check containment first; a miss is a usage error, not a document
    /// content error.
    #[error("search text {0:?} not found in block")]
    NotFound(String),
}

/// Byte range of one run within the block's logical text. `end` is
/// exclusive; empty runs have `start == end`.
struct RunSpan {
    start: usize,
    end: usize,
}

fn run_spans(block: &Block) -> (String, Vec<RunSpan>) {
    let mut text = String::new();
    let mut spans = Vec::with_capacity(block.runs.len());
    for run in &block.runs {
        let start = text.len();
        text.push_str(&run.text);
        spans.push(RunSpan {
            start,
            end: text.len(),
        });
    }
    (text, spans)
}

/// Index of the run containing the logical byte position `pos`.
fn run_index(spans: &[RunSpan], pos: usize) -> usize {
    spans
        .iter()
        .position(|span| pos < span.end)
        .unwrap_or(spans.len().saturating_sub(1))
}

/// Replace the first occurrence of `find` in the block's logical text with
/// `replace`, preserving run boundaries.
///
/// The total run count is unchanged; runs strictly between the first and
/// last touched run become empty.
///
/// # Errors
///
/// Returns [`ReplaceError::NotFound`] if `find` is empty or does not occur
/// in the block.
pub fn replace_first(block: &mut Block, find: &str, replace: &str) -> Result<(), ReplaceError> {
    if find.is_empty() {
        return Err(ReplaceError::NotFound(find.to_owned()));
    }

    let (text, spans) = run_spans(block);
    let Some(start) = text.find(find) else {
        return Err(ReplaceError::NotFound(find.to_owned()));
    };
    let end = start + find.len();

    let first = run_index(&spans, start);
    let last = run_index(&spans, end - 1);

    if first == last {
        // Match is contained in a single run.
        let local = start - spans[first].start;
        let run = &mut block.runs[first];
        let mut updated =
            String::with_capacity(run.text.len() - find.len() + replace.len());
        updated.push_str(&run.text[..local]);
        updated.push_str(replace);
        updated.push_str(&run.text[local + find.len()..]);
        run.text = updated;
        return Ok(());
    }

    // Match spans multiple runs. The replacement text goes onto the tail of
    // the first touched run, the matched prefix is stripped from the last
    // touched run, and every run strictly between them is blanked.
    let local_start = start - spans[first].start;
    block.runs[first].text.truncate(local_start);
    block.runs[first].text.push_str(replace);

    let local_end = end - spans[last].start;
    block.runs[last].text.drain(..local_end);

    for run in &mut block.runs[first + 1..last] {
        run.text.clear();
    }

    Ok(())
}

/// Outcome of a document-level [`search_replace`] sweep.
#[derive(Debug, Default)]
pub struct SearchReplaceOutcome {
    counts: IndexMap<String, usize>,
}

impl SearchReplaceOutcome {
    /// Number of blocks in which `find` was replaced.
    #[must_use]
    pub fn count(&self, find: &str) -> usize {
        self.counts.get(find).copied().unwrap_or(0)
    }

    /// Per-pair replacement counts, in pair order.
    #[must_use]
    pub fn counts(&self) -> &IndexMap<String, usize> {
        &self.counts
    }

    /// Find strings that were never replaced.
    pub fn missing(&self) -> impl Iterator<Item = &str> {
        self.counts
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(find, _)| find.as_str())
    }
}

/// Apply every find/replace pair to every block whose text contains the
/// find string (first occurrence per block).
///
/// Pairs that match nowhere are reported in the outcome and logged as
/// errors; the sweep itself still completes.
///
/// # Errors
///
/// Propagates [`ReplaceError`] from the per-block replacement.
pub fn search_replace(
    stream: &mut BlockStream,
    pairs: &[FindReplace],
) -> Result<SearchReplaceOutcome, ReplaceError> {
    let mut counts: IndexMap<String, usize> =
        pairs.iter().map(|pair| (pair.find.clone(), 0)).collect();

    for index in 0..stream.len() {
        for pair in pairs {
            if stream.block(index).text().contains(&pair.find) {
                replace_first(stream.block_mut(index), &pair.find, &pair.replace)?;
                *counts.entry(pair.find.clone()).or_default() += 1;
            }
        }
    }

    for (find, count) in &counts {
        if *count == 0 {
            tracing::error!(
                "expected to find and replace text {find:?} but it was not found"
            );
        } else {
            tracing::debug!("replaced {find:?} in {count} location(s)");
        }
    }

    Ok(SearchReplaceOutcome { counts })
}
