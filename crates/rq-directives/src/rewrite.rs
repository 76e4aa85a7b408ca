//! Directive rewriting: replace a directive's block span with freshly
//! rendered, correctly styled text.

use std::ops::Range;

use rq_blocks::{Block, BlockStream};

use crate::codec;
use crate::directive::{Directive, DirectiveKind};

/// The two paragraph styles directives are written with.
///
/// Shortform directives are meant to be read alongside the prose and use
/// the visible style; extended directives carry machine metadata and use
/// the hidden style.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectiveStyles {
    /// Style applied to shortform directive blocks.
    pub visible: String,
    /// Style applied to extended directive blocks.
    pub hidden: String,
}

impl DirectiveStyles {
    /// Create a style pair.
    pub fn new(visible: impl Into<String>, hidden: impl Into<String>) -> Self {
        Self {
            visible: visible.into(),
            hidden: hidden.into(),
        }
    }
}

impl Default for DirectiveStyles {
    fn default() -> Self {
        Self::new("Rq Directive", "Rq Hidden Directive")
    }
}

/// Error type for structural rewrite preconditions.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    /// The directive's span ends at the last block of the document, so
    /// there is no following block to anchor the insertion. Directives may
    /// never legally terminate a document.
    #[error("a directive may not be the last block of a document; rewrite has no insertion anchor")]
    TrailingDirective,
}

/// Replace a directive's original block span with freshly rendered text.
///
/// The payload is serialized with the classification-aware format
/// ([`codec::render_auto`]): shortform payloads become a single block in
/// the visible style, extended payloads one block per output line in the
/// hidden style. New blocks are inserted immediately before the first
/// block following the span, then the span is deleted.
///
/// Returns the block range now occupied by the rewritten directive. All
/// other previously computed block positions are invalidated; callers
/// re-scan the stream.
///
/// # Errors
///
/// Returns [`RewriteError::TrailingDirective`] when the span includes the
/// stream's last block.
pub fn rewrite_directive(
    stream: &mut BlockStream,
    directive: &Directive,
    styles: &DirectiveStyles,
) -> Result<Range<usize>, RewriteError> {
    if directive.blocks.end >= stream.len() {
        return Err(RewriteError::TrailingDirective);
    }

    let rendered = codec::render_auto(&directive.payload);
    let replacement: Vec<Block> = match directive.kind {
        DirectiveKind::Shortform => vec![Block::new(styles.visible.clone(), rendered)],
        DirectiveKind::Extended(_) => rendered
            .lines()
            .map(|line| Block::new(styles.hidden.clone(), line))
            .collect(),
    };

    let start = directive.blocks.start;
    let inserted = replacement.len();
    stream.insert_before(directive.blocks.end, replacement);
    stream.remove_range(start..directive.blocks.end);
    Ok(start..start + inserted)
}
