//! Style repair sweep for directive blocks.
//!
//! Documents authored before directive styles were enforced carry ad-hoc
//! paragraph formatting. [`apply_styles`] forces every directive cluster's
//! blocks to the style expected for its classification.

use rq_blocks::BlockStream;

use crate::cluster::{Cluster, clusters};
use crate::codec::DecodeError;
use crate::directive::SHORTFORM;
use crate::rewrite::DirectiveStyles;

/// Counts reported by [`apply_styles`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StyleSweep {
    /// Directive clusters found.
    pub directives: usize,
    /// Directive clusters that had at least one block restyled.
    pub restyled: usize,
}

/// Force every directive's blocks to the expected style: visible for
/// shortform directives, hidden for everything else.
///
/// # Errors
///
/// Fails when clustering fails (a decode error inside a directive span).
pub fn apply_styles(
    stream: &mut BlockStream,
    styles: &DirectiveStyles,
) -> Result<StyleSweep, DecodeError> {
    let mut sweep = StyleSweep::default();
    for cluster in clusters(stream)? {
        let Cluster::Directive { blocks, payload } = cluster else {
            continue;
        };
        sweep.directives += 1;
        let target = if payload.contains_key(SHORTFORM) {
            &styles.visible
        } else {
            &styles.hidden
        };
        let mut touched = false;
        for index in blocks {
            let block = stream.block_mut(index);
            if block.style != *target {
                target.clone_into(&mut block.style);
                touched = true;
            }
        }
        if touched {
            sweep.restyled += 1;
        }
    }
    tracing::info!(
        directives = sweep.directives,
        restyled = sweep.restyled,
        "style sweep complete"
    );
    Ok(sweep)
}
