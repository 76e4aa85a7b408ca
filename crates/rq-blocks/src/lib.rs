//! Block stream abstraction for the rq document engine.
//!
//! A document, as seen by the rest of the workspace, is an ordered sequence
//! of [`Block`]s. Each block carries a paragraph style name and an ordered
//! list of [`Run`]s (formatting-homogeneous text fragments). How that
//! structure is serialized to bytes is the document adapter's concern; this
//! crate models only what the directive machinery needs: indexed access, a
//! style catalog, and structural insert/delete.
//!
//! Blocks are replaced, never mutated in place, when a directive is
//! rewritten. Any structural mutation invalidates previously computed block
//! indices; callers re-scan the stream instead of patching cached
//! positions.

mod replace;

pub use replace::{
    FindReplace, ReplaceError, SearchReplaceOutcome, replace_first, search_replace,
};

use std::collections::BTreeSet;
use std::ops::Range;

/// A formatting-homogeneous text fragment within a [`Block`].
///
/// Runs are exclusively owned by their block and never shared.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Run {
    /// Text content of the run.
    pub text: String,
}

impl Run {
    /// Create a run from text.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// One structural text unit (paragraph-equivalent).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    /// Paragraph style name.
    pub style: String,
    /// Ordered runs making up the block's text.
    pub runs: Vec<Run>,
}

impl Block {
    /// Create a block with a single run.
    pub fn new(style: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            runs: vec![Run::new(text)],
        }
    }

    /// Create a block from pre-segmented runs.
    pub fn with_runs(style: impl Into<String>, runs: Vec<Run>) -> Self {
        Self {
            style: style.into(),
            runs,
        }
    }

    /// Logical text: the concatenation of all run text.
    #[must_use]
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    /// Numeric heading level of this block, if its style is a heading style.
    #[must_use]
    pub fn heading_level(&self) -> Option<u32> {
        heading_level(&self.style)
    }
}

/// The ordered sequence of blocks making up one document, plus the
/// document's style catalog.
///
/// The stream is an in-memory mutable value exclusively owned by the caller
/// driving one processing session. Indices into it are stable only until
/// the next structural mutation.
#[derive(Clone, Debug, Default)]
pub struct BlockStream {
    blocks: Vec<Block>,
    styles: BTreeSet<String>,
}

impl BlockStream {
    /// Create a stream from blocks and an explicit style catalog.
    ///
    /// The catalog additionally picks up every style used by `blocks`.
    pub fn new(blocks: Vec<Block>, styles: impl IntoIterator<Item = String>) -> Self {
        let mut catalog: BTreeSet<String> = styles.into_iter().collect();
        catalog.extend(blocks.iter().map(|block| block.style.clone()));
        Self {
            blocks,
            styles: catalog,
        }
    }

    /// Create a stream whose style catalog is exactly the styles in use.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self::new(blocks, [])
    }

    /// Number of blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the stream has no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Borrow the block at `index`.
    #[must_use]
    pub fn block(&self, index: usize) -> &Block {
        &self.blocks[index]
    }

    /// Mutably borrow the block at `index`.
    pub fn block_mut(&mut self, index: usize) -> &mut Block {
        &mut self.blocks[index]
    }

    /// All blocks, in document order.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Logical text of the block at `index`.
    #[must_use]
    pub fn text(&self, index: usize) -> String {
        self.blocks[index].text()
    }

    /// Whether `name` is present in the document's style catalog.
    #[must_use]
    pub fn has_style(&self, name: &str) -> bool {
        self.styles.contains(name)
    }

    /// Add a style to the catalog.
    pub fn add_style(&mut self, name: impl Into<String>) {
        self.styles.insert(name.into());
    }

    /// Insert `blocks` immediately before the block at `index`.
    ///
    /// Inserted styles are added to the catalog. `index` may equal `len()`,
    /// which appends.
    pub fn insert_before(&mut self, index: usize, blocks: Vec<Block>) {
        self.styles.extend(blocks.iter().map(|block| block.style.clone()));
        self.blocks.splice(index..index, blocks);
    }

    /// Delete the blocks in `range`.
    pub fn remove_range(&mut self, range: Range<usize>) {
        self.blocks.drain(range);
    }
}

/// Numeric heading level of a style name, if it follows one of the heading
/// naming conventions.
///
/// Recognized forms: `"Heading N"` and `"Appendix_<X>_Level_N"`.
#[must_use]
pub fn heading_level(style: &str) -> Option<u32> {
    if style.starts_with("Heading") {
        return style.rsplit(' ').next()?.parse().ok();
    }
    if style.starts_with("Appendix_") && style.contains("_Level_") {
        return style.rsplit('_').next()?.parse().ok();
    }
    None
}

/// Truncate `text` to at most `max` characters, appending `...` when cut.
#[must_use]
pub fn snippet(text: &str, max: usize) -> String {
    if text.chars().count() < max {
        return text.to_owned();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_block_text_concatenates_runs() {
        let block = Block::with_runs("Normal", vec![Run::new("AB"), Run::new("CDE")]);
        assert_eq!(block.text(), "ABCDE");
    }

    #[test]
    fn test_heading_level_word_style() {
        assert_eq!(heading_level("Heading 1"), Some(1));
        assert_eq!(heading_level("Heading 12"), Some(12));
        assert_eq!(heading_level("Normal"), None);
    }

    #[test]
    fn test_heading_level_appendix_style() {
        assert_eq!(heading_level("Appendix_A_Level_2"), Some(2));
        assert_eq!(heading_level("Appendix_B_Level_10"), Some(10));
        // Missing the level segment
        assert_eq!(heading_level("Appendix_A"), None);
    }

    #[test]
    fn test_heading_level_non_numeric_suffix() {
        assert_eq!(heading_level("Heading Body"), None);
        assert_eq!(heading_level("Appendix_A_Level_X"), None);
    }

    #[test]
    fn test_style_catalog_membership() {
        let mut stream = BlockStream::new(
            vec![Block::new("Normal", "text")],
            ["Rq Directive".to_owned()],
        );
        assert!(stream.has_style("Normal"));
        assert!(stream.has_style("Rq Directive"));
        assert!(!stream.has_style("Rq Hidden Directive"));

        stream.add_style("Rq Hidden Directive");
        assert!(stream.has_style("Rq Hidden Directive"));
    }

    #[test]
    fn test_insert_before_and_remove_range() {
        let mut stream = BlockStream::from_blocks(vec![
            Block::new("Normal", "a"),
            Block::new("Normal", "b"),
            Block::new("Normal", "c"),
        ]);

        stream.insert_before(1, vec![Block::new("Quote", "x"), Block::new("Quote", "y")]);
        let texts: Vec<String> = (0..stream.len()).map(|i| stream.text(i)).collect();
        assert_eq!(texts, ["a", "x", "y", "b", "c"]);
        assert!(stream.has_style("Quote"));

        stream.remove_range(1..3);
        let texts: Vec<String> = (0..stream.len()).map(|i| stream.text(i)).collect();
        assert_eq!(texts, ["a", "b", "c"]);
    }

    #[test]
    fn test_insert_before_at_end_appends() {
        let mut stream = BlockStream::from_blocks(vec![Block::new("Normal", "a")]);
        stream.insert_before(1, vec![Block::new("Normal", "z")]);
        assert_eq!(stream.text(1), "z");
    }

    #[test]
    fn test_snippet() {
        assert_eq!(snippet("short", 40), "short");
        let long = "x".repeat(60);
        let cut = snippet(&long, 40);
        assert_eq!(cut.len(), 40);
        assert!(cut.ends_with("..."));
    }
}
