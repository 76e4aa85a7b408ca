//! Position-preserving text replacement in raw document markup.
//!
//! Document containers keep flowing text inside explicit text-node tags
//! (`<w:t ...>` ... `</w:t>`) surrounded by otherwise-opaque structural
//! markup. [`replace_in_markup`] substitutes literal text only inside
//! those regions; every byte outside a replaced span (tag names,
//! attributes, structural elements) is preserved exactly.
//!
//! The scan is a three-state machine (seeking an opening text tag, seeking
//! that tag's `>`, capturing text). Captured bytes accumulate in a single
//! clear-text buffer with a parallel table mapping each clear-text byte to
//! its absolute source offset. The buffer spans text nodes, so a search
//! string split across adjacent nodes still matches; its replacement then
//! consumes the intermediate markup, healing the split.
//!
//! All matches of all pairs are collected first and applied in descending
//! source order, so earlier edits never invalidate the positions of edits
//! still pending (replacement length generally differs from match length).

use rq_blocks::FindReplace;

const OPEN_TAG: &str = "<w:t";
const CLOSE_TAG: &str = "</w:t>";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    SeekOpenTag,
    SeekOpenTagEnd,
    CaptureText,
}

struct Operation {
    start: usize,
    end: usize,
    replace: String,
}

/// Replace every occurrence of every find string, but only within
/// text-node regions of `markup`.
#[must_use]
pub fn replace_in_markup(markup: &str, pairs: &[FindReplace]) -> String {
    let (clear_text, offsets) = scan_clear_text(markup);
    tracing::debug!("markup clear text: {clear_text:?}");

    let mut operations = Vec::new();
    for pair in pairs {
        if pair.find.is_empty() {
            tracing::warn!("ignoring empty find string");
            continue;
        }
        for (position, _) in clear_text.match_indices(&pair.find) {
            operations.push(Operation {
                start: offsets[position],
                end: offsets[position + pair.find.len() - 1] + 1,
                replace: pair.replace.clone(),
            });
        }
    }
    operations.sort_by(|a, b| b.start.cmp(&a.start));

    let mut result = markup.to_owned();
    let mut applied_start = result.len();
    for operation in operations {
        if operation.end > applied_start {
            tracing::warn!(
                start = operation.start,
                "skipping replacement overlapping an already applied edit"
            );
            continue;
        }
        result.replace_range(operation.start..operation.end, &operation.replace);
        applied_start = operation.start;
    }
    result
}

/// Collect the clear text of all text nodes, with one absolute source byte
/// offset per clear-text byte.
fn scan_clear_text(markup: &str) -> (String, Vec<usize>) {
    let mut clear_text = String::new();
    let mut offsets = Vec::new();
    let mut state = State::SeekOpenTag;
    let mut skip = 0usize;

    for (index, ch) in markup.char_indices() {
        if skip > 0 {
            skip -= 1;
            continue;
        }
        match state {
            State::SeekOpenTag => {
                if ch == '<' && is_open_tag(markup, index) {
                    state = State::SeekOpenTagEnd;
                    skip = OPEN_TAG.len() - 1;
                }
            }
            State::SeekOpenTagEnd => {
                if ch == '>' {
                    // `<w:t/>` is an empty text node with nothing to capture
                    state = if markup.as_bytes()[index - 1] == b'/' {
                        State::SeekOpenTag
                    } else {
                        State::CaptureText
                    };
                }
            }
            State::CaptureText => {
                if ch == '<' && markup[index..].starts_with(CLOSE_TAG) {
                    state = State::SeekOpenTag;
                    skip = CLOSE_TAG.len() - 1;
                } else {
                    clear_text.push(ch);
                    for byte in 0..ch.len_utf8() {
                        offsets.push(index + byte);
                    }
                }
            }
        }
    }

    (clear_text, offsets)
}

/// An opening text tag starts with `<w:t` and continues with `>`, `/`, or
/// an attribute, never with more tag-name characters (`<w:tab` is a
/// different element).
fn is_open_tag(markup: &str, index: usize) -> bool {
    if !markup[index..].starts_with(OPEN_TAG) {
        return false;
    }
    match markup[index + OPEN_TAG.len()..].chars().next() {
        Some('>' | '/') => true,
        Some(c) => c.is_whitespace(),
        None => false,
    }
}
