//! Detection of legacy bracketed object ids in body text.
//!
//! Before directives, requirement ids were written directly in prose as
//! `[PREFIX-SUFFIX, <method>(, <extra>(, <extra>))]`. Documents must have
//! migrated those to directive form; the check flags any that remain.
//! Detection only; the legacy format is never written.

use std::sync::LazyLock;

use regex::Regex;

static FUZZY_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[\s*([\w.]+-[\w.]+-\S*)\s*,.+\]\s*$").unwrap());

static STRICT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[\s*([\w.]+-[\w.]+-\d+)\s*,.+\]\s*$").unwrap());

/// Find a legacy object id in a line of body text.
///
/// With `fuzzy` the suffix may be anything non-blank (catches pending
/// `ABC-DEF-?` annotations); otherwise only numeric suffixes match.
#[must_use]
pub fn legacy_object_id(text: &str, fuzzy: bool) -> Option<&str> {
    let re: &Regex = if fuzzy { &FUZZY_ID_RE } else { &STRICT_ID_RE };
    re.captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}
