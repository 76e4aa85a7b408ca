//! Directive machinery for the rq document engine.
//!
//! A directive is a JSON object embedded in document text between the `${`
//! and `}$` sentinels. It may span several blocks. Two shapes exist:
//!
//! - **shortform**: the object carries an `"id"` field and represents one
//!   requirement entry;
//! - **extended**: the object has exactly one key starting with `#`, which
//!   names the directive type (`#document_info`, `#pragma`, ...).
//!
//! This crate provides:
//!
//! - [`codec`]: sentinel extraction, JSON decoding (key order preserved),
//!   and the three rendering modes used when writing directives back;
//! - [`scan`](scan()): the single-pass scanner producing the directive
//!   list, the document info directive, and harvested requirements;
//! - [`clusters`]: the heading / body / directive partition of a stream;
//! - [`rewrite_directive`]: block-range replacement with classification
//!   dependent styling;
//! - [`annotate`] / [`annotate_reset`]: the per-prefix id allocation and
//!   reset protocols;
//! - [`apply_styles`]: the repair sweep forcing directive blocks to their
//!   expected styles.
//!
//! Payload edits never mutate document text in place; they go through
//! decode → mutate → re-encode → [`rewrite_directive`], and every rewrite
//! invalidates previously scanned block positions.

pub mod codec;

mod annotate;
mod cluster;
mod directive;
mod rewrite;
mod scan;
mod styles;

pub use annotate::{
    AnnotateError, AnnotateOutcome, DEFAULT_PAD_WIDTH, IdChange, annotate, annotate_reset,
};
pub use cluster::{Cluster, clusters};
pub use codec::DecodeError;
pub use directive::{
    DOCUMENT_INFO, Directive, DirectiveKind, IdSuffix, ObjectId, PRAGMA, SHORTFORM,
    expand_shortform,
};
pub use rewrite::{DirectiveStyles, RewriteError, rewrite_directive};
pub use scan::{Requirement, ScanResult, scan};
pub use styles::{StyleSweep, apply_styles};
