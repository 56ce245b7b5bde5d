//! Selection and ranking of normalized conversations
//!
//! Ranking is by effective activity time (newest first). Filters are opt-in:
//! export-oriented callers drop conversations with no assistant content,
//! interactive callers show everything.

pub mod ranking;

pub use ranking::{compare, effective_activity_time, filter_exportable, filter_since, rank, ranked};
