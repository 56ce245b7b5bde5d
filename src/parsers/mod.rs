//! Schema normalization for conversation records
//!
//! # Error Handling Strategy
//!
//! Records come from stores written by many builds over time, so the parsers
//! degrade gracefully at every level:
//!
//! - **Whole records**: bytes that are not JSON, or match no known generation, return
//!   [`ExtractError::MalformedRecord`](crate::ExtractError). Callers skip and continue.
//!
//! - **Messages**: a message with an unknown sender, or with neither text nor code
//!   after reconstruction, is dropped. This is a deliberate lossy filter.
//!
//! - **Rich text**: a broken or pathologically deep document falls back to the
//!   message's plain `text` field instead of failing the record.
//!
//! - **Registry headers**: a malformed header is skipped; its siblings are kept.
//!
//! Normalization is a pure function of the input bytes, which is what lets the
//! resolution policy fan it out across rayon workers.

pub mod code_blocks;
pub mod deserializers;
pub mod message;
pub mod normalize;
pub mod rich_text;
pub mod schema;

pub use normalize::{
    COMPOSER_DATA_PREFIX, Extracted, extract, normalize_bubble, normalize_record, normalize_registry,
};
pub use schema::{SchemaGeneration, classify};
