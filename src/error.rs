//! Error taxonomy for extraction
//!
//! Every retrieval step returns `Result<_, ExtractError>`. Batch operations never
//! short-circuit on the first failure; they fold results into a [`Partitioned`]
//! value and keep going. The only outcome a caller sees is "fewer results".

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The store file does not exist. Yields an empty result, never fatal.
    #[error("store not found: {}", .0.display())]
    MissingStore(PathBuf),

    /// A workspace descriptor (`workspace.json`) is missing or unparseable.
    #[error("malformed workspace descriptor {}: {reason}", .path.display())]
    MalformedDescriptor { path: PathBuf, reason: String },

    /// A record matches no known schema generation or is not valid JSON.
    #[error("malformed record{}: {reason}", key_suffix(.key))]
    MalformedRecord { key: Option<String>, reason: String },

    /// The store exists but cannot be opened (corrupt, locked, not a database).
    #[error("failed to open store {}: {source}", .path.display())]
    StoreOpenFailure {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The store opened but a query against it failed.
    #[error("query failed on {}: {source}", .path.display())]
    Query {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
}

fn key_suffix(key: &Option<String>) -> String {
    key.as_ref().map(|k| format!(" '{}'", k)).unwrap_or_default()
}

impl ExtractError {
    pub fn malformed_record(key: Option<&str>, reason: impl fmt::Display) -> Self {
        Self::MalformedRecord { key: key.map(str::to_string), reason: reason.to_string() }
    }

    pub fn malformed_descriptor(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::MalformedDescriptor { path: path.into(), reason: reason.to_string() }
    }

    /// Store-level failures (as opposed to per-record ones)
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::StoreOpenFailure { .. } | Self::Query { .. })
    }
}

/// Successes and skipped failures of a best-effort batch
#[derive(Debug)]
pub struct Partitioned<T> {
    pub ok: Vec<T>,
    pub skipped: Vec<ExtractError>,
}

impl<T> Default for Partitioned<T> {
    fn default() -> Self {
        Self { ok: Vec::new(), skipped: Vec::new() }
    }
}

impl<T> FromIterator<Result<T, ExtractError>> for Partitioned<T> {
    fn from_iter<I: IntoIterator<Item = Result<T, ExtractError>>>(iter: I) -> Self {
        let mut out = Self::default();
        for item in iter {
            match item {
                Ok(value) => out.ok.push(value),
                Err(e) => out.skipped.push(e),
            }
        }
        out
    }
}
