//! Read-only access to `state.vscdb` stores
//!
//! Each store is a SQLite file with an item table (`ItemTable`) and a blob table
//! (`cursorDiskKV`). Stores are only ever opened read-only, queried, and closed.
//! A missing or broken store never takes its siblings down with it: the helpers
//! here fold every failure into an empty result plus a diagnostic.

pub mod reader;

use std::path::Path;

use tracing::{debug, warn};

pub use reader::StoreReader;

use crate::error::ExtractError;
use crate::models::{RawRecord, StoreTable};

/// Open a store, logging instead of failing
///
/// Missing stores are routine (new workspaces, older builds) and only logged at
/// debug level; open failures are warnings.
pub fn open_or_log(path: &Path) -> Option<StoreReader> {
    match StoreReader::open(path) {
        Ok(reader) => Some(reader),
        Err(e @ ExtractError::MissingStore(_)) => {
            debug!("{}", e);
            None
        }
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

/// Blob-table prefix scan; empty on any failure
pub fn scan_blobs(path: &Path, prefix: &str) -> Vec<RawRecord> {
    let Some(reader) = open_or_log(path) else {
        return Vec::new();
    };
    reader.scan_prefix(StoreTable::Blob, prefix).unwrap_or_else(|e| {
        warn!("{}", e);
        Vec::new()
    })
}
