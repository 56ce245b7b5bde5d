use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};

use crate::error::ExtractError;
use crate::models::{RawRecord, StoreTable};

/// Read-only handle on one `state.vscdb`
///
/// The connection is opened read-only and closed when the reader is dropped,
/// so every exit path releases the file.
#[derive(Debug)]
pub struct StoreReader {
    path: PathBuf,
    conn: Connection,
}

impl StoreReader {
    /// Open a store read-only
    ///
    /// # Errors
    ///
    /// - [`ExtractError::MissingStore`] when the file does not exist
    /// - [`ExtractError::StoreOpenFailure`] when it exists but is not a readable database
    pub fn open(path: &Path) -> Result<Self, ExtractError> {
        if !path.is_file() {
            return Err(ExtractError::MissingStore(path.to_path_buf()));
        }

        let open_failure = |source| ExtractError::StoreOpenFailure { path: path.to_path_buf(), source };
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI,
        )
        .map_err(open_failure)?;

        // SQLite opens lazily; touch the schema so corrupt files fail here
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(open_failure)?;

        Ok(Self { path: path.to_path_buf(), conn })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Exact-key lookup
    pub fn get(&self, table: StoreTable, key: &str) -> Result<Option<RawRecord>, ExtractError> {
        if !self.has_table(table)? {
            return Ok(None);
        }

        let sql = format!("SELECT value FROM {} WHERE key = ?1 LIMIT 1", table.table_name());
        let value = self
            .conn
            .query_row(&sql, params![key], |row| Ok(value_bytes(row.get_ref(0)?)))
            .optional()
            .map_err(|source| self.query_error(source))?
            .flatten();

        Ok(value.map(|value| self.record(table, key.to_string(), value)))
    }

    /// Every record whose key starts with `prefix`, in no particular order
    pub fn scan_prefix(&self, table: StoreTable, prefix: &str) -> Result<Vec<RawRecord>, ExtractError> {
        if !self.has_table(table)? {
            return Ok(Vec::new());
        }

        // substr comparison is exact and case-sensitive, unlike LIKE
        let sql = format!(
            "SELECT key, value FROM {} WHERE substr(key, 1, length(?1)) = ?1",
            table.table_name()
        );
        let mut stmt = self.conn.prepare(&sql).map_err(|source| self.query_error(source))?;
        let rows = stmt
            .query_map(params![prefix], |row| {
                let key: String = row.get(0)?;
                Ok((key, value_bytes(row.get_ref(1)?)))
            })
            .map_err(|source| self.query_error(source))?;

        let mut records = Vec::new();
        for row in rows {
            match row {
                Ok((key, Some(value))) => records.push(self.record(table, key, value)),
                Ok((key, None)) => tracing::debug!("Skipping null value for key {}", key),
                Err(e) => tracing::warn!("Skipping unreadable row in {}: {}", self.path.display(), e),
            }
        }
        Ok(records)
    }

    /// Older stores may lack the blob table entirely
    fn has_table(&self, table: StoreTable) -> Result<bool, ExtractError> {
        self.conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table.table_name()],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
            .map_err(|source| self.query_error(source))
    }

    fn record(&self, table: StoreTable, key: String, value: Vec<u8>) -> RawRecord {
        RawRecord { store: self.path.clone(), table, key, value }
    }

    fn query_error(&self, source: rusqlite::Error) -> ExtractError {
        ExtractError::Query { path: self.path.clone(), source }
    }
}

/// TEXT and BLOB values are both returned as bytes
fn value_bytes(value: ValueRef<'_>) -> Option<Vec<u8>> {
    match value {
        ValueRef::Null => None,
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Some(bytes.to_vec()),
        ValueRef::Integer(i) => Some(i.to_string().into_bytes()),
        ValueRef::Real(f) => Some(f.to_string().into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn create_store(dir: &TempDir, with_blob_table: bool) -> PathBuf {
        let path = dir.path().join("state.vscdb");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE ItemTable (key TEXT UNIQUE ON CONFLICT REPLACE, value BLOB);").unwrap();
        conn.execute("INSERT INTO ItemTable VALUES (?1, ?2)", params!["composer.composerData", "{\"allComposers\":[]}"])
            .unwrap();
        if with_blob_table {
            conn.execute_batch("CREATE TABLE cursorDiskKV (key TEXT UNIQUE ON CONFLICT REPLACE, value BLOB);")
                .unwrap();
            for (key, value) in [
                ("composerData:a", b"{\"composerId\":\"a\"}".to_vec()),
                ("composerData:b", b"{\"composerId\":\"b\"}".to_vec()),
                ("ComposerData:upper", b"{}".to_vec()),
                ("bubbleId:a:1", b"{}".to_vec()),
            ] {
                conn.execute("INSERT INTO cursorDiskKV VALUES (?1, ?2)", params![key, value]).unwrap();
            }
            conn.execute("INSERT INTO cursorDiskKV VALUES ('composerData:null', NULL)", []).unwrap();
        }
        path
    }

    #[test]
    fn test_missing_store() {
        let result = StoreReader::open(Path::new("/nonexistent/state.vscdb"));
        assert!(matches!(result, Err(ExtractError::MissingStore(_))));
    }

    #[test]
    fn test_corrupt_store_fails_to_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.vscdb");
        fs::write(&path, vec![b'x'; 4096]).unwrap();
        assert!(matches!(StoreReader::open(&path), Err(ExtractError::StoreOpenFailure { .. })));
    }

    #[test]
    fn test_exact_lookup_in_item_table() {
        let dir = TempDir::new().unwrap();
        let reader = StoreReader::open(&create_store(&dir, true)).unwrap();

        let record = reader.get(StoreTable::Item, "composer.composerData").unwrap().unwrap();
        assert_eq!(record.value, b"{\"allComposers\":[]}");
        assert_eq!(record.table, StoreTable::Item);
        assert!(reader.get(StoreTable::Item, "missing").unwrap().is_none());
    }

    #[test]
    fn test_prefix_scan_is_case_sensitive_and_skips_nulls() {
        let dir = TempDir::new().unwrap();
        let reader = StoreReader::open(&create_store(&dir, true)).unwrap();

        let mut keys: Vec<String> =
            reader.scan_prefix(StoreTable::Blob, "composerData:").unwrap().into_iter().map(|r| r.key).collect();
        keys.sort();
        assert_eq!(keys, vec!["composerData:a", "composerData:b"]);
    }

    #[test]
    fn test_prefix_with_like_wildcards_is_literal() {
        let dir = TempDir::new().unwrap();
        let reader = StoreReader::open(&create_store(&dir, true)).unwrap();
        assert!(reader.scan_prefix(StoreTable::Blob, "composer%").unwrap().is_empty());
    }

    #[test]
    fn test_missing_blob_table_is_empty() {
        let dir = TempDir::new().unwrap();
        let reader = StoreReader::open(&create_store(&dir, false)).unwrap();
        assert!(reader.get(StoreTable::Blob, "composerData:a").unwrap().is_none());
        assert!(reader.scan_prefix(StoreTable::Blob, "composerData:").unwrap().is_empty());
    }

    #[test]
    fn test_store_is_not_modified() {
        let dir = TempDir::new().unwrap();
        let path = create_store(&dir, true);
        let before = fs::read(&path).unwrap();
        {
            let reader = StoreReader::open(&path).unwrap();
            reader.scan_prefix(StoreTable::Blob, "").unwrap();
        }
        assert_eq!(fs::read(&path).unwrap(), before);
    }
}
