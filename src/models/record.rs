use std::path::PathBuf;

/// The two logical tables every store exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreTable {
    /// Small string-or-JSON values, queried by exact key
    Item,
    /// Bulky JSON values, queried by exact key or key prefix
    Blob,
}

impl StoreTable {
    pub fn table_name(self) -> &'static str {
        match self {
            StoreTable::Item => "ItemTable",
            StoreTable::Blob => "cursorDiskKV",
        }
    }
}

/// One undecoded value, tagged with where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub store: PathBuf,
    pub table: StoreTable,
    pub key: String,
    pub value: Vec<u8>,
}

impl RawRecord {
    /// A record that did not come from a store (direct extraction callers)
    pub fn detached(value: impl Into<Vec<u8>>) -> Self {
        Self { store: PathBuf::new(), table: StoreTable::Blob, key: String::new(), value: value.into() }
    }

    pub fn key(&self) -> Option<&str> {
        if self.key.is_empty() { None } else { Some(&self.key) }
    }
}
