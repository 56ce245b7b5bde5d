//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use composer_history::ExtractorConfig;
use rusqlite::{Connection, params};
use serde_json::{Value, json};
use tempfile::TempDir;

/// Builder for creating test user-data directories with workspace and global stores
pub struct StorageBuilder {
    temp_dir: TempDir,
}

impl StorageBuilder {
    /// Create a new builder with empty `workspaceStorage` and `globalStorage` directories
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(temp_dir.path().join("User/workspaceStorage")).expect("Failed to create workspaceStorage");
        fs::create_dir_all(temp_dir.path().join("User/globalStorage")).expect("Failed to create globalStorage");
        Self { temp_dir }
    }

    /// Get the path to the user-data directory
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn workspace_dir(&self, storage_id: &str) -> PathBuf {
        self.temp_dir.path().join("User/workspaceStorage").join(storage_id)
    }

    pub fn global_store_path(&self) -> PathBuf {
        self.temp_dir.path().join("User/globalStorage/state.vscdb")
    }

    /// Add a workspace folder with a descriptor and an empty store
    pub fn with_workspace(self, storage_id: &str, folder_uri: &str) -> Self {
        let descriptor = json!({ "folder": folder_uri }).to_string();
        let builder = self.with_raw_descriptor(storage_id, &descriptor);
        create_store(&builder.workspace_dir(storage_id).join("state.vscdb"));
        builder
    }

    /// Add a workspace folder whose descriptor has the given raw content and no store
    pub fn with_raw_descriptor(self, storage_id: &str, content: &str) -> Self {
        let dir = self.workspace_dir(storage_id);
        fs::create_dir_all(&dir).expect("Failed to create workspace dir");
        fs::write(dir.join("workspace.json"), content).expect("Failed to write workspace.json");
        self
    }

    /// Write a composer registry into a workspace store
    pub fn with_registry(self, storage_id: &str, registry: &Value) -> Self {
        let path = self.workspace_dir(storage_id).join("state.vscdb");
        insert(&path, "ItemTable", "composer.composerData", registry.to_string().as_bytes());
        self
    }

    /// Replace a workspace store with a file that is not a database
    pub fn with_corrupt_store(self, storage_id: &str) -> Self {
        let path = self.workspace_dir(storage_id).join("state.vscdb");
        fs::write(path, vec![b'x'; 4096]).expect("Failed to write corrupt store");
        self
    }

    /// Insert a record into the global store's blob table
    pub fn with_global_record(self, key: &str, value: &Value) -> Self {
        self.with_global_raw(key, value.to_string().as_bytes())
    }

    pub fn with_global_raw(self, key: &str, value: &[u8]) -> Self {
        insert(&self.global_store_path(), "cursorDiskKV", key, value);
        self
    }

    /// Insert a full conversation record under `composerData:<id>`
    pub fn with_conversation(self, record: &Value) -> Self {
        let id = record["composerId"].as_str().expect("record needs a composerId").to_string();
        self.with_global_record(&format!("composerData:{}", id), record)
    }

    pub fn config(&self) -> ExtractorConfig {
        ExtractorConfig::from_user_data_dir(self.temp_dir.path())
    }

    /// Build and return the temp directory (consumes self)
    pub fn build(self) -> TempDir {
        self.temp_dir
    }
}

impl Default for StorageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a store with both tables if it does not exist yet
pub fn create_store(path: &Path) {
    let conn = Connection::open(path).expect("Failed to open store");
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS ItemTable (key TEXT UNIQUE ON CONFLICT REPLACE, value BLOB);
         CREATE TABLE IF NOT EXISTS cursorDiskKV (key TEXT UNIQUE ON CONFLICT REPLACE, value BLOB);",
    )
    .expect("Failed to create tables");
}

fn insert(path: &Path, table: &str, key: &str, value: &[u8]) {
    create_store(path);
    let conn = Connection::open(path).expect("Failed to open store");
    conn.execute(&format!("INSERT INTO {} (key, value) VALUES (?1, ?2)", table), params![key, value])
        .expect("Failed to insert record");
}

/// Legacy record: `(type, text)` pairs with direct text
pub fn legacy_record(composer_id: &str, created_at: i64, turns: &[(u8, &str)]) -> Value {
    let conversation: Vec<Value> = turns.iter().map(|(kind, text)| json!({ "type": kind, "text": text })).collect();
    json!({ "composerId": composer_id, "createdAt": created_at, "conversation": conversation })
}

/// Assistant message that finished at `end` (epoch milliseconds)
pub fn timed_reply(text: &str, start: i64, end: i64) -> Value {
    json!({
        "type": 2,
        "text": text,
        "timingInfo": { "clientStartTime": start, "clientEndTime": end }
    })
}

/// Serialized rich-text document with one paragraph and one code node
pub fn rich_text_doc(paragraph: &str, code: &str, language: &str) -> String {
    json!({
        "root": {
            "type": "root",
            "children": [
                { "type": "paragraph", "children": [{ "type": "text", "text": paragraph }] },
                { "type": "code", "language": language, "children": [{ "type": "text", "text": code }] }
            ]
        }
    })
    .to_string()
}

/// Registry value listing the given `(composerId, name, createdAt)` headers
pub fn registry(headers: &[(&str, &str, i64)]) -> Value {
    let all: Vec<Value> = headers
        .iter()
        .map(|(id, name, created_at)| json!({ "composerId": id, "name": name, "createdAt": created_at }))
        .collect();
    json!({ "allComposers": all, "selectedComposerId": headers.first().map(|h| h.0) })
}
