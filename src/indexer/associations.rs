//! Workspace → composer id associations
//!
//! The global-fallback tier needs to know which composer ids belong to a
//! workspace when the workspace's own registry is gone. That knowledge is a
//! plain value handed into each resolution call, never a process-wide cache.

use std::collections::HashMap;
use std::path::Path;

use rayon::prelude::*;
use serde_json::Value;
use tracing::debug;

use crate::models::WorkspaceDescriptor;
use crate::parsers::COMPOSER_DATA_PREFIX;
use crate::parsers::code_blocks::uri_path;
use crate::store::scan_blobs;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposerAssociations {
    by_workspace: HashMap<String, Vec<String>>,
}

impl ComposerAssociations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a composer id with a workspace storage id; duplicates are ignored
    pub fn insert(&mut self, storage_id: impl Into<String>, composer_id: impl Into<String>) {
        let ids = self.by_workspace.entry(storage_id.into()).or_default();
        let composer_id = composer_id.into();
        if !ids.contains(&composer_id) {
            ids.push(composer_id);
        }
    }

    pub fn composer_ids(&self, storage_id: &str) -> &[String] {
        self.by_workspace.get(storage_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.by_workspace.values().all(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.by_workspace.values().map(Vec::len).sum()
    }

    /// Derive associations from workspace hints inside global conversation records
    ///
    /// A record is associated with a workspace when its `workspaceIdentifier.id`
    /// equals the storage id, or its `workspaceIdentifier.uri` decodes to the
    /// workspace folder (case-insensitive). A missing or unreadable global store
    /// yields no associations.
    pub fn from_global_store(global_store: &Path, workspaces: &[WorkspaceDescriptor]) -> Self {
        let mut associations = Self::new();
        let records = scan_blobs(global_store, COMPOSER_DATA_PREFIX);

        let pairs: Vec<(String, String)> = records
            .par_iter()
            .filter_map(|record| {
                let composer_id = record.key.strip_prefix(COMPOSER_DATA_PREFIX)?.to_string();
                let value: Value = serde_json::from_slice(&record.value).ok()?;
                let hint = value.get("workspaceIdentifier")?;
                Some(
                    workspaces
                        .iter()
                        .filter(|ws| hint_matches(hint, ws))
                        .map(|ws| (ws.storage_id.clone(), composer_id.clone()))
                        .collect::<Vec<_>>(),
                )
            })
            .flatten()
            .collect();

        for (storage_id, composer_id) in pairs {
            associations.insert(storage_id, composer_id);
        }
        debug!("Derived {} workspace associations from {}", associations.len(), global_store.display());
        associations
    }
}

fn hint_matches(hint: &Value, workspace: &WorkspaceDescriptor) -> bool {
    if hint.get("id").and_then(Value::as_str) == Some(workspace.storage_id.as_str()) {
        return true;
    }
    hint.get("uri")
        .and_then(uri_path)
        .is_some_and(|path| path.to_lowercase() == workspace.folder_path.to_lowercase())
}
