use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceDescriptor {
    /// Opaque directory name under the storage root
    pub storage_id: String,
    /// Decoded folder path, e.g. `/Users/alice/project` or `C:/Users/alice/project`
    pub folder_path: String,
    /// Final segment of `folder_path`
    pub display_name: String,
    /// The workspace's `state.vscdb`
    pub store_path: PathBuf,
}

impl WorkspaceDescriptor {
    /// Case-insensitive exact match on the display name
    pub fn matches_name(&self, query: &str) -> bool {
        self.display_name.to_lowercase() == query.to_lowercase()
    }

    /// Case-insensitive substring match on the folder path
    pub fn matches_path(&self, query: &str) -> bool {
        !query.is_empty() && self.folder_path.to_lowercase().contains(&query.to_lowercase())
    }
}
