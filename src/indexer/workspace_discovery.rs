use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{ExtractError, Partitioned};
use crate::models::WorkspaceDescriptor;
use crate::utils::{decode_folder_uri, display_name, validate_file_size};

/// Maximum number of workspace directories visited per scan
const MAX_WORKSPACES: usize = 10_000;

/// Descriptor documents are tiny; anything bigger is not one
const MAX_DESCRIPTOR_BYTES: u64 = 1024 * 1024;

pub const DESCRIPTOR_FILENAME: &str = "workspace.json";
pub const STORE_FILENAME: &str = "state.vscdb";

#[derive(Debug, Deserialize)]
struct DescriptorDocument {
    #[serde(default)]
    folder: Option<String>,
    /// Multi-root workspaces point at a `.code-workspace` file instead
    #[serde(default)]
    workspace: Option<String>,
}

/// Discover all workspaces under the storage root
///
/// Each immediate subdirectory is one workspace. Its `workspace.json` is read and
/// the `folder` URI decoded into a [`WorkspaceDescriptor`]. Subdirectories with a
/// missing or unparseable descriptor are skipped. Descriptors are never merged:
/// several storage ids may decode to the same folder (stale entries) and all are
/// kept.
///
/// Returns an empty Vec if the storage root doesn't exist. Results are sorted by
/// storage id so repeated scans agree.
pub fn discover_workspaces(storage_root: &Path) -> Vec<WorkspaceDescriptor> {
    let scan = scan_workspaces(storage_root);
    for skipped in &scan.skipped {
        debug!("Skipping workspace: {}", skipped);
    }
    scan.ok
}

/// Like [`discover_workspaces`], also reporting why directories were skipped
pub fn scan_workspaces(storage_root: &Path) -> Partitioned<WorkspaceDescriptor> {
    let entries = match fs::read_dir(storage_root) {
        Ok(entries) => entries,
        Err(e) => {
            if storage_root.exists() {
                warn!("Failed to read storage root {}: {}", storage_root.display(), e);
            }
            return Partitioned::default();
        }
    };

    let mut dirs: Vec<PathBuf> = entries.flatten().map(|e| e.path()).filter(|p| p.is_dir()).collect();
    dirs.sort();
    if dirs.len() > MAX_WORKSPACES {
        warn!(
            "Found {} workspace directories; only the first {} are scanned",
            dirs.len(),
            MAX_WORKSPACES
        );
        dirs.truncate(MAX_WORKSPACES);
    }

    dirs.iter().map(|dir| read_descriptor(dir)).collect()
}

/// Decode one workspace directory
pub fn read_descriptor(workspace_dir: &Path) -> Result<WorkspaceDescriptor, ExtractError> {
    let storage_id = workspace_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| ExtractError::malformed_descriptor(workspace_dir, "directory has no name"))?;

    let descriptor_path = workspace_dir.join(DESCRIPTOR_FILENAME);
    let document = read_document(&descriptor_path)?;

    let uri = document
        .folder
        .or(document.workspace)
        .ok_or_else(|| ExtractError::malformed_descriptor(&descriptor_path, "no folder URI"))?;
    let folder_path = decode_folder_uri(&uri)
        .ok_or_else(|| ExtractError::malformed_descriptor(&descriptor_path, format!("undecodable URI '{}'", uri)))?;

    Ok(WorkspaceDescriptor {
        storage_id,
        display_name: display_name(&folder_path),
        folder_path,
        store_path: workspace_dir.join(STORE_FILENAME),
    })
}

fn read_document(path: &Path) -> Result<DescriptorDocument, ExtractError> {
    let mut file = File::open(path).map_err(|e| ExtractError::malformed_descriptor(path, e))?;
    validate_file_size(&file, path, MAX_DESCRIPTOR_BYTES).map_err(|e| ExtractError::malformed_descriptor(path, e))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(|e| ExtractError::malformed_descriptor(path, e))?;
    serde_json::from_str(&contents).map_err(|e| ExtractError::malformed_descriptor(path, e))
}
