use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::WorkspaceDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub code: String,
    pub language: String,
    pub file_path: Option<String>,
    pub line_start: Option<u32>,
    pub line_end: Option<u32>,
}

/// Client-side timing window of a message, epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    pub role: Role,
    pub text: String,
    pub code_blocks: Vec<CodeBlock>,
    pub timing: Option<Timing>,
}

impl NormalizedMessage {
    /// Messages without text and without code are not retained
    pub fn has_content(&self) -> bool {
        !self.text.is_empty() || !self.code_blocks.is_empty()
    }
}

/// Which lookup tier produced a conversation. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceTier {
    /// Normalized directly from bytes handed in by the caller
    Direct,
    /// Header from a workspace's own composer registry (no messages)
    LocalRegistry,
    /// Full record from the global store, found through a workspace association
    GlobalFallback,
    /// Most recent record in the global store, no workspace involved
    GlobalLatest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedConversation {
    pub id: String,
    /// Epoch milliseconds
    pub created_at: i64,
    pub name: Option<String>,
    pub messages: Vec<NormalizedMessage>,
    pub workspace_name: Option<String>,
    pub workspace_path: Option<PathBuf>,
    pub source_tier: SourceTier,
}

impl NormalizedConversation {
    pub fn new(id: impl Into<String>, created_at: i64, source_tier: SourceTier) -> Self {
        Self {
            id: id.into(),
            created_at,
            name: None,
            messages: Vec::new(),
            workspace_name: None,
            workspace_path: None,
            source_tier,
        }
    }

    pub fn with_name(self, name: Option<String>) -> Self {
        Self { name: name.filter(|n| !n.trim().is_empty()), ..self }
    }

    pub fn with_messages(self, messages: Vec<NormalizedMessage>) -> Self {
        Self { messages, ..self }
    }

    pub fn with_workspace(self, workspace: &WorkspaceDescriptor) -> Self {
        Self {
            workspace_name: Some(workspace.display_name.clone()),
            workspace_path: Some(PathBuf::from(&workspace.folder_path)),
            ..self
        }
    }

    pub fn with_tier(self, source_tier: SourceTier) -> Self {
        Self { source_tier, ..self }
    }

    /// True when at least one retained message came from the assistant
    pub fn has_assistant_content(&self) -> bool {
        self.messages.iter().any(|m| m.role == Role::Assistant)
    }

    pub fn is_metadata_only(&self) -> bool {
        self.messages.is_empty()
    }
}

// `source_tier` records provenance and is deliberately left out of equality.
impl PartialEq for NormalizedConversation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.created_at == other.created_at
            && self.name == other.name
            && self.messages == other.messages
            && self.workspace_name == other.workspace_name
            && self.workspace_path == other.workspace_path
    }
}

impl Eq for NormalizedConversation {}
