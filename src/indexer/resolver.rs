//! Tiered conversation resolution
//!
//! Answers "which conversations belong to workspace W" and "what is the latest
//! conversation overall" by walking an ordered set of lookup tiers:
//!
//! - **T0 directory match**: find the workspace descriptor by display name or path
//! - **T1 local registry**: the workspace store's `composer.composerData` headers
//! - **T2 global fallback**: associated composer ids looked up in the global store
//! - **T3 global latest**: prefix scan of the global store, most recent wins
//!
//! A tier that fails to read its store is treated exactly like a tier that found
//! nothing. Nothing is retried and nothing is raised.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::associations::ComposerAssociations;
use super::workspace_discovery::discover_workspaces;
use crate::error::{ExtractError, Partitioned};
use crate::filters::ranking::rank;
use crate::models::{NormalizedConversation, NormalizedMessage, RawRecord, SourceTier, StoreTable, WorkspaceDescriptor};
use crate::parsers::{COMPOSER_DATA_PREFIX, Extracted, extract, normalize_bubble, normalize_registry};
use crate::store::{StoreReader, open_or_log};
use crate::utils::ExtractorConfig;

/// Item-table key holding a workspace's composer registry
pub const COMPOSER_REGISTRY_KEY: &str = "composer.composerData";

/// Blob-table key prefix of split-out message bubbles
pub const BUBBLE_PREFIX: &str = "bubbleId:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// A present-but-empty local registry ends resolution (no global fallback)
    pub empty_registry_is_terminal: bool,
    /// Fetch split-out bubbles for headers-only records
    pub hydrate_bubbles: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { empty_registry_is_terminal: true, hydrate_bubbles: true }
    }
}

/// Cooperative cancellation, checked between workspaces
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Diagnostic counts for one resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    /// Tier that produced the result, if any did
    pub tier: Option<SourceTier>,
    pub workspaces_matched: usize,
    pub records_seen: usize,
    pub records_skipped: usize,
    pub stores_failed: usize,
}

impl ResolutionReport {
    fn merge(mut self, other: ResolutionReport) -> Self {
        self.tier = self.tier.or(other.tier);
        self.workspaces_matched += other.workspaces_matched;
        self.records_seen += other.records_seen;
        self.records_skipped += other.records_skipped;
        self.stores_failed += other.stores_failed;
        self
    }

    fn count_skipped(&mut self, skipped: &[ExtractError]) {
        for e in skipped {
            if e.is_store_failure() {
                self.stores_failed += 1;
            } else {
                self.records_skipped += 1;
            }
            debug!("Skipped: {}", e);
        }
    }
}

/// Orchestrates discovery, store reads and normalization
#[derive(Debug, Clone)]
pub struct ConversationResolver {
    storage_root: PathBuf,
    global_store: PathBuf,
    options: ResolveOptions,
}

impl ConversationResolver {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            storage_root: config.storage_root.clone(),
            global_store: config.global_store.clone(),
            options: config.options,
        }
    }

    pub fn global_store(&self) -> &Path {
        &self.global_store
    }

    /// All decodable workspaces under the storage root
    pub fn resolve_workspaces(&self) -> Vec<WorkspaceDescriptor> {
        discover_workspaces(&self.storage_root)
    }

    /// Conversations for the workspace matching `name`, ranked (T0–T2)
    pub fn resolve_conversations_for_workspace(
        &self,
        name: &str,
        associations: &ComposerAssociations,
    ) -> Vec<NormalizedConversation> {
        self.resolve_conversations_for_workspace_with_report(name, associations).0
    }

    pub fn resolve_conversations_for_workspace_with_report(
        &self,
        name: &str,
        associations: &ComposerAssociations,
    ) -> (Vec<NormalizedConversation>, ResolutionReport) {
        let workspaces = self.resolve_workspaces();
        let Some(workspace) = match_workspace(&workspaces, name) else {
            info!("No workspace matches '{}'", name);
            return (Vec::new(), ResolutionReport::default());
        };
        debug!("Workspace '{}' resolved to {} ({})", name, workspace.storage_id, workspace.folder_path);

        let (mut conversations, mut report) = self.resolve_for_descriptor(workspace, associations);
        report.workspaces_matched = 1;
        rank(&mut conversations);
        (conversations, report)
    }

    /// The single most recently active conversation in the global store (T3)
    pub fn resolve_latest_conversation(&self) -> Option<NormalizedConversation> {
        self.resolve_latest_conversation_with_report().0
    }

    pub fn resolve_latest_conversation_with_report(&self) -> (Option<NormalizedConversation>, ResolutionReport) {
        let mut report = ResolutionReport::default();
        let Some(reader) = self.open_store(&self.global_store, &mut report) else {
            return (None, report);
        };

        let records = match reader.scan_prefix(StoreTable::Blob, COMPOSER_DATA_PREFIX) {
            Ok(records) => records,
            Err(e) => {
                warn!("{}", e);
                report.stores_failed += 1;
                return (None, report);
            }
        };

        let mut conversations = self.normalize_batch(&reader, &records, SourceTier::GlobalLatest, &mut report);
        rank(&mut conversations);
        let latest = conversations.into_iter().next();
        if latest.is_some() {
            report.tier = Some(SourceTier::GlobalLatest);
        }
        (latest, report)
    }

    /// Conversations of every workspace, resolved concurrently and ranked together
    ///
    /// Each workspace's store is opened and closed inside its own task. When
    /// `cancel` is raised, workspaces not yet started are skipped and whatever
    /// has been collected is returned.
    pub fn resolve_all_conversations(
        &self,
        associations: &ComposerAssociations,
        cancel: &CancelFlag,
    ) -> (Vec<NormalizedConversation>, ResolutionReport) {
        let workspaces = self.resolve_workspaces();
        let results: Vec<(Vec<NormalizedConversation>, ResolutionReport)> = workspaces
            .par_iter()
            .map(|workspace| {
                if cancel.is_cancelled() {
                    return (Vec::new(), ResolutionReport::default());
                }
                let (conversations, mut report) = self.resolve_for_descriptor(workspace, associations);
                report.workspaces_matched = 1;
                (conversations, report)
            })
            .collect();

        let mut all = Vec::new();
        let mut report = ResolutionReport::default();
        for (conversations, r) in results {
            all.extend(conversations);
            report = report.merge(r);
        }
        if cancel.is_cancelled() {
            info!("Resolution cancelled after {} workspaces", report.workspaces_matched);
        }
        rank(&mut all);
        (all, report)
    }

    /// T1 then T2 for one already-matched workspace
    fn resolve_for_descriptor(
        &self,
        workspace: &WorkspaceDescriptor,
        associations: &ComposerAssociations,
    ) -> (Vec<NormalizedConversation>, ResolutionReport) {
        let mut report = ResolutionReport::default();

        if let Some(conversations) = self.local_registry(workspace, &mut report) {
            report.tier = Some(SourceTier::LocalRegistry);
            return (conversations, report);
        }

        let conversations = self.global_fallback(workspace, associations, &mut report);
        if !conversations.is_empty() {
            report.tier = Some(SourceTier::GlobalFallback);
        }
        (conversations, report)
    }

    /// T1: `None` means "registry absent or unreadable", so T2 runs
    fn local_registry(
        &self,
        workspace: &WorkspaceDescriptor,
        report: &mut ResolutionReport,
    ) -> Option<Vec<NormalizedConversation>> {
        let reader = self.open_store(&workspace.store_path, report)?;
        let record = match reader.get(StoreTable::Item, COMPOSER_REGISTRY_KEY) {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                warn!("{}", e);
                report.stores_failed += 1;
                return None;
            }
        };
        drop(reader);
        report.records_seen += 1;

        match normalize_registry(&record.value) {
            Ok(headers) if headers.is_empty() && !self.options.empty_registry_is_terminal => {
                debug!("Empty registry for {}; trying global fallback", workspace.storage_id);
                None
            }
            Ok(headers) => {
                debug!("Registry for {} lists {} composers", workspace.storage_id, headers.len());
                Some(headers.into_iter().map(|c| c.with_workspace(workspace)).collect())
            }
            Err(e) => {
                debug!("Unreadable registry in {}: {}", workspace.store_path.display(), e);
                report.records_skipped += 1;
                None
            }
        }
    }

    /// T2: full records for the workspace's associated composer ids
    fn global_fallback(
        &self,
        workspace: &WorkspaceDescriptor,
        associations: &ComposerAssociations,
        report: &mut ResolutionReport,
    ) -> Vec<NormalizedConversation> {
        let ids = associations.composer_ids(&workspace.storage_id);
        if ids.is_empty() {
            return Vec::new();
        }
        let Some(reader) = self.open_store(&self.global_store, report) else {
            return Vec::new();
        };

        let lookups: Partitioned<Option<RawRecord>> = ids
            .iter()
            .map(|id| reader.get(StoreTable::Blob, &format!("{}{}", COMPOSER_DATA_PREFIX, id)))
            .collect();
        report.count_skipped(&lookups.skipped);
        let records: Vec<RawRecord> = lookups.ok.into_iter().flatten().collect();

        self.normalize_batch(&reader, &records, SourceTier::GlobalFallback, report)
            .into_iter()
            .map(|c| c.with_workspace(workspace))
            .collect()
    }

    /// Normalize records in parallel, then hydrate headers-only ones
    fn normalize_batch(
        &self,
        reader: &StoreReader,
        records: &[RawRecord],
        tier: SourceTier,
        report: &mut ResolutionReport,
    ) -> Vec<NormalizedConversation> {
        report.records_seen += records.len();
        let extracted: Partitioned<Extracted> = records.par_iter().map(extract).collect::<Vec<_>>().into_iter().collect();
        report.count_skipped(&extracted.skipped);

        extracted
            .ok
            .into_iter()
            .map(|e| {
                let conversation = if e.pending_bubbles.is_empty() || !self.options.hydrate_bubbles {
                    e.conversation
                } else {
                    let messages = hydrate(reader, &e.conversation.id, &e.pending_bubbles);
                    e.conversation.with_messages(messages)
                };
                conversation.with_tier(tier)
            })
            .collect()
    }

    fn open_store(&self, path: &Path, report: &mut ResolutionReport) -> Option<StoreReader> {
        let reader = open_or_log(path);
        if reader.is_none() && path.exists() {
            report.stores_failed += 1;
        }
        reader
    }
}

/// Fetch and normalize the split-out bubbles of one conversation, in order
fn hydrate(reader: &StoreReader, composer_id: &str, bubble_ids: &[String]) -> Vec<NormalizedMessage> {
    bubble_ids
        .iter()
        .filter_map(|bubble_id| {
            let key = format!("{}{}:{}", BUBBLE_PREFIX, composer_id, bubble_id);
            match reader.get(StoreTable::Blob, &key) {
                Ok(Some(record)) => normalize_bubble(&record).unwrap_or_else(|e| {
                    debug!("{}", e);
                    None
                }),
                Ok(None) => None,
                Err(e) => {
                    debug!("{}", e);
                    None
                }
            }
        })
        .collect()
}

/// T0: pick the descriptor for a workspace query
///
/// Exact display-name matches beat folder-path substring matches. Among equal
/// matches (stale duplicates of one folder) the most recently modified store wins.
pub fn match_workspace<'a>(workspaces: &'a [WorkspaceDescriptor], query: &str) -> Option<&'a WorkspaceDescriptor> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }

    let by_name: Vec<&WorkspaceDescriptor> = workspaces.iter().filter(|w| w.matches_name(query)).collect();
    let candidates = if by_name.is_empty() {
        workspaces.iter().filter(|w| w.matches_path(query)).collect()
    } else {
        by_name
    };

    candidates.into_iter().max_by_key(|w| {
        let modified = w.store_path.metadata().and_then(|m| m.modified()).ok();
        // Ties fall to the greatest storage id so the choice is deterministic
        (modified, w.storage_id.clone())
    })
}
