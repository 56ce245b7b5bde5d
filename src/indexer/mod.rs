//! Workspace discovery and conversation resolution
//!
//! # Error Handling Strategy
//!
//! Resolution is best-effort across many small stores:
//!
//! - **Workspace-level failures**: a workspace with a broken descriptor is skipped during
//!   discovery; a workspace whose store is missing or corrupt contributes nothing.
//!
//! - **Tier-level failures**: a store read that fails inside a tier counts as "this tier
//!   found nothing" and control falls to the next tier. Nothing is retried.
//!
//! - **Record-level failures**: records that fail normalization are dropped and counted
//!   in the [`ResolutionReport`]; their siblings are still returned.
//!
//! The only outcome surfaced to callers is an empty result; the report carries counts
//! for diagnostics.

pub mod associations;
pub mod resolver;
pub mod workspace_discovery;

pub use associations::ComposerAssociations;
pub use resolver::{
    BUBBLE_PREFIX, COMPOSER_REGISTRY_KEY, CancelFlag, ConversationResolver, ResolutionReport, ResolveOptions,
    match_workspace,
};
pub use workspace_discovery::{discover_workspaces, read_descriptor, scan_workspaces};
