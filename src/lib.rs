//! Composer History - Recover editor chat conversations from local state stores
//!
//! The editor keeps conversation history in many small SQLite stores: one
//! global store plus one per workspace, written by builds with different record
//! schemas. This library reassembles them into one uniform model:
//!
//! - Discovering workspaces and decoding their folder URIs
//! - Reading stores read-only by exact key or key prefix
//! - Normalizing legacy, rich-text, headers-only and registry records
//! - Resolving a workspace's conversations through ordered fallback tiers
//! - Ranking conversations by their last activity
//!
//! Nothing is ever written to the stores, and no single broken store, descriptor
//! or record fails a whole query.
//!
//! # Example
//!
//! ```no_run
//! use composer_history::{ComposerAssociations, ConversationResolver, ExtractorConfig};
//!
//! let config = ExtractorConfig::discover(None)?;
//! let resolver = ConversationResolver::new(&config);
//! for conversation in resolver.resolve_conversations_for_workspace("my-app", &ComposerAssociations::new()) {
//!     println!("{} ({} messages)", conversation.id, conversation.messages.len());
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cli;
pub mod error;
pub mod filters;
pub mod indexer;
pub mod models;
pub mod parsers;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use error::ExtractError;
pub use filters::{effective_activity_time, filter_exportable, rank, ranked};
pub use indexer::{CancelFlag, ComposerAssociations, ConversationResolver, ResolutionReport, ResolveOptions};
pub use models::{NormalizedConversation, NormalizedMessage, Role, SourceTier, WorkspaceDescriptor};
pub use parsers::{normalize_record, normalize_registry};
pub use utils::{ExtractorConfig, decode_folder_uri, display_name};
