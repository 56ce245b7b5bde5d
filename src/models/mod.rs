//! Data models for recovered conversation history.
//!
//! - [`WorkspaceDescriptor`] - A workspace directory decoded from its `workspace.json`
//! - [`RawRecord`] - One undecoded value read from a store, with its origin
//! - [`NormalizedMessage`] / [`NormalizedConversation`] - The uniform model every
//!   schema generation is normalized into
//!
//! All of these are constructed fresh per query and never mutated afterwards;
//! builders such as [`NormalizedConversation::with_workspace`] consume `self`
//! and return a new value.

pub mod conversation;
pub mod record;
pub mod workspace;

pub use conversation::{CodeBlock, NormalizedConversation, NormalizedMessage, Role, SourceTier, Timing};
pub use record::{RawRecord, StoreTable};
pub use workspace::WorkspaceDescriptor;
