// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the collaborators the dispatch engine consumes.
//!
//! Stores and notifiers use `#[async_trait]` for dynamic dispatch
//! compatibility; the engine holds them as `Arc<dyn Trait>`.

pub mod adapter;
pub mod clock;
pub mod conversations;
pub mod directory;
pub mod notifier;
pub mod storage;

pub use adapter::PluginAdapter;
pub use clock::{Clock, SystemClock};
pub use conversations::{AgentSelector, ConversationStore};
pub use directory::DirectoryStore;
pub use notifier::Notifier;
pub use storage::StorageAdapter;
