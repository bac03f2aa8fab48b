// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! The engine never talks to a database, an SMS gateway or a language model
//! directly; it goes through these traits. All of them extend [`PluginAdapter`]
//! and use `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod agent;
pub mod sender;
pub mod store;

pub use adapter::PluginAdapter;
pub use agent::{CompletionProvider, LandmarkMatcher, SignupAgent};
pub use sender::{Dispatch, MessageSender, SendOptions};
pub use store::{CatalogStore, CustomerStore, MessageStore, Store, TaskStore};
