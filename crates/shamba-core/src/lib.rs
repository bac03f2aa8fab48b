// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Shamba SMS engine.
//!
//! This crate provides the domain model, the error type, and the collaborator
//! traits (persistence, delivery, signup extraction) the rest of the workspace
//! is written against.

pub mod error;
pub mod model;
pub mod signup;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ExtractionFailed, ShambaError};
pub use model::*;
pub use signup::*;
pub use types::*;

pub use traits::{
    CatalogStore, CompletionProvider, CustomerStore, Dispatch, LandmarkMatcher, MessageSender,
    MessageStore, PluginAdapter, SendOptions, SignupAgent, Store, TaskStore,
};
