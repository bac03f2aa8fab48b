// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Shamba integration tests.
//!
//! Provides mock collaborators and a test harness for fast, deterministic,
//! CI-runnable tests without an SMS gateway or a language model.
//!
//! # Components
//!
//! - [`MockSender`] - Captures dispatches instead of handing them to a gateway
//! - [`MockExtractor`] - Signup agent with scripted extraction results
//! - [`MockCompletion`] - Completion provider with pre-configured replies
//! - [`MockLandmarks`] - Landmark matcher backed by a fixed table
//! - [`TestHarness`] - An [`shamba_router::Engine`] over the fixture catalog

pub mod harness;
pub mod mock_completion;
pub mod mock_extractor;
pub mod mock_landmarks;
pub mod mock_sender;

pub use harness::{FIXTURE_CATALOG, SHORTCODE, TestHarness, TestHarnessBuilder, march};
pub use mock_completion::MockCompletion;
pub use mock_extractor::MockExtractor;
pub use mock_landmarks::MockLandmarks;
pub use mock_sender::MockSender;
