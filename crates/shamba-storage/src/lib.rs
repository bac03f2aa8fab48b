// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence collaborator for the Shamba SMS engine.
//!
//! Provides [`MemoryStore`], a concurrent in-memory implementation of every
//! store trait the engine consumes, and a JSON [`Catalog`] format for seeding
//! it with keywords, templates, vouchers, regions and commodities.

pub mod catalog;
pub mod memory;

pub use catalog::{Catalog, CatalogError, SubscriptionRecord};
pub use memory::{MemoryStore, Subscription, SubscriptionTier};
