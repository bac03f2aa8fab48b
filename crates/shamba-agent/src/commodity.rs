// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Matching free-text crop and livestock names against the commodity catalog.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use shamba_core::{CatalogStore, Commodity, ShambaError};
use shamba_geo::best_match;
use tracing::debug;

use crate::cache::TtlCache;

/// Minimum fuzzy score for a commodity name match.
pub const COMMODITY_MIN_SCORE: u8 = 85;

/// Terms that fuzzy matching gets systematically wrong, mapped to catalog names.
pub const BUILTIN_OVERRIDES: &[(&str, &str)] = &[
    ("ng'ombe", "Dairy Cattle"),
    ("ngombe", "Dairy Cattle"),
    ("cow", "Dairy Cattle"),
    ("cows", "Dairy Cattle"),
    ("dairy", "Dairy Cattle"),
    ("kuku", "Poultry"),
    ("chicken", "Poultry"),
    ("chickens", "Poultry"),
    ("mahindi", "Maize"),
    ("corn", "Maize"),
    ("irish", "Irish Potato"),
    ("potatoes", "Irish Potato"),
    ("sukuma", "Kale"),
    ("sukuma wiki", "Kale"),
];

/// Lowercase long and short names mapped to their commodity.
#[derive(Debug, Default)]
pub struct CommodityIndex {
    by_name: HashMap<String, Commodity>,
    keys: Vec<String>,
}

impl CommodityIndex {
    pub fn new(commodities: Vec<Commodity>) -> Self {
        let mut by_name = HashMap::new();
        for commodity in commodities {
            if let Some(short) = &commodity.short_name {
                by_name
                    .entry(short.trim().to_lowercase())
                    .or_insert_with(|| commodity.clone());
            }
            by_name.insert(commodity.name.trim().to_lowercase(), commodity);
        }
        let mut keys: Vec<String> = by_name.keys().cloned().collect();
        keys.sort();
        Self { by_name, keys }
    }

    pub fn get(&self, name: &str) -> Option<&Commodity> {
        self.by_name.get(&name.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Matched and unmatched commodity names from one extraction.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommodityResolution {
    pub matched: Vec<Commodity>,
    /// Names that matched nothing: a catalog gap, not a missing answer.
    pub unmatched: Vec<String>,
}

/// Resolves commodity names through overrides, then a cached fuzzy lookup.
pub struct CommodityMatcher {
    cache: TtlCache<CommodityIndex>,
    overrides: HashMap<String, String>,
}

impl CommodityMatcher {
    /// `overrides` are merged over [`BUILTIN_OVERRIDES`].
    pub fn new(ttl: Duration, overrides: &BTreeMap<String, String>) -> Self {
        let mut merged: HashMap<String, String> = BUILTIN_OVERRIDES
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        for (from, to) in overrides {
            merged.insert(from.trim().to_lowercase(), to.clone());
        }
        Self {
            cache: TtlCache::new(ttl),
            overrides: merged,
        }
    }

    /// Resolve each raw name, loading the catalog if the cache is stale.
    pub async fn resolve<S>(
        &self,
        store: &S,
        names: &[String],
    ) -> Result<CommodityResolution, ShambaError>
    where
        S: CatalogStore + ?Sized,
    {
        let index = self
            .cache
            .get_or_refresh(|| async move {
                let commodities = store.commodities().await?;
                debug!(count = commodities.len(), "refreshed commodity index");
                Ok::<_, ShambaError>(CommodityIndex::new(commodities))
            })
            .await?;

        let mut resolution = CommodityResolution::default();
        for raw in names {
            match self.match_one(&index, raw) {
                Some(commodity) => {
                    if !resolution.matched.iter().any(|c| c.id == commodity.id) {
                        resolution.matched.push(commodity);
                    }
                }
                None => resolution.unmatched.push(raw.clone()),
            }
        }
        Ok(resolution)
    }

    /// Match a single name against `index`.
    pub fn match_one(&self, index: &CommodityIndex, raw: &str) -> Option<Commodity> {
        let needle = raw.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        if let Some(target) = self.overrides.get(&needle)
            && let Some(commodity) = index.get(target)
        {
            debug!(raw, commodity = %commodity.name, "commodity override");
            return Some(commodity.clone());
        }

        if let Some(commodity) = index.get(&needle) {
            return Some(commodity.clone());
        }

        let found = best_match(&needle, &index.keys, |k| k.as_str(), COMMODITY_MIN_SCORE)?;
        debug!(raw, key = %found.item, score = found.score, "fuzzy commodity match");
        index.get(found.item).cloned()
    }
}
