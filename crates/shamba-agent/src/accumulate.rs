// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Validating extracted signup fields and accumulating them on the customer.
//!
//! Accumulation is monotonic: a field already set on the customer is never
//! overwritten, whatever a later extraction says. Each of name, commodities,
//! level-1 region and level-3 region is completed independently.

use std::sync::Arc;
use std::time::Duration;

use shamba_config::model::AgentConfig;
use shamba_core::{
    Border, BorderId, BorderLevel, CatalogStore, Country, Customer, LandmarkMatcher,
    ShambaError, SignupInformation,
};
use shamba_geo::{RegionIndex, rank};
use tracing::{debug, info, warn};

use crate::commodity::CommodityMatcher;

/// Minimum fuzzy score for region names given by the farmer.
pub const REGION_MIN_SCORE: u8 = 90;

/// A signup field, in the order missing fields are listed to the farmer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SignupField {
    Name,
    Commodities,
    Region1,
    Region3,
}

impl SignupField {
    pub const ALL: [SignupField; 4] = [
        SignupField::Name,
        SignupField::Commodities,
        SignupField::Region1,
        SignupField::Region3,
    ];

    /// How the field is named in a reply to a farmer in `country`.
    pub fn label(&self, country: Country) -> &'static str {
        match self {
            SignupField::Name => "name",
            SignupField::Commodities => "crops or livestock",
            SignupField::Region1 => country.level_word(BorderLevel::Level1),
            SignupField::Region3 => country.level_word(BorderLevel::Level3),
        }
    }
}

/// Why a human has to finish this signup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intervention {
    /// The farmer named a commodity missing from the catalog.
    UnmatchedCommodity(String),
    /// The level-3 region lies outside the level-1 region already known.
    RegionConflict { region1: BorderId, region3: BorderId },
}

impl std::fmt::Display for Intervention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intervention::UnmatchedCommodity(name) => {
                write!(f, "commodity \"{name}\" is not in the catalog")
            }
            Intervention::RegionConflict { region1, region3 } => {
                write!(f, "region {region3} does not belong to region {region1}")
            }
        }
    }
}

/// Overall state of a signup after one extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupStatus {
    Complete,
    Partial,
    /// Every field is still unresolved; the message was probably not a signup.
    Unrelated,
    NeedsHuman,
}

/// Result of applying one extraction to a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupOutcome {
    pub updated: Vec<SignupField>,
    pub missing: Vec<SignupField>,
    pub interventions: Vec<Intervention>,
}

impl SignupOutcome {
    pub fn status(&self) -> SignupStatus {
        if !self.interventions.is_empty() {
            SignupStatus::NeedsHuman
        } else if self.missing.is_empty() {
            SignupStatus::Complete
        } else if self.updated.is_empty() && self.missing.len() == SignupField::ALL.len() {
            SignupStatus::Unrelated
        } else {
            SignupStatus::Partial
        }
    }

    /// Comma-separated labels of the missing fields, in stable order.
    pub fn missing_labels(&self, country: Country) -> String {
        self.missing
            .iter()
            .map(|f| f.label(country))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Applies validated signup fields to customers.
pub struct SignupAccumulator {
    commodities: CommodityMatcher,
    landmarks: Option<Arc<dyn LandmarkMatcher>>,
    landmark_countries: Vec<Country>,
    landmark_min_confidence: f64,
}

impl SignupAccumulator {
    pub fn new(config: &AgentConfig, landmarks: Option<Arc<dyn LandmarkMatcher>>) -> Self {
        Self {
            commodities: CommodityMatcher::new(
                Duration::from_secs(config.commodity_cache_ttl_secs),
                &config.commodity_overrides,
            ),
            landmarks,
            landmark_countries: Country::ALL
                .into_iter()
                .filter(|c| config.landmarks_enabled_for(*c))
                .collect(),
            landmark_min_confidence: config.landmark_min_confidence,
        }
    }

    /// Fill unset fields of `customer` from `info` and report what remains.
    pub async fn apply<S>(
        &self,
        store: &S,
        customer: &mut Customer,
        country: Country,
        info: &SignupInformation,
    ) -> Result<SignupOutcome, ShambaError>
    where
        S: CatalogStore + ?Sized,
    {
        let mut updated = Vec::new();
        let mut interventions = Vec::new();

        if customer.name.is_none()
            && let Some(name) = &info.name
        {
            customer.name = Some(name.clone());
            updated.push(SignupField::Name);
        }

        if customer.commodities.is_empty() && !info.commodities.is_empty() {
            let resolution = self.commodities.resolve(store, &info.commodities).await?;
            if !resolution.matched.is_empty() {
                customer.commodities = resolution.matched.iter().map(|c| c.id).collect();
                updated.push(SignupField::Commodities);
            }
            interventions.extend(
                resolution
                    .unmatched
                    .into_iter()
                    .map(Intervention::UnmatchedCommodity),
            );
        }

        let index = load_regions(store, country).await?;

        if customer.border1.is_none()
            && let Some(region1) = &info.region1
        {
            let level1 = index.at_level(BorderLevel::Level1);
            if let Some(border) = unique_best(region1, &level1) {
                debug!(customer_id = %customer.id, region = %border.name, "resolved level-1 region");
                customer.border1 = Some(border.id);
                customer.border0 = customer.border0.or(border.parent);
                updated.push(SignupField::Region1);
            }
        }

        if customer.border3.is_none()
            && let Some(border3) = self.resolve_region3(&index, customer, country, info).await
        {
            let ancestor1 = index.ancestor(&border3, BorderLevel::Level1).map(|b| b.id);
            match (customer.border1, ancestor1) {
                (Some(region1), Some(parent)) if region1 != parent => {
                    warn!(
                        customer_id = %customer.id,
                        region = %border3.name,
                        "level-3 region conflicts with known level-1 region"
                    );
                    interventions.push(Intervention::RegionConflict {
                        region1,
                        region3: border3.id,
                    });
                }
                _ => {
                    customer.border3 = Some(border3.id);
                    if customer.border2.is_none() {
                        customer.border2 = index.ancestor(&border3, BorderLevel::Level2).map(|b| b.id);
                    }
                    if customer.border1.is_none() && ancestor1.is_some() {
                        customer.border1 = ancestor1;
                        updated.push(SignupField::Region1);
                    }
                    if customer.border0.is_none() {
                        customer.border0 =
                            index.ancestor(&border3, BorderLevel::Country).map(|b| b.id);
                    }
                    updated.push(SignupField::Region3);
                }
            }
        }

        updated.sort();
        let missing = missing_fields(customer);
        info!(
            customer_id = %customer.id,
            updated = updated.len(),
            missing = missing.len(),
            interventions = interventions.len(),
            "applied signup extraction"
        );
        Ok(SignupOutcome {
            updated,
            missing,
            interventions,
        })
    }

    async fn resolve_region3(
        &self,
        index: &RegionIndex,
        customer: &Customer,
        country: Country,
        info: &SignupInformation,
    ) -> Option<Border> {
        if let Some(region3) = &info.region3 {
            let level3 = index.at_level(BorderLevel::Level3);
            if let Some(border) = unique_best(region3, &level3) {
                return Some(border.clone());
            }
        }

        let landmark = info.nearest_landmark.as_deref()?;
        let matcher = self.landmarks.as_ref()?;
        let region1 = customer.border1?;
        if !self.landmark_countries.contains(&country) {
            return None;
        }

        match matcher.locate(landmark, country, region1).await {
            Ok(Some(found)) if found.confidence >= self.landmark_min_confidence => {
                debug!(landmark, confidence = found.confidence, "landmark resolved region");
                index.get(found.border).cloned()
            }
            Ok(Some(found)) => {
                debug!(landmark, confidence = found.confidence, "landmark match below floor");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(landmark, "landmark lookup failed: {e}");
                None
            }
        }
    }
}

/// Fields still unset on `customer`, in [`SignupField`] order.
pub fn missing_fields(customer: &Customer) -> Vec<SignupField> {
    SignupField::ALL
        .into_iter()
        .filter(|field| match field {
            SignupField::Name => customer.name.is_none(),
            SignupField::Commodities => customer.commodities.is_empty(),
            SignupField::Region1 => customer.border1.is_none(),
            SignupField::Region3 => customer.border3.is_none(),
        })
        .collect()
}

async fn load_regions<S>(store: &S, country: Country) -> Result<RegionIndex, ShambaError>
where
    S: CatalogStore + ?Sized,
{
    let mut borders = Vec::new();
    for level in [
        BorderLevel::Country,
        BorderLevel::Level1,
        BorderLevel::Level2,
        BorderLevel::Level3,
    ] {
        borders.extend(store.borders(country, level).await?);
    }
    Ok(RegionIndex::new(borders))
}

/// The single best name match at or above [`REGION_MIN_SCORE`]; ties resolve to nothing.
fn unique_best<'a>(query: &str, borders: &'a [Border]) -> Option<&'a Border> {
    let ranked = rank(query, borders, |b| b.name.as_str());
    let top = ranked.first().filter(|r| r.score >= REGION_MIN_SCORE)?;
    if ranked.get(1).is_some_and(|r| r.score == top.score) {
        return None;
    }
    Some(top.item)
}
