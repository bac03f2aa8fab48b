// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signup extraction shapes.
//!
//! Each country asks for a different set of fields, so the extraction service
//! returns a closed sum type. It is normalized into [`SignupInformation`] right
//! at the agent boundary and nothing downstream sees the per-country shapes.

use serde::{Deserialize, Serialize};

use crate::types::{BorderId, Country};

/// Kenyan signup fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KenyaSignup {
    pub name: Option<String>,
    pub crops_livestock: Vec<String>,
    pub county: Option<String>,
    pub ward: Option<String>,
    pub nearest_landmark: Option<String>,
}

/// Ugandan signup fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UgandaSignup {
    pub name: Option<String>,
    pub crops_livestock: Vec<String>,
    pub district: Option<String>,
    pub subcounty: Option<String>,
}

/// Zambian signup fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZambiaSignup {
    pub name: Option<String>,
    pub crops_livestock: Vec<String>,
    pub province: Option<String>,
    pub ward: Option<String>,
}

/// Raw extraction output, one variant per country schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "country")]
pub enum SignupExtraction {
    #[serde(rename = "KE")]
    Kenya(KenyaSignup),
    #[serde(rename = "UG")]
    Uganda(UgandaSignup),
    #[serde(rename = "ZM")]
    Zambia(ZambiaSignup),
}

impl SignupExtraction {
    pub fn country(&self) -> Country {
        match self {
            SignupExtraction::Kenya(_) => Country::Kenya,
            SignupExtraction::Uganda(_) => Country::Uganda,
            SignupExtraction::Zambia(_) => Country::Zambia,
        }
    }
}

/// The canonical signup shape used by the rest of the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupInformation {
    pub name: Option<String>,
    pub commodities: Vec<String>,
    pub region1: Option<String>,
    pub region3: Option<String>,
    pub nearest_landmark: Option<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values.into_iter().filter_map(|v| clean(Some(v))) {
        if !out.iter().any(|o| o.eq_ignore_ascii_case(&value)) {
            out.push(value);
        }
    }
    out
}

impl From<SignupExtraction> for SignupInformation {
    fn from(extraction: SignupExtraction) -> Self {
        let (name, commodities, region1, region3, nearest_landmark) = match extraction {
            SignupExtraction::Kenya(k) => {
                (k.name, k.crops_livestock, k.county, k.ward, k.nearest_landmark)
            }
            SignupExtraction::Uganda(u) => {
                (u.name, u.crops_livestock, u.district, u.subcounty, None)
            }
            SignupExtraction::Zambia(z) => (z.name, z.crops_livestock, z.province, z.ward, None),
        };
        SignupInformation {
            name: clean(name),
            commodities: clean_list(commodities),
            region1: clean(region1),
            region3: clean(region3),
            nearest_landmark: clean(nearest_landmark),
        }
    }
}

impl SignupInformation {
    /// Nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.commodities.is_empty()
            && self.region1.is_none()
            && self.region3.is_none()
            && self.nearest_landmark.is_none()
    }
}

/// A level-3 region inferred from a landmark description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkMatch {
    pub border: BorderId,
    /// 0.0 - 1.0
    pub confidence: f64,
}
