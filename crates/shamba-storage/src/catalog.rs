// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hand-authored JSON catalogs.
//!
//! Records reference each other by name rather than by id: keywords list the
//! template names they trigger, and borders name their parent (or an explicit
//! `key` where names repeat). Ids are generated when the catalog is loaded.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use shamba_core::{
    Border, BorderId, BorderLevel, Commodity, CommodityId, CommodityKind, Country, Customer,
    CustomerStore, Keyword, KeywordId, Language, Offer, OfferId, OfferKind, ResponseTemplate,
    ShambaError, TemplateAction, TemplateId, Voucher, VoucherId,
};

use crate::memory::{MemoryStore, Subscription, SubscriptionTier};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("keyword `{keyword}` references unknown template `{template}`")]
    UnknownTemplate { keyword: String, template: String },

    #[error("border `{border}` references unknown parent `{parent}`")]
    UnknownParent { border: String, parent: String },

    #[error("border key `{0}` is used more than once")]
    DuplicateBorder(String),
}

impl From<CatalogError> for ShambaError {
    fn from(err: CatalogError) -> Self {
        ShambaError::Config(err.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateRecord {
    pub name: String,
    pub translations: BTreeMap<Language, String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub action: TemplateAction,
    #[serde(default)]
    pub assign_category: Option<String>,
    /// Empty means the template applies everywhere.
    #[serde(default)]
    pub countries: Vec<Country>,
    #[serde(default)]
    pub protected: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordRecord {
    pub text: String,
    pub templates: Vec<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BorderRecord {
    pub country: Country,
    pub level: BorderLevel,
    pub name: String,
    /// Unique handle for this border; defaults to the name.
    #[serde(default)]
    pub key: Option<String>,
    /// Key of the parent border.
    #[serde(default)]
    pub parent: Option<String>,
}

impl BorderRecord {
    fn key(&self) -> String {
        let key = self.key.as_deref().unwrap_or(&self.name);
        format!("{}:{}", self.country.code(), key.to_lowercase())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommodityRecord {
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    pub kind: CommodityKind,
    #[serde(default)]
    pub event_based: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfferRecord {
    pub name: String,
    pub kind: OfferKind,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[serde(default)]
    pub repeatable: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoucherRecord {
    pub code: String,
    pub offer: OfferRecord,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionRecord {
    pub tier: SubscriptionTier,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerRecord {
    pub phone: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preferred_language: Option<Language>,
    #[serde(default)]
    pub registered: bool,
    #[serde(default)]
    pub subscription: Option<SubscriptionRecord>,
}

fn default_true() -> bool {
    true
}

/// Reference data and pre-existing customers for a [`MemoryStore`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Catalog {
    pub templates: Vec<TemplateRecord>,
    pub keywords: Vec<KeywordRecord>,
    pub borders: Vec<BorderRecord>,
    pub commodities: Vec<CommodityRecord>,
    pub vouchers: Vec<VoucherRecord>,
    pub customers: Vec<CustomerRecord>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Resolve references and load every record into a new store.
    pub async fn into_store(self) -> Result<MemoryStore, ShambaError> {
        let store = MemoryStore::new();

        let mut template_ids: HashMap<String, Vec<TemplateId>> = HashMap::new();
        for record in &self.templates {
            let template = ResponseTemplate {
                id: TemplateId::new(),
                name: record.name.clone(),
                translations: record.translations.clone(),
                sender: record.sender.clone(),
                action: record.action,
                assign_category: record.assign_category.clone(),
                all_countries: record.countries.is_empty(),
                countries: record.countries.clone(),
                protected: record.protected,
            };
            template_ids
                .entry(record.name.clone())
                .or_default()
                .push(template.id);
            store.insert_template(template);
        }

        for record in &self.keywords {
            let mut templates = Vec::new();
            for name in &record.templates {
                let ids = template_ids
                    .get(name)
                    .ok_or_else(|| CatalogError::UnknownTemplate {
                        keyword: record.text.clone(),
                        template: name.clone(),
                    })?;
                templates.extend(ids.iter().copied());
            }
            store.insert_keyword(Keyword {
                id: KeywordId::new(),
                text: record.text.trim().to_uppercase(),
                is_active: record.active,
                templates,
            });
        }

        for border in resolve_borders(&self.borders)? {
            store.insert_border(border);
        }

        for record in &self.commodities {
            store.insert_commodity(Commodity {
                id: CommodityId::new(),
                name: record.name.clone(),
                short_name: record.short_name.clone(),
                kind: record.kind,
                event_based: record.event_based,
            });
        }

        for record in &self.vouchers {
            store.insert_voucher(Voucher {
                id: VoucherId::new(),
                code: record.code.trim().to_uppercase(),
                offer: Offer {
                    id: OfferId::new(),
                    name: record.offer.name.clone(),
                    kind: record.offer.kind.clone(),
                    valid_from: record.offer.valid_from,
                    valid_until: record.offer.valid_until,
                    repeatable: record.offer.repeatable,
                },
                used_by: None,
                used_at: None,
            });
        }

        for record in &self.customers {
            let mut customer = Customer::new(record.phone.trim(), Utc::now());
            customer.name = record.name.clone();
            customer.preferred_language = record.preferred_language;
            customer.is_registered = record.registered;
            store.save_customer(&customer).await?;
            if let Some(subscription) = &record.subscription {
                store.set_subscription(
                    customer.id,
                    Subscription {
                        tier: subscription.tier,
                        ends_at: subscription.ends_at,
                    },
                );
            }
        }

        info!(
            templates = self.templates.len(),
            keywords = self.keywords.len(),
            borders = self.borders.len(),
            commodities = self.commodities.len(),
            vouchers = self.vouchers.len(),
            customers = self.customers.len(),
            "catalog loaded"
        );
        Ok(store)
    }
}

fn resolve_borders(records: &[BorderRecord]) -> Result<Vec<Border>, CatalogError> {
    let mut ids: HashMap<String, BorderId> = HashMap::new();
    for record in records {
        if ids.insert(record.key(), BorderId::new()).is_some() {
            return Err(CatalogError::DuplicateBorder(record.key()));
        }
    }

    records
        .iter()
        .map(|record| {
            let parent = match &record.parent {
                Some(parent) => {
                    let key = format!("{}:{}", record.country.code(), parent.to_lowercase());
                    Some(*ids.get(&key).ok_or_else(|| CatalogError::UnknownParent {
                        border: record.name.clone(),
                        parent: parent.clone(),
                    })?)
                }
                None => None,
            };
            Ok(Border {
                id: ids[&record.key()],
                country: record.country,
                level: record.level,
                name: record.name.clone(),
                parent,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use shamba_core::CatalogStore;

    use super::*;

    const CATALOG: &str = r#"{
        "templates": [
            {"name": "join_new", "translations": {"eng": "Welcome to {shortcode}", "swa": "Karibu"}},
            {"name": "maize_info", "translations": {"eng": "Plant maize early"}, "countries": ["KE"],
             "assign_category": "maize"}
        ],
        "keywords": [
            {"text": "join", "templates": ["join_new"]},
            {"text": "Mahindi", "templates": ["maize_info"]}
        ],
        "borders": [
            {"country": "KE", "level": "country", "name": "Kenya"},
            {"country": "KE", "level": "level1", "name": "Nakuru", "parent": "Kenya"},
            {"country": "KE", "level": "level2", "name": "Molo", "parent": "Nakuru"},
            {"country": "KE", "level": "level3", "name": "Kihingo", "key": "kihingo-molo", "parent": "Molo"}
        ],
        "commodities": [{"name": "Maize", "kind": "crop"}],
        "vouchers": [{"code": "free3", "offer": {"name": "launch",
            "kind": {"type": "free_subscription", "months": 3},
            "valid_from": "2026-01-01T00:00:00Z", "valid_until": "2026-12-31T00:00:00Z"}}],
        "customers": [{"phone": "+254700000001", "name": "Wanjiru",
            "subscription": {"tier": "premium", "ends_at": "2099-01-01T00:00:00Z"}}]
    }"#;

    #[tokio::test]
    async fn loads_and_links_records() {
        let store = Catalog::from_json(CATALOG).unwrap().into_store().await.unwrap();

        let keywords = store.keywords_starting_with("MAH", Country::Kenya).await.unwrap();
        assert_eq!(keywords.len(), 1);
        assert_eq!(keywords[0].text, "MAHINDI");
        assert!(store
            .keywords_starting_with("MAH", Country::Uganda)
            .await
            .unwrap()
            .is_empty());

        let wards = store.borders(Country::Kenya, BorderLevel::Level3).await.unwrap();
        let subcounties = store.borders(Country::Kenya, BorderLevel::Level2).await.unwrap();
        assert_eq!(wards[0].parent, Some(subcounties[0].id));

        assert!(store.voucher_by_code("FREE3").await.unwrap().is_some());

        let customer = store.customer_by_phone("+254700000001").await.unwrap().unwrap();
        assert_eq!(customer.name.as_deref(), Some("Wanjiru"));
        assert!(store.has_paid_subscription(customer.id, chrono::Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_template_reference_is_rejected() {
        let catalog = Catalog::from_json(
            r#"{"keywords": [{"text": "join", "templates": ["nope"]}]}"#,
        )
        .unwrap();
        let Err(err) = catalog.into_store().await else {
            panic!("expected unknown template error");
        };
        assert!(err.to_string().contains("unknown template `nope`"));
    }

    #[test]
    fn border_keys_must_be_unique() {
        let records: Vec<BorderRecord> = serde_json::from_str(
            r#"[{"country": "KE", "level": "level3", "name": "Kihingo"},
                {"country": "KE", "level": "level3", "name": "Kihingo"}]"#,
        )
        .unwrap();
        assert!(matches!(
            resolve_borders(&records),
            Err(CatalogError::DuplicateBorder(_))
        ));
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let records: Vec<BorderRecord> = serde_json::from_str(
            r#"[{"country": "UG", "level": "level1", "name": "Gulu", "parent": "Uganda"}]"#,
        )
        .unwrap();
        assert!(matches!(
            resolve_borders(&records),
            Err(CatalogError::UnknownParent { .. })
        ));
    }

    #[test]
    fn reads_catalog_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();
        let catalog = Catalog::from_path(file.path()).unwrap();
        assert_eq!(catalog.templates.len(), 2);
        assert!(Catalog::from_path(Path::new("/nonexistent/catalog.json")).is_err());
    }
}
