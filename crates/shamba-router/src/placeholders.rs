// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `{name}` placeholder substitution in response texts.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Captures, Regex};
use thiserror::Error;

use shamba_config::model::TenantConfig;
use shamba_core::{Customer, ShambaError};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
    #[error("unknown placeholder {{{0}}}")]
    Unknown(String),

    #[error("no value for placeholder {{{0}}}")]
    Unavailable(String),
}

impl From<PlaceholderError> for ShambaError {
    fn from(err: PlaceholderError) -> Self {
        ShambaError::Placeholder(err.to_string())
    }
}

/// Per-message values some templates refer to.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderContext {
    pub end_date: Option<NaiveDate>,
    pub voucher_months: Option<u32>,
    pub voucher_code: Option<String>,
    pub missing_fields: Option<String>,
}

fn lookup(
    name: &str,
    tenant: &TenantConfig,
    customer: &Customer,
    context: &PlaceholderContext,
) -> Result<String, PlaceholderError> {
    let value = match name {
        "call_centre" => tenant.call_centre.clone(),
        "shortcode" => tenant.shortcode.clone(),
        "monthly_price" => tenant.monthly_price.clone(),
        "yearly_price" => tenant.yearly_price.clone(),
        "till_number" => tenant.till_number.clone(),
        "customer_name" => customer.name.clone(),
        "end_date" => context.end_date.map(|d| d.format("%d/%m/%Y").to_string()),
        "voucher_months" => context.voucher_months.map(|m| m.to_string()),
        "voucher_code" => context.voucher_code.clone(),
        "missing_fields" => context.missing_fields.clone(),
        other => return Err(PlaceholderError::Unknown(other.to_string())),
    };
    value.ok_or_else(|| PlaceholderError::Unavailable(name.to_string()))
}

/// Replace every placeholder in `text`; any unresolved one fails the whole text.
pub fn populate(
    text: &str,
    tenant: &TenantConfig,
    customer: &Customer,
    context: &PlaceholderContext,
) -> Result<String, PlaceholderError> {
    let mut failure = None;
    let populated = PLACEHOLDER.replace_all(text, |caps: &Captures<'_>| {
        match lookup(&caps[1], tenant, customer, context) {
            Ok(value) => value,
            Err(e) => {
                failure.get_or_insert(e);
                String::new()
            }
        }
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(populated.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn tenant() -> TenantConfig {
        TenantConfig {
            call_centre: Some("0711 082 606".into()),
            shortcode: Some("21606".into()),
            monthly_price: Some("KES 100".into()),
            ..TenantConfig::default()
        }
    }

    #[test]
    fn substitutes_tenant_and_customer_values() {
        let mut customer = Customer::new("+254700000001", Utc::now());
        customer.name = Some("Wanjiru".into());
        let text = populate(
            "Hi {customer_name}, text {shortcode} or call {call_centre}. Only {monthly_price}!",
            &tenant(),
            &customer,
            &PlaceholderContext::default(),
        )
        .unwrap();
        assert_eq!(text, "Hi Wanjiru, text 21606 or call 0711 082 606. Only KES 100!");
    }

    #[test]
    fn context_values_are_formatted() {
        let customer = Customer::new("+260970000001", Utc::now());
        let context = PlaceholderContext {
            end_date: NaiveDate::from_ymd_opt(2026, 9, 30),
            voucher_months: Some(3),
            ..PlaceholderContext::default()
        };
        let text = populate(
            "{voucher_months} free months until {end_date}",
            &tenant(),
            &customer,
            &context,
        )
        .unwrap();
        assert_eq!(text, "3 free months until 30/09/2026");
    }

    #[test]
    fn unresolved_placeholders_are_errors() {
        let customer = Customer::new("+256700000001", Utc::now());
        let ctx = PlaceholderContext::default();
        assert_eq!(
            populate("pay to {till_number}", &tenant(), &customer, &ctx),
            Err(PlaceholderError::Unavailable("till_number".into()))
        );
        assert_eq!(
            populate("hello {nickname}", &tenant(), &customer, &ctx),
            Err(PlaceholderError::Unknown("nickname".into()))
        );
        assert_eq!(populate("no braces here", &tenant(), &customer, &ctx).unwrap(), "no braces here");
    }
}
