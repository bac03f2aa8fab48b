// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-backed signup extraction.
//!
//! Builds a country-specific prompt, sends it to a [`CompletionProvider`] and
//! parses the JSON object in the reply into the country's
//! [`SignupExtraction`] variant.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shamba_core::{
    AdapterType, CompletionProvider, Country, ExtractionFailed, HealthStatus, KenyaSignup,
    PluginAdapter, ShambaError, SignupAgent, SignupExtraction, UgandaSignup, ZambiaSignup,
};
use tracing::{debug, warn};

const EXTRACTION_PROMPT: &str = r#"You help register farmers who text an agricultural advice service in {country}.
Extract the following fields from the farmer's message:

{fields}

Use null for anything the message does not state. Never guess or invent values.
Output a single JSON object only, no explanation.

Message:
{text}"#;

fn country_name(country: Country) -> &'static str {
    match country {
        Country::Kenya => "Kenya",
        Country::Uganda => "Uganda",
        Country::Zambia => "Zambia",
    }
}

fn schema_fields(country: Country) -> &'static [(&'static str, &'static str)] {
    const NAME: (&str, &str) = ("name", "the farmer's full name");
    const CROPS: (&str, &str) = (
        "crops_livestock",
        "array of crops and livestock the farmer keeps, as written",
    );
    match country {
        Country::Kenya => &[
            NAME,
            CROPS,
            ("county", "the county the farmer lives in"),
            ("ward", "the ward the farmer lives in"),
            ("nearest_landmark", "a school, market or other landmark near the farm"),
        ],
        Country::Uganda => &[
            NAME,
            CROPS,
            ("district", "the district the farmer lives in"),
            ("subcounty", "the subcounty the farmer lives in"),
        ],
        Country::Zambia => &[
            NAME,
            CROPS,
            ("province", "the province the farmer lives in"),
            ("ward", "the ward the farmer lives in"),
        ],
    }
}

/// Build the extraction prompt for `country`.
pub fn build_prompt(text: &str, country: Country) -> String {
    let fields = schema_fields(country)
        .iter()
        .map(|(key, description)| format!("- \"{key}\": {description}"))
        .collect::<Vec<_>>()
        .join("\n");
    EXTRACTION_PROMPT
        .replace("{country}", country_name(country))
        .replace("{fields}", &fields)
        .replace("{text}", text.trim())
}

/// Parse a model reply into the extraction shape for `country`.
///
/// Markdown fences and surrounding prose are tolerated; anything that does not
/// contain a JSON object matching the schema is [`ExtractionFailed::Malformed`].
pub fn parse_extraction(
    response: &str,
    country: Country,
) -> Result<SignupExtraction, ExtractionFailed> {
    let trimmed = response.trim();
    let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
        return Err(ExtractionFailed::Malformed(
            "no JSON object in response".to_string(),
        ));
    };
    if end < start {
        return Err(ExtractionFailed::Malformed(
            "no JSON object in response".to_string(),
        ));
    }

    let mut value: Value = serde_json::from_str(&trimmed[start..=end]).map_err(|e| {
        debug!("Raw extraction response: {response}");
        ExtractionFailed::Malformed(e.to_string())
    })?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| ExtractionFailed::Malformed("expected a JSON object".to_string()))?;
    object.retain(|_, v| !v.is_null());
    let listed = match object.get("crops_livestock") {
        Some(Value::String(list)) => Some(
            list.split([',', ';'])
                .flat_map(|part| part.split(" and "))
                .map(|s| Value::String(s.trim().to_string()))
                .collect(),
        ),
        _ => None,
    };
    if let Some(items) = listed {
        object.insert("crops_livestock".to_string(), Value::Array(items));
    }

    match country {
        Country::Kenya => from_value::<KenyaSignup>(value).map(SignupExtraction::Kenya),
        Country::Uganda => from_value::<UgandaSignup>(value).map(SignupExtraction::Uganda),
        Country::Zambia => from_value::<ZambiaSignup>(value).map(SignupExtraction::Zambia),
    }
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, ExtractionFailed> {
    serde_json::from_value(value).map_err(|e| {
        warn!("Failed to parse extraction response: {e}");
        ExtractionFailed::Malformed(e.to_string())
    })
}

/// [`SignupAgent`] backed by a text-completion model.
pub struct PromptedSignupAgent<C: ?Sized> {
    provider: Arc<C>,
}

impl<C: CompletionProvider + ?Sized> PromptedSignupAgent<C> {
    pub fn new(provider: Arc<C>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<C: CompletionProvider + ?Sized> PluginAdapter for PromptedSignupAgent<C> {
    fn name(&self) -> &str {
        "prompted-signup"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Extractor
    }

    async fn health_check(&self) -> Result<HealthStatus, ShambaError> {
        self.provider.health_check().await
    }
}

#[async_trait]
impl<C: CompletionProvider + ?Sized> SignupAgent for PromptedSignupAgent<C> {
    async fn invoke(
        &self,
        text: &str,
        country: Country,
    ) -> Result<SignupExtraction, ExtractionFailed> {
        let prompt = build_prompt(text, country);
        let response = self
            .provider
            .complete(&prompt)
            .await
            .map_err(|e| ExtractionFailed::Unavailable(e.to_string()))?;
        parse_extraction(&response, country)
    }
}
