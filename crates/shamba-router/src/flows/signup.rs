// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI-assisted signup over one or more free-text messages.

use tracing::{info, warn};

use shamba_agent::SignupStatus;
use shamba_core::{
    ExtractionFailed, MessageKind, ShambaError, SignupInformation, TaskReason,
};
use shamba_text::sanitize;

use crate::effects::TaskDraft;
use crate::engine::{Engine, Turn};
use crate::metrics::{Anomaly, record_anomaly};
use crate::outbound::OutboundRequest;
use crate::placeholders::PlaceholderContext;
use crate::templates::names;

impl Engine {
    pub(crate) async fn signup(&self, turn: &mut Turn) -> Result<(), ShambaError> {
        let country = turn.country()?;
        let agent = self
            .agent
            .as_ref()
            .ok_or_else(|| ShambaError::Internal("signup chosen without an agent".into()))?;

        let extraction = agent
            .invoke(&turn.inbound.text, country)
            .await
            .and_then(|e| {
                if e.country() == country {
                    Ok(e)
                } else {
                    Err(ExtractionFailed::Malformed(format!(
                        "asked for {country}, got {}",
                        e.country()
                    )))
                }
            });
        let extraction = match extraction {
            Ok(extraction) => extraction,
            Err(e) => {
                record_anomaly(Anomaly::ExtractionFailed, &e.to_string());
                let description =
                    format!("Signup details could not be extracted ({e}): {}", turn.inbound.text);
                self.create_task(turn, TaskDraft::new(TaskReason::SignupReview, description))
                    .await?;
                return Ok(());
            }
        };

        let info = SignupInformation::from(extraction);
        let outcome = self
            .accumulator
            .apply(&*self.store, &mut turn.customer, country, &info)
            .await?;
        if !outcome.updated.is_empty() {
            self.store.save_customer(&turn.customer).await?;
        }
        let status = outcome.status();
        info!(
            customer_id = %turn.customer.id,
            ?status,
            updated = outcome.updated.len(),
            missing = outcome.missing.len(),
            "signup details applied"
        );

        match status {
            SignupStatus::Complete => {
                turn.customer.is_registered = true;
                self.store.save_customer(&turn.customer).await?;
                self.signup_reply(turn, names::SIGNUP_COMPLETE, &PlaceholderContext::default())
                    .await
            }
            SignupStatus::Partial => {
                let context = PlaceholderContext {
                    missing_fields: Some(outcome.missing_labels(country)),
                    ..PlaceholderContext::default()
                };
                self.signup_reply(turn, names::SIGNUP_PARTIAL, &context).await
            }
            SignupStatus::Unrelated => {
                self.signup_reply(turn, names::JOIN, &PlaceholderContext::default())
                    .await
            }
            SignupStatus::NeedsHuman => {
                turn.customer.skip_ai_invocation = true;
                self.store.save_customer(&turn.customer).await?;
                let reasons = outcome
                    .interventions
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                let description = format!("Signup needs a human ({reasons}): {}", turn.inbound.text);
                self.create_task(turn, TaskDraft::new(TaskReason::SignupReview, description))
                    .await?;
                Ok(())
            }
        }
    }

    /// Send a signup reply, unless the customer already received the exact same text.
    ///
    /// A repeat means the conversation is stuck; the agent is switched off for
    /// this customer and a human takes over.
    async fn signup_reply(
        &self,
        turn: &mut Turn,
        name: &str,
        context: &PlaceholderContext,
    ) -> Result<(), ShambaError> {
        let country = turn.country()?;
        let template = self.required_template(name, country).await?;
        let Some(text) = self.render(turn, &template, context)? else {
            return Err(ShambaError::MissingTemplate {
                name: name.to_string(),
                country: country.code().to_string(),
            });
        };

        let candidate = sanitize(&text).text.trim().to_string();
        let repeated = self
            .store
            .outbound_to(turn.customer.id)
            .await?
            .iter()
            .any(|m| m.kind == MessageKind::Signup && m.text == candidate);
        if repeated {
            warn!(customer_id = %turn.customer.id, template = name, "signup reply would repeat");
            turn.customer.skip_ai_invocation = true;
            self.store.save_customer(&turn.customer).await?;
            let description = format!(
                "Automatic signup reply `{name}` was already sent; respond to: {}",
                turn.inbound.text
            );
            self.create_task(turn, TaskDraft::new(TaskReason::DuplicateAiResponse, description))
                .await?;
            return Ok(());
        }

        let request = OutboundRequest::reply(turn.customer.id, text, MessageKind::Signup)
            .from_sender(template.sender.clone())
            .with_metadata("template", name);
        self.respond(turn, request).await?;
        Ok(())
    }
}
