// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use tracing::{info, warn};

use shamba_core::{MessageKind, ResponseTemplate, ShambaError, StopMethod};

use crate::engine::{Engine, Turn};
use crate::metrics::{Anomaly, record_anomaly};
use crate::placeholders::PlaceholderContext;
use crate::templates::names;

impl Engine {
    /// Opt the customer out. Returns whether a confirmation was sent.
    pub(crate) async fn stop(
        &self,
        turn: &mut Turn,
        matched: &ResponseTemplate,
    ) -> Result<bool, ShambaError> {
        let country = turn.country()?;
        let already_inactive = turn.customer.has_requested_stop;

        let customer = &mut turn.customer;
        customer.has_requested_stop = true;
        customer.stop_method = Some(StopMethod::Sms);
        customer.stop_date = Some(turn.now.date_naive());
        self.store.save_customer(customer).await?;
        info!(customer_id = %customer.id, already_inactive, "customer opted out");

        let name = if already_inactive {
            names::STOP_ALREADY
        } else {
            names::STOP_CONFIRMED
        };
        let template = match self.named_template(name, country).await? {
            Some(template) => template,
            None => {
                record_anomaly(
                    Anomaly::MissingTemplate,
                    &format!("no template `{name}` for {country}, answering with `{}`", matched.name),
                );
                matched.clone()
            }
        };

        match self
            .respond_with_template(turn, &template, MessageKind::Stop, &PlaceholderContext::default())
            .await
        {
            Ok(sent) => Ok(sent.is_some()),
            Err(e) if e.is_contract_violation() => Err(e),
            Err(e) => {
                warn!(template = %template.name, "stop confirmation failed: {e}");
                Ok(false)
            }
        }
    }
}
