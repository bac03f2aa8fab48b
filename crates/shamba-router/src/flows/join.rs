// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use tracing::{info, warn};

use shamba_core::{
    Country, Customer, JoinMethod, MessageKind, ShambaError, TaskId, TaskReason,
};

use crate::effects::TaskDraft;
use crate::engine::{Engine, Turn};
use crate::metrics::{Anomaly, record_anomaly};
use crate::placeholders::PlaceholderContext;
use crate::templates::names;

/// Which welcome a joining customer gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JoinVariant {
    New,
    /// The customer had opted out before.
    Rejoin,
    /// Already subscribed and active.
    Existing,
}

impl JoinVariant {
    pub fn of(customer: &Customer) -> Self {
        if customer.has_requested_stop {
            JoinVariant::Rejoin
        } else if customer.join_method.is_some() {
            JoinVariant::Existing
        } else {
            JoinVariant::New
        }
    }

    fn template_name(self) -> &'static str {
        match self {
            JoinVariant::New => names::JOIN_NEW,
            JoinVariant::Rejoin => names::JOIN_REJOIN,
            JoinVariant::Existing => names::JOIN_EXISTING,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Joined {
    pub variant: JoinVariant,
    pub task: Option<TaskId>,
}

impl Engine {
    /// Subscribe the customer and, unless `silent`, send the matching welcome.
    ///
    /// Only a missing welcome template escalates, and then as a task.
    pub(crate) async fn join(
        &self,
        turn: &mut Turn,
        method: JoinMethod,
        silent: bool,
    ) -> Result<Joined, ShambaError> {
        let country = turn.country()?;
        let variant = JoinVariant::of(&turn.customer);

        let customer = &mut turn.customer;
        if customer.join_method.is_none() || variant == JoinVariant::Rejoin {
            customer.join_method = Some(method);
        }
        customer.has_requested_stop = false;
        customer.stop_method = None;
        customer.stop_date = None;
        self.store.save_customer(customer).await?;
        info!(customer_id = %customer.id, ?variant, %method, "customer joined");

        let mut task = None;
        if !silent && !self.send_welcome(turn, country, variant).await? {
            record_anomaly(
                Anomaly::MissingTemplate,
                &format!("no usable welcome template for {country}"),
            );
            let description = format!(
                "Customer joined but no welcome could be sent; respond to: {}",
                turn.inbound.text
            );
            task = self
                .create_task(turn, TaskDraft::new(TaskReason::MissingTemplate, description))
                .await?;
        }

        if task.is_none()
            && variant == JoinVariant::New
            && self.config.join.create_registration_task
            && !turn.customer.is_registered
        {
            let description = format!(
                "New customer joined by {method}; collect registration details"
            );
            task = self
                .create_task(turn, TaskDraft::new(TaskReason::Registration, description))
                .await?;
        }

        Ok(Joined { variant, task })
    }

    /// Send the variant welcome, or the generic one. `false` if neither could be sent.
    async fn send_welcome(
        &self,
        turn: &mut Turn,
        country: Country,
        variant: JoinVariant,
    ) -> Result<bool, ShambaError> {
        for name in [variant.template_name(), names::JOIN] {
            let Some(template) = self.named_template(name, country).await? else {
                record_anomaly(
                    Anomaly::MissingTemplate,
                    &format!("no template `{name}` for {country}"),
                );
                continue;
            };
            match self
                .respond_with_template(
                    turn,
                    &template,
                    MessageKind::Join,
                    &PlaceholderContext::default(),
                )
                .await
            {
                Ok(Some(_)) => return Ok(true),
                Ok(None) => {}
                Err(ShambaError::Placeholder(e)) => {
                    warn!(template = name, "welcome skipped: {e}");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(false)
    }
}
