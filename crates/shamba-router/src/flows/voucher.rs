// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Voucher redemption.
//!
//! `used_by` is written once. A second redemption, by anyone, only ever gets
//! an "already used" notice.

use tracing::{info, warn};

use shamba_core::{JoinMethod, MessageKind, OfferKind, ShambaError, TaskReason, Voucher};

use crate::effects::TaskDraft;
use crate::engine::{Engine, Turn};
use crate::metrics::{Anomaly, record_anomaly};
use crate::placeholders::PlaceholderContext;
use crate::templates::names;

impl Engine {
    pub(crate) async fn redeem_voucher(
        &self,
        turn: &mut Turn,
        mut voucher: Voucher,
    ) -> Result<(), ShambaError> {
        let customer_id = turn.customer.id;
        let code_only = PlaceholderContext {
            voucher_code: Some(voucher.code.clone()),
            ..PlaceholderContext::default()
        };

        if !voucher.offer.is_valid_at(turn.now) {
            info!(code = %voucher.code, "voucher offer expired");
            return self
                .voucher_notice(turn, &voucher, names::VOUCHER_EXPIRED, &code_only)
                .await;
        }

        if let Some(owner) = voucher.used_by {
            let name = if owner == customer_id && voucher.offer.repeatable {
                names::VOUCHER_USED_BY_YOU
            } else {
                names::VOUCHER_USED
            };
            info!(code = %voucher.code, owner = %owner, "voucher already used");
            return self.voucher_notice(turn, &voucher, name, &code_only).await;
        }

        match voucher.offer.kind.clone() {
            OfferKind::Discount { percent } => {
                self.claim(&mut voucher, turn).await?;
                info!(code = %voucher.code, percent, "discount voucher redeemed");
                self.voucher_notice(turn, &voucher, names::VOUCHER_DISCOUNT, &code_only)
                    .await
            }
            OfferKind::FreeSubscription { months } => {
                let joined = if turn.customer.join_method.is_none() {
                    Some(self.join(turn, JoinMethod::Voucher, true).await?)
                } else {
                    None
                };
                self.claim(&mut voucher, turn).await?;

                let intro = if joined.is_some() {
                    self.config.join.intro_subscription_months
                } else {
                    0
                };
                let ends_at = self
                    .store
                    .extend_subscription(customer_id, months + intro, turn.now)
                    .await?;
                info!(code = %voucher.code, months, intro, %ends_at, "free months granted");

                let context = PlaceholderContext {
                    end_date: Some(ends_at.date_naive()),
                    voucher_months: Some(months),
                    voucher_code: Some(voucher.code.clone()),
                    missing_fields: None,
                };
                self.voucher_notice(turn, &voucher, names::VOUCHER_FREE_MONTHS, &context)
                    .await?;

                if let Some(task) = joined.and_then(|j| j.task) {
                    let description = format!(
                        "Joined by redeeming voucher {}: {months} free months plus {intro} \
                         introductory months, subscribed until {}",
                        voucher.code,
                        ends_at.format("%d/%m/%Y")
                    );
                    self.store.update_task_description(task, &description).await?;
                }
                Ok(())
            }
        }
    }

    async fn claim(&self, voucher: &mut Voucher, turn: &Turn) -> Result<(), ShambaError> {
        voucher
            .redeem(turn.customer.id, turn.now)
            .map_err(|e| ShambaError::Internal(format!("voucher {}: {e}", voucher.code)))?;
        self.store.save_voucher(voucher).await
    }

    /// Answer with the named voucher template, or hand the customer to a human.
    async fn voucher_notice(
        &self,
        turn: &mut Turn,
        voucher: &Voucher,
        name: &str,
        context: &PlaceholderContext,
    ) -> Result<(), ShambaError> {
        let country = turn.country()?;
        let sent = match self.named_template(name, country).await? {
            Some(template) => match self
                .respond_with_template(turn, &template, MessageKind::Voucher, context)
                .await
            {
                Ok(sent) => sent.is_some(),
                Err(e) if e.is_contract_violation() => return Err(e),
                Err(e) => {
                    warn!(template = name, "voucher reply failed: {e}");
                    false
                }
            },
            None => {
                record_anomaly(
                    Anomaly::MissingTemplate,
                    &format!("no template `{name}` for {country}"),
                );
                false
            }
        };

        if !sent {
            let description = format!(
                "Voucher {} needs a `{name}` reply; respond to: {}",
                voucher.code, turn.inbound.text
            );
            self.create_task(turn, TaskDraft::new(TaskReason::Voucher, description))
                .await?;
        }
        Ok(())
    }
}
