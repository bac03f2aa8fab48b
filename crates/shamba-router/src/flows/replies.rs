// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Automatic handling of replies to survey and data requests.

use tracing::{debug, info};

use shamba_core::{Border, BorderId, NpsResponse, OutboundMessage, ShambaError, TaskReason};
use shamba_geo::MatchScope;

use crate::context::parse_nps_score;
use crate::effects::TaskDraft;
use crate::engine::{Engine, Turn};
use crate::metrics::{Anomaly, record_anomaly};

impl Engine {
    pub(crate) async fn handle_survey_reply(
        &self,
        turn: &mut Turn,
        request: &OutboundMessage,
    ) -> Result<(), ShambaError> {
        match parse_nps_score(&turn.inbound.text) {
            Ok(score) => {
                self.store
                    .record_nps(&NpsResponse {
                        customer: turn.customer.id,
                        score,
                        request: request.id,
                        reply: turn.inbound.id,
                        recorded_at: turn.now,
                    })
                    .await?;
                info!(customer_id = %turn.customer.id, score, "survey score recorded");
                Ok(())
            }
            Err(rejection) => {
                debug!(inbound_id = %turn.inbound.id, "survey reply rejected: {rejection}");
                let description = format!(
                    "Survey reply could not be scored ({rejection}): {}",
                    turn.inbound.text
                );
                self.create_task(
                    turn,
                    TaskDraft::new(TaskReason::SurveyReview, description).answering(request.id),
                )
                .await?;
                Ok(())
            }
        }
    }

    /// Fill the customer's regions from a location reply.
    ///
    /// A level already on record is never overwritten; a disagreeing match
    /// goes to a human instead.
    pub(crate) async fn handle_data_reply(
        &self,
        turn: &mut Turn,
        request: &OutboundMessage,
    ) -> Result<(), ShambaError> {
        let country = turn.country()?;
        let matcher = self.locality(country).await?;
        let Some(found) = matcher.find(&turn.inbound.text, &MatchScope::default()) else {
            let description = format!("Location reply not recognised: {}", turn.inbound.text);
            self.create_task(
                turn,
                TaskDraft::new(TaskReason::DataReview, description).answering(request.id),
            )
            .await?;
            return Ok(());
        };

        let customer = &turn.customer;
        let levels: [(Option<BorderId>, Option<&Border>); 3] = [
            (customer.border1, found.level1.as_ref()),
            (customer.border2, found.level2.as_ref()),
            (customer.border3, Some(&found.level3)),
        ];
        let conflicts: Vec<String> = levels
            .iter()
            .filter_map(|(known, proposed)| match (known, proposed) {
                (Some(known), Some(proposed)) if *known != proposed.id => Some(format!(
                    "{} {} differs from recorded {known}",
                    country.level_word(proposed.level),
                    proposed.name
                )),
                _ => None,
            })
            .collect();

        if !conflicts.is_empty() {
            let detail = conflicts.join("; ");
            record_anomaly(
                Anomaly::RegionConflict,
                &format!("customer {}: {detail}", turn.customer.id),
            );
            let description = format!(
                "Location reply conflicts with recorded regions ({detail}): {}",
                turn.inbound.text
            );
            self.create_task(
                turn,
                TaskDraft::new(TaskReason::DataReview, description).answering(request.id),
            )
            .await?;
            return Ok(());
        }

        let customer = &mut turn.customer;
        customer.border1 = customer.border1.or(found.level1.as_ref().map(|b| b.id));
        customer.border2 = customer.border2.or(found.level2.as_ref().map(|b| b.id));
        customer.border3 = customer.border3.or(Some(found.level3.id));
        self.store.save_customer(customer).await?;
        info!(
            customer_id = %customer.id,
            region = %found.level3.name,
            score = found.score,
            "location updated from reply"
        );
        Ok(())
    }
}
