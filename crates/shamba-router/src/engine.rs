// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dispatch engine: one terminal branch per inbound message.
//!
//! Classification walks a fixed priority list and stops at the first rule
//! that applies:
//! 1. country gate
//! 2. duplicate suppression
//! 3. voucher code
//! 4. survey reply
//! 5. data-request reply
//! 6. keyword template
//! 7. AI signup
//! 8. vanilla task
//!
//! Nothing but a [`ShambaError::Contract`] escapes [`Engine::process`]; every
//! other failure becomes a task for a human.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use shamba_agent::{SignupAccumulator, TtlCache};
use shamba_config::model::ShambaConfig;
use shamba_core::{
    BorderLevel, Country, Customer, CustomerId, InboundId, InboundMessage, JoinMethod,
    LandmarkMatcher, Language, MessageKind, MessageSender, OutboundMessage, ResponseTemplate,
    ShambaError, SignupAgent, Store, Task, TaskId, TaskPriority, TaskReason, TaskSource,
    TaskStatus, TemplateAction,
};
use shamba_geo::{LocalityMatcher, RegionIndex};
use shamba_text::{sanitize, strip_boundary_punctuation};

use crate::action::{Action, Branch, Outcome, TemplateMatch};
use crate::context::ContextTracker;
use crate::effects::{Effects, TaskDraft};
use crate::keywords::{KeywordResolution, resolve_keyword};
use crate::metrics::{
    Anomaly, record_anomaly, record_processed, record_processing_time, record_task,
};
use crate::outbound::{OutboundRequest, Responder, page_options};
use crate::placeholders::{PlaceholderContext, populate};
use crate::templates::{localized_text, names};

/// State of one message while it runs through the engine.
pub(crate) struct Turn {
    pub inbound: InboundMessage,
    pub customer: Customer,
    /// Set when the sender's number belongs to an operated country.
    pub country: Option<Country>,
    pub now: DateTime<Utc>,
    pub effects: Effects,
}

impl Turn {
    pub fn country(&self) -> Result<Country, ShambaError> {
        self.country.ok_or_else(|| {
            ShambaError::Internal("message passed the country gate without a country".into())
        })
    }
}

/// Classifies inbound messages and carries out the chosen action.
pub struct Engine {
    pub(crate) config: ShambaConfig,
    pub(crate) store: Arc<dyn Store>,
    pub(crate) responder: Responder<dyn Store>,
    pub(crate) agent: Option<Arc<dyn SignupAgent>>,
    pub(crate) accumulator: SignupAccumulator,
    pub(crate) contexts: ContextTracker,
    regions: HashMap<Country, TtlCache<LocalityMatcher>>,
}

impl Engine {
    pub fn new(
        config: ShambaConfig,
        store: Arc<dyn Store>,
        sender: Arc<dyn MessageSender>,
    ) -> Self {
        let responder = Responder::new(
            Arc::clone(&store),
            sender,
            page_options(&config.sms),
            config.tenant.sender_identity.clone(),
        );
        let ttl = Duration::from_secs(config.agent.commodity_cache_ttl_secs);
        let regions = Country::ALL
            .into_iter()
            .map(|c| (c, TtlCache::new(ttl)))
            .collect();
        Self {
            accumulator: SignupAccumulator::new(&config.agent, None),
            contexts: ContextTracker::new(&config.engine),
            responder,
            store,
            agent: None,
            regions,
            config,
        }
    }

    /// Use `agent` for free-text signups.
    pub fn with_agent(mut self, agent: Arc<dyn SignupAgent>) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Infer wards from landmarks where the configuration enables it.
    pub fn with_landmarks(mut self, landmarks: Arc<dyn LandmarkMatcher>) -> Self {
        self.accumulator = SignupAccumulator::new(&self.config.agent, Some(landmarks));
        self
    }

    pub fn config(&self) -> &ShambaConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Record an inbound SMS, creating its customer if needed, and process it.
    ///
    /// An empty sender is a caller bug and fails with [`ShambaError::Contract`].
    /// Storage failures before the message is recorded are returned as-is.
    pub async fn receive(
        &self,
        sender: &str,
        recipient: &str,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<Outcome, ShambaError> {
        let sender = sender.trim();
        if sender.is_empty() {
            return Err(ShambaError::Contract("inbound message has no sender".into()));
        }

        let (customer, created) = match self.store.customer_by_phone(sender).await? {
            Some(customer) => (customer, false),
            None => {
                let mut customer = Customer::new(sender, at);
                if let Some(country) = Country::from_phone(sender) {
                    customer.border0 = self
                        .store
                        .borders(country, BorderLevel::Country)
                        .await?
                        .first()
                        .map(|b| b.id);
                }
                self.store.save_customer(&customer).await?;
                info!(customer_id = %customer.id, "created customer on first message");
                (customer, true)
            }
        };

        let inbound = InboundMessage {
            id: InboundId::new(),
            sender: sender.to_string(),
            recipient: recipient.trim().to_string(),
            text: text.to_string(),
            received_at: at,
            customer: Some(customer.id),
            customer_created: created,
        };
        self.store.record_inbound(&inbound).await?;
        self.process(&inbound, at).await
    }

    /// Run the decision list once for a recorded inbound message.
    pub async fn process(
        &self,
        inbound: &InboundMessage,
        now: DateTime<Utc>,
    ) -> Result<Outcome, ShambaError> {
        let started = Instant::now();
        let customer_id = inbound.customer.ok_or_else(|| {
            ShambaError::Contract(format!("inbound message {} has no customer", inbound.id))
        })?;
        let customer = self
            .store
            .customer(customer_id)
            .await?
            .ok_or_else(|| ShambaError::NotFound {
                entity: "customer",
                id: customer_id.to_string(),
            })?;

        let country = Country::from_phone(&inbound.sender)
            .filter(|c| self.config.countries.is_operated(*c));
        let mut turn = Turn {
            inbound: inbound.clone(),
            customer,
            country,
            now,
            effects: Effects::default(),
        };

        let branch = match self.run(&mut turn).await {
            Ok(branch) => branch,
            Err(e) if e.is_contract_violation() => return Err(e),
            Err(e) => {
                self.recover(&mut turn, e).await;
                Branch::Failed
            }
        };

        record_processed(branch);
        record_processing_time(started.elapsed().as_secs_f64());
        info!(
            inbound_id = %inbound.id,
            customer_id = %customer_id,
            branch = %branch,
            task = turn.effects.task().is_some(),
            response = turn.effects.response().is_some(),
            "message processed"
        );
        Ok(Outcome {
            inbound: inbound.id,
            customer: customer_id,
            customer_created: inbound.customer_created,
            branch,
            task: turn.effects.task(),
            response: turn.effects.response(),
        })
    }

    /// Hand `text` to `recipients` outside of any inbound conversation.
    ///
    /// Used for survey and data requests; an empty recipient list or text is a
    /// [`ShambaError::Contract`] violation.
    pub async fn send_text(
        &self,
        recipients: &[CustomerId],
        text: &str,
        kind: MessageKind,
        now: DateTime<Utc>,
    ) -> Result<OutboundMessage, ShambaError> {
        let request = OutboundRequest {
            recipients: recipients.to_vec(),
            text: text.to_string(),
            kind,
            in_reply_to: None,
            metadata: Default::default(),
            sender_identity: None,
            allow_international: false,
        };
        self.responder.send(request, now).await
    }

    async fn run(&self, turn: &mut Turn) -> Result<Branch, ShambaError> {
        let action = self.classify(turn).await?;
        debug!(inbound_id = %turn.inbound.id, action = action_name(&action), "classified message");
        self.execute(turn, action).await
    }

    /// Pick the first applicable action; the order is the contract.
    pub(crate) async fn classify(&self, turn: &Turn) -> Result<Action, ShambaError> {
        let Some(country) = turn.country else {
            return Ok(Action::UnsupportedCountry);
        };
        let store = &*self.store;

        if let Some(first) = self.earlier_duplicate(turn).await? {
            return Ok(Action::Duplicate { first });
        }

        let normalized = strip_boundary_punctuation(&turn.inbound.text);
        if !normalized.is_empty()
            && let Some(voucher) = store.voucher_by_code(&normalized).await?
        {
            return Ok(Action::RedeemVoucher(voucher));
        }

        if let Some(context) = self.contexts.survey_reply(store, &turn.inbound).await? {
            return Ok(Action::SurveyReply {
                request: context.request().clone(),
            });
        }
        if let Some(context) = self.contexts.data_reply(store, &turn.inbound).await? {
            return Ok(Action::DataReply {
                request: context.request().clone(),
            });
        }

        match resolve_keyword(store, &turn.inbound.text, country).await? {
            KeywordResolution::Empty => {
                let template = self.required_template(names::EMPTY, country).await?;
                return Ok(Action::Template(TemplateMatch {
                    keyword: None,
                    template,
                }));
            }
            KeywordResolution::Matched { keyword, template } => {
                return Ok(Action::Template(TemplateMatch {
                    keyword: Some(keyword),
                    template,
                }));
            }
            KeywordResolution::Ambiguous { keyword, templates } => {
                return Ok(Action::KeywordConflict { keyword, templates });
            }
            KeywordResolution::NoMatch => {}
        }

        if self.signup_eligible(turn) {
            return Ok(Action::Signup);
        }
        Ok(Action::Vanilla)
    }

    async fn execute(&self, turn: &mut Turn, action: Action) -> Result<Branch, ShambaError> {
        match action {
            Action::UnsupportedCountry => {
                let mut request = OutboundRequest::reply(
                    turn.customer.id,
                    self.config.engine.unsupported_country_text.clone(),
                    MessageKind::Unsupported,
                );
                request.allow_international = true;
                if self.respond(turn, request).await?.is_none() {
                    let description =
                        format!("Unsupported-country notice could not be sent: {}", turn.inbound.text);
                    self.create_task(turn, TaskDraft::new(TaskReason::ResponseFailed, description))
                        .await?;
                }
                Ok(Branch::UnsupportedCountry)
            }
            Action::Duplicate { first } => {
                info!(inbound_id = %turn.inbound.id, first = %first, "duplicate message suppressed");
                Ok(Branch::Duplicate)
            }
            Action::RedeemVoucher(voucher) => {
                self.redeem_voucher(turn, voucher).await?;
                Ok(Branch::Voucher)
            }
            Action::SurveyReply { request } => {
                self.handle_survey_reply(turn, &request).await?;
                Ok(Branch::SurveyReply)
            }
            Action::DataReply { request } => {
                self.handle_data_reply(turn, &request).await?;
                Ok(Branch::DataReply)
            }
            Action::Template(matched) => self.handle_template(turn, matched).await,
            Action::KeywordConflict { keyword, templates } => {
                let country = turn.country()?;
                record_anomaly(
                    Anomaly::KeywordConflict,
                    &format!(
                        "keyword {} resolves to {templates} templates in {country}",
                        keyword.text
                    ),
                );
                let description = format!(
                    "Keyword {} is bound to {templates} templates in {country}; respond to: {}",
                    keyword.text, turn.inbound.text
                );
                self.create_task(turn, TaskDraft::new(TaskReason::KeywordConflict, description))
                    .await?;
                Ok(Branch::KeywordConflict)
            }
            Action::Signup => {
                self.signup(turn).await?;
                Ok(Branch::Signup)
            }
            Action::Vanilla => {
                self.vanilla(turn).await?;
                Ok(Branch::Vanilla)
            }
        }
    }

    /// The earliest identical message inside the window, when it is not this one.
    async fn earlier_duplicate(&self, turn: &Turn) -> Result<Option<InboundId>, ShambaError> {
        let window = i64::try_from(self.config.engine.duplicate_window_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX);
        let since = turn
            .inbound
            .received_at
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let identical: Vec<InboundMessage> = self
            .store
            .inbound_from(turn.customer.id, since)
            .await?
            .into_iter()
            .filter(|m| m.text == turn.inbound.text && m.received_at <= turn.inbound.received_at)
            .collect();
        match identical.first() {
            Some(first) if identical.len() > 1 && first.id != turn.inbound.id => Ok(Some(first.id)),
            _ => Ok(None),
        }
    }

    fn signup_eligible(&self, turn: &Turn) -> bool {
        let agent = &self.config.agent;
        self.agent.is_some()
            && agent.enabled
            && agent.allows_sender(&turn.inbound.sender)
            && !turn.customer.is_registered
            && !turn.customer.skip_ai_invocation
    }

    async fn handle_template(
        &self,
        turn: &mut Turn,
        matched: TemplateMatch,
    ) -> Result<Branch, ShambaError> {
        let template = matched.template;
        if let Some(category) = &template.assign_category
            && turn.customer.add_category(category)
        {
            self.store.save_customer(&turn.customer).await?;
            debug!(customer_id = %turn.customer.id, category, "assigned category");
        }

        match template.action {
            TemplateAction::JoinCustomer => {
                self.join(turn, JoinMethod::Sms, false).await?;
                Ok(Branch::Join)
            }
            TemplateAction::StopCustomer => {
                if !self.stop(turn, &template).await? {
                    let description =
                        format!("Stop request could not be answered: {}", turn.inbound.text);
                    self.create_task(turn, TaskDraft::new(TaskReason::ResponseFailed, description))
                        .await?;
                }
                Ok(Branch::Stop)
            }
            action => {
                let sent = match self
                    .respond_with_template(
                        turn,
                        &template,
                        MessageKind::TemplateResponse,
                        &PlaceholderContext::default(),
                    )
                    .await
                {
                    Ok(sent) => sent.is_some(),
                    Err(e) if e.is_contract_violation() => return Err(e),
                    Err(e) => {
                        warn!(template = %template.name, "template response failed: {e}");
                        false
                    }
                };
                if action == TemplateAction::CreateTask {
                    let description = format!(
                        "Template {} requests follow-up: {}",
                        template.name, turn.inbound.text
                    );
                    self.create_task(turn, TaskDraft::new(TaskReason::TemplateAction, description))
                        .await?;
                } else if !sent {
                    let description = format!(
                        "Response {} could not be sent: {}",
                        template.name, turn.inbound.text
                    );
                    self.create_task(turn, TaskDraft::new(TaskReason::ResponseFailed, description))
                        .await?;
                }
                Ok(Branch::Template)
            }
        }
    }

    async fn vanilla(&self, turn: &mut Turn) -> Result<(), ShambaError> {
        let priority = if self.store.has_paid_subscription(turn.customer.id, turn.now).await? {
            TaskPriority::High
        } else {
            TaskPriority::Medium
        };
        let description = format!("Please respond to: {}", turn.inbound.text);
        self.create_task(
            turn,
            TaskDraft::new(TaskReason::VanillaRequest, description).priority(priority),
        )
        .await?;

        if turn.inbound.customer_created && turn.country.is_some() {
            self.join(turn, JoinMethod::Sms, false).await?;
        }
        Ok(())
    }

    /// Turn an unexpected failure into a task so the message is not lost.
    async fn recover(&self, turn: &mut Turn, err: ShambaError) {
        let reason = match &err {
            ShambaError::MissingTemplate { .. } => TaskReason::MissingTemplate,
            _ => TaskReason::ProcessingFailure,
        };
        record_anomaly(
            Anomaly::ProcessingFailure,
            &format!("processing {} failed: {err}", turn.inbound.id),
        );
        if turn.effects.task().is_some() {
            return;
        }
        let description = format!("Automatic handling failed ({err}); respond to: {}", turn.inbound.text);
        if let Err(e) = self
            .create_task(turn, TaskDraft::new(reason, description))
            .await
        {
            error!(inbound_id = %turn.inbound.id, "could not create fallback task: {e}");
        }
    }

    /// Send `request` as this message's response, unless one was already sent.
    pub(crate) async fn respond(
        &self,
        turn: &mut Turn,
        request: OutboundRequest,
    ) -> Result<Option<OutboundMessage>, ShambaError> {
        if !turn.effects.allow_response() {
            return Ok(None);
        }
        if is_blank(&request.text) {
            record_anomaly(
                Anomaly::MissingTranslation,
                &format!("nothing sendable for {} reply to {}", request.kind, turn.inbound.id),
            );
            return Ok(None);
        }
        let message = self
            .responder
            .send(request.in_reply_to(turn.inbound.id), turn.now)
            .await?;
        turn.effects.response_sent(message.id);
        Ok(Some(message))
    }

    /// Create a task for this message, unless one was already created.
    pub(crate) async fn create_task(
        &self,
        turn: &mut Turn,
        draft: TaskDraft,
    ) -> Result<Option<TaskId>, ShambaError> {
        if !turn.effects.allow_task(draft.reason) {
            return Ok(None);
        }
        let mut outgoing = draft.outgoing;
        if let Some(response) = turn.effects.response()
            && !outgoing.contains(&response)
        {
            outgoing.push(response);
        }
        let task = Task {
            id: TaskId::new(),
            customer: turn.customer.id,
            description: draft.description,
            source: draft
                .source
                .unwrap_or(TaskSource::Inbound(turn.inbound.id)),
            priority: draft.priority,
            status: TaskStatus::New,
            reasons: vec![draft.reason],
            incoming: vec![turn.inbound.id],
            outgoing,
            created_at: turn.now,
        };
        self.store.create_task(&task).await?;
        turn.effects.task_created(task.id);
        record_task(draft.reason);
        info!(
            task_id = %task.id,
            customer_id = %task.customer,
            reason = %draft.reason,
            priority = %task.priority,
            "task created"
        );
        Ok(Some(task.id))
    }

    /// A named template applicable to `country`, if one exists.
    pub(crate) async fn named_template(
        &self,
        name: &str,
        country: Country,
    ) -> Result<Option<ResponseTemplate>, ShambaError> {
        self.store.template_by_name(name, country).await
    }

    pub(crate) async fn required_template(
        &self,
        name: &str,
        country: Country,
    ) -> Result<ResponseTemplate, ShambaError> {
        match self.named_template(name, country).await? {
            Some(template) => Ok(template),
            None => {
                record_anomaly(
                    Anomaly::MissingTemplate,
                    &format!("no template `{name}` for {country}"),
                );
                Err(ShambaError::MissingTemplate {
                    name: name.to_string(),
                    country: country.code().to_string(),
                })
            }
        }
    }

    /// The customer's language and the tenant default.
    fn languages(&self, turn: &Turn) -> (Language, Language) {
        let default = self.config.engine.default_language();
        let requested = turn
            .customer
            .preferred_language
            .or_else(|| turn.country.map(|c| c.default_language()))
            .unwrap_or(default);
        (requested, default)
    }

    /// Localized, populated text of `template`; `None` if it has no text at all.
    pub(crate) fn render(
        &self,
        turn: &Turn,
        template: &ResponseTemplate,
        context: &PlaceholderContext,
    ) -> Result<Option<String>, ShambaError> {
        let (requested, default) = self.languages(turn);
        let Some((_, text)) = localized_text(template, requested, default) else {
            return Ok(None);
        };
        match populate(&text, &self.config.tenant, &turn.customer, context) {
            Ok(text) if is_blank(&text) => {
                record_anomaly(
                    Anomaly::MissingTranslation,
                    &format!("template `{}` has only blank text for {requested}", template.name),
                );
                Ok(None)
            }
            Ok(text) => Ok(Some(text)),
            Err(e) => {
                record_anomaly(
                    Anomaly::UnresolvedPlaceholder,
                    &format!("template `{}`: {e}", template.name),
                );
                Err(e.into())
            }
        }
    }

    /// Render and send `template`; `Ok(None)` when nothing could be sent.
    pub(crate) async fn respond_with_template(
        &self,
        turn: &mut Turn,
        template: &ResponseTemplate,
        kind: MessageKind,
        context: &PlaceholderContext,
    ) -> Result<Option<OutboundMessage>, ShambaError> {
        let Some(text) = self.render(turn, template, context)? else {
            return Ok(None);
        };
        let request = OutboundRequest::reply(turn.customer.id, text, kind)
            .from_sender(template.sender.clone())
            .with_metadata("template", template.name.clone());
        self.respond(turn, request).await
    }

    /// Region lookup for `country`, rebuilt from the store once stale.
    pub(crate) async fn locality(&self, country: Country) -> Result<Arc<LocalityMatcher>, ShambaError> {
        let cache = self
            .regions
            .get(&country)
            .ok_or_else(|| ShambaError::Internal(format!("no region cache for {country}")))?;
        let store = &self.store;
        cache
            .get_or_refresh(|| async move {
                let mut borders = Vec::new();
                for level in [
                    BorderLevel::Country,
                    BorderLevel::Level1,
                    BorderLevel::Level2,
                    BorderLevel::Level3,
                ] {
                    borders.extend(store.borders(country, level).await?);
                }
                debug!(%country, count = borders.len(), "refreshed region index");
                Ok::<_, ShambaError>(LocalityMatcher::new(country, RegionIndex::new(borders)))
            })
            .await
    }
}

/// Text that would reach the handset empty once unencodable characters go.
fn is_blank(text: &str) -> bool {
    sanitize(text).text.trim().is_empty()
}

fn action_name(action: &Action) -> &'static str {
    match action {
        Action::UnsupportedCountry => "unsupported_country",
        Action::Duplicate { .. } => "duplicate",
        Action::RedeemVoucher(_) => "redeem_voucher",
        Action::SurveyReply { .. } => "survey_reply",
        Action::DataReply { .. } => "data_reply",
        Action::Template(_) => "template",
        Action::KeywordConflict { .. } => "keyword_conflict",
        Action::Signup => "signup",
        Action::Vanilla => "vanilla",
    }
}
