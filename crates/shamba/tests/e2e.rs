// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete dispatch pipeline.
//!
//! Each test creates an isolated TestHarness over the fixture catalog with
//! mock collaborators. Tests are independent and order-insensitive.

use chrono::{TimeZone, Utc};

use shamba_core::{
    BorderLevel, Country, DeliveryStatus, JoinMethod, MessageKind, TaskPriority, TaskReason,
};
use shamba_router::Branch;
use shamba_test_utils::{TestHarness, march};

const WANJIRU: &str = "+254711000001";
const OTIENO: &str = "+254711000002";
const NAKATO: &str = "+256772000001";

// ---- Joining ----

#[tokio::test]
async fn join_from_new_kenyan_number_welcomes_in_swahili() {
    let harness = TestHarness::new().await.unwrap();
    let outcome = harness.send("+254722000100", "JOIN", march(10, 8, 0)).await.unwrap();

    assert_eq!(outcome.branch, Branch::Join);
    assert!(outcome.customer_created);
    assert!(outcome.task.is_none());
    assert_eq!(
        harness.response_text(&outcome).unwrap(),
        "Karibu Shamba! Vidokezo vitaanza wiki hii. Piga 0800 720 000 kwa msaada."
    );

    let customer = harness.customer("+254722000100").await.unwrap().unwrap();
    assert_eq!(customer.join_method, Some(JoinMethod::Sms));
    assert!(customer.border0.is_some());
    assert_eq!(harness.sender.sent_count().await, 1);
}

#[tokio::test]
async fn keyword_variants_resolve_through_normalization() {
    let harness = TestHarness::new().await.unwrap();

    let joined = harness.send("+254722000101", "jiunge!", march(10, 8, 0)).await.unwrap();
    assert_eq!(joined.branch, Branch::Join);

    let stopped = harness.send("+254722000101", "Sto", march(10, 9, 0)).await.unwrap();
    assert_eq!(stopped.branch, Branch::Stop);
    assert!(harness.customer("+254722000101").await.unwrap().unwrap().has_requested_stop);

    let again = harness.send("+254722000101", "off", march(10, 10, 0)).await.unwrap();
    assert_eq!(again.branch, Branch::Stop);
    assert_eq!(
        harness.response_text(&again).unwrap(),
        "Tayari umejiondoa. Tuma JIUNGE kujiunga tena."
    );
}

#[tokio::test]
async fn keyword_at_start_of_longer_sentence_is_a_question() {
    let harness = TestHarness::new().await.unwrap();
    let outcome = harness
        .send(OTIENO, "Stop the armyworm from eating my maize", march(10, 8, 0))
        .await
        .unwrap();

    assert_eq!(outcome.branch, Branch::Vanilla);
    assert!(!harness.customer(OTIENO).await.unwrap().unwrap().has_requested_stop);
    assert_eq!(
        harness.task(&outcome).unwrap().reasons,
        vec![TaskReason::VanillaRequest]
    );
}

#[tokio::test]
async fn first_contact_question_gets_task_and_welcome() {
    let harness = TestHarness::new().await.unwrap();
    let outcome = harness
        .send("+260971000001", "How do I treat cassava mosaic?", march(10, 8, 0))
        .await
        .unwrap();

    assert_eq!(outcome.branch, Branch::Vanilla);
    let task = harness.task(&outcome).unwrap();
    assert_eq!(task.priority, TaskPriority::Medium);
    assert!(task.description.contains("cassava mosaic"));

    let welcome = harness.store.outbound_message(outcome.response.unwrap()).unwrap();
    assert_eq!(welcome.kind, MessageKind::Join);
    assert_eq!(
        welcome.text,
        "Welcome to Shamba! Tips start this week. Call 0800 720 000 for help."
    );
}

// ---- Fallback tasks ----

#[tokio::test]
async fn paid_subscribers_get_high_priority_tasks() {
    let harness = TestHarness::new().await.unwrap();
    let freemium = harness
        .send(NAKATO, "My goats are coughing", march(10, 8, 0))
        .await
        .unwrap();
    let premium = harness
        .send(WANJIRU, "My cow has a swollen udder", march(10, 8, 0))
        .await
        .unwrap();
    let unpaid = harness
        .send(OTIENO, "My cow has a swollen udder", march(10, 8, 0))
        .await
        .unwrap();

    assert_eq!(harness.task(&freemium).unwrap().priority, TaskPriority::High);
    assert_eq!(harness.task(&premium).unwrap().priority, TaskPriority::High);
    assert_eq!(harness.task(&unpaid).unwrap().priority, TaskPriority::Medium);
}

#[tokio::test]
async fn duplicate_inside_window_is_suppressed() {
    let harness = TestHarness::new().await.unwrap();
    let text = "My maize leaves are turning yellow";

    let first = harness.send(OTIENO, text, march(10, 8, 0)).await.unwrap();
    let repeat = harness.send(OTIENO, text, march(10, 8, 3)).await.unwrap();
    let later = harness.send(OTIENO, text, march(10, 8, 10)).await.unwrap();

    assert_eq!(first.branch, Branch::Vanilla);
    assert_eq!(repeat.branch, Branch::Duplicate);
    assert!(repeat.task.is_none() && repeat.response.is_none());
    assert_eq!(later.branch, Branch::Vanilla);
    assert_eq!(harness.tasks().len(), 2);
}

#[tokio::test]
async fn template_restricted_to_other_country_is_a_conflict() {
    let harness = TestHarness::new().await.unwrap();
    let outcome = harness.send(NAKATO, "MAIZE", march(10, 8, 0)).await.unwrap();

    assert_eq!(outcome.branch, Branch::KeywordConflict);
    assert_eq!(
        harness.task(&outcome).unwrap().reasons,
        vec![TaskReason::KeywordConflict]
    );
    assert!(outcome.response.is_none());
}

#[tokio::test]
async fn unsupported_country_gets_fixed_reply() {
    let harness = TestHarness::new().await.unwrap();
    let outcome = harness.send("+447700900123", "JOIN", march(10, 8, 0)).await.unwrap();

    assert_eq!(outcome.branch, Branch::UnsupportedCountry);
    let reply = harness.store.outbound_message(outcome.response.unwrap()).unwrap();
    assert_eq!(reply.kind, MessageKind::Unsupported);
    assert!(harness.sender.dispatches().await[0].options.allow_international);
    assert!(harness.tasks().is_empty());
}

// ---- Templates ----

#[tokio::test]
async fn tenant_placeholders_are_filled() {
    let harness = TestHarness::new().await.unwrap();
    let outcome = harness.send(OTIENO, "price?", march(10, 8, 0)).await.unwrap();

    assert_eq!(outcome.branch, Branch::Template);
    assert_eq!(
        harness.response_text(&outcome).unwrap(),
        "Premium is KSh 100 a month or KSh 1,000 a year. Pay to till 512345."
    );
}

#[tokio::test]
async fn category_template_tags_customer() {
    let harness = TestHarness::new().await.unwrap();
    harness.send(OTIENO, "maize", march(10, 8, 0)).await.unwrap();
    harness.send(OTIENO, "Maize.", march(10, 9, 0)).await.unwrap();

    let customer = harness.customer(OTIENO).await.unwrap().unwrap();
    assert_eq!(customer.categories, vec!["maize".to_string()]);
}

#[tokio::test]
async fn failed_hand_off_still_creates_follow_up_task() {
    let harness = TestHarness::new().await.unwrap();
    harness.sender.set_failing(true);

    let outcome = harness.send(OTIENO, "Call me", march(10, 8, 0)).await.unwrap();

    assert_eq!(outcome.branch, Branch::Template);
    assert_eq!(
        harness.task(&outcome).unwrap().reasons,
        vec![TaskReason::TemplateAction]
    );
    let attempted = harness.outbound();
    assert_eq!(attempted.len(), 1);
    let attempts = harness.store.attempts_for(attempted[0].id);
    assert!(!attempts.is_empty());
    assert!(attempts.iter().all(|a| a.status == DeliveryStatus::Failed));
}

// ---- Vouchers ----

#[tokio::test]
async fn free_months_voucher_joins_and_is_redeemed_once() {
    let harness = TestHarness::new().await.unwrap();
    let phone = "+254722000200";

    let first = harness.send(phone, "free3", march(10, 8, 0)).await.unwrap();
    assert_eq!(first.branch, Branch::Voucher);
    assert_eq!(
        harness.response_text(&first).unwrap(),
        "Voucher accepted: 3 free months of Shamba, valid until 10/07/2026."
    );
    let customer = harness.customer(phone).await.unwrap().unwrap();
    assert_eq!(customer.join_method, Some(JoinMethod::Voucher));
    let ends_at = harness.store.subscription(customer.id).unwrap().ends_at;
    assert_eq!(ends_at, Utc.with_ymd_and_hms(2026, 7, 10, 8, 0, 0).unwrap());

    let second = harness.send(phone, "FREE3", march(10, 9, 0)).await.unwrap();
    assert_eq!(
        harness.response_text(&second).unwrap(),
        "Sorry, voucher FREE3 has already been used."
    );
    let third = harness.send(OTIENO, "FREE3", march(10, 9, 30)).await.unwrap();
    assert_eq!(
        harness.response_text(&third).unwrap(),
        "Sorry, voucher FREE3 has already been used."
    );
    assert_eq!(harness.store.subscription(customer.id).unwrap().ends_at, ends_at);
}

#[tokio::test]
async fn repeatable_and_expired_vouchers() {
    let harness = TestHarness::new().await.unwrap();

    let discount = harness.send(OTIENO, "SAVE10", march(10, 8, 0)).await.unwrap();
    assert_eq!(
        harness.response_text(&discount).unwrap(),
        "Voucher SAVE10 accepted. Show this SMS at the agro-dealer for your discount."
    );
    let repeat = harness.send(OTIENO, "SAVE10", march(10, 9, 0)).await.unwrap();
    assert_eq!(
        harness.response_text(&repeat).unwrap(),
        "You have already used voucher SAVE10."
    );

    let expired = harness.send(OTIENO, "OLD1", march(10, 10, 0)).await.unwrap();
    assert_eq!(
        harness.response_text(&expired).unwrap(),
        "Sorry, voucher OLD1 has expired."
    );
}

// ---- Replies to outstanding requests ----

#[tokio::test]
async fn survey_reply_is_recorded_once() {
    let harness = TestHarness::new().await.unwrap();
    let otieno = harness.customer(OTIENO).await.unwrap().unwrap();
    harness
        .engine
        .send_text(
            &[otieno.id],
            "How likely are you to recommend Shamba, 0-10?",
            MessageKind::NpsRequest,
            march(10, 8, 0),
        )
        .await
        .unwrap();

    let reply = harness.send(OTIENO, "9/10", march(10, 9, 0)).await.unwrap();
    assert_eq!(reply.branch, Branch::SurveyReply);
    let scores = harness.store.nps_responses();
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].score, 9);
    assert_eq!(scores[0].reply, reply.inbound);

    let follow_up = harness.send(OTIENO, "10", march(10, 9, 30)).await.unwrap();
    assert_eq!(follow_up.branch, Branch::Vanilla);
    assert_eq!(harness.store.nps_responses().len(), 1);
}

#[tokio::test]
async fn out_of_range_score_goes_to_review() {
    let harness = TestHarness::new().await.unwrap();
    let wanjiru = harness.customer(WANJIRU).await.unwrap().unwrap();
    let request = harness
        .engine
        .send_text(&[wanjiru.id], "Rate us 0-10", MessageKind::NpsRequest, march(10, 8, 0))
        .await
        .unwrap();

    let reply = harness.send(WANJIRU, "11", march(10, 8, 30)).await.unwrap();
    assert_eq!(reply.branch, Branch::SurveyReply);
    let task = harness.task(&reply).unwrap();
    assert_eq!(task.reasons, vec![TaskReason::SurveyReview]);
    assert_eq!(task.outgoing, vec![request.id]);
    assert!(harness.store.nps_responses().is_empty());
}

#[tokio::test]
async fn location_reply_fills_regions() {
    let harness = TestHarness::new().await.unwrap();
    let otieno = harness.customer(OTIENO).await.unwrap().unwrap();
    harness
        .engine
        .send_text(
            &[otieno.id],
            "Which ward is your farm in?",
            MessageKind::DataRequest,
            march(10, 8, 0),
        )
        .await
        .unwrap();

    let reply = harness.send(OTIENO, "elburgon", march(10, 8, 30)).await.unwrap();
    assert_eq!(reply.branch, Branch::DataReply);
    assert!(reply.task.is_none());

    let customer = harness.customer(OTIENO).await.unwrap().unwrap();
    let ward = harness.border(Country::Kenya, BorderLevel::Level3, "Elburgon").await.unwrap();
    let county = harness.border(Country::Kenya, BorderLevel::Level1, "Nakuru").await.unwrap();
    assert_eq!(customer.border3, ward);
    assert_eq!(customer.border1, county);
}

// ---- AI signup ----

#[tokio::test]
async fn signup_over_two_messages_uses_landmark() {
    let harness = TestHarness::builder()
        .with_agent_replies(vec![
            r#"{"name": "Jane Wanjiku", "crops_livestock": "maize and cows", "county": null, "ward": null}"#.into(),
            "```json\n{\"county\": \"Kiambu\", \"nearest_landmark\": \"Kagwe market\"}\n```".into(),
        ])
        .with_landmark("Kagwe market", Country::Kenya, "Komothai", 0.9)
        .build()
        .await
        .unwrap();
    let phone = "+254722000300";

    let first = harness
        .send(phone, "I am Jane Wanjiku, I grow maize and keep cows", march(10, 8, 0))
        .await
        .unwrap();
    assert_eq!(first.branch, Branch::Signup);
    assert_eq!(
        harness.response_text(&first).unwrap(),
        "Thank you! Please also send us your county, ward."
    );

    let second = harness
        .send(phone, "Kiambu, near Kagwe market", march(10, 8, 20))
        .await
        .unwrap();
    assert_eq!(second.branch, Branch::Signup);
    assert_eq!(
        harness.response_text(&second).unwrap(),
        "Thank you Jane Wanjiku, you are now registered with Shamba."
    );

    let customer = harness.customer(phone).await.unwrap().unwrap();
    assert!(customer.is_registered);
    assert_eq!(customer.commodities.len(), 2);
    assert_eq!(
        customer.border3,
        harness.border(Country::Kenya, BorderLevel::Level3, "Komothai").await.unwrap()
    );
    let prompts = harness.completion.prompts().await;
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("I am Jane Wanjiku"));
}

#[tokio::test]
async fn unknown_commodity_hands_signup_to_a_human() {
    let harness = TestHarness::builder()
        .with_agent_replies(vec![
            r#"{"name": "Mwila", "crops_livestock": ["maize", "dragon fruit"]}"#.into(),
        ])
        .build()
        .await
        .unwrap();
    let phone = "+260971000050";

    let outcome = harness
        .send(phone, "Mwila here, maize and dragon fruit", march(10, 8, 0))
        .await
        .unwrap();

    assert_eq!(outcome.branch, Branch::Signup);
    let task = harness.task(&outcome).unwrap();
    assert_eq!(task.reasons, vec![TaskReason::SignupReview]);
    assert!(task.description.contains("dragon fruit"));
    assert!(harness.customer(phone).await.unwrap().unwrap().skip_ai_invocation);

    // The agent is not asked again once a human has taken over.
    let next = harness.send(phone, "Hello?", march(10, 9, 0)).await.unwrap();
    assert_eq!(next.branch, Branch::Vanilla);
    assert_eq!(harness.completion.prompts().await.len(), 1);
}

#[tokio::test]
async fn model_outage_becomes_a_review_task() {
    let harness = TestHarness::builder()
        .with_agent_replies(Vec::new())
        .build()
        .await
        .unwrap();
    harness.completion.add_failure("model offline").await;

    let outcome = harness
        .send("+256772000400", "Namukasa from Kira, I grow coffee", march(10, 8, 0))
        .await
        .unwrap();

    assert_eq!(outcome.branch, Branch::Signup);
    assert_eq!(
        harness.task(&outcome).unwrap().reasons,
        vec![TaskReason::SignupReview]
    );
    assert!(outcome.response.is_none());
}
