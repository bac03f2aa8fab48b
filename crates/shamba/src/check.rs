// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `shamba check` command implementation.
//!
//! Reports on a configuration that has already passed validation, and
//! optionally on a catalog: whether every operated country can be answered.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use shamba_config::ShambaConfig;
use shamba_core::{BorderLevel, CatalogStore, Country};
use shamba_router::names;
use shamba_storage::{Catalog, MemoryStore};

/// Templates the engine falls back on; without them some branches become tasks.
const ENGINE_TEMPLATES: &[&str] = &[
    names::EMPTY,
    names::JOIN,
    names::JOIN_NEW,
    names::JOIN_REJOIN,
    names::JOIN_EXISTING,
    names::STOP_CONFIRMED,
    names::STOP_ALREADY,
    names::VOUCHER_EXPIRED,
    names::VOUCHER_USED,
    names::VOUCHER_USED_BY_YOU,
    names::VOUCHER_DISCOUNT,
    names::VOUCHER_FREE_MONTHS,
    names::SIGNUP_COMPLETE,
    names::SIGNUP_PARTIAL,
];

/// Status of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: String, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message,
            duration: start.elapsed(),
        }
    }
}

/// Run the `shamba check` command.
///
/// Returns `false` when any check failed, so the caller can exit non-zero.
pub async fn run_check(config: &ShambaConfig, catalog: Option<&Path>, plain: bool) -> bool {
    let use_color = !plain && std::io::stdout().is_terminal();

    let mut results = vec![
        check_countries(config),
        check_tenant(config),
        check_agent(config),
    ];
    if let Some(path) = catalog {
        results.extend(check_catalog(config, path).await);
    }

    println!();
    println!("  shamba check");
    println!("  {}", "-".repeat(50));
    for result in &results {
        println!("{}", format_line(result, use_color));
    }
    println!();

    let failed = results.iter().filter(|r| r.status == CheckStatus::Fail).count();
    let warned = results.iter().filter(|r| r.status == CheckStatus::Warn).count();
    if failed + warned > 0 {
        let issues = failed + warned;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    failed == 0
}

fn format_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red()),
        };
        format!(
            "    {symbol} {:<20} {message} ({duration_ms}ms)",
            result.name
        )
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

fn check_countries(config: &ShambaConfig) -> CheckResult {
    let start = Instant::now();
    let codes: Vec<&str> = config
        .countries
        .operated_countries()
        .into_iter()
        .map(|c| c.code())
        .collect();
    CheckResult::new(
        "Countries",
        CheckStatus::Pass,
        format!("operating in {}", codes.join(", ")),
        start,
    )
}

/// Placeholder values that templates may reference.
fn check_tenant(config: &ShambaConfig) -> CheckResult {
    let start = Instant::now();
    let tenant = &config.tenant;
    let unset: Vec<&str> = [
        ("call_centre", &tenant.call_centre),
        ("shortcode", &tenant.shortcode),
        ("monthly_price", &tenant.monthly_price),
        ("yearly_price", &tenant.yearly_price),
        ("till_number", &tenant.till_number),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_none())
    .map(|(key, _)| key)
    .collect();

    if unset.is_empty() {
        CheckResult::new(
            "Tenant",
            CheckStatus::Pass,
            format!("sending as {}", tenant.sender_identity),
            start,
        )
    } else {
        CheckResult::new(
            "Tenant",
            CheckStatus::Warn,
            format!("unset placeholders: {}", unset.join(", ")),
            start,
        )
    }
}

fn check_agent(config: &ShambaConfig) -> CheckResult {
    let start = Instant::now();
    let agent = &config.agent;
    match (agent.enabled, agent.whitelist_enabled) {
        (false, _) => CheckResult::new("Signup agent", CheckStatus::Pass, "disabled".into(), start),
        (true, true) if agent.whitelist.is_empty() => CheckResult::new(
            "Signup agent",
            CheckStatus::Warn,
            "whitelist is on but empty; nobody reaches the agent".into(),
            start,
        ),
        (true, true) => CheckResult::new(
            "Signup agent",
            CheckStatus::Pass,
            format!("enabled for {} whitelisted numbers", agent.whitelist.len()),
            start,
        ),
        (true, false) => CheckResult::new(
            "Signup agent",
            CheckStatus::Pass,
            "enabled for all senders".into(),
            start,
        ),
    }
}

async fn check_catalog(config: &ShambaConfig, path: &Path) -> Vec<CheckResult> {
    let start = Instant::now();
    let store = match Catalog::from_path(path) {
        Ok(catalog) => match catalog.into_store().await {
            Ok(store) => store,
            Err(e) => return vec![CheckResult::new("Catalog", CheckStatus::Fail, e.to_string(), start)],
        },
        Err(e) => return vec![CheckResult::new("Catalog", CheckStatus::Fail, e.to_string(), start)],
    };

    let mut results = vec![CheckResult::new(
        "Catalog",
        CheckStatus::Pass,
        format!("loaded {}", path.display()),
        start,
    )];
    for country in config.countries.operated_countries() {
        results.push(check_country_catalog(&store, country).await);
    }
    results
}

async fn check_country_catalog(store: &MemoryStore, country: Country) -> CheckResult {
    let start = Instant::now();
    let name = format!("Catalog {}", country.code());

    let mut missing = Vec::new();
    for template in ENGINE_TEMPLATES {
        match store.template_by_name(template, country).await {
            Ok(Some(_)) => {}
            Ok(None) => missing.push(*template),
            Err(e) => return CheckResult::new(&name, CheckStatus::Fail, e.to_string(), start),
        }
    }
    let wards = match store.borders(country, BorderLevel::Level3).await {
        Ok(wards) => wards.len(),
        Err(e) => return CheckResult::new(&name, CheckStatus::Fail, e.to_string(), start),
    };

    if missing.contains(&names::EMPTY) {
        CheckResult::new(
            &name,
            CheckStatus::Fail,
            "no `empty` template; empty messages cannot be answered".into(),
            start,
        )
    } else if !missing.is_empty() {
        CheckResult::new(
            &name,
            CheckStatus::Warn,
            format!("missing templates: {}", missing.join(", ")),
            start,
        )
    } else if wards == 0 {
        CheckResult::new(
            &name,
            CheckStatus::Warn,
            "no level-3 regions; location replies will become tasks".into(),
            start,
        )
    } else {
        CheckResult::new(
            &name,
            CheckStatus::Pass,
            format!("all engine templates present, {wards} level-3 regions"),
            start,
        )
    }
}
