// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `shamba replay` command implementation.
//!
//! Seeds an in-memory store from a catalog, then pushes inbound messages from
//! a JSON lines file through the engine. Each message produces one JSON line
//! on stdout describing what the engine did. Dispatches are logged, not sent.

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use shamba_config::ShambaConfig;
use shamba_core::{
    AdapterType, Dispatch, HealthStatus, MessageSender, PluginAdapter, ShambaError, Store,
    TaskPriority, TaskReason,
};
use shamba_prometheus::{PrometheusAdapter, set_known_customers};
use shamba_router::{Branch, Engine};
use shamba_storage::{Catalog, MemoryStore};

/// One inbound SMS in the replay file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayMessage {
    pub from: String,
    /// Defaults to the tenant's sender identity.
    #[serde(default)]
    pub to: Option<String>,
    pub text: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TaskSummary {
    pub reasons: Vec<TaskReason>,
    pub priority: TaskPriority,
    pub description: String,
}

/// What the engine did with one line of the replay file.
#[derive(Debug, Default, Serialize)]
pub struct ReplayRecord {
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<Branch>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub customer_created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Counts reported at the end of a replay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub processed: usize,
    pub rejected: usize,
}

/// Accepts every dispatch and logs it.
pub struct LogSender;

#[async_trait]
impl PluginAdapter for LogSender {
    fn name(&self) -> &str {
        "log-sender"
    }

    fn version(&self) -> semver::Version {
        semver::Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or(semver::Version::new(0, 1, 0))
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Sender
    }

    async fn health_check(&self) -> Result<HealthStatus, ShambaError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl MessageSender for LogSender {
    async fn send(&self, dispatch: Dispatch) -> Result<(), ShambaError> {
        info!(
            message_id = %dispatch.message,
            recipients = dispatch.recipients.len(),
            pages = dispatch.options.pages,
            sender_identity = %dispatch.sender_identity,
            "dispatch accepted"
        );
        Ok(())
    }
}

/// Run the `shamba replay` command against files on disk.
pub async fn run_replay(
    config: ShambaConfig,
    catalog: &Path,
    messages: &Path,
    with_metrics: bool,
) -> Result<ReplaySummary, ShambaError> {
    let recorder = if with_metrics {
        Some(PrometheusAdapter::install()?)
    } else {
        None
    };

    let store = Arc::new(Catalog::from_path(catalog)?.into_store().await?);
    let file = std::fs::File::open(messages).map_err(|e| {
        ShambaError::Config(format!("failed to open {}: {e}", messages.display()))
    })?;
    let engine = build_engine(config, Arc::clone(&store));

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = replay(&engine, &store, std::io::BufReader::new(file), &mut out).await?;

    if let Some(recorder) = recorder {
        set_known_customers(store.customer_count());
        write!(out, "{}", recorder.render()).map_err(write_error)?;
    }
    info!(
        processed = summary.processed,
        rejected = summary.rejected,
        "replay finished"
    );
    Ok(summary)
}

pub fn build_engine(config: ShambaConfig, store: Arc<MemoryStore>) -> Engine {
    let store: Arc<dyn Store> = store;
    Engine::new(config, store, Arc::new(LogSender))
}

/// Replay every line of `input`, writing one JSON record per line to `out`.
///
/// Unparseable lines and caller-shape violations are reported in the record's
/// `error` field and counted as rejected; they do not stop the replay.
pub async fn replay<R: BufRead, W: Write>(
    engine: &Engine,
    store: &MemoryStore,
    input: R,
    out: &mut W,
) -> Result<ReplaySummary, ShambaError> {
    let mut summary = ReplaySummary::default();
    let recipient = engine.config().tenant.sender_identity.clone();

    for (index, line) in input.lines().enumerate() {
        let line = line.map_err(|e| ShambaError::Internal(format!("failed to read input: {e}")))?;
        if line.trim().is_empty() {
            continue;
        }
        let mut record = ReplayRecord {
            line: index + 1,
            ..ReplayRecord::default()
        };

        match serde_json::from_str::<ReplayMessage>(&line) {
            Err(e) => {
                warn!(line = index + 1, "skipping malformed replay line: {e}");
                record.error = Some(format!("malformed line: {e}"));
                summary.rejected += 1;
            }
            Ok(message) => {
                let to = message.to.as_deref().unwrap_or(&recipient);
                match engine.receive(&message.from, to, &message.text, message.at).await {
                    Ok(outcome) => {
                        record.branch = Some(outcome.branch);
                        record.customer_created = outcome.customer_created;
                        record.response = outcome
                            .response
                            .and_then(|id| store.outbound_message(id))
                            .map(|m| m.text);
                        record.task = outcome.task.and_then(|id| {
                            store.all_tasks().into_iter().find(|t| t.id == id).map(|t| {
                                TaskSummary {
                                    reasons: t.reasons,
                                    priority: t.priority,
                                    description: t.description,
                                }
                            })
                        });
                        summary.processed += 1;
                    }
                    Err(e) if e.is_contract_violation() => {
                        record.error = Some(e.to_string());
                        summary.rejected += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let json = serde_json::to_string(&record)
            .map_err(|e| ShambaError::Internal(format!("failed to encode record: {e}")))?;
        writeln!(out, "{json}").map_err(write_error)?;
    }
    Ok(summary)
}

fn write_error(e: std::io::Error) -> ShambaError {
    ShambaError::Internal(format!("failed to write output: {e}"))
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    const CATALOG: &str = r#"{
        "templates": [
            {"name": "empty", "translations": {"eng": "Send JOIN to start."}},
            {"name": "join", "action": "join_customer", "translations": {"eng": "Welcome."}},
            {"name": "join_new", "translations": {"eng": "Welcome to Shamba."}}
        ],
        "keywords": [{"text": "JOIN", "templates": ["join"]}],
        "borders": [{"country": "UG", "level": "country", "name": "Uganda"}]
    }"#;

    async fn run(lines: &str) -> (ReplaySummary, Vec<Value>) {
        let store = Arc::new(Catalog::from_json(CATALOG).unwrap().into_store().await.unwrap());
        let engine = build_engine(ShambaConfig::default(), Arc::clone(&store));
        let mut out = Vec::new();
        let summary = replay(&engine, &store, lines.as_bytes(), &mut out).await.unwrap();
        let records = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (summary, records)
    }

    #[tokio::test]
    async fn join_line_reports_branch_and_reply() {
        let (summary, records) = run(
            r#"{"from": "+256772111222", "text": "JOIN", "at": "2026-03-10T08:00:00Z"}"#,
        )
        .await;
        assert_eq!(summary, ReplaySummary { processed: 1, rejected: 0 });
        assert_eq!(records[0]["line"], 1);
        assert_eq!(records[0]["branch"], "join");
        assert_eq!(records[0]["customer_created"], true);
        assert_eq!(records[0]["response"], "Welcome to Shamba.");
    }

    #[tokio::test]
    async fn bad_lines_are_reported_and_skipped() {
        let input = concat!(
            "not json\n",
            "\n",
            r#"{"from": " ", "text": "JOIN", "at": "2026-03-10T08:00:00Z"}"#,
            "\n",
            r#"{"from": "+256772111222", "text": "maize prices?", "at": "2026-03-10T08:01:00Z"}"#,
        );
        let (summary, records) = run(input).await;
        assert_eq!(summary, ReplaySummary { processed: 1, rejected: 2 });
        assert_eq!(records.len(), 3);
        assert!(records[0]["error"].as_str().unwrap().starts_with("malformed line"));
        assert_eq!(records[1]["line"], 3);
        assert!(records[1]["error"].is_string());
        assert_eq!(records[2]["line"], 4);
        assert_eq!(records[2]["branch"], "vanilla");
        assert_eq!(records[2]["task"]["reasons"][0], "vanilla_request");
    }
}
