// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! At most one task and one response per processed message.

use shamba_core::{OutboundId, TaskId, TaskPriority, TaskReason, TaskSource};

use crate::metrics::{Anomaly, record_anomaly};

/// A task the engine wants to create.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub reason: TaskReason,
    pub description: String,
    pub priority: TaskPriority,
    /// Defaults to the inbound message being processed.
    pub source: Option<TaskSource>,
    pub outgoing: Vec<OutboundId>,
}

impl TaskDraft {
    pub fn new(reason: TaskReason, description: impl Into<String>) -> Self {
        Self {
            reason,
            description: description.into(),
            priority: TaskPriority::Medium,
            source: None,
            outgoing: Vec::new(),
        }
    }

    pub fn priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Review of a reply: the source is the query that was answered.
    pub fn answering(mut self, request: OutboundId) -> Self {
        self.source = Some(TaskSource::Outbound(request));
        self.outgoing.push(request);
        self
    }
}

/// Side effects already produced while processing one message.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Effects {
    task: Option<TaskId>,
    response: Option<OutboundId>,
}

impl Effects {
    pub fn task(&self) -> Option<TaskId> {
        self.task
    }

    pub fn response(&self) -> Option<OutboundId> {
        self.response
    }

    /// Whether a task may still be created; logs the rejected request if not.
    pub fn allow_task(&self, reason: TaskReason) -> bool {
        match self.task {
            None => true,
            Some(existing) => {
                record_anomaly(
                    Anomaly::EffectRejected,
                    &format!("second task ({reason}) ignored, task {existing} already created"),
                );
                false
            }
        }
    }

    /// Whether a response may still be sent; logs the rejected request if not.
    pub fn allow_response(&self) -> bool {
        match self.response {
            None => true,
            Some(existing) => {
                record_anomaly(
                    Anomaly::EffectRejected,
                    &format!("second response ignored, message {existing} already sent"),
                );
                false
            }
        }
    }

    pub fn task_created(&mut self, id: TaskId) {
        self.task = Some(id);
    }

    pub fn response_sent(&mut self, id: OutboundId) {
        self.response = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    #[traced_test]
    #[test]
    fn second_task_and_response_are_refused() {
        let mut effects = Effects::default();
        assert!(effects.allow_task(TaskReason::VanillaRequest));
        effects.task_created(TaskId::new());
        assert!(!effects.allow_task(TaskReason::Registration));
        assert!(logs_contain("second task (registration) ignored"));

        assert!(effects.allow_response());
        effects.response_sent(OutboundId::new());
        assert!(!effects.allow_response());
    }

    #[test]
    fn answering_sets_outbound_source() {
        let request = OutboundId::new();
        let draft = TaskDraft::new(TaskReason::SurveyReview, "check score").answering(request);
        assert_eq!(draft.source, Some(TaskSource::Outbound(request)));
        assert_eq!(draft.outgoing, vec![request]);
        assert_eq!(draft.priority, TaskPriority::Medium);
    }
}
