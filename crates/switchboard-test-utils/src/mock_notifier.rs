// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notifier for deterministic testing.
//!
//! `MockNotifier` implements `Notifier` by capturing every call for
//! assertion. Delivery failures can be switched on to exercise the
//! engine's log-and-continue path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use switchboard_core::types::EscalationReason;
use switchboard_core::{Notifier, SwitchboardError};

/// One captured notifier call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifiedEvent {
    DepartmentQueued {
        department_id: String,
        conversation_id: String,
    },
    AgentAssigned {
        agent_id: String,
        conversation_id: String,
    },
    CompanyTransferred {
        company_id: String,
        conversation_id: String,
        to_department_id: String,
        reason: EscalationReason,
    },
    CustomerText {
        conversation_id: String,
        text: String,
    },
}

pub struct MockNotifier {
    events: Arc<Mutex<Vec<NotifiedEvent>>>,
    failing: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            failing: AtomicBool::new(false),
        }
    }

    /// While set, every call fails with a delivery error and records nothing.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn events(&self) -> Vec<NotifiedEvent> {
        self.events.lock().await.clone()
    }

    /// Texts sent to the customer of `conversation_id`, in order.
    pub async fn texts_for(&self, conversation_id: &str) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                NotifiedEvent::CustomerText {
                    conversation_id: id,
                    text,
                } if id == conversation_id => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Escalations recorded for `conversation_id`.
    pub async fn transfers_for(&self, conversation_id: &str) -> Vec<EscalationReason> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                NotifiedEvent::CompanyTransferred {
                    conversation_id: id,
                    reason,
                    ..
                } if id == conversation_id => Some(*reason),
                _ => None,
            })
            .collect()
    }

    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }

    async fn record(&self, event: NotifiedEvent) -> Result<(), SwitchboardError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SwitchboardError::Delivery {
                message: "mock notifier set to fail".into(),
                source: None,
            });
        }
        self.events.lock().await.push(event);
        Ok(())
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify_department_queued(
        &self,
        department_id: &str,
        conversation_id: &str,
    ) -> Result<(), SwitchboardError> {
        self.record(NotifiedEvent::DepartmentQueued {
            department_id: department_id.to_string(),
            conversation_id: conversation_id.to_string(),
        })
        .await
    }

    async fn notify_agent_assigned(
        &self,
        agent_id: &str,
        conversation_id: &str,
    ) -> Result<(), SwitchboardError> {
        self.record(NotifiedEvent::AgentAssigned {
            agent_id: agent_id.to_string(),
            conversation_id: conversation_id.to_string(),
        })
        .await
    }

    async fn notify_company_transferred(
        &self,
        company_id: &str,
        conversation_id: &str,
        to_department_id: &str,
        reason: EscalationReason,
    ) -> Result<(), SwitchboardError> {
        self.record(NotifiedEvent::CompanyTransferred {
            company_id: company_id.to_string(),
            conversation_id: conversation_id.to_string(),
            to_department_id: to_department_id.to_string(),
            reason,
        })
        .await
    }

    async fn send_customer_text(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<(), SwitchboardError> {
        self.record(NotifiedEvent::CustomerText {
            conversation_id: conversation_id.to_string(),
            text: text.to_string(),
        })
        .await
    }
}
