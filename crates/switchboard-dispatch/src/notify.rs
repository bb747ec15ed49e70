// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process notifier fanning routing events out over a broadcast channel.
//!
//! Channel adapters and agent sessions subscribe and forward events to their
//! own transports.

use async_trait::async_trait;
use switchboard_core::types::EscalationReason;
use switchboard_core::{Notifier, SwitchboardError};
use tokio::sync::broadcast;

/// Default subscriber buffer.
pub const DEFAULT_CAPACITY: usize = 256;

/// Event published for each notifier call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingEvent {
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

impl RoutingEvent {
    pub fn conversation_id(&self) -> &str {
        match self {
            Self::DepartmentQueued {
                conversation_id, ..
            }
            | Self::AgentAssigned {
                conversation_id, ..
            }
            | Self::CompanyTransferred {
                conversation_id, ..
            }
            | Self::CustomerText {
                conversation_id, ..
            } => conversation_id,
        }
    }
}

pub struct BroadcastNotifier {
    tx: broadcast::Sender<RoutingEvent>,
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoutingEvent> {
        self.tx.subscribe()
    }

    fn publish(&self, event: RoutingEvent) -> Result<(), SwitchboardError> {
        self.tx
            .send(event)
            .map(|_| ())
            .map_err(|e| SwitchboardError::Delivery {
                message: "no subscriber for routing events".into(),
                source: Some(Box::new(e)),
            })
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn notify_department_queued(
        &self,
        department_id: &str,
        conversation_id: &str,
    ) -> Result<(), SwitchboardError> {
        self.publish(RoutingEvent::DepartmentQueued {
            department_id: department_id.to_string(),
            conversation_id: conversation_id.to_string(),
        })
    }

    async fn notify_agent_assigned(
        &self,
        agent_id: &str,
        conversation_id: &str,
    ) -> Result<(), SwitchboardError> {
        self.publish(RoutingEvent::AgentAssigned {
            agent_id: agent_id.to_string(),
            conversation_id: conversation_id.to_string(),
        })
    }

    async fn notify_company_transferred(
        &self,
        company_id: &str,
        conversation_id: &str,
        to_department_id: &str,
        reason: EscalationReason,
    ) -> Result<(), SwitchboardError> {
        self.publish(RoutingEvent::CompanyTransferred {
            company_id: company_id.to_string(),
            conversation_id: conversation_id.to_string(),
            to_department_id: to_department_id.to_string(),
            reason,
        })
    }

    async fn send_customer_text(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<(), SwitchboardError> {
        self.publish(RoutingEvent::CustomerText {
            conversation_id: conversation_id.to_string(),
            text: text.to_string(),
        })
    }
}
