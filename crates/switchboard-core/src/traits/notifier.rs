// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifier trait: push events to agent sessions and text to customers.

use async_trait::async_trait;

use crate::error::SwitchboardError;
use crate::types::EscalationReason;

/// Outbound side of the routing core.
///
/// Called after the state transition it reports has been committed.
/// Failures are reported as [`SwitchboardError::Delivery`]; the engine logs
/// them and carries on.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A conversation entered a department's queue.
    async fn notify_department_queued(
        &self,
        department_id: &str,
        conversation_id: &str,
    ) -> Result<(), SwitchboardError>;

    /// An agent was given a conversation.
    async fn notify_agent_assigned(
        &self,
        agent_id: &str,
        conversation_id: &str,
    ) -> Result<(), SwitchboardError>;

    /// A conversation was escalated to the company's root department.
    async fn notify_company_transferred(
        &self,
        company_id: &str,
        conversation_id: &str,
        to_department_id: &str,
        reason: EscalationReason,
    ) -> Result<(), SwitchboardError>;

    /// Sends a text message to the customer of a conversation.
    async fn send_customer_text(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<(), SwitchboardError>;
}
