// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation store trait: conditional writes, the serializable agent
//! selection transaction, and the assignment ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SwitchboardError;
use crate::types::{
    AgentLoad, AssignOutcome, Assignment, Conversation, ConversationPatch, ConversationStatus,
    FlowState, Precondition,
};

/// Picks the winner among eligible agents. Runs inside the selection
/// transaction, so it must not block.
pub type AgentSelector = Box<dyn FnOnce(Vec<AgentLoad>) -> Option<AgentLoad> + Send + 'static>;

/// Persistence of conversations and their assignment ledger.
///
/// Every write takes `now` from the caller's clock. Any patch that clears
/// `assigned_user_id` also closes the conversation's open ledger entry in
/// the same transaction.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, SwitchboardError>;

    /// Returns the conversation for `(company_id, customer_id)`, creating it
    /// in `GREETING`/`OPEN` on first contact. Concurrent callers converge
    /// on the same row.
    async fn find_or_create_conversation(
        &self,
        company_id: &str,
        customer_id: &str,
        customer_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Conversation, SwitchboardError>;

    /// Unconditional update. Returns `NotFound` if the row does not exist.
    async fn update_conversation(
        &self,
        id: &str,
        patch: &ConversationPatch,
        now: DateTime<Utc>,
    ) -> Result<(), SwitchboardError>;

    /// Applies `patch` only where `precondition` still holds, checked by the
    /// write itself. Returns whether the row was updated.
    async fn update_conversation_if(
        &self,
        id: &str,
        precondition: &Precondition,
        patch: &ConversationPatch,
        now: DateTime<Utc>,
    ) -> Result<bool, SwitchboardError>;

    /// Serializable read-aggregate-write: lists the eligible agents of
    /// `department_id` with their loads, lets `select` pick one, then writes
    /// the assignment and appends the ledger entry, all in one transaction.
    ///
    /// Only assigns while the conversation is still `DEPARTMENT_SELECTED`
    /// in `department_id`; otherwise returns [`AssignOutcome::Superseded`].
    async fn assign_in_transaction(
        &self,
        conversation_id: &str,
        department_id: &str,
        select: AgentSelector,
        now: DateTime<Utc>,
    ) -> Result<AssignOutcome, SwitchboardError>;

    /// Takes the conversation away from `agent_id` and puts it back in its
    /// department's queue with a fresh deadline. The ledger entry is closed
    /// by the same write. Returns false if the agent no longer held it.
    async fn release_assignment(
        &self,
        conversation_id: &str,
        agent_id: &str,
        timeout_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, SwitchboardError> {
        let patch = ConversationPatch::new()
            .clear_agent()
            .flow_state(FlowState::DepartmentSelected)
            .status(ConversationStatus::Open)
            .timeout_at(Some(timeout_at));
        self.update_conversation_if(
            conversation_id,
            &Precondition::default().held_by(agent_id),
            &patch,
            now,
        )
        .await
    }

    /// Conversations whose flow state is `ASSIGNED` but hold no agent.
    async fn list_orphaned_assignments(&self) -> Result<Vec<Conversation>, SwitchboardError>;

    /// `DEPARTMENT_SELECTED` conversations whose deadline is before `now`.
    async fn list_expired(&self, now: DateTime<Utc>)
    -> Result<Vec<Conversation>, SwitchboardError>;

    /// Conversations the agent holds in an active engagement state.
    async fn list_engaged_by_agent(
        &self,
        agent_id: &str,
    ) -> Result<Vec<Conversation>, SwitchboardError>;

    /// Conversation counts per flow state, for status reporting.
    async fn count_by_flow_state(&self) -> Result<Vec<(FlowState, i64)>, SwitchboardError>;

    /// Full ledger history of a conversation, oldest first.
    async fn list_assignments(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Assignment>, SwitchboardError>;
}
