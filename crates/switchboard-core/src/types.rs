// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the store traits, the dispatch engine, and storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Customer-facing lifecycle of a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationStatus {
    Open,
    Assigned,
    Resolved,
    Archived,
}

impl ConversationStatus {
    /// Statuses that count towards an agent's active load.
    pub const ENGAGED: [ConversationStatus; 2] = [Self::Open, Self::Assigned];

    /// True once the engagement is over and the row waits for the next contact.
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Resolved | Self::Archived)
    }
}

/// Position of a conversation in the routing/escalation state machine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowState {
    Greeting,
    AwaitingRoutingConfirmation,
    DepartmentSelected,
    Assigned,
    /// Reserved. Nothing in the engine produces it; intake treats it like
    /// [`FlowState::DepartmentSelected`].
    TimeoutRedirect,
}

impl FlowState {
    /// Flow states that count towards an agent's active load.
    pub const ENGAGED: [FlowState; 2] = [Self::DepartmentSelected, Self::Assigned];

    /// All variants, in state-machine order.
    pub const ALL: [FlowState; 5] = [
        Self::Greeting,
        Self::AwaitingRoutingConfirmation,
        Self::DepartmentSelected,
        Self::Assigned,
        Self::TimeoutRedirect,
    ];
}

/// Presence of an agent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OnlineStatus {
    Online,
    Busy,
    Offline,
}

impl OnlineStatus {
    /// Online and busy agents can take new conversations.
    pub fn accepts_work(self) -> bool {
        matches!(self, Self::Online | Self::Busy)
    }
}

/// Why a conversation was moved to the root department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EscalationReason {
    /// The target department had no eligible agent at routing time.
    Offline,
    /// The department's response deadline elapsed.
    Timeout,
}

/// One conversation per (company, customer identity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub company_id: String,
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub status: ConversationStatus,
    pub flow_state: FlowState,
    pub department_id: Option<String>,
    pub assigned_user_id: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub routed_at: Option<DateTime<Utc>>,
    pub timeout_at: Option<DateTime<Utc>>,
    pub greeting_sent_at: Option<DateTime<Utc>>,
    pub last_department_id: Option<String>,
    pub last_attendant_id: Option<String>,
    pub last_attended_at: Option<DateTime<Utc>>,
    /// Channel-specific routing hints, stored as JSON text.
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// `ASSIGNED` with no agent: only reachable through a partial failure.
    pub fn is_orphaned(&self) -> bool {
        self.flow_state == FlowState::Assigned && self.assigned_user_id.is_none()
    }

    /// Whether this conversation counts towards its agent's load.
    pub fn is_active_engagement(&self) -> bool {
        ConversationStatus::ENGAGED.contains(&self.status)
            && FlowState::ENGAGED.contains(&self.flow_state)
    }
}

/// A routing target inside a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub company_id: String,
    pub slug: String,
    pub name: String,
    pub response_timeout_minutes: i64,
    /// The single catch-all department of the company.
    pub is_root: bool,
    /// Menu order.
    pub position: i64,
}

/// A human agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub company_id: String,
    pub department_id: Option<String>,
    pub name: String,
    pub is_active: bool,
    pub online_status: OnlineStatus,
}

/// An eligible agent together with its current active-engagement count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentLoad {
    pub agent_id: String,
    pub agent_name: String,
    pub active_count: i64,
}

/// Ledger entry: one agent holding one conversation for a period of time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub conversation_id: String,
    pub agent_id: String,
    pub assigned_at: DateTime<Utc>,
    pub unassigned_at: Option<DateTime<Utc>>,
}

/// Result of a transactional agent selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignOutcome {
    /// The selected agent now holds the conversation.
    Assigned(AgentLoad),
    /// The department has no eligible agent.
    NoEligibleAgent,
    /// The conversation was no longer queued for this department when the
    /// transaction ran (another path assigned, resolved, or moved it).
    Superseded,
}

/// Field-level update of a conversation row.
///
/// Each `Some` field is written; `None` fields are left untouched. Nullable
/// columns use `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationPatch {
    pub status: Option<ConversationStatus>,
    pub flow_state: Option<FlowState>,
    pub department_id: Option<Option<String>>,
    pub assigned_user_id: Option<Option<String>>,
    pub assigned_at: Option<Option<DateTime<Utc>>>,
    pub routed_at: Option<Option<DateTime<Utc>>>,
    pub timeout_at: Option<Option<DateTime<Utc>>>,
    pub greeting_sent_at: Option<Option<DateTime<Utc>>>,
    pub last_department_id: Option<Option<String>>,
    pub last_attendant_id: Option<Option<String>>,
    pub last_attended_at: Option<Option<DateTime<Utc>>>,
}

impl ConversationPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: ConversationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn flow_state(mut self, flow_state: FlowState) -> Self {
        self.flow_state = Some(flow_state);
        self
    }

    pub fn department(mut self, department_id: Option<String>) -> Self {
        self.department_id = Some(department_id);
        self
    }

    /// Clears the agent and its assignment timestamp.
    pub fn clear_agent(mut self) -> Self {
        self.assigned_user_id = Some(None);
        self.assigned_at = Some(None);
        self
    }

    pub fn routed_at(mut self, at: DateTime<Utc>) -> Self {
        self.routed_at = Some(Some(at));
        self
    }

    pub fn timeout_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.timeout_at = Some(at);
        self
    }

    pub fn greeting_sent_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.greeting_sent_at = Some(at);
        self
    }

    /// Remembers the engagement that just ended for sticky routing.
    pub fn remember_engagement(
        mut self,
        department_id: Option<String>,
        attendant_id: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        self.last_department_id = Some(department_id);
        self.last_attendant_id = Some(attendant_id);
        self.last_attended_at = Some(Some(at));
        self
    }

    /// Whether applying this patch releases the current agent.
    pub fn releases_agent(&self) -> bool {
        matches!(self.assigned_user_id, Some(None))
    }
}

/// Conditions a conditional update checks as part of the write itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Precondition {
    pub flow_state: Option<FlowState>,
    pub status: Option<ConversationStatus>,
    /// Require `greeting_sent_at IS NULL`.
    pub greeting_unclaimed: bool,
    /// Require `greeting_sent_at IS NOT NULL`.
    pub greeting_claimed: bool,
    /// Require this exact agent to still hold the conversation.
    pub assigned_user_id: Option<String>,
}

impl Precondition {
    pub fn flow_state(flow_state: FlowState) -> Self {
        Self {
            flow_state: Some(flow_state),
            ..Self::default()
        }
    }

    pub fn status(status: ConversationStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn greeting_unclaimed(mut self) -> Self {
        self.greeting_unclaimed = true;
        self
    }

    pub fn greeting_claimed(mut self) -> Self {
        self.greeting_claimed = true;
        self
    }

    pub fn held_by(mut self, agent_id: impl Into<String>) -> Self {
        self.assigned_user_id = Some(agent_id.into());
        self
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}
