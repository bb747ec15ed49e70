// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dispatch engine: department routing, agent assignment, escalation to
//! the root department, and redistribution when an agent goes offline.
//!
//! Every state transition is a single store write (unconditional patch,
//! conditional patch, or the selection transaction). Notifications follow
//! the write and never roll it back.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use switchboard_config::model::{DispatchConfig, MessagesConfig};
use switchboard_core::types::{
    AgentLoad, AssignOutcome, Conversation, ConversationPatch, ConversationStatus, Department,
    EscalationReason, FlowState, OnlineStatus, Precondition,
};
use switchboard_core::{Clock, ConversationStore, DirectoryStore, Notifier, SwitchboardError};
use tracing::{debug, info, warn};

use crate::balance;
use crate::messages::Messages;

/// Result of [`DispatchEngine::route_to_department`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// An agent of the chosen department took the conversation.
    Assigned(AgentLoad),
    /// Nobody in the department was available; the conversation went
    /// through [`DispatchEngine::redirect_to_admin`].
    Escalated(EscalationOutcome),
    /// Another path moved the conversation while it was being routed.
    Superseded,
}

/// Result of [`DispatchEngine::redirect_to_admin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationOutcome {
    /// A root-department agent took the conversation.
    Connected(AgentLoad),
    /// No agent anywhere. The conversation is back in `GREETING` and the
    /// customer got the unavailability notice.
    Exhausted,
    /// The conversation was no longer queued when the escalation ran.
    Superseded,
}

/// Counters for one sweeper pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Orphaned `ASSIGNED` rows put back in their queue.
    pub reconciled: usize,
    /// Reconciled rows that found an agent straight away.
    pub reassigned: usize,
    /// Expired rows moved to the root department.
    pub escalated: usize,
    /// Conversations whose handling failed; logged and left for the next pass.
    pub failed: usize,
}

impl SweepReport {
    /// True when the pass touched no conversation.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Counters for [`DispatchEngine::redistribute_on_agent_offline`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedistributionReport {
    /// Conversations taken away from the agent.
    pub released: usize,
    /// Released rows a colleague picked up straight away.
    pub reassigned: usize,
    /// Released but still waiting for an agent.
    pub queued: usize,
    /// Conversations whose hand-over errored; logged and skipped.
    pub failed: usize,
}

/// Tunables taken from `[dispatch]`.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub admin_timeout: Duration,
    pub fallback_slug: String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

impl From<&DispatchConfig> for DispatchSettings {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            admin_timeout: Duration::minutes(config.admin_timeout_minutes),
            fallback_slug: config.fallback_slug.clone(),
        }
    }
}

/// Routes conversations to departments and agents.
pub struct DispatchEngine {
    directory: Arc<dyn DirectoryStore>,
    conversations: Arc<dyn ConversationStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    settings: DispatchSettings,
    messages: Messages,
}

impl DispatchEngine {
    pub fn new(
        directory: Arc<dyn DirectoryStore>,
        conversations: Arc<dyn ConversationStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            directory,
            conversations,
            notifier,
            clock,
            settings: DispatchSettings::default(),
            messages: Messages::default(),
        }
    }

    pub fn with_settings(mut self, config: &DispatchConfig) -> Self {
        self.settings = DispatchSettings::from(config);
        self
    }

    pub fn with_messages(mut self, config: &MessagesConfig) -> Self {
        self.messages = Messages::new(config.clone());
        self
    }

    pub fn directory(&self) -> &Arc<dyn DirectoryStore> {
        &self.directory
    }

    pub fn conversations(&self) -> &Arc<dyn ConversationStore> {
        &self.conversations
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Queues the conversation in the department named by `department_slug`
    /// and tries to hand it to an agent, escalating when nobody is free.
    ///
    /// The configured fallback slug resolves to the company's root
    /// department when no department carries it.
    pub async fn route_to_department(
        &self,
        conversation_id: &str,
        department_slug: &str,
        company_id: &str,
    ) -> Result<RouteOutcome, SwitchboardError> {
        let outcome = self
            .route(conversation_id, department_slug, company_id, None)
            .await?;
        Ok(outcome.unwrap_or(RouteOutcome::Superseded))
    }

    /// Like [`route_to_department`](Self::route_to_department), but the
    /// queueing write only lands while `expected` still holds.
    ///
    /// Returns `None` when another path moved the conversation first; only
    /// the caller whose write landed goes on to assign and notify.
    pub async fn route_from(
        &self,
        conversation_id: &str,
        department_slug: &str,
        company_id: &str,
        expected: &Precondition,
    ) -> Result<Option<RouteOutcome>, SwitchboardError> {
        self.route(conversation_id, department_slug, company_id, Some(expected))
            .await
    }

    async fn route(
        &self,
        conversation_id: &str,
        department_slug: &str,
        company_id: &str,
        expected: Option<&Precondition>,
    ) -> Result<Option<RouteOutcome>, SwitchboardError> {
        let department = match self.resolve_department(company_id, department_slug).await? {
            Some(department) => department,
            None => {
                warn!(
                    conversation_id,
                    company_id, department_slug, "routing target not found"
                );
                return Err(SwitchboardError::department_not_found(department_slug));
            }
        };

        let now = self.clock.now();
        let patch = ConversationPatch::new()
            .department(Some(department.id.clone()))
            .routed_at(now)
            .timeout_at(Some(now + Duration::minutes(department.response_timeout_minutes)))
            .flow_state(FlowState::DepartmentSelected)
            .status(ConversationStatus::Open)
            .clear_agent();
        match expected {
            Some(expected) => {
                let queued = self
                    .conversations
                    .update_conversation_if(conversation_id, expected, &patch, now)
                    .await?;
                if !queued {
                    debug!(conversation_id, "conversation already left its intake state");
                    return Ok(None);
                }
            }
            None => {
                self.conversations
                    .update_conversation(conversation_id, &patch, now)
                    .await?;
            }
        }
        info!(
            conversation_id,
            department_id = %department.id,
            "conversation queued in department"
        );
        self.deliver(
            "department_queued",
            conversation_id,
            self.notifier
                .notify_department_queued(&department.id, conversation_id),
        )
        .await;

        match self.assign_to_agent(conversation_id, &department.id).await? {
            AssignOutcome::Assigned(agent) => {
                self.announce_assignment(conversation_id, &agent, &department)
                    .await;
                Ok(Some(RouteOutcome::Assigned(agent)))
            }
            AssignOutcome::NoEligibleAgent => {
                let outcome = self
                    .redirect_to_admin(conversation_id, company_id, EscalationReason::Offline)
                    .await?;
                Ok(Some(RouteOutcome::Escalated(outcome)))
            }
            AssignOutcome::Superseded => Ok(Some(RouteOutcome::Superseded)),
        }
    }

    /// Hands a queued conversation to the least-loaded eligible agent of
    /// `department_id` inside one selection transaction.
    pub async fn assign_to_agent(
        &self,
        conversation_id: &str,
        department_id: &str,
    ) -> Result<AssignOutcome, SwitchboardError> {
        let now = self.clock.now();
        let outcome = self
            .conversations
            .assign_in_transaction(conversation_id, department_id, balance::selector(), now)
            .await?;

        match &outcome {
            AssignOutcome::Assigned(agent) => {
                info!(
                    conversation_id,
                    department_id,
                    agent_id = %agent.agent_id,
                    load = agent.active_count,
                    "conversation assigned"
                );
                self.deliver(
                    "agent_assigned",
                    conversation_id,
                    self.notifier
                        .notify_agent_assigned(&agent.agent_id, conversation_id),
                )
                .await;
            }
            AssignOutcome::NoEligibleAgent => {
                debug!(conversation_id, department_id, "no eligible agent");
            }
            AssignOutcome::Superseded => {
                debug!(
                    conversation_id,
                    department_id, "conversation left the queue before assignment"
                );
            }
        }
        Ok(outcome)
    }

    /// Moves a queued conversation to the company's root department with the
    /// admin deadline. When root cannot take it either, the conversation is
    /// reset to `GREETING` and the customer is told nobody is available.
    pub async fn redirect_to_admin(
        &self,
        conversation_id: &str,
        company_id: &str,
        reason: EscalationReason,
    ) -> Result<EscalationOutcome, SwitchboardError> {
        let Some(root) = self.directory.find_root_department(company_id).await? else {
            warn!(conversation_id, company_id, %reason, "company has no root department");
            self.exhaust(conversation_id).await?;
            return Ok(EscalationOutcome::Exhausted);
        };

        let now = self.clock.now();
        let patch = ConversationPatch::new()
            .department(Some(root.id.clone()))
            .routed_at(now)
            .timeout_at(Some(now + self.settings.admin_timeout))
            .flow_state(FlowState::DepartmentSelected)
            .status(ConversationStatus::Open)
            .clear_agent();
        let moved = self
            .conversations
            .update_conversation_if(
                conversation_id,
                &Precondition::flow_state(FlowState::DepartmentSelected),
                &patch,
                now,
            )
            .await?;
        if !moved {
            debug!(conversation_id, %reason, "escalation skipped, conversation not queued");
            return Ok(EscalationOutcome::Superseded);
        }

        warn!(
            conversation_id,
            company_id,
            root_department_id = %root.id,
            %reason,
            "conversation escalated to root department"
        );
        self.deliver(
            "company_transferred",
            conversation_id,
            self.notifier
                .notify_company_transferred(company_id, conversation_id, &root.id, reason),
        )
        .await;

        match self.assign_to_agent(conversation_id, &root.id).await? {
            AssignOutcome::Assigned(agent) => {
                self.deliver(
                    "customer_text",
                    conversation_id,
                    self.notifier
                        .send_customer_text(conversation_id, &self.messages.connecting()),
                )
                .await;
                Ok(EscalationOutcome::Connected(agent))
            }
            AssignOutcome::NoEligibleAgent => {
                self.exhaust(conversation_id).await?;
                Ok(EscalationOutcome::Exhausted)
            }
            AssignOutcome::Superseded => Ok(EscalationOutcome::Superseded),
        }
    }

    /// One sweeper pass: put orphaned assignments back in their queue, then
    /// escalate queued conversations whose deadline has passed.
    ///
    /// A failure on one conversation is logged and counted; the pass moves
    /// on to the next one.
    pub async fn check_timeout_and_redirect(&self) -> Result<SweepReport, SwitchboardError> {
        let mut report = SweepReport::default();

        for conversation in self.conversations.list_orphaned_assignments().await? {
            match self.reconcile(&conversation).await {
                Ok(assigned) => {
                    report.reconciled += 1;
                    if assigned {
                        report.reassigned += 1;
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(conversation_id = %conversation.id, error = %e, "reconciliation failed");
                }
            }
        }

        let now = self.clock.now();
        for conversation in self.conversations.list_expired(now).await? {
            match self
                .redirect_to_admin(
                    &conversation.id,
                    &conversation.company_id,
                    EscalationReason::Timeout,
                )
                .await
            {
                Ok(EscalationOutcome::Superseded) => {}
                Ok(_) => report.escalated += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(conversation_id = %conversation.id, error = %e, "timeout escalation failed");
                }
            }
        }

        Ok(report)
    }

    /// Releases every active engagement held by `agent_id` and tries to
    /// place each one with another agent of the same department.
    pub async fn redistribute_on_agent_offline(
        &self,
        agent_id: &str,
    ) -> Result<RedistributionReport, SwitchboardError> {
        let mut report = RedistributionReport::default();

        for conversation in self.conversations.list_engaged_by_agent(agent_id).await? {
            debug_assert!(conversation.is_active_engagement(), "{conversation:?}");
            match self.release_and_reassign(&conversation, agent_id).await {
                Ok(None) => {}
                Ok(Some(true)) => {
                    report.released += 1;
                    report.reassigned += 1;
                }
                Ok(Some(false)) => {
                    report.released += 1;
                    report.queued += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        conversation_id = %conversation.id,
                        agent_id,
                        error = %e,
                        "redistribution failed"
                    );
                }
            }
        }

        info!(
            agent_id,
            released = report.released,
            reassigned = report.reassigned,
            queued = report.queued,
            "agent engagements redistributed"
        );
        Ok(report)
    }

    /// Ends the engagement: remembers department and agent for the next
    /// contact, closes the ledger entry and resets the routing fields.
    pub async fn resolve(&self, conversation_id: &str) -> Result<(), SwitchboardError> {
        let conversation = self.require_conversation(conversation_id).await?;
        let now = self.clock.now();

        let last_department = conversation
            .department_id
            .clone()
            .or_else(|| conversation.last_department_id.clone());
        let last_attendant = conversation
            .assigned_user_id
            .clone()
            .or_else(|| conversation.last_attendant_id.clone());

        let patch = ConversationPatch::new()
            .remember_engagement(last_department, last_attendant, now)
            .department(None)
            .clear_agent()
            .timeout_at(None)
            .greeting_sent_at(None)
            .flow_state(FlowState::Greeting)
            .status(ConversationStatus::Resolved);
        self.conversations
            .update_conversation(conversation_id, &patch, now)
            .await?;

        info!(conversation_id, "conversation resolved");
        Ok(())
    }

    /// Persists an agent's presence. Going offline hands the agent's
    /// conversations to colleagues.
    pub async fn set_agent_status(
        &self,
        agent_id: &str,
        status: OnlineStatus,
    ) -> Result<Option<RedistributionReport>, SwitchboardError> {
        self.directory.set_agent_status(agent_id, status).await?;
        info!(agent_id, %status, "agent status changed");

        if !status.accepts_work() {
            return self.redistribute_on_agent_offline(agent_id).await.map(Some);
        }
        Ok(None)
    }

    async fn resolve_department(
        &self,
        company_id: &str,
        slug: &str,
    ) -> Result<Option<Department>, SwitchboardError> {
        if let Some(department) = self
            .directory
            .find_department_by_slug(company_id, slug)
            .await?
        {
            return Ok(Some(department));
        }
        if slug.eq_ignore_ascii_case(&self.settings.fallback_slug) {
            return self.directory.find_root_department(company_id).await;
        }
        Ok(None)
    }

    async fn require_conversation(&self, id: &str) -> Result<Conversation, SwitchboardError> {
        self.conversations
            .get_conversation(id)
            .await?
            .ok_or_else(|| {
                warn!(conversation_id = id, "conversation not found");
                SwitchboardError::conversation_not_found(id)
            })
    }

    /// Deadline for a conversation re-queued in `department_id`.
    async fn requeue_deadline(
        &self,
        department_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(Option<Department>, DateTime<Utc>), SwitchboardError> {
        let department = self.directory.find_department(department_id).await?;
        let window = department
            .as_ref()
            .map(|d| Duration::minutes(d.response_timeout_minutes))
            .unwrap_or(self.settings.admin_timeout);
        Ok((department, now + window))
    }

    /// Returns whether the reconciled conversation was reassigned.
    async fn reconcile(&self, conversation: &Conversation) -> Result<bool, SwitchboardError> {
        let now = self.clock.now();
        let Some(department_id) = conversation.department_id.clone() else {
            warn!(conversation_id = %conversation.id, "orphaned assignment without department");
            self.exhaust(&conversation.id).await?;
            return Ok(false);
        };

        let (department, deadline) = self.requeue_deadline(&department_id, now).await?;
        let patch = ConversationPatch::new()
            .flow_state(FlowState::DepartmentSelected)
            .status(ConversationStatus::Open)
            .timeout_at(Some(deadline))
            .clear_agent();
        let requeued = self
            .conversations
            .update_conversation_if(
                &conversation.id,
                &Precondition::flow_state(FlowState::Assigned),
                &patch,
                now,
            )
            .await?;
        if !requeued {
            return Ok(false);
        }
        warn!(conversation_id = %conversation.id, %department_id, "orphaned assignment requeued");

        match self.assign_to_agent(&conversation.id, &department_id).await? {
            AssignOutcome::Assigned(agent) => {
                if let Some(department) = &department {
                    self.announce_assignment(&conversation.id, &agent, department)
                        .await;
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// `None` when the agent no longer held the conversation; otherwise
    /// whether it found a new agent.
    async fn release_and_reassign(
        &self,
        conversation: &Conversation,
        agent_id: &str,
    ) -> Result<Option<bool>, SwitchboardError> {
        let now = self.clock.now();
        let Some(department_id) = conversation.department_id.clone() else {
            warn!(conversation_id = %conversation.id, agent_id, "engagement without department");
            return Ok(None);
        };

        let (department, deadline) = self.requeue_deadline(&department_id, now).await?;
        let released = self
            .conversations
            .release_assignment(&conversation.id, agent_id, deadline, now)
            .await?;
        if !released {
            debug!(conversation_id = %conversation.id, agent_id, "engagement already released");
            return Ok(None);
        }
        info!(conversation_id = %conversation.id, agent_id, "engagement released");

        match self.assign_to_agent(&conversation.id, &department_id).await? {
            AssignOutcome::Assigned(agent) => {
                if let Some(department) = &department {
                    self.announce_assignment(&conversation.id, &agent, department)
                        .await;
                }
                Ok(Some(true))
            }
            _ => Ok(Some(false)),
        }
    }

    /// Full reset to `GREETING` plus the unavailability notice.
    async fn exhaust(&self, conversation_id: &str) -> Result<(), SwitchboardError> {
        let now = self.clock.now();
        let patch = ConversationPatch::new()
            .department(None)
            .clear_agent()
            .timeout_at(None)
            .greeting_sent_at(None)
            .flow_state(FlowState::Greeting)
            .status(ConversationStatus::Open);
        self.conversations
            .update_conversation(conversation_id, &patch, now)
            .await?;

        warn!(conversation_id, "no agent available, conversation reset");
        self.deliver(
            "customer_text",
            conversation_id,
            self.notifier
                .send_customer_text(conversation_id, &self.messages.all_unavailable()),
        )
        .await;
        Ok(())
    }

    async fn announce_assignment(
        &self,
        conversation_id: &str,
        agent: &AgentLoad,
        department: &Department,
    ) {
        let text = self.messages.assigned(&agent.agent_name, &department.name);
        self.deliver(
            "customer_text",
            conversation_id,
            self.notifier.send_customer_text(conversation_id, &text),
        )
        .await;
    }

    /// Awaits an outbound delivery and swallows its failure.
    pub(crate) async fn deliver<F>(&self, event: &'static str, conversation_id: &str, delivery: F)
    where
        F: Future<Output = Result<(), SwitchboardError>>,
    {
        if let Err(e) = delivery.await {
            warn!(event, conversation_id, error = %e, "delivery failed");
        }
    }

    pub(crate) fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::TimeZone;
    use switchboard_config::model::StorageConfig;
    use switchboard_core::types::Agent;
    use switchboard_core::StorageAdapter;
    use switchboard_storage::SqliteStorage;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    use super::*;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    struct FailingNotifier;

    impl FailingNotifier {
        fn fail() -> Result<(), SwitchboardError> {
            Err(SwitchboardError::Delivery {
                message: "socket closed".into(),
                source: None,
            })
        }
    }

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify_department_queued(&self, _: &str, _: &str) -> Result<(), SwitchboardError> {
            Self::fail()
        }

        async fn notify_agent_assigned(&self, _: &str, _: &str) -> Result<(), SwitchboardError> {
            Self::fail()
        }

        async fn notify_company_transferred(
            &self,
            _: &str,
            _: &str,
            _: &str,
            _: EscalationReason,
        ) -> Result<(), SwitchboardError> {
            Self::fail()
        }

        async fn send_customer_text(&self, _: &str, _: &str) -> Result<(), SwitchboardError> {
            Self::fail()
        }
    }

    async fn engine(dir: &TempDir) -> (DispatchEngine, Arc<SqliteStorage>) {
        let path = dir.path().join("engine.db");
        let storage = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: path.to_string_lossy().to_string(),
            ..StorageConfig::default()
        }));
        storage.initialize().await.unwrap();

        for (id, slug, root) in [("sales", "comercial", false), ("front", "other", true)] {
            storage
                .upsert_department(&Department {
                    id: id.into(),
                    company_id: "acme".into(),
                    slug: slug.into(),
                    name: id.to_uppercase(),
                    response_timeout_minutes: 10,
                    is_root: root,
                    position: 0,
                })
                .await
                .unwrap();
        }
        storage
            .upsert_agent(&Agent {
                id: "ana".into(),
                company_id: "acme".into(),
                department_id: Some("sales".into()),
                name: "Ana".into(),
                is_active: true,
                online_status: OnlineStatus::Online,
            })
            .await
            .unwrap();

        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()));
        let engine = DispatchEngine::new(
            storage.clone(),
            storage.clone(),
            Arc::new(FailingNotifier),
            clock,
        );
        (engine, storage)
    }

    #[tokio::test]
    #[traced_test]
    async fn delivery_failure_is_logged_and_state_commits() {
        let dir = TempDir::new().unwrap();
        let (engine, storage) = engine(&dir).await;
        let conv = storage
            .find_or_create_conversation("acme", "5511999", None, engine.clock().now())
            .await
            .unwrap();

        let outcome = engine
            .route_to_department(&conv.id, "comercial", "acme")
            .await
            .unwrap();
        assert!(matches!(outcome, RouteOutcome::Assigned(ref a) if a.agent_id == "ana"));

        let stored = storage.get_conversation(&conv.id).await.unwrap().unwrap();
        assert_eq!(stored.flow_state, FlowState::Assigned);
        assert_eq!(stored.assigned_user_id.as_deref(), Some("ana"));

        assert!(logs_contain("delivery failed"));
        assert!(logs_contain("agent_assigned"));
        assert!(logs_contain("department_queued"));
    }

    #[tokio::test]
    async fn unknown_slug_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (engine, storage) = engine(&dir).await;
        let conv = storage
            .find_or_create_conversation("acme", "5511999", None, engine.clock().now())
            .await
            .unwrap();

        let err = engine
            .route_to_department(&conv.id, "billing", "acme")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn fallback_slug_reaches_root() {
        let dir = TempDir::new().unwrap();
        let (engine, storage) = engine(&dir).await;
        let engine = engine.with_settings(&DispatchConfig {
            fallback_slug: "outros".into(),
            ..DispatchConfig::default()
        });
        let conv = storage
            .find_or_create_conversation("acme", "5511999", None, engine.clock().now())
            .await
            .unwrap();

        // Root has no agents, so the conversation ends back in GREETING.
        let outcome = engine
            .route_to_department(&conv.id, "OUTROS", "acme")
            .await
            .unwrap();
        assert_eq!(outcome, RouteOutcome::Escalated(EscalationOutcome::Exhausted));

        let stored = storage.get_conversation(&conv.id).await.unwrap().unwrap();
        assert_eq!(stored.flow_state, FlowState::Greeting);
        assert!(stored.department_id.is_none());
        assert!(stored.greeting_sent_at.is_none());
    }

    #[tokio::test]
    async fn resolve_of_missing_conversation_is_not_found() {
        let dir = TempDir::new().unwrap();
        let (engine, _storage) = engine(&dir).await;
        assert!(engine.resolve("nope").await.unwrap_err().is_not_found());
    }

    #[test]
    fn settings_follow_config() {
        let settings = DispatchSettings::from(&DispatchConfig {
            admin_timeout_minutes: 7,
            ..DispatchConfig::default()
        });
        assert_eq!(settings.admin_timeout, Duration::minutes(7));
        assert_eq!(settings.fallback_slug, "other");
    }
}
