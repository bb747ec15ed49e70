// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end routing tests.
//!
//! `TestHarness` assembles a temp SQLite directory and conversation store,
//! a recording notifier, a manual clock, the dispatch engine and the intake
//! flow. Provides `inbound()` to drive customer messages in tests.

use std::sync::Arc;

use chrono::Duration;
use switchboard_config::model::{DispatchConfig, StorageConfig};
use switchboard_core::types::{Agent, Conversation, Department, OnlineStatus};
use switchboard_core::{
    Clock, ConversationStore, DirectoryStore, StorageAdapter, SwitchboardError,
};
use switchboard_dispatch::{DispatchEngine, InboundContact, Intake, IntakeOutcome, SweepReport};
use switchboard_storage::SqliteStorage;

use crate::clock::ManualClock;
use crate::mock_notifier::MockNotifier;

/// Company used when a test does not name one.
pub const DEFAULT_COMPANY: &str = "acme";

/// Builder for creating test environments with a seeded directory.
pub struct TestHarnessBuilder {
    company_id: String,
    departments: Vec<Department>,
    agents: Vec<Agent>,
    dispatch: DispatchConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            company_id: DEFAULT_COMPANY.to_string(),
            departments: Vec::new(),
            agents: Vec::new(),
            dispatch: DispatchConfig::default(),
        }
    }

    /// Company for departments and agents added after this call.
    pub fn company(mut self, company_id: &str) -> Self {
        self.company_id = company_id.to_string();
        self
    }

    /// Add a regular department. Its display name is the capitalized slug.
    pub fn department(mut self, id: &str, slug: &str, response_timeout_minutes: i64) -> Self {
        let position = self.departments.len() as i64;
        self.departments.push(Department {
            id: id.to_string(),
            company_id: self.company_id.clone(),
            slug: slug.to_string(),
            name: display_name(slug),
            response_timeout_minutes,
            is_root: false,
            position,
        });
        self
    }

    /// Add the company's root department, listed last in the menu.
    pub fn root_department(mut self, id: &str, slug: &str) -> Self {
        self.departments.push(Department {
            id: id.to_string(),
            company_id: self.company_id.clone(),
            slug: slug.to_string(),
            name: display_name(slug),
            response_timeout_minutes: self.dispatch.admin_timeout_minutes,
            is_root: true,
            position: 1000,
        });
        self
    }

    /// Add an active agent. Its display name is the capitalized id.
    pub fn agent(mut self, id: &str, department_id: &str, status: OnlineStatus) -> Self {
        self.agents.push(Agent {
            id: id.to_string(),
            company_id: self.company_id.clone(),
            department_id: Some(department_id.to_string()),
            name: display_name(id),
            is_active: true,
            online_status: status,
        });
        self
    }

    pub fn admin_timeout_minutes(mut self, minutes: i64) -> Self {
        self.dispatch.admin_timeout_minutes = minutes;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, SwitchboardError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| SwitchboardError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            ..StorageConfig::default()
        }));
        storage.initialize().await?;

        for department in &self.departments {
            storage.upsert_department(department).await?;
        }
        for agent in &self.agents {
            storage.upsert_agent(agent).await?;
        }

        let notifier = Arc::new(MockNotifier::new());
        let clock = Arc::new(ManualClock::default());
        let engine = Arc::new(
            DispatchEngine::new(
                storage.clone(),
                storage.clone(),
                notifier.clone(),
                clock.clone(),
            )
            .with_settings(&self.dispatch),
        );
        let intake = Intake::new(engine.clone());

        Ok(TestHarness {
            company_id: self.company_id,
            storage,
            notifier,
            clock,
            engine,
            intake,
            _temp_dir: temp_dir,
        })
    }
}

fn display_name(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A complete routing environment with temp storage.
pub struct TestHarness {
    /// Company of the last builder `company()` call.
    pub company_id: String,
    /// SQLite storage (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    pub notifier: Arc<MockNotifier>,
    pub clock: Arc<ManualClock>,
    pub engine: Arc<DispatchEngine>,
    pub intake: Intake,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Drive one customer message through intake.
    pub async fn inbound(
        &self,
        customer_id: &str,
        text: &str,
    ) -> Result<IntakeOutcome, SwitchboardError> {
        self.intake
            .handle_inbound(&InboundContact::new(&self.company_id, customer_id, text))
            .await
    }

    /// The conversation of `customer_id`, created if it does not exist yet.
    pub async fn conversation_of(&self, customer_id: &str) -> Result<Conversation, SwitchboardError> {
        self.storage
            .find_or_create_conversation(&self.company_id, customer_id, None, self.clock.now())
            .await
    }

    /// Create a conversation and route it straight to `department_slug`.
    pub async fn route_new(
        &self,
        customer_id: &str,
        department_slug: &str,
    ) -> Result<Conversation, SwitchboardError> {
        let conversation = self.conversation_of(customer_id).await?;
        self.engine
            .route_to_department(&conversation.id, department_slug, &self.company_id)
            .await?;
        self.reload(&conversation.id).await
    }

    pub async fn reload(&self, conversation_id: &str) -> Result<Conversation, SwitchboardError> {
        self.storage
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| SwitchboardError::conversation_not_found(conversation_id))
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.clock.advance(Duration::minutes(minutes));
    }

    pub async fn sweep(&self) -> Result<SweepReport, SwitchboardError> {
        self.engine.check_timeout_and_redirect().await
    }

    /// Active engagement count per eligible agent of `department_id`.
    pub async fn loads(&self, department_id: &str) -> Result<Vec<(String, i64)>, SwitchboardError> {
        Ok(self
            .storage
            .list_eligible_agents(department_id)
            .await?
            .into_iter()
            .map(|l| (l.agent_id, l.active_count))
            .collect())
    }
}
