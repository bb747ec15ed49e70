// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `SqliteStorage`: one SQLite database serving as both directory and
//! conversation store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use switchboard_config::model::StorageConfig;
use switchboard_core::types::{
    Agent, AgentLoad, AssignOutcome, Assignment, Conversation, ConversationPatch, Department,
    FlowState, OnlineStatus, Precondition,
};
use switchboard_core::{
    AgentSelector, ConversationStore, DirectoryStore, HealthStatus, PluginAdapter,
    StorageAdapter, SwitchboardError,
};

use crate::database::Database;
use crate::queries::{assignments, conversations, directory};

/// SQLite-backed storage adapter.
///
/// The database is opened by [`StorageAdapter::initialize`]; every other
/// call fails with a storage error until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, SwitchboardError> {
        self.db.get().ok_or_else(|| SwitchboardError::Storage {
            source: "storage not initialized; call initialize() first".into(),
        })
    }

    async fn checkpoint(&self, db: &Database) -> Result<(), SwitchboardError> {
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        debug!(path = %self.config.database_path, "WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        if let Some(db) = self.db.get() {
            self.checkpoint(db).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), SwitchboardError> {
        let db = Database::open_with(&self.config).await?;
        self.db.set(db).map_err(|_| SwitchboardError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), SwitchboardError> {
        let db = self.db()?;
        self.checkpoint(db).await
    }
}

#[async_trait]
impl DirectoryStore for SqliteStorage {
    async fn find_department_by_slug(
        &self,
        company_id: &str,
        slug: &str,
    ) -> Result<Option<Department>, SwitchboardError> {
        directory::find_department_by_slug(self.db()?, company_id, slug).await
    }

    async fn find_department(&self, id: &str) -> Result<Option<Department>, SwitchboardError> {
        directory::find_department(self.db()?, id).await
    }

    async fn find_root_department(
        &self,
        company_id: &str,
    ) -> Result<Option<Department>, SwitchboardError> {
        directory::find_root_department(self.db()?, company_id).await
    }

    async fn list_departments(
        &self,
        company_id: &str,
    ) -> Result<Vec<Department>, SwitchboardError> {
        directory::list_departments(self.db()?, company_id).await
    }

    async fn list_eligible_agents(
        &self,
        department_id: &str,
    ) -> Result<Vec<AgentLoad>, SwitchboardError> {
        directory::list_eligible_agents(self.db()?, department_id).await
    }

    async fn find_agent(&self, id: &str) -> Result<Option<Agent>, SwitchboardError> {
        directory::find_agent(self.db()?, id).await
    }

    async fn set_agent_status(
        &self,
        agent_id: &str,
        status: OnlineStatus,
    ) -> Result<(), SwitchboardError> {
        directory::set_agent_status(self.db()?, agent_id, status).await
    }

    async fn upsert_department(&self, department: &Department) -> Result<(), SwitchboardError> {
        directory::upsert_department(self.db()?, department).await
    }

    async fn upsert_agent(&self, agent: &Agent) -> Result<(), SwitchboardError> {
        directory::upsert_agent(self.db()?, agent).await
    }
}

#[async_trait]
impl ConversationStore for SqliteStorage {
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, SwitchboardError> {
        conversations::get_conversation(self.db()?, id).await
    }

    async fn find_or_create_conversation(
        &self,
        company_id: &str,
        customer_id: &str,
        customer_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Conversation, SwitchboardError> {
        conversations::find_or_create_conversation(
            self.db()?,
            company_id,
            customer_id,
            customer_name,
            now,
        )
        .await
    }

    async fn update_conversation(
        &self,
        id: &str,
        patch: &ConversationPatch,
        now: DateTime<Utc>,
    ) -> Result<(), SwitchboardError> {
        conversations::update_conversation(self.db()?, id, patch, now).await
    }

    async fn update_conversation_if(
        &self,
        id: &str,
        precondition: &Precondition,
        patch: &ConversationPatch,
        now: DateTime<Utc>,
    ) -> Result<bool, SwitchboardError> {
        conversations::update_conversation_if(self.db()?, id, precondition, patch, now).await
    }

    async fn assign_in_transaction(
        &self,
        conversation_id: &str,
        department_id: &str,
        select: AgentSelector,
        now: DateTime<Utc>,
    ) -> Result<AssignOutcome, SwitchboardError> {
        conversations::assign_in_transaction(self.db()?, conversation_id, department_id, select, now)
            .await
    }

    async fn list_orphaned_assignments(&self) -> Result<Vec<Conversation>, SwitchboardError> {
        conversations::list_orphaned_assignments(self.db()?).await
    }

    async fn list_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Conversation>, SwitchboardError> {
        conversations::list_expired(self.db()?, now).await
    }

    async fn list_engaged_by_agent(
        &self,
        agent_id: &str,
    ) -> Result<Vec<Conversation>, SwitchboardError> {
        conversations::list_engaged_by_agent(self.db()?, agent_id).await
    }

    async fn count_by_flow_state(&self) -> Result<Vec<(FlowState, i64)>, SwitchboardError> {
        conversations::count_by_flow_state(self.db()?).await
    }

    async fn list_assignments(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<Assignment>, SwitchboardError> {
        assignments::list_assignments(self.db()?, conversation_id).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use switchboard_core::ConversationStatus;
    use tempfile::tempdir;

    use super::*;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            ..StorageConfig::default()
        }
    }

    async fn ready(dir: &tempfile::TempDir, name: &str) -> SqliteStorage {
        let path = dir.path().join(name);
        let storage = SqliteStorage::new(make_config(path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        storage
    }

    #[tokio::test]
    async fn identity_and_version() {
        let storage = SqliteStorage::new(make_config("unused.db"));
        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.version(), semver::Version::new(0, 1, 0));
    }

    #[tokio::test]
    async fn initialize_creates_file_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("init.db");
        let storage = SqliteStorage::new(make_config(path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(path.exists());
        assert!(storage.initialize().await.is_err(), "second initialize should fail");
    }

    #[tokio::test]
    async fn calls_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cold.db");
        let storage = SqliteStorage::new(make_config(path.to_str().unwrap()));

        assert!(storage.health_check().await.is_err());
        assert!(storage.find_department("x").await.is_err());
        // shutdown of a never-opened store is a no-op
        storage.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn health_check_is_healthy_once_open() {
        let dir = tempdir().unwrap();
        let storage = ready(&dir, "health.db").await;
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        storage.close().await.unwrap();
    }

    #[tokio::test]
    async fn release_assignment_requeues_with_fresh_deadline() {
        let dir = tempdir().unwrap();
        let storage = ready(&dir, "release.db").await;
        let t0 = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();

        storage
            .upsert_department(&Department {
                id: "sales".into(),
                company_id: "acme".into(),
                slug: "comercial".into(),
                name: "Sales".into(),
                response_timeout_minutes: 10,
                is_root: false,
                position: 0,
            })
            .await
            .unwrap();
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

        let conv = storage
            .find_or_create_conversation("acme", "c1", None, t0)
            .await
            .unwrap();
        storage
            .update_conversation(
                &conv.id,
                &ConversationPatch::new()
                    .department(Some("sales".into()))
                    .flow_state(FlowState::DepartmentSelected),
                t0,
            )
            .await
            .unwrap();
        let outcome = storage
            .assign_in_transaction(&conv.id, "sales", Box::new(|l: Vec<AgentLoad>| l.into_iter().next()), t0)
            .await
            .unwrap();
        assert!(matches!(outcome, AssignOutcome::Assigned(_)));

        let later = t0 + Duration::minutes(2);
        let deadline = later + Duration::minutes(10);
        assert!(
            storage
                .release_assignment(&conv.id, "ana", deadline, later)
                .await
                .unwrap()
        );
        assert!(
            !storage
                .release_assignment(&conv.id, "ana", deadline, later)
                .await
                .unwrap(),
            "already released"
        );

        let conv = storage.get_conversation(&conv.id).await.unwrap().unwrap();
        assert_eq!(conv.flow_state, FlowState::DepartmentSelected);
        assert_eq!(conv.status, ConversationStatus::Open);
        assert_eq!(conv.timeout_at, Some(deadline));
        assert!(conv.assigned_user_id.is_none());

        let ledger = storage.list_assignments(&conv.id).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].unassigned_at, Some(later));

        storage.shutdown().await.unwrap();
    }
}
