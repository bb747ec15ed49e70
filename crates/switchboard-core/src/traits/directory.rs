// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Directory store trait: departments and agents.

use async_trait::async_trait;

use crate::error::SwitchboardError;
use crate::types::{Agent, AgentLoad, Department, OnlineStatus};

/// Read access to departments and agents, plus the few writes the routing
/// core needs (presence changes and seeding).
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Looks up a department of `company_id` by its routing slug.
    async fn find_department_by_slug(
        &self,
        company_id: &str,
        slug: &str,
    ) -> Result<Option<Department>, SwitchboardError>;

    /// Looks up a department by id.
    async fn find_department(&self, id: &str) -> Result<Option<Department>, SwitchboardError>;

    /// Returns the company's root (fallback) department, if one is configured.
    async fn find_root_department(
        &self,
        company_id: &str,
    ) -> Result<Option<Department>, SwitchboardError>;

    /// Lists the company's departments in menu order.
    async fn list_departments(&self, company_id: &str)
    -> Result<Vec<Department>, SwitchboardError>;

    /// Lists eligible agents of a department with their active-engagement
    /// counts, ordered by agent id.
    async fn list_eligible_agents(
        &self,
        department_id: &str,
    ) -> Result<Vec<AgentLoad>, SwitchboardError>;

    async fn find_agent(&self, id: &str) -> Result<Option<Agent>, SwitchboardError>;

    /// Persists an agent's presence. Returns `NotFound` for unknown agents.
    async fn set_agent_status(
        &self,
        agent_id: &str,
        status: OnlineStatus,
    ) -> Result<(), SwitchboardError>;

    /// Inserts or replaces a department (directory seeding).
    async fn upsert_department(&self, department: &Department) -> Result<(), SwitchboardError>;

    /// Inserts or replaces an agent (directory seeding).
    async fn upsert_agent(&self, agent: &Agent) -> Result<(), SwitchboardError>;
}
