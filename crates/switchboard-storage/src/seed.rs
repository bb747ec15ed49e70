// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Loads the `[[departments]]` / `[[agents]]` directory seed into a store.

use std::str::FromStr;

use switchboard_config::model::{AgentSeed, DepartmentSeed, SwitchboardConfig};
use switchboard_core::types::{Agent, Department, OnlineStatus};
use switchboard_core::{DirectoryStore, SwitchboardError};
use tracing::{debug, info};

/// Rows written by [`seed_directory`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub departments: usize,
    pub agents: usize,
}

/// Department row for a seed entry; the name falls back to the slug.
fn department_from_seed(seed: &DepartmentSeed) -> Department {
    Department {
        id: seed.id.clone(),
        company_id: seed.company.clone(),
        slug: seed.slug.clone(),
        name: seed.name.clone().unwrap_or_else(|| seed.slug.clone()),
        response_timeout_minutes: seed.response_timeout_minutes,
        is_root: seed.root,
        position: seed.position,
    }
}

fn agent_from_seed(seed: &AgentSeed) -> Result<Agent, SwitchboardError> {
    let online_status = OnlineStatus::from_str(&seed.status).map_err(|_| {
        SwitchboardError::Config(format!(
            "agent '{}' has invalid status '{}'",
            seed.id, seed.status
        ))
    })?;
    Ok(Agent {
        id: seed.id.clone(),
        company_id: seed.company.clone(),
        department_id: seed.department.clone(),
        name: seed.name.clone(),
        is_active: seed.active,
        online_status,
    })
}

/// Upserts every seeded department, then every seeded agent.
///
/// Existing rows are overwritten, so agent presence resets to the seeded
/// status on each start.
pub async fn seed_directory(
    store: &dyn DirectoryStore,
    config: &SwitchboardConfig,
) -> Result<SeedSummary, SwitchboardError> {
    let mut summary = SeedSummary::default();

    for seed in &config.departments {
        store.upsert_department(&department_from_seed(seed)).await?;
        debug!(department_id = %seed.id, company_id = %seed.company, "department seeded");
        summary.departments += 1;
    }
    for seed in &config.agents {
        store.upsert_agent(&agent_from_seed(seed)?).await?;
        debug!(agent_id = %seed.id, "agent seeded");
        summary.agents += 1;
    }

    info!(
        departments = summary.departments,
        agents = summary.agents,
        "directory seeded"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use switchboard_config::model::StorageConfig;
    use switchboard_core::StorageAdapter;
    use tempfile::tempdir;

    use super::*;
    use crate::SqliteStorage;

    fn config() -> SwitchboardConfig {
        switchboard_config::load_config_from_str(
            r#"
[[departments]]
id = "sales"
company = "acme"
slug = "comercial"
name = "Sales"

[[departments]]
id = "front"
company = "acme"
slug = "other"
root = true
position = 9

[[agents]]
id = "ana"
company = "acme"
department = "sales"
name = "Ana"
status = "online"
"#,
        )
        .unwrap()
    }

    #[test]
    fn department_name_defaults_to_slug() {
        let cfg = config();
        let root = department_from_seed(&cfg.departments[1]);
        assert_eq!(root.name, "other");
        assert!(root.is_root);
        assert_eq!(root.position, 9);
    }

    #[test]
    fn bad_agent_status_is_a_config_error() {
        let mut cfg = config();
        cfg.agents[0].status = "AWAY".into();
        let err = agent_from_seed(&cfg.agents[0]).unwrap_err();
        assert!(matches!(err, SwitchboardError::Config(_)));
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("seed.db");
        let storage = SqliteStorage::new(StorageConfig {
            database_path: path.to_string_lossy().to_string(),
            ..StorageConfig::default()
        });
        storage.initialize().await.unwrap();
        let cfg = config();

        let first = seed_directory(&storage, &cfg).await.unwrap();
        assert_eq!(first, SeedSummary { departments: 2, agents: 1 });
        seed_directory(&storage, &cfg).await.unwrap();

        assert_eq!(storage.list_departments("acme").await.unwrap().len(), 2);
        let ana = storage.find_agent("ana").await.unwrap().unwrap();
        assert_eq!(ana.online_status, OnlineStatus::Online);
        assert_eq!(ana.department_id.as_deref(), Some("sales"));
    }
}
