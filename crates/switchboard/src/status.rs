// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchboard status` command implementation.
//!
//! Opens the configured database, runs the storage health check and prints
//! conversation counts per flow state.

use std::collections::BTreeMap;
use std::io::IsTerminal;

use serde::Serialize;
use switchboard_config::SwitchboardConfig;
use switchboard_core::types::{FlowState, HealthStatus};
use switchboard_core::{ConversationStore, PluginAdapter, StorageAdapter, SwitchboardError};
use switchboard_storage::SqliteStorage;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub healthy: bool,
    pub health: String,
    pub database_path: String,
    pub conversations: BTreeMap<String, i64>,
}

impl StatusResponse {
    fn new(database_path: &str, health: &HealthStatus, counts: &[(FlowState, i64)]) -> Self {
        let (healthy, health) = match health {
            HealthStatus::Healthy => (true, "healthy".to_string()),
            HealthStatus::Degraded(reason) => (true, format!("degraded: {reason}")),
            HealthStatus::Unhealthy(reason) => (false, format!("unhealthy: {reason}")),
        };
        // Every flow state is listed, zero when absent.
        let mut conversations: BTreeMap<String, i64> =
            FlowState::ALL.iter().map(|s| (s.to_string(), 0)).collect();
        for (state, count) in counts {
            conversations.insert(state.to_string(), *count);
        }
        Self {
            healthy,
            health,
            database_path: database_path.to_string(),
            conversations,
        }
    }

    fn total(&self) -> i64 {
        self.conversations.values().sum()
    }
}

/// Run the `switchboard status` command.
pub async fn run_status(
    config: &SwitchboardConfig,
    json: bool,
    plain: bool,
) -> Result<(), SwitchboardError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let health = storage.health_check().await?;
    let counts = storage.count_by_flow_state().await?;
    storage.close().await?;

    let status = StatusResponse::new(&config.storage.database_path, &health, &counts);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&status).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_status(&status, use_color);
    }
    Ok(())
}

fn print_status(status: &StatusResponse, use_color: bool) {
    println!();
    println!("  switchboard status");
    println!("  {}", "-".repeat(35));

    if use_color {
        use colored::Colorize;
        let state = if status.healthy {
            format!("{} {}", "✓".green(), status.health.green())
        } else {
            format!("{} {}", "✗".red(), status.health.red())
        };
        println!("    Storage:  {state}");
    } else {
        let tag = if status.healthy { "[OK]" } else { "[FAIL]" };
        println!("    Storage:  {tag} {}", status.health);
    }
    println!("    Database: {}", status.database_path);
    println!("    Conversations: {}", status.total());
    for (state, count) in &status.conversations {
        println!("      {state:<30} {count}");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_flow_state_is_reported() {
        let status = StatusResponse::new(
            "switchboard.db",
            &HealthStatus::Healthy,
            &[(FlowState::Assigned, 4), (FlowState::Greeting, 1)],
        );
        assert!(status.healthy);
        assert_eq!(status.conversations.len(), FlowState::ALL.len());
        assert_eq!(status.conversations["ASSIGNED"], 4);
        assert_eq!(status.conversations["TIMEOUT_REDIRECT"], 0);
        assert_eq!(status.total(), 5);
    }

    #[test]
    fn status_response_serializes() {
        let status = StatusResponse::new("x.db", &HealthStatus::Unhealthy("locked".into()), &[]);
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"healthy\":false"));
        assert!(json.contains("unhealthy: locked"));
        assert!(json.contains("\"DEPARTMENT_SELECTED\":0"));
    }
}
