// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Switchboard routing service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Switchboard configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchboardConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Routing, escalation and sweeper settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Customer-facing message templates.
    #[serde(default)]
    pub messages: MessagesConfig,

    /// Departments seeded into the directory at startup.
    #[serde(default)]
    pub departments: Vec<DepartmentSeed>,

    /// Agents seeded into the directory at startup.
    #[serde(default)]
    pub agents: Vec<AgentSeed>,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Instance name, used in log output.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "switchboard".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long a write waits for another process's lock, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    "switchboard.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Routing and escalation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Escalation sweeper tick interval in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Deadline given to a conversation escalated to the root department.
    #[serde(default = "default_admin_timeout_minutes")]
    pub admin_timeout_minutes: i64,

    /// Menu slug that stands for "anything else" and routes to the root department.
    #[serde(default = "default_fallback_slug")]
    pub fallback_slug: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            admin_timeout_minutes: default_admin_timeout_minutes(),
            fallback_slug: default_fallback_slug(),
        }
    }
}

fn default_sweep_interval_secs() -> u64 {
    30
}

fn default_admin_timeout_minutes() -> i64 {
    5
}

fn default_fallback_slug() -> String {
    "other".to_string()
}

/// Customer-facing message templates.
///
/// Placeholders: `{customer}`, `{menu}`, `{department}`, `{agent}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MessagesConfig {
    /// First message of an engagement. Supports `{customer}` and `{menu}`.
    #[serde(default = "default_welcome")]
    pub welcome: String,

    /// One menu line. Supports `{index}` and `{department}`.
    #[serde(default = "default_menu_item")]
    pub menu_item: String,

    /// Reply to an unrecognised menu choice. Supports `{menu}`.
    #[serde(default = "default_invalid_choice")]
    pub invalid_choice: String,

    /// Offer to continue with the previous department. Supports `{customer}` and `{department}`.
    #[serde(default = "default_routing_suggestion")]
    pub routing_suggestion: String,

    /// Sent when an agent takes the conversation. Supports `{agent}` and `{department}`.
    #[serde(default = "default_assigned")]
    pub assigned: String,

    /// Sent when an escalated conversation found an agent in the root department.
    #[serde(default = "default_connecting")]
    pub connecting: String,

    /// Sent when every escalation path is exhausted.
    #[serde(default = "default_all_unavailable")]
    pub all_unavailable: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            welcome: default_welcome(),
            menu_item: default_menu_item(),
            invalid_choice: default_invalid_choice(),
            routing_suggestion: default_routing_suggestion(),
            assigned: default_assigned(),
            connecting: default_connecting(),
            all_unavailable: default_all_unavailable(),
        }
    }
}

fn default_welcome() -> String {
    "Hello {customer}! How can we help you today? Reply with an option:\n{menu}".to_string()
}

fn default_menu_item() -> String {
    "{index} - {department}".to_string()
}

fn default_invalid_choice() -> String {
    "Sorry, that is not one of the options. Please reply with:\n{menu}".to_string()
}

fn default_routing_suggestion() -> String {
    "Welcome back {customer}! Last time you talked to {department}. Continue there?\n1 - Yes\n2 - No, show all options".to_string()
}

fn default_assigned() -> String {
    "{agent} from {department} will help you.".to_string()
}

fn default_connecting() -> String {
    "Please hold on, an agent is connecting to you.".to_string()
}

fn default_all_unavailable() -> String {
    "All our agents are unavailable right now. We registered your message and will get back to you as soon as possible.".to_string()
}

/// A department entry in the directory seed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DepartmentSeed {
    /// Stable department identifier.
    pub id: String,

    /// Owning company.
    pub company: String,

    /// Routing slug (menu keyword).
    pub slug: String,

    /// Display name. Defaults to the slug.
    #[serde(default)]
    pub name: Option<String>,

    /// Minutes a queued conversation may wait before escalation.
    #[serde(default = "default_response_timeout_minutes")]
    pub response_timeout_minutes: i64,

    /// The company's catch-all department.
    #[serde(default)]
    pub root: bool,

    /// Menu order.
    #[serde(default)]
    pub position: i64,
}

fn default_response_timeout_minutes() -> i64 {
    10
}

/// An agent entry in the directory seed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSeed {
    /// Stable agent identifier.
    pub id: String,

    /// Owning company.
    pub company: String,

    /// Department id the agent works in.
    #[serde(default)]
    pub department: Option<String>,

    /// Display name shown to customers.
    pub name: String,

    /// Inactive agents are never assigned.
    #[serde(default = "default_agent_active")]
    pub active: bool,

    /// Presence at startup: ONLINE, BUSY or OFFLINE.
    #[serde(default = "default_agent_status")]
    pub status: String,
}

fn default_agent_active() -> bool {
    true
}

fn default_agent_status() -> String {
    "OFFLINE".to_string()
}
