// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Switchboard routing service.

use thiserror::Error;

/// The primary error type used across all Switchboard adapter traits and core operations.
#[derive(Debug, Error)]
pub enum SwitchboardError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A referenced conversation, department, or agent does not exist.
    ///
    /// Aborts the operation that hit it. Never retried.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Outbound notification or customer message could not be delivered.
    ///
    /// The engine logs and swallows these: the state transition that
    /// preceded the delivery stays committed.
    #[error("delivery failed: {message}")]
    Delivery {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SwitchboardError {
    /// Shorthand for a [`SwitchboardError::NotFound`] on a conversation.
    pub fn conversation_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "conversation",
            id: id.into(),
        }
    }

    /// Shorthand for a [`SwitchboardError::NotFound`] on a department.
    pub fn department_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "department",
            id: id.into(),
        }
    }

    /// Shorthand for a [`SwitchboardError::NotFound`] on an agent.
    pub fn agent_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "agent",
            id: id.into(),
        }
    }

    /// Returns true for errors that mean "the referenced record is gone".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
