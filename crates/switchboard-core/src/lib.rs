// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Switchboard routing service.
//!
//! This crate provides the domain types, error type, and the adapter traits
//! (directory store, conversation store, notifier, clock) that the dispatch
//! engine consumes and the storage crate implements.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SwitchboardError;
pub use types::{
    Agent, AgentLoad, AssignOutcome, Assignment, Conversation, ConversationPatch,
    ConversationStatus, Department, EscalationReason, FlowState, HealthStatus, OnlineStatus,
    Precondition,
};

pub use traits::{
    AgentSelector, Clock, ConversationStore, DirectoryStore, Notifier, PluginAdapter,
    StorageAdapter, SystemClock,
};

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn switchboard_error_variants_render() {
        let storage = SwitchboardError::Storage {
            source: Box::new(std::io::Error::other("disk")),
        };
        assert_eq!(storage.to_string(), "storage error: disk");

        let missing = SwitchboardError::department_not_found("dep-1");
        assert_eq!(missing.to_string(), "department not found: dep-1");
        assert!(missing.is_not_found());

        let delivery = SwitchboardError::Delivery {
            message: "socket closed".into(),
            source: None,
        };
        assert!(!delivery.is_not_found());
        assert_eq!(delivery.to_string(), "delivery failed: socket closed");
    }

    #[test]
    fn flow_state_uses_screaming_snake_case() {
        assert_eq!(
            FlowState::AwaitingRoutingConfirmation.to_string(),
            "AWAITING_ROUTING_CONFIRMATION"
        );
        for state in FlowState::ALL {
            let parsed = FlowState::from_str(&state.to_string()).expect("should parse back");
            assert_eq!(parsed, state);
        }
        let json = serde_json::to_string(&FlowState::DepartmentSelected).unwrap();
        assert_eq!(json, "\"DEPARTMENT_SELECTED\"");
    }

    #[test]
    fn online_status_parses_case_insensitively() {
        assert_eq!(OnlineStatus::from_str("offline").unwrap(), OnlineStatus::Offline);
        assert_eq!(OnlineStatus::from_str("BUSY").unwrap(), OnlineStatus::Busy);
        assert!(OnlineStatus::Busy.accepts_work());
        assert!(!OnlineStatus::Offline.accepts_work());
    }

    #[test]
    fn escalation_reason_is_lowercase() {
        assert_eq!(EscalationReason::Timeout.to_string(), "timeout");
        assert_eq!(EscalationReason::Offline.to_string(), "offline");
    }

    #[test]
    fn patch_builder_tracks_agent_release() {
        let patch = ConversationPatch::new()
            .flow_state(FlowState::DepartmentSelected)
            .clear_agent();
        assert!(patch.releases_agent());
        assert_eq!(patch.assigned_at, Some(None));
        assert!(!ConversationPatch::new().status(ConversationStatus::Open).releases_agent());
    }

    #[test]
    fn precondition_builder() {
        let p = Precondition::flow_state(FlowState::Greeting)
            .greeting_unclaimed()
            .held_by("a1");
        assert_eq!(p.flow_state, Some(FlowState::Greeting));
        assert!(p.greeting_unclaimed);
        assert_eq!(p.assigned_user_id.as_deref(), Some("a1"));
        assert_eq!(p.status, None);
        assert!(!p.greeting_claimed);
        assert!(Precondition::flow_state(FlowState::Greeting).greeting_claimed().greeting_claimed);
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_directory_store<T: DirectoryStore>() {}
        fn _assert_conversation_store<T: ConversationStore>() {}
        fn _assert_notifier<T: Notifier>() {}
        fn _assert_clock<T: Clock>() {}
        _assert_clock::<SystemClock>();
    }
}
