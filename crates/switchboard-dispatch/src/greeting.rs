// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Greeting claim gate.
//!
//! Several ingestion paths (webhook, poller) may see the same first
//! message. Only the path whose conditional write lands sends the welcome.

use std::sync::Arc;

use switchboard_core::types::{ConversationPatch, FlowState, Precondition};
use switchboard_core::{Clock, ConversationStore, SwitchboardError};
use tracing::debug;

/// Result of a greeting claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This caller owns the greeting.
    Claimed,
    /// Someone else already greeted, or the conversation left `GREETING`.
    AlreadyClaimed,
}

#[derive(Clone)]
pub struct GreetingGate {
    conversations: Arc<dyn ConversationStore>,
    clock: Arc<dyn Clock>,
}

impl GreetingGate {
    pub fn new(conversations: Arc<dyn ConversationStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            conversations,
            clock,
        }
    }

    /// Sets `greeting_sent_at` where it is still NULL and the conversation
    /// is still in `GREETING`. Exactly one concurrent caller wins.
    pub async fn try_claim(&self, conversation_id: &str) -> Result<ClaimOutcome, SwitchboardError> {
        let now = self.clock.now();
        let won = self
            .conversations
            .update_conversation_if(
                conversation_id,
                &Precondition::flow_state(FlowState::Greeting).greeting_unclaimed(),
                &ConversationPatch::new().greeting_sent_at(Some(now)),
                now,
            )
            .await?;

        if won {
            debug!(conversation_id, "greeting claimed");
            Ok(ClaimOutcome::Claimed)
        } else {
            debug!(conversation_id, "greeting already claimed");
            Ok(ClaimOutcome::AlreadyClaimed)
        }
    }
}
