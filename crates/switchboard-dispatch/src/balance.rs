// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Least-loaded agent selection.

use switchboard_core::AgentSelector;
use switchboard_core::types::AgentLoad;

/// Picks the agent with the fewest active engagements. Ties go to the
/// lowest agent id.
pub fn least_loaded(loads: Vec<AgentLoad>) -> Option<AgentLoad> {
    loads.into_iter().min_by(|a, b| {
        a.active_count
            .cmp(&b.active_count)
            .then_with(|| a.agent_id.cmp(&b.agent_id))
    })
}

/// [`least_loaded`] boxed for the store's selection transaction.
pub fn selector() -> AgentSelector {
    Box::new(least_loaded)
}
