// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation sweeper: periodic reconciliation and timeout escalation.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::DispatchEngine;

/// Runs [`DispatchEngine::check_timeout_and_redirect`] on a fixed interval.
///
/// Each pass is awaited inside the loop, so passes never overlap. Ticks
/// missed while a pass runs are skipped.
pub struct EscalationSweeper {
    engine: Arc<DispatchEngine>,
    interval: Duration,
}

impl EscalationSweeper {
    pub fn new(engine: Arc<DispatchEngine>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // Skip the immediate first tick.
        interval.tick().await;

        info!(interval_secs = self.interval.as_secs(), "escalation sweeper started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep().await;
                }
                _ = cancel.cancelled() => {
                    info!("escalation sweeper shutting down");
                    break;
                }
            }
        }
    }

    async fn sweep(&self) {
        match self.engine.check_timeout_and_redirect().await {
            Ok(report) if report.is_empty() => debug!("sweep found nothing to do"),
            Ok(report) => info!(
                reconciled = report.reconciled,
                reassigned = report.reassigned,
                escalated = report.escalated,
                failed = report.failed,
                "sweep complete"
            ),
            Err(e) => warn!(error = %e, "sweep failed"),
        }
    }
}
