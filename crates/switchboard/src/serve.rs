// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `switchboard serve` command implementation.
//!
//! Opens SQLite storage, loads the directory seed, builds the dispatch
//! engine on a broadcast notifier and runs the escalation sweeper until
//! SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use switchboard_config::SwitchboardConfig;
use switchboard_core::{StorageAdapter, SwitchboardError, SystemClock};
use switchboard_dispatch::shutdown::{self, drain_task};
use switchboard_dispatch::{BroadcastNotifier, DispatchEngine, EscalationSweeper, RoutingEvent};
use switchboard_storage::{SqliteStorage, seed_directory};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Grace period for background tasks after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the `switchboard serve` command.
pub async fn run_serve(config: SwitchboardConfig) -> Result<(), SwitchboardError> {
    init_tracing(&config.service.log_level);
    info!(name = %config.service.name, "starting switchboard serve");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    seed_directory(storage.as_ref(), &config).await?;

    let notifier = Arc::new(BroadcastNotifier::default());
    let engine = Arc::new(
        DispatchEngine::new(
            storage.clone(),
            storage.clone(),
            notifier.clone(),
            Arc::new(SystemClock),
        )
        .with_settings(&config.dispatch)
        .with_messages(&config.messages),
    );

    let cancel = shutdown::install_signal_handler();
    let event_log = spawn_event_log(notifier.subscribe(), cancel.clone());
    let sweeper = EscalationSweeper::new(
        engine.clone(),
        Duration::from_secs(config.dispatch.sweep_interval_secs),
    )
    .spawn(cancel.clone());

    info!(
        sweep_interval_secs = config.dispatch.sweep_interval_secs,
        "switchboard ready"
    );
    cancel.cancelled().await;

    drain_task("sweeper", sweeper, DRAIN_TIMEOUT).await;
    drain_task("event-log", event_log, DRAIN_TIMEOUT).await;
    storage.close().await?;

    info!("switchboard stopped");
    Ok(())
}

/// Logs every routing event until shutdown. Keeps one subscriber attached
/// so deliveries succeed when no channel adapter is listening.
fn spawn_event_log(
    mut rx: broadcast::Receiver<RoutingEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Ok(event) => info!(
                        conversation_id = %event.conversation_id(),
                        ?event,
                        "routing event"
                    ),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event log lagging, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = cancel.cancelled() => {
                    debug!("event log shutting down");
                    break;
                }
            }
        }
    })
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("switchboard={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
