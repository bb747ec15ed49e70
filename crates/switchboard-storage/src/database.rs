// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database handle: connection setup, PRAGMAs, migrations, and lifecycle.
//!
//! Every statement runs on tokio-rusqlite's single background thread, so
//! writes from one process are serialized. Do not open extra connections
//! for writes.

use std::time::Duration;

use switchboard_config::model::StorageConfig;
use switchboard_core::SwitchboardError;
use tokio_rusqlite::Connection;
use tracing::debug;

/// An open, migrated SQLite database.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens `path` with default storage settings (WAL on).
    pub async fn open(path: &str) -> Result<Self, SwitchboardError> {
        let config = StorageConfig {
            database_path: path.to_string(),
            ..StorageConfig::default()
        };
        Self::open_with(&config).await
    }

    /// Opens the database described by `config`, applies PRAGMAs, and runs
    /// pending migrations.
    pub async fn open_with(config: &StorageConfig) -> Result<Self, SwitchboardError> {
        let conn = Connection::open(&config.database_path)
            .await
            .map_err(|e| SwitchboardError::Storage {
                source: Box::new(e),
            })?;

        let wal_mode = config.wal_mode;
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.busy_timeout(busy_timeout)?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            if wal_mode {
                let mode: String =
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
                debug!(journal_mode = %mode, "journal mode set");
                conn.pragma_update(None, "synchronous", "NORMAL")?;
            }
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| Ok::<_, rusqlite::Error>(crate::migrations::run_migrations(conn)))
            .await
            .map_err(map_tr_err)??;

        debug!(path = %config.database_path, "database opened");
        Ok(Self { conn })
    }

    /// The background connection all queries go through.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Closes the background connection.
    pub async fn close(self) -> Result<(), SwitchboardError> {
        self.conn.close().await.map_err(|e| SwitchboardError::Storage {
            source: Box::new(e),
        })
    }
}

/// Maps a tokio-rusqlite call error into [`SwitchboardError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> SwitchboardError {
    SwitchboardError::Storage {
        source: Box::new(e),
    }
}
