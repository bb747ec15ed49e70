// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assignment ledger. Entries are opened and closed inside the transaction
//! that changes the conversation's agent.

use rusqlite::{Connection, params};
use switchboard_core::SwitchboardError;

use crate::database::Database;
use crate::models::{Assignment, assignment_from_row};

/// Closes the conversation's open ledger entry, if any.
pub(crate) fn close_open_entry(
    conn: &Connection,
    conversation_id: &str,
    at: &str,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE assignments SET unassigned_at = ?1
         WHERE conversation_id = ?2 AND unassigned_at IS NULL",
        params![at, conversation_id],
    )
}

/// Closes any open entry and opens a new one for `agent_id`.
pub(crate) fn open_entry(
    conn: &Connection,
    conversation_id: &str,
    agent_id: &str,
    at: &str,
) -> rusqlite::Result<i64> {
    close_open_entry(conn, conversation_id, at)?;
    conn.execute(
        "INSERT INTO assignments (conversation_id, agent_id, assigned_at) VALUES (?1, ?2, ?3)",
        params![conversation_id, agent_id, at],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Ledger history of a conversation, oldest first.
pub async fn list_assignments(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<Assignment>, SwitchboardError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, agent_id, assigned_at, unassigned_at
                 FROM assignments
                 WHERE conversation_id = ?1
                 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], assignment_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
