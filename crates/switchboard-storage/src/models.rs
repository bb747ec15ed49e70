// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite and the domain types in `switchboard-core`.
//!
//! Timestamps are stored as UTC text with millisecond precision
//! (`2026-01-01T00:00:00.000Z`), which sorts and compares lexicographically.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

pub use switchboard_core::types::{
    Agent, AgentLoad, Assignment, Conversation, ConversationStatus, Department, FlowState,
    OnlineStatus,
};

/// Formats a timestamp for storage.
pub fn to_sql_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn opt_sql_ts(at: Option<DateTime<Utc>>) -> Option<String> {
    at.map(to_sql_ts)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|text| {
        DateTime::parse_from_rfc3339(&text)
            .map(|at| at.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

fn parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    T::from_str(&text).map_err(|e| conversion_error(idx, e))
}

/// Column list matching [`conversation_from_row`].
pub const CONVERSATION_COLUMNS: &str = "id, company_id, customer_id, customer_name, status, \
     flow_state, department_id, assigned_user_id, assigned_at, routed_at, timeout_at, \
     greeting_sent_at, last_department_id, last_attendant_id, last_attended_at, metadata, \
     created_at, updated_at";

pub fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        company_id: row.get(1)?,
        customer_id: row.get(2)?,
        customer_name: row.get(3)?,
        status: parsed(row, 4)?,
        flow_state: parsed(row, 5)?,
        department_id: row.get(6)?,
        assigned_user_id: row.get(7)?,
        assigned_at: opt_ts(row, 8)?,
        routed_at: opt_ts(row, 9)?,
        timeout_at: opt_ts(row, 10)?,
        greeting_sent_at: opt_ts(row, 11)?,
        last_department_id: row.get(12)?,
        last_attendant_id: row.get(13)?,
        last_attended_at: opt_ts(row, 14)?,
        metadata: row.get(15)?,
        created_at: ts(row, 16)?,
        updated_at: ts(row, 17)?,
    })
}

pub const DEPARTMENT_COLUMNS: &str =
    "id, company_id, slug, name, response_timeout_minutes, is_root, position";

pub fn department_from_row(row: &Row<'_>) -> rusqlite::Result<Department> {
    Ok(Department {
        id: row.get(0)?,
        company_id: row.get(1)?,
        slug: row.get(2)?,
        name: row.get(3)?,
        response_timeout_minutes: row.get(4)?,
        is_root: row.get(5)?,
        position: row.get(6)?,
    })
}

pub const AGENT_COLUMNS: &str = "id, company_id, department_id, name, is_active, online_status";

pub fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: row.get(0)?,
        company_id: row.get(1)?,
        department_id: row.get(2)?,
        name: row.get(3)?,
        is_active: row.get(4)?,
        online_status: parsed(row, 5)?,
    })
}

pub fn agent_load_from_row(row: &Row<'_>) -> rusqlite::Result<AgentLoad> {
    Ok(AgentLoad {
        agent_id: row.get(0)?,
        agent_name: row.get(1)?,
        active_count: row.get(2)?,
    })
}

pub fn assignment_from_row(row: &Row<'_>) -> rusqlite::Result<Assignment> {
    Ok(Assignment {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        agent_id: row.get(2)?,
        assigned_at: ts(row, 3)?,
        unassigned_at: opt_ts(row, 4)?,
    })
}

/// Flow state column value. Kept next to the row mappers so SQL literals
/// and parsing agree.
pub fn flow_state_from_str(idx: usize, text: &str) -> rusqlite::Result<FlowState> {
    FlowState::from_str(text).map_err(|e| conversion_error(idx, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_use_millisecond_zulu_text() {
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(to_sql_ts(at), "2026-03-04T05:06:07.000Z");
    }

    #[test]
    fn stored_timestamps_order_lexicographically() {
        let early = Utc.with_ymd_and_hms(2026, 1, 9, 23, 59, 59).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
        assert!(to_sql_ts(early) < to_sql_ts(late));
    }
}
