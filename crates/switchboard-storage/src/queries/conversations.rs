// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation queries: patch writes, conditional writes, the agent
//! selection transaction, and the sweeper's listings.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params, params_from_iter};
use switchboard_core::types::{AssignOutcome, ConversationPatch, Precondition};
use switchboard_core::{AgentSelector, SwitchboardError};
use uuid::Uuid;

use crate::database::Database;
use crate::models::{
    CONVERSATION_COLUMNS, Conversation, FlowState, conversation_from_row, flow_state_from_str,
    opt_sql_ts, to_sql_ts,
};
use crate::queries::assignments::{close_open_entry, open_entry};
use crate::queries::directory::eligible_agent_loads;

fn text(value: Option<String>) -> Value {
    value.map_or(Value::Null, Value::Text)
}

/// Column assignments for every field the patch sets.
fn patch_columns(patch: &ConversationPatch) -> Vec<(&'static str, Value)> {
    let mut sets = Vec::new();
    if let Some(status) = patch.status {
        sets.push(("status", Value::Text(status.to_string())));
    }
    if let Some(flow_state) = patch.flow_state {
        sets.push(("flow_state", Value::Text(flow_state.to_string())));
    }
    let ids = [
        ("department_id", &patch.department_id),
        ("assigned_user_id", &patch.assigned_user_id),
        ("last_department_id", &patch.last_department_id),
        ("last_attendant_id", &patch.last_attendant_id),
    ];
    for (column, value) in ids {
        if let Some(value) = value {
            sets.push((column, text(value.clone())));
        }
    }
    let times = [
        ("assigned_at", patch.assigned_at),
        ("routed_at", patch.routed_at),
        ("timeout_at", patch.timeout_at),
        ("greeting_sent_at", patch.greeting_sent_at),
        ("last_attended_at", patch.last_attended_at),
    ];
    for (column, value) in times {
        if let Some(value) = value {
            sets.push((column, text(opt_sql_ts(value))));
        }
    }
    sets
}

/// Applies `patch` (and the matching ledger change) in one transaction.
/// Returns the number of conversation rows updated (0 or 1).
fn apply_patch(
    conn: &mut Connection,
    id: &str,
    precondition: Option<&Precondition>,
    patch: &ConversationPatch,
    now: &str,
) -> rusqlite::Result<usize> {
    let mut values: Vec<Value> = Vec::new();
    let mut sql = String::from("UPDATE conversations SET ");
    for (column, value) in patch_columns(patch) {
        values.push(value);
        sql.push_str(&format!("{column} = ?{}, ", values.len()));
    }
    values.push(Value::Text(now.to_string()));
    sql.push_str(&format!("updated_at = ?{}", values.len()));

    values.push(Value::Text(id.to_string()));
    sql.push_str(&format!(" WHERE id = ?{}", values.len()));

    if let Some(pre) = precondition {
        if let Some(flow_state) = pre.flow_state {
            values.push(Value::Text(flow_state.to_string()));
            sql.push_str(&format!(" AND flow_state = ?{}", values.len()));
        }
        if let Some(status) = pre.status {
            values.push(Value::Text(status.to_string()));
            sql.push_str(&format!(" AND status = ?{}", values.len()));
        }
        if pre.greeting_unclaimed {
            sql.push_str(" AND greeting_sent_at IS NULL");
        }
        if pre.greeting_claimed {
            sql.push_str(" AND greeting_sent_at IS NOT NULL");
        }
        if let Some(agent) = &pre.assigned_user_id {
            values.push(Value::Text(agent.clone()));
            sql.push_str(&format!(" AND assigned_user_id = ?{}", values.len()));
        }
    }

    let tx = conn.transaction()?;
    let updated = tx.execute(&sql, params_from_iter(values.iter()))?;
    if updated == 1 {
        if patch.releases_agent() {
            close_open_entry(&tx, id, now)?;
        } else if let Some(Some(agent_id)) = &patch.assigned_user_id {
            open_entry(&tx, id, agent_id, now)?;
        }
    }
    tx.commit()?;
    Ok(updated)
}

pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, SwitchboardError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
                params![id],
                conversation_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert-if-absent on `(company_id, customer_id)`, then read back. Every
/// concurrent caller sees the same row.
pub async fn find_or_create_conversation(
    db: &Database,
    company_id: &str,
    customer_id: &str,
    customer_name: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Conversation, SwitchboardError> {
    let id = Uuid::new_v4().to_string();
    let company_id = company_id.to_string();
    let customer_id = customer_id.to_string();
    let customer_name = customer_name.map(str::to_string);
    let now = to_sql_ts(now);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations
                     (id, company_id, customer_id, customer_name, status, flow_state,
                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 'OPEN', 'GREETING', ?5, ?5)
                 ON CONFLICT(company_id, customer_id) DO NOTHING",
                params![id, company_id, customer_id, customer_name, now],
            )?;
            conn.query_row(
                &format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations
                     WHERE company_id = ?1 AND customer_id = ?2"
                ),
                params![company_id, customer_id],
                conversation_from_row,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn update_conversation(
    db: &Database,
    id: &str,
    patch: &ConversationPatch,
    now: DateTime<Utc>,
) -> Result<(), SwitchboardError> {
    let conversation_id = id.to_string();
    let patch = patch.clone();
    let now = to_sql_ts(now);
    let updated = db
        .connection()
        .call(move |conn| apply_patch(conn, &conversation_id, None, &patch, &now))
        .await
        .map_err(crate::database::map_tr_err)?;
    if updated == 0 {
        return Err(SwitchboardError::conversation_not_found(id));
    }
    Ok(())
}

pub async fn update_conversation_if(
    db: &Database,
    id: &str,
    precondition: &Precondition,
    patch: &ConversationPatch,
    now: DateTime<Utc>,
) -> Result<bool, SwitchboardError> {
    let id = id.to_string();
    let precondition = precondition.clone();
    let patch = patch.clone();
    let now = to_sql_ts(now);
    let updated = db
        .connection()
        .call(move |conn| apply_patch(conn, &id, Some(&precondition), &patch, &now))
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(updated == 1)
}

/// The serializable selection: check the conversation is still queued in
/// `department_id`, aggregate loads, let `select` choose, write, and
/// append the ledger entry. `BEGIN IMMEDIATE` takes the write lock up front
/// so two selections cannot both read the same load.
pub async fn assign_in_transaction(
    db: &Database,
    conversation_id: &str,
    department_id: &str,
    select: AgentSelector,
    now: DateTime<Utc>,
) -> Result<AssignOutcome, SwitchboardError> {
    let id = conversation_id.to_string();
    let department_id = department_id.to_string();
    let now = to_sql_ts(now);
    let outcome = db
        .connection()
        .call(move |conn| -> Result<Option<AssignOutcome>, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let current: Option<(String, Option<String>)> = tx
                .query_row(
                    "SELECT flow_state, department_id FROM conversations WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let Some((flow_state, current_department)) = current else {
                return Ok(None);
            };
            let queued = flow_state_from_str(0, &flow_state)? == FlowState::DepartmentSelected
                && current_department.as_deref() == Some(department_id.as_str());
            if !queued {
                return Ok(Some(AssignOutcome::Superseded));
            }

            let loads = eligible_agent_loads(&tx, &department_id)?;
            let Some(winner) = select(loads) else {
                return Ok(Some(AssignOutcome::NoEligibleAgent));
            };

            tx.execute(
                "UPDATE conversations
                 SET assigned_user_id = ?1, assigned_at = ?2,
                     flow_state = 'ASSIGNED', status = 'ASSIGNED',
                     timeout_at = NULL, updated_at = ?2
                 WHERE id = ?3",
                params![winner.agent_id, now, id],
            )?;
            open_entry(&tx, &id, &winner.agent_id, &now)?;
            tx.commit()?;
            Ok(Some(AssignOutcome::Assigned(winner)))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    outcome.ok_or_else(|| SwitchboardError::conversation_not_found(conversation_id))
}

fn list_where(
    conn: &Connection,
    filter: &str,
    args: &[&dyn rusqlite::ToSql],
) -> rusqlite::Result<Vec<Conversation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE {filter}"
    ))?;
    let rows = stmt.query_map(args, conversation_from_row)?;
    rows.collect()
}

pub async fn list_orphaned_assignments(
    db: &Database,
) -> Result<Vec<Conversation>, SwitchboardError> {
    db.connection()
        .call(|conn| {
            list_where(
                conn,
                "flow_state = 'ASSIGNED' AND assigned_user_id IS NULL ORDER BY updated_at, id",
                &[],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_expired(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<Vec<Conversation>, SwitchboardError> {
    let now = to_sql_ts(now);
    db.connection()
        .call(move |conn| {
            list_where(
                conn,
                "flow_state = 'DEPARTMENT_SELECTED'
                 AND timeout_at IS NOT NULL AND timeout_at < ?1
                 ORDER BY timeout_at, id",
                &[&now as &dyn rusqlite::ToSql],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_engaged_by_agent(
    db: &Database,
    agent_id: &str,
) -> Result<Vec<Conversation>, SwitchboardError> {
    let agent_id = agent_id.to_string();
    db.connection()
        .call(move |conn| {
            list_where(
                conn,
                "assigned_user_id = ?1
                 AND status IN ('OPEN', 'ASSIGNED')
                 AND flow_state IN ('DEPARTMENT_SELECTED', 'ASSIGNED')
                 ORDER BY assigned_at, id",
                &[&agent_id as &dyn rusqlite::ToSql],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn count_by_flow_state(db: &Database) -> Result<Vec<(FlowState, i64)>, SwitchboardError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT flow_state, COUNT(*) FROM conversations
                 GROUP BY flow_state ORDER BY flow_state",
            )?;
            let rows = stmt.query_map([], |row| {
                let state: String = row.get(0)?;
                Ok((flow_state_from_str(0, &state)?, row.get::<_, i64>(1)?))
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone};
    use switchboard_core::types::{
        Agent, AgentLoad, ConversationStatus, Department, OnlineStatus,
    };

    use super::*;
    use crate::queries::{assignments, directory};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("conversations.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        directory::upsert_department(
            &db,
            &Department {
                id: "sales".into(),
                company_id: "acme".into(),
                slug: "comercial".into(),
                name: "Sales".into(),
                response_timeout_minutes: 3,
                is_root: false,
                position: 1,
            },
        )
        .await
        .unwrap();
        for (id, status) in [("agent-a", OnlineStatus::Online), ("agent-b", OnlineStatus::Online)] {
            directory::upsert_agent(
                &db,
                &Agent {
                    id: id.into(),
                    company_id: "acme".into(),
                    department_id: Some("sales".into()),
                    name: id.into(),
                    is_active: true,
                    online_status: status,
                },
            )
            .await
            .unwrap();
        }
        (db, dir)
    }

    fn least_loaded() -> AgentSelector {
        Box::new(|mut loads: Vec<AgentLoad>| {
            loads.sort_by_key(|l| l.active_count);
            loads.into_iter().next()
        })
    }

    async fn queue(db: &Database, customer: &str) -> Conversation {
        let conv = find_or_create_conversation(db, "acme", customer, None, t0())
            .await
            .unwrap();
        let patch = ConversationPatch::new()
            .department(Some("sales".into()))
            .flow_state(FlowState::DepartmentSelected)
            .routed_at(t0())
            .timeout_at(Some(t0() + Duration::minutes(3)));
        update_conversation(db, &conv.id, &patch, t0()).await.unwrap();
        get_conversation(db, &conv.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn concurrent_first_contacts_converge_on_one_row() {
        let (db, _dir) = setup_db().await;
        let db = Arc::new(db);

        let tasks = (0..8).map(|_| {
            let db = Arc::clone(&db);
            tokio::spawn(async move {
                find_or_create_conversation(&db, "acme", "+5511999", Some("Maria"), t0())
                    .await
                    .unwrap()
                    .id
            })
        });
        let ids: Vec<String> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));

        let conv = get_conversation(&db, &ids[0]).await.unwrap().unwrap();
        assert_eq!(conv.flow_state, FlowState::Greeting);
        assert_eq!(conv.status, ConversationStatus::Open);
        assert_eq!(conv.customer_name.as_deref(), Some("Maria"));
        assert_eq!(conv.created_at, t0());
    }

    #[tokio::test]
    async fn greeting_claim_is_won_exactly_once() {
        let (db, _dir) = setup_db().await;
        let db = Arc::new(db);
        let conv = find_or_create_conversation(&db, "acme", "c1", None, t0())
            .await
            .unwrap();

        let tasks = (0..10).map(|_| {
            let db = Arc::clone(&db);
            let id = conv.id.clone();
            tokio::spawn(async move {
                update_conversation_if(
                    &db,
                    &id,
                    &Precondition::flow_state(FlowState::Greeting).greeting_unclaimed(),
                    &ConversationPatch::new().greeting_sent_at(Some(t0())),
                    t0(),
                )
                .await
                .unwrap()
            })
        });
        let wins = futures::future::join_all(tasks)
            .await
            .into_iter()
            .filter(|r| *r.as_ref().unwrap())
            .count();
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn claimed_greeting_guard_waits_for_the_claim() {
        let (db, _dir) = setup_db().await;
        let conv = find_or_create_conversation(&db, "acme", "c1", None, t0())
            .await
            .unwrap();
        let guard = Precondition::flow_state(FlowState::Greeting).greeting_claimed();
        let patch = ConversationPatch::new().flow_state(FlowState::DepartmentSelected);

        assert!(!update_conversation_if(&db, &conv.id, &guard, &patch, t0()).await.unwrap());

        update_conversation(
            &db,
            &conv.id,
            &ConversationPatch::new().greeting_sent_at(Some(t0())),
            t0(),
        )
        .await
        .unwrap();
        assert!(update_conversation_if(&db, &conv.id, &guard, &patch, t0()).await.unwrap());
        assert!(!update_conversation_if(&db, &conv.id, &guard, &patch, t0()).await.unwrap());
    }

    #[tokio::test]
    async fn update_unknown_conversation_is_not_found() {
        let (db, _dir) = setup_db().await;
        let err = update_conversation(
            &db,
            "nope",
            &ConversationPatch::new().status(ConversationStatus::Open),
            t0(),
        )
        .await
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn assignment_picks_least_loaded_and_writes_ledger() {
        let (db, _dir) = setup_db().await;
        let first = queue(&db, "c1").await;
        let outcome = assign_in_transaction(&db, &first.id, "sales", least_loaded(), t0())
            .await
            .unwrap();
        assert!(matches!(&outcome, AssignOutcome::Assigned(l) if l.agent_id == "agent-a"));

        let second = queue(&db, "c2").await;
        let outcome = assign_in_transaction(&db, &second.id, "sales", least_loaded(), t0())
            .await
            .unwrap();
        assert!(matches!(&outcome, AssignOutcome::Assigned(l) if l.agent_id == "agent-b"));

        let conv = get_conversation(&db, &first.id).await.unwrap().unwrap();
        assert_eq!(conv.flow_state, FlowState::Assigned);
        assert_eq!(conv.status, ConversationStatus::Assigned);
        assert_eq!(conv.assigned_user_id.as_deref(), Some("agent-a"));
        assert_eq!(conv.assigned_at, Some(t0()));
        assert!(conv.timeout_at.is_none());

        let ledger = assignments::list_assignments(&db, &first.id).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(ledger[0].unassigned_at.is_none());

        let loads = directory::list_eligible_agents(&db, "sales").await.unwrap();
        assert!(loads.iter().all(|l| l.active_count == 1));
    }

    #[tokio::test]
    async fn assignment_is_superseded_once_conversation_moved() {
        let (db, _dir) = setup_db().await;
        let conv = queue(&db, "c1").await;
        assign_in_transaction(&db, &conv.id, "sales", least_loaded(), t0())
            .await
            .unwrap();

        // already assigned: a second attempt must not steal it
        let again = assign_in_transaction(&db, &conv.id, "sales", least_loaded(), t0())
            .await
            .unwrap();
        assert_eq!(again, AssignOutcome::Superseded);

        let missing = assign_in_transaction(&db, "ghost", "sales", least_loaded(), t0()).await;
        assert!(missing.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn empty_selection_is_no_eligible_agent() {
        let (db, _dir) = setup_db().await;
        let conv = queue(&db, "c1").await;
        let outcome = assign_in_transaction(&db, &conv.id, "sales", Box::new(|_: Vec<AgentLoad>| None), t0())
            .await
            .unwrap();
        assert_eq!(outcome, AssignOutcome::NoEligibleAgent);
        let conv = get_conversation(&db, &conv.id).await.unwrap().unwrap();
        assert_eq!(conv.flow_state, FlowState::DepartmentSelected);
    }

    #[tokio::test]
    async fn parallel_assignments_do_not_double_book() {
        let (db, _dir) = setup_db().await;
        let db = Arc::new(db);
        let mut ids = Vec::new();
        for i in 0..6 {
            ids.push(queue(&db, &format!("c{i}")).await.id);
        }

        let tasks = ids.into_iter().map(|id| {
            let db = Arc::clone(&db);
            tokio::spawn(async move {
                assign_in_transaction(&db, &id, "sales", least_loaded(), t0())
                    .await
                    .unwrap()
            })
        });
        for outcome in futures::future::join_all(tasks).await {
            assert!(matches!(outcome.unwrap(), AssignOutcome::Assigned(_)));
        }

        let loads = directory::list_eligible_agents(&db, "sales").await.unwrap();
        let counts: Vec<i64> = loads.iter().map(|l| l.active_count).collect();
        assert_eq!(counts, vec![3, 3]);
    }

    #[tokio::test]
    async fn releasing_agent_closes_ledger_entry() {
        let (db, _dir) = setup_db().await;
        let conv = queue(&db, "c1").await;
        assign_in_transaction(&db, &conv.id, "sales", least_loaded(), t0())
            .await
            .unwrap();

        let later = t0() + Duration::minutes(1);
        let wrong_holder = update_conversation_if(
            &db,
            &conv.id,
            &Precondition::default().held_by("agent-b"),
            &ConversationPatch::new().clear_agent(),
            later,
        )
        .await
        .unwrap();
        assert!(!wrong_holder);

        let released = update_conversation_if(
            &db,
            &conv.id,
            &Precondition::default().held_by("agent-a"),
            &ConversationPatch::new()
                .clear_agent()
                .flow_state(FlowState::DepartmentSelected)
                .status(ConversationStatus::Open),
            later,
        )
        .await
        .unwrap();
        assert!(released);

        let ledger = assignments::list_assignments(&db, &conv.id).await.unwrap();
        assert_eq!(ledger[0].unassigned_at, Some(later));
        let conv = get_conversation(&db, &conv.id).await.unwrap().unwrap();
        assert!(conv.assigned_user_id.is_none());
        assert!(conv.assigned_at.is_none());
    }

    #[tokio::test]
    async fn sweeper_listings() {
        let (db, _dir) = setup_db().await;
        let expired = queue(&db, "late").await;
        let assigned = queue(&db, "taken").await;
        assign_in_transaction(&db, &assigned.id, "sales", least_loaded(), t0())
            .await
            .unwrap();

        // deadline is t0 + 3 min, strictly-before comparison
        assert!(list_expired(&db, t0() + Duration::minutes(3)).await.unwrap().is_empty());
        let due = list_expired(&db, t0() + Duration::minutes(4)).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, expired.id);

        let orphan = find_or_create_conversation(&db, "acme", "orphan", None, t0())
            .await
            .unwrap();
        update_conversation(
            &db,
            &orphan.id,
            &ConversationPatch::new().flow_state(FlowState::Assigned),
            t0(),
        )
        .await
        .unwrap();
        let orphans = list_orphaned_assignments(&db).await.unwrap();
        assert_eq!(orphans.len(), 1);
        assert!(orphans[0].is_orphaned());

        let engaged = list_engaged_by_agent(&db, "agent-a").await.unwrap();
        assert_eq!(engaged.len(), 1);
        assert_eq!(engaged[0].id, assigned.id);

        let counts = count_by_flow_state(&db).await.unwrap();
        assert!(counts.contains(&(FlowState::Assigned, 2)));
        assert!(counts.contains(&(FlowState::DepartmentSelected, 1)));
    }
}
