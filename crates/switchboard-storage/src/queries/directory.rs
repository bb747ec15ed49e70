// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Department and agent queries.

use rusqlite::{Connection, OptionalExtension, params};
use switchboard_core::SwitchboardError;

use crate::database::Database;
use crate::models::{
    AGENT_COLUMNS, Agent, AgentLoad, DEPARTMENT_COLUMNS, Department, OnlineStatus,
    agent_from_row, agent_load_from_row, department_from_row,
};

/// Eligible agents of a department with their active-engagement counts,
/// ordered by agent id. Shared by the directory listing and the selection
/// transaction so both count load the same way.
pub(crate) fn eligible_agent_loads(
    conn: &Connection,
    department_id: &str,
) -> rusqlite::Result<Vec<AgentLoad>> {
    let mut stmt = conn.prepare_cached(
        "SELECT a.id, a.name,
                (SELECT COUNT(*) FROM conversations c
                  WHERE c.assigned_user_id = a.id
                    AND c.status IN ('OPEN', 'ASSIGNED')
                    AND c.flow_state IN ('DEPARTMENT_SELECTED', 'ASSIGNED')) AS active_count
         FROM agents a
         WHERE a.department_id = ?1
           AND a.is_active = 1
           AND a.online_status IN ('ONLINE', 'BUSY')
         ORDER BY a.id ASC",
    )?;
    let rows = stmt.query_map(params![department_id], agent_load_from_row)?;
    rows.collect()
}

pub async fn find_department_by_slug(
    db: &Database,
    company_id: &str,
    slug: &str,
) -> Result<Option<Department>, SwitchboardError> {
    let company_id = company_id.to_string();
    let slug = slug.trim().to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {DEPARTMENT_COLUMNS} FROM departments
                     WHERE company_id = ?1 AND slug = ?2 COLLATE NOCASE"
                ),
                params![company_id, slug],
                department_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn find_department(
    db: &Database,
    id: &str,
) -> Result<Option<Department>, SwitchboardError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE id = ?1"),
                params![id],
                department_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn find_root_department(
    db: &Database,
    company_id: &str,
) -> Result<Option<Department>, SwitchboardError> {
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {DEPARTMENT_COLUMNS} FROM departments
                     WHERE company_id = ?1 AND is_root = 1"
                ),
                params![company_id],
                department_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Departments of a company in menu order (position, then name).
pub async fn list_departments(
    db: &Database,
    company_id: &str,
) -> Result<Vec<Department>, SwitchboardError> {
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {DEPARTMENT_COLUMNS} FROM departments
                 WHERE company_id = ?1
                 ORDER BY position ASC, name ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![company_id], department_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list_eligible_agents(
    db: &Database,
    department_id: &str,
) -> Result<Vec<AgentLoad>, SwitchboardError> {
    let department_id = department_id.to_string();
    db.connection()
        .call(move |conn| eligible_agent_loads(conn, &department_id))
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn find_agent(db: &Database, id: &str) -> Result<Option<Agent>, SwitchboardError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"),
                params![id],
                agent_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn set_agent_status(
    db: &Database,
    agent_id: &str,
    status: OnlineStatus,
) -> Result<(), SwitchboardError> {
    let id = agent_id.to_string();
    let updated = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE agents SET online_status = ?1 WHERE id = ?2",
                params![status.to_string(), id],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    if updated == 0 {
        return Err(SwitchboardError::agent_not_found(agent_id));
    }
    Ok(())
}

pub async fn upsert_department(
    db: &Database,
    department: &Department,
) -> Result<(), SwitchboardError> {
    let d = department.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO departments
                     (id, company_id, slug, name, response_timeout_minutes, is_root, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                     company_id = excluded.company_id,
                     slug = excluded.slug,
                     name = excluded.name,
                     response_timeout_minutes = excluded.response_timeout_minutes,
                     is_root = excluded.is_root,
                     position = excluded.position",
                params![
                    d.id,
                    d.company_id,
                    d.slug,
                    d.name,
                    d.response_timeout_minutes,
                    d.is_root,
                    d.position
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn upsert_agent(db: &Database, agent: &Agent) -> Result<(), SwitchboardError> {
    let a = agent.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO agents (id, company_id, department_id, name, is_active, online_status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET
                     company_id = excluded.company_id,
                     department_id = excluded.department_id,
                     name = excluded.name,
                     is_active = excluded.is_active,
                     online_status = excluded.online_status",
                params![
                    a.id,
                    a.company_id,
                    a.department_id,
                    a.name,
                    a.is_active,
                    a.online_status.to_string()
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("directory.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn department(id: &str, slug: &str, is_root: bool, position: i64) -> Department {
        Department {
            id: id.to_string(),
            company_id: "acme".to_string(),
            slug: slug.to_string(),
            name: slug.to_uppercase(),
            response_timeout_minutes: 10,
            is_root,
            position,
        }
    }

    fn agent(id: &str, department: &str, status: OnlineStatus) -> Agent {
        Agent {
            id: id.to_string(),
            company_id: "acme".to_string(),
            department_id: Some(department.to_string()),
            name: id.to_string(),
            is_active: true,
            online_status: status,
        }
    }

    #[tokio::test]
    async fn slug_lookup_is_case_insensitive_and_company_scoped() {
        let (db, _dir) = setup_db().await;
        upsert_department(&db, &department("sales", "Comercial", false, 1))
            .await
            .unwrap();

        let found = find_department_by_slug(&db, "acme", "comercial").await.unwrap();
        assert_eq!(found.unwrap().id, "sales");
        assert!(
            find_department_by_slug(&db, "zeta", "comercial")
                .await
                .unwrap()
                .is_none()
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn root_and_menu_order() {
        let (db, _dir) = setup_db().await;
        upsert_department(&db, &department("root", "other", true, 9)).await.unwrap();
        upsert_department(&db, &department("support", "suporte", false, 2)).await.unwrap();
        upsert_department(&db, &department("sales", "comercial", false, 1)).await.unwrap();

        let root = find_root_department(&db, "acme").await.unwrap().unwrap();
        assert_eq!(root.id, "root");

        let menu: Vec<String> = list_departments(&db, "acme")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(menu, vec!["sales", "support", "root"]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn second_root_is_rejected_by_schema() {
        let (db, _dir) = setup_db().await;
        upsert_department(&db, &department("root", "other", true, 0)).await.unwrap();
        let result = upsert_department(&db, &department("root2", "help", true, 0)).await;
        assert!(result.is_err());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn eligible_agents_exclude_offline_and_inactive() {
        let (db, _dir) = setup_db().await;
        upsert_department(&db, &department("sales", "comercial", false, 0)).await.unwrap();
        upsert_agent(&db, &agent("c", "sales", OnlineStatus::Busy)).await.unwrap();
        upsert_agent(&db, &agent("a", "sales", OnlineStatus::Online)).await.unwrap();
        upsert_agent(&db, &agent("b", "sales", OnlineStatus::Offline)).await.unwrap();
        let mut inactive = agent("d", "sales", OnlineStatus::Online);
        inactive.is_active = false;
        upsert_agent(&db, &inactive).await.unwrap();

        let loads = list_eligible_agents(&db, "sales").await.unwrap();
        let ids: Vec<&str> = loads.iter().map(|l| l.agent_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(loads.iter().all(|l| l.active_count == 0));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn set_agent_status_persists_and_reports_unknown() {
        let (db, _dir) = setup_db().await;
        upsert_department(&db, &department("sales", "comercial", false, 0)).await.unwrap();
        upsert_agent(&db, &agent("a", "sales", OnlineStatus::Online)).await.unwrap();

        set_agent_status(&db, "a", OnlineStatus::Offline).await.unwrap();
        let a = find_agent(&db, "a").await.unwrap().unwrap();
        assert_eq!(a.online_status, OnlineStatus::Offline);

        let err = set_agent_status(&db, "ghost", OnlineStatus::Online)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        db.close().await.unwrap();
    }
}
