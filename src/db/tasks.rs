//! Follow-up task CRUD.

use super::{Database, now_ms};
use crate::types::{NewTask, Task, TaskFilter, TaskStatus};
use anyhow::Result;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use uuid::Uuid;

const TASK_COLUMNS: &str = "id, user_id, title, status, client_id, due_at, notes, created_at, completed_at";

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get(3)?;
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        status: TaskStatus::from_str(&status).unwrap_or_default(),
        client_id: row.get(4)?,
        due_at: row.get(5)?,
        notes: row.get(6)?,
        created_at: row.get(7)?,
        completed_at: row.get(8)?,
    })
}

fn get_task_internal(conn: &Connection, user_id: &str, task_id: &str) -> Result<Option<Task>> {
    let sql = format!(
        "SELECT {} FROM tasks WHERE id = ?1 AND user_id = ?2",
        TASK_COLUMNS
    );
    Ok(conn
        .query_row(&sql, params![task_id, user_id], row_to_task)
        .optional()?)
}

impl Database {
    /// Create a task. The title is validated; the caller checks `client_id`.
    pub fn create_task(&self, user_id: &str, input: NewTask) -> Result<Task> {
        let title = input.validated_title()?;
        let task = Task {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            title,
            status: TaskStatus::Open,
            client_id: input
                .client_id
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            due_at: input.due_at,
            notes: input
                .notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            created_at: now_ms(),
            completed_at: None,
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (id, user_id, title, status, client_id, due_at, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    &task.id,
                    &task.user_id,
                    &task.title,
                    task.status.as_str(),
                    &task.client_id,
                    task.due_at,
                    &task.notes,
                    task.created_at
                ],
            )?;
            Ok(task)
        })
    }

    /// Get one of the user's tasks.
    pub fn get_task(&self, user_id: &str, task_id: &str) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, user_id, task_id))
    }

    /// List the user's tasks. Open tasks sort by due date (undated last),
    /// then newest first.
    pub fn list_tasks(&self, user_id: &str, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut sql = format!("SELECT {} FROM tasks WHERE user_id = ?", TASK_COLUMNS);
        let mut values: Vec<SqlValue> = vec![SqlValue::Text(user_id.to_string())];

        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            values.push(SqlValue::Text(status.as_str().to_string()));
        }
        if let Some(ref client_id) = filter.client_id {
            sql.push_str(" AND client_id = ?");
            values.push(SqlValue::Text(client_id.clone()));
        }
        sql.push_str(
            " ORDER BY status = 'done', due_at IS NULL, due_at, created_at DESC, id DESC",
        );

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let tasks = stmt
                .query_map(params_from_iter(values.iter()), row_to_task)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// Mark a task done. Completing a done task keeps its original `completed_at`.
    pub fn complete_task(&self, user_id: &str, task_id: &str) -> Result<Option<Task>> {
        let now = now_ms();
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE tasks SET status = 'done', completed_at = COALESCE(completed_at, ?3)
                 WHERE id = ?1 AND user_id = ?2",
                params![task_id, user_id, now],
            )?;
            get_task_internal(conn, user_id, task_id)
        })
    }

    /// Reopen a task, clearing `completed_at`.
    pub fn reopen_task(&self, user_id: &str, task_id: &str) -> Result<Option<Task>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE tasks SET status = 'open', completed_at = NULL
                 WHERE id = ?1 AND user_id = ?2",
                params![task_id, user_id],
            )?;
            get_task_internal(conn, user_id, task_id)
        })
    }

    /// Delete a task. Returns false if the user has no such task.
    pub fn delete_task(&self, user_id: &str, task_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
                params![task_id, user_id],
            )?;
            Ok(deleted > 0)
        })
    }

    /// Delete every task attached to a client.
    pub fn delete_tasks_for_client(&self, user_id: &str, client_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM tasks WHERE user_id = ?1 AND client_id = ?2",
                params![user_id, client_id],
            )?)
        })
    }
}
