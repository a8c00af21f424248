//! Aggregation queries for the dashboard.

use super::Database;
use crate::types::{Client, ClientStatus, RiskLevel};
use anyhow::Result;
use rusqlite::params;
use serde::Serialize;
use std::collections::BTreeMap;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Task totals for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCounts {
    pub open: i64,
    pub done: i64,
    /// Open tasks whose due date has passed.
    pub overdue: i64,
}

/// Dashboard summary for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_clients: usize,
    pub by_status: BTreeMap<&'static str, usize>,
    pub by_risk: BTreeMap<&'static str, usize>,
    pub open_tasks: i64,
    pub done_tasks: i64,
    pub overdue_tasks: i64,
    pub comms_last_7_days: usize,
}

impl DashboardSummary {
    /// Combine a user's clients with their task counts. Every status and
    /// risk label appears in the maps, zero or not.
    pub fn build(clients: &[Client], tasks: TaskCounts, now: i64) -> Self {
        let mut by_status: BTreeMap<&'static str, usize> =
            ClientStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
        let mut by_risk: BTreeMap<&'static str, usize> =
            RiskLevel::ALL.iter().map(|r| (r.as_str(), 0)).collect();

        let since = now - 7 * DAY_MS;
        let mut comms_last_7_days = 0;
        for client in clients {
            *by_status.entry(client.status.as_str()).or_default() += 1;
            *by_risk.entry(client.risk.as_str()).or_default() += 1;
            // Comms are newest first
            comms_last_7_days += client
                .comms
                .iter()
                .take_while(|c| c.created_at >= since)
                .count();
        }

        Self {
            total_clients: clients.len(),
            by_status,
            by_risk,
            open_tasks: tasks.open,
            done_tasks: tasks.done,
            overdue_tasks: tasks.overdue,
            comms_last_7_days,
        }
    }
}

impl Database {
    /// Count a user's tasks by state as of `now`.
    pub fn task_counts(&self, user_id: &str, now: i64) -> Result<TaskCounts> {
        self.with_conn(|conn| {
            let counts = conn.query_row(
                "SELECT
                    COALESCE(SUM(status = 'open'), 0),
                    COALESCE(SUM(status = 'done'), 0),
                    COALESCE(SUM(status = 'open' AND due_at IS NOT NULL AND due_at < ?2), 0)
                 FROM tasks WHERE user_id = ?1",
                params![user_id, now],
                |row| {
                    Ok(TaskCounts {
                        open: row.get(0)?,
                        done: row.get(1)?,
                        overdue: row.get(2)?,
                    })
                },
            )?;
            Ok(counts)
        })
    }
}
