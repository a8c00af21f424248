//! Retention scoring reference data.

use super::Database;
use anyhow::Result;
use serde::Serialize;

/// A weighted signal that a client may leave.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactor {
    pub id: i64,
    pub key: String,
    pub label: String,
    pub category: String,
    pub weight: f64,
    pub active: bool,
}

/// A selectable result of a retention call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOutcome {
    pub id: i64,
    pub key: String,
    pub label: String,
    pub risk_delta: f64,
    pub creates_task: bool,
    pub sort_order: i64,
}

impl Database {
    /// Risk factors, heaviest first. Inactive factors are skipped unless asked for.
    pub fn list_risk_factors(&self, include_inactive: bool) -> Result<Vec<RiskFactor>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, key, label, category, weight, active FROM risk_factors
                 WHERE active = 1 OR ?1
                 ORDER BY weight DESC, key",
            )?;
            let factors = stmt
                .query_map([include_inactive], |row| {
                    Ok(RiskFactor {
                        id: row.get(0)?,
                        key: row.get(1)?,
                        label: row.get(2)?,
                        category: row.get(3)?,
                        weight: row.get(4)?,
                        active: row.get(5)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(factors)
        })
    }

    /// Call outcome options in display order.
    pub fn list_call_outcomes(&self) -> Result<Vec<CallOutcome>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, key, label, risk_delta, creates_task, sort_order
                 FROM call_outcome_options ORDER BY sort_order, id",
            )?;
            let outcomes = stmt
                .query_map([], |row| {
                    Ok(CallOutcome {
                        id: row.get(0)?,
                        key: row.get(1)?,
                        label: row.get(2)?,
                        risk_delta: row.get(3)?,
                        creates_task: row.get(4)?,
                        sort_order: row.get(5)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(outcomes)
        })
    }
}
