//! Agent accounts.

use super::{Database, now_ms};
use crate::types::{User, UserRole, normalize_email};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

/// Signup with an email that already has an account.
#[derive(Debug, thiserror::Error)]
#[error("email already registered: {0}")]
pub struct EmailTaken(pub String);

const USER_COLUMNS: &str = "id, email, password_hash, name, phone, role, created_at";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(5)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
        phone: row.get(4)?,
        role: UserRole::from_str(&role).unwrap_or_default(),
        created_at: row.get(6)?,
    })
}

fn find_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
    Ok(conn
        .query_row(&sql, params![email], row_to_user)
        .optional()?)
}

impl Database {
    /// Create an account. `password_hash` must already be a PHC string.
    ///
    /// Fails with [`EmailTaken`] if the (normalized) email is in use.
    pub fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        name: Option<String>,
        phone: Option<String>,
    ) -> Result<User> {
        let email = normalize_email(email);
        let user = User {
            id: Uuid::now_v7().to_string(),
            email,
            password_hash: password_hash.to_string(),
            name,
            phone,
            role: UserRole::Agent,
            created_at: now_ms(),
        };

        self.with_conn(|conn| {
            if find_by_email(conn, &user.email)?.is_some() {
                return Err(EmailTaken(user.email.clone()).into());
            }

            conn.execute(
                "INSERT INTO users (id, email, password_hash, name, phone, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    &user.id,
                    &user.email,
                    &user.password_hash,
                    &user.name,
                    &user.phone,
                    user.role.as_str(),
                    user.created_at
                ],
            )?;
            Ok(user)
        })
    }

    /// Get a user by ID.
    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
            Ok(conn
                .query_row(&sql, params![user_id], row_to_user)
                .optional()?)
        })
    }

    /// Look up a user by email, ignoring case and surrounding whitespace.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = normalize_email(email);
        self.with_conn(|conn| find_by_email(conn, &email))
    }

    /// Number of registered users.
    pub fn count_users(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
        })
    }
}
