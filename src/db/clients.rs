//! SQLite-backed client store.
//!
//! Clients live in the `clients` table with tags and upload records as JSON
//! columns; comms get their own table so the cap can be enforced with a
//! single delete.

use super::{Database, now_ms};
use crate::store::{ClientStore, StoreError, StoreResult, new_id};
use crate::types::{
    Client, ClientPatch, ClientStatus, Comm, CommDirection, CommType, NewClient, NewComm,
    RiskLevel, Upload,
};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.into())
    }
}

fn json_err(err: serde_json::Error) -> StoreError {
    StoreError::Backend(err.into())
}

const CLIENT_COLUMNS: &str = "id, user_id, name, email, phone, address, date_of_birth, carrier, \
     plan, notes, tags, risk, status, uploads, created_at, updated_at";

/// Map a row to a client without its comms.
fn row_to_client(row: &Row<'_>) -> rusqlite::Result<Client> {
    let tags_json: String = row.get(10)?;
    let risk: String = row.get(11)?;
    let status: String = row.get(12)?;
    let uploads_json: String = row.get(13)?;

    Ok(Client {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        address: row.get(5)?,
        date_of_birth: row.get(6)?,
        carrier: row.get(7)?,
        plan: row.get(8)?,
        notes: row.get(9)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        risk: RiskLevel::from_str(&risk).unwrap_or_default(),
        status: ClientStatus::from_str(&status).unwrap_or_default(),
        comms: Vec::new(),
        uploads: serde_json::from_str(&uploads_json).unwrap_or_default(),
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn row_to_comm(row: &Row<'_>) -> rusqlite::Result<Comm> {
    let kind: String = row.get(1)?;
    let direction: String = row.get(2)?;
    let metadata: Option<String> = row.get(5)?;

    Ok(Comm {
        id: row.get(0)?,
        kind: CommType::from_str(&kind).unwrap_or(CommType::Note),
        direction: CommDirection::from_str(&direction).unwrap_or_default(),
        subject: row.get(3)?,
        preview: row.get(4)?,
        metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
        created_at: row.get(6)?,
    })
}

fn load_comms(conn: &Connection, client_id: &str) -> StoreResult<Vec<Comm>> {
    let mut stmt = conn.prepare(
        "SELECT id, kind, direction, subject, preview, metadata, created_at
         FROM comms WHERE client_id = ?1
         ORDER BY created_at DESC, seq DESC",
    )?;
    let comms = stmt
        .query_map(params![client_id], row_to_comm)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(comms)
}

/// Load a client row owned by `user_id`, without comms.
fn find_owned(conn: &Connection, user_id: &str, client_id: &str) -> StoreResult<Option<Client>> {
    let sql = format!(
        "SELECT {} FROM clients WHERE id = ?1 AND user_id = ?2",
        CLIENT_COLUMNS
    );
    Ok(conn
        .query_row(&sql, params![client_id, user_id], row_to_client)
        .optional()?)
}

fn require_owned(conn: &Connection, user_id: &str, client_id: &str) -> StoreResult<Client> {
    find_owned(conn, user_id, client_id)?
        .ok_or_else(|| StoreError::ClientNotFound(client_id.to_string()))
}

fn insert_client_row(conn: &Connection, client: &Client) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO clients (id, user_id, name, email, phone, address, date_of_birth,
                              carrier, plan, notes, tags, risk, status, uploads,
                              created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            &client.id,
            &client.user_id,
            &client.name,
            &client.email,
            &client.phone,
            &client.address,
            &client.date_of_birth,
            &client.carrier,
            &client.plan,
            &client.notes,
            serde_json::to_string(&client.tags).map_err(json_err)?,
            client.risk.as_str(),
            client.status.as_str(),
            serde_json::to_string(&client.uploads).map_err(json_err)?,
            client.created_at,
            client.updated_at,
        ],
    )?;
    Ok(())
}

fn update_client_row(conn: &Connection, client: &Client) -> StoreResult<()> {
    conn.execute(
        "UPDATE clients SET name = ?2, email = ?3, phone = ?4, address = ?5,
                date_of_birth = ?6, carrier = ?7, plan = ?8, notes = ?9, tags = ?10,
                risk = ?11, status = ?12, uploads = ?13, updated_at = ?14
         WHERE id = ?1",
        params![
            &client.id,
            &client.name,
            &client.email,
            &client.phone,
            &client.address,
            &client.date_of_birth,
            &client.carrier,
            &client.plan,
            &client.notes,
            serde_json::to_string(&client.tags).map_err(json_err)?,
            client.risk.as_str(),
            client.status.as_str(),
            serde_json::to_string(&client.uploads).map_err(json_err)?,
            client.updated_at,
        ],
    )?;
    Ok(())
}

fn insert_comm_row(conn: &Connection, client_id: &str, comm: &Comm) -> StoreResult<()> {
    let metadata = match comm.metadata {
        Some(ref m) => Some(serde_json::to_string(m).map_err(json_err)?),
        None => None,
    };
    conn.execute(
        "INSERT INTO comms (id, client_id, kind, direction, subject, preview, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            &comm.id,
            client_id,
            comm.kind.as_str(),
            comm.direction.as_str(),
            &comm.subject,
            &comm.preview,
            metadata,
            comm.created_at,
        ],
    )?;
    Ok(())
}

/// Delete everything but the newest `cap` comms of a client.
fn trim_comms(conn: &Connection, client_id: &str, cap: usize) -> StoreResult<usize> {
    let removed = conn.execute(
        "DELETE FROM comms WHERE client_id = ?1 AND seq NOT IN (
             SELECT seq FROM comms WHERE client_id = ?1
             ORDER BY created_at DESC, seq DESC LIMIT ?2
         )",
        params![client_id, cap as i64],
    )?;
    Ok(removed)
}

impl Database {
    fn store_op<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T>,
    {
        let mut conn = self.lock()?;
        f(&mut conn)
    }
}

#[async_trait]
impl ClientStore for Database {
    async fn list_clients(&self, user_id: &str) -> StoreResult<Vec<Client>> {
        self.store_op(|conn| {
            let sql = format!(
                "SELECT {} FROM clients WHERE user_id = ?1 ORDER BY updated_at DESC, id",
                CLIENT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut clients = stmt
                .query_map(params![user_id], row_to_client)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for client in &mut clients {
                client.comms = load_comms(conn, &client.id)?;
            }
            Ok(clients)
        })
    }

    async fn get_client(&self, user_id: &str, client_id: &str) -> StoreResult<Option<Client>> {
        self.store_op(|conn| match find_owned(conn, user_id, client_id)? {
            Some(mut client) => {
                client.comms = load_comms(conn, client_id)?;
                Ok(Some(client))
            }
            None => Ok(None),
        })
    }

    async fn create_client(&self, user_id: &str, input: NewClient) -> StoreResult<Client> {
        let client = input.into_client(user_id, new_id(), now_ms())?;
        self.store_op(|conn| insert_client_row(conn, &client))?;
        Ok(client)
    }

    async fn update_client(
        &self,
        user_id: &str,
        client_id: &str,
        patch: ClientPatch,
    ) -> StoreResult<Client> {
        self.store_op(|conn| {
            let tx = conn.transaction()?;
            let mut client = require_owned(&tx, user_id, client_id)?;
            patch.apply(&mut client, now_ms())?;
            update_client_row(&tx, &client)?;
            client.comms = load_comms(&tx, client_id)?;
            tx.commit()?;
            Ok(client)
        })
    }

    async fn delete_client(&self, user_id: &str, client_id: &str) -> StoreResult<()> {
        self.store_op(|conn| {
            let deleted = conn.execute(
                "DELETE FROM clients WHERE id = ?1 AND user_id = ?2",
                params![client_id, user_id],
            )?;
            if deleted == 0 {
                return Err(StoreError::ClientNotFound(client_id.to_string()));
            }
            Ok(())
        })
    }

    async fn add_comm(&self, user_id: &str, client_id: &str, input: NewComm) -> StoreResult<Comm> {
        let now = now_ms();
        let comm = input.into_comm(new_id(), now)?;
        let cap = self.max_comms();
        self.store_op(|conn| {
            let tx = conn.transaction()?;
            require_owned(&tx, user_id, client_id)?;
            insert_comm_row(&tx, client_id, &comm)?;
            tx.execute(
                "UPDATE clients SET updated_at = ?2 WHERE id = ?1",
                params![client_id, now],
            )?;
            let dropped = trim_comms(&tx, client_id, cap)?;
            tx.commit()?;
            if dropped > 0 {
                debug!(client_id, dropped, "Dropped oldest comms past cap");
            }
            Ok(comm)
        })
    }

    async fn list_comms(&self, user_id: &str, client_id: &str) -> StoreResult<Vec<Comm>> {
        self.store_op(|conn| {
            require_owned(conn, user_id, client_id)?;
            load_comms(conn, client_id)
        })
    }

    async fn add_upload(
        &self,
        user_id: &str,
        client_id: &str,
        upload: Upload,
    ) -> StoreResult<()> {
        self.store_op(|conn| {
            let tx = conn.transaction()?;
            let mut client = require_owned(&tx, user_id, client_id)?;
            client.updated_at = upload.uploaded_at;
            client.uploads.push(upload);
            update_client_row(&tx, &client)?;
            tx.commit()?;
            Ok(())
        })
    }

    async fn remove_upload(
        &self,
        user_id: &str,
        client_id: &str,
        upload_id: &str,
    ) -> StoreResult<Upload> {
        self.store_op(|conn| {
            let tx = conn.transaction()?;
            let mut client = require_owned(&tx, user_id, client_id)?;
            let idx = client
                .uploads
                .iter()
                .position(|u| u.id == upload_id)
                .ok_or_else(|| StoreError::UploadNotFound(upload_id.to_string()))?;
            let removed = client.uploads.remove(idx);
            client.updated_at = now_ms();
            update_client_row(&tx, &client)?;
            tx.commit()?;
            Ok(removed)
        })
    }

    async fn all_clients(&self) -> StoreResult<Vec<Client>> {
        self.store_op(|conn| {
            let sql = format!(
                "SELECT {} FROM clients ORDER BY created_at, id",
                CLIENT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut clients = stmt
                .query_map([], row_to_client)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for client in &mut clients {
                client.comms = load_comms(conn, &client.id)?;
            }
            Ok(clients)
        })
    }

    async fn import_client(&self, client: Client) -> StoreResult<bool> {
        let cap = self.max_comms();
        self.store_op(|conn| {
            let tx = conn.transaction()?;
            let exists = tx
                .query_row(
                    "SELECT 1 FROM clients WHERE id = ?1",
                    params![&client.id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if exists {
                return Ok(false);
            }
            insert_client_row(&tx, &client)?;
            // Oldest first so insertion order matches age
            for comm in client.comms.iter().rev() {
                insert_comm_row(&tx, &client.id, comm)?;
            }
            let dropped = trim_comms(&tx, &client.id, cap)?;
            if dropped > 0 {
                debug!(client_id = %client.id, dropped, "Trimmed imported comms to cap");
            }
            tx.commit()?;
            Ok(true)
        })
    }
}
