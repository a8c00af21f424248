//! Client storage.
//!
//! Clients (with their embedded comms and upload records) live behind the
//! [`ClientStore`] trait. Two backends exist: a single JSON file rewritten on
//! every mutation, and the SQLite application database.

pub mod files;
pub mod json_file;

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::db::Database;
use crate::types::{Client, ClientPatch, Comm, FieldError, NewClient, NewComm, Upload};

pub use files::FileStore;
pub use json_file::JsonClientStore;

/// Errors raised by client stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("client not found: {0}")]
    ClientNotFound(String),

    #[error("upload not found: {0}")]
    UploadNotFound(String),

    #[error(transparent)]
    Validation(#[from] FieldError),

    #[error("client store I/O failed on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("client store file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage for an agent's clients.
///
/// Every per-user operation is scoped by `user_id`; a client owned by
/// someone else is reported as [`StoreError::ClientNotFound`].
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// All clients of a user, most recently updated first.
    async fn list_clients(&self, user_id: &str) -> StoreResult<Vec<Client>>;

    async fn get_client(&self, user_id: &str, client_id: &str) -> StoreResult<Option<Client>>;

    async fn create_client(&self, user_id: &str, input: NewClient) -> StoreResult<Client>;

    async fn update_client(
        &self,
        user_id: &str,
        client_id: &str,
        patch: ClientPatch,
    ) -> StoreResult<Client>;

    async fn delete_client(&self, user_id: &str, client_id: &str) -> StoreResult<()>;

    /// Prepend a comm to the client's log, dropping the oldest past the cap.
    async fn add_comm(&self, user_id: &str, client_id: &str, input: NewComm) -> StoreResult<Comm>;

    /// The client's comms, newest first.
    async fn list_comms(&self, user_id: &str, client_id: &str) -> StoreResult<Vec<Comm>>;

    async fn add_upload(&self, user_id: &str, client_id: &str, upload: Upload)
    -> StoreResult<()>;

    /// Remove an upload record and return it.
    async fn remove_upload(
        &self,
        user_id: &str,
        client_id: &str,
        upload_id: &str,
    ) -> StoreResult<Upload>;

    /// Every client of every user (for export).
    async fn all_clients(&self) -> StoreResult<Vec<Client>>;

    /// Insert a client as-is. Returns false if the id already exists.
    async fn import_client(&self, client: Client) -> StoreResult<bool>;
}

/// Open the client store selected by the storage configuration.
pub fn open_client_store(
    config: &StorageConfig,
    db: &Arc<Database>,
) -> anyhow::Result<Arc<dyn ClientStore>> {
    let store: Arc<dyn ClientStore> = match config.backend {
        StorageBackend::Sqlite => Arc::new(db.as_ref().clone().with_max_comms(config.max_comms)),
        StorageBackend::Json => Arc::new(
            JsonClientStore::open(config.clients_file())?.with_max_comms(config.max_comms),
        ),
    };
    Ok(store)
}

/// Generate a new record id (UUIDv7, time-sortable).
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
