//! JSON file client store.
//!
//! The whole client list is one JSON array on disk. Every mutation reads the
//! file, changes the list in memory and writes it back through a temporary
//! file plus rename. An async mutex serializes access within the process, so
//! concurrent requests no longer overwrite each other's changes. Separate
//! processes sharing the file are not coordinated.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use super::{ClientStore, StoreError, StoreResult, new_id};
use crate::db::now_ms;
use crate::types::{
    Client, ClientPatch, Comm, MAX_COMMS_PER_CLIENT, NewClient, NewComm, Upload, push_comm,
};

/// Client store backed by a single JSON file.
pub struct JsonClientStore {
    path: PathBuf,
    max_comms: usize,
    lock: Mutex<()>,
}

impl JsonClientStore {
    /// Create a store for `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_comms: MAX_COMMS_PER_CLIENT,
            lock: Mutex::new(()),
        }
    }

    /// Create a store and make sure its parent directory exists.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let store = Self::new(path);
        if let Some(parent) = store.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(store)
    }

    /// Override the per-client comms cap.
    pub fn with_max_comms(mut self, max_comms: usize) -> Self {
        self.max_comms = max_comms.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("clients.json"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn read_all(&self) -> StoreResult<Vec<Client>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    async fn write_all(&self, clients: &[Client]) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(clients).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), clients = clients.len(), "Wrote client store");
        Ok(())
    }

    /// Run `f` against the current list under the lock and persist the result.
    async fn mutate<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Vec<Client>) -> StoreResult<T> + Send,
        T: Send,
    {
        let _guard = self.lock.lock().await;
        let mut clients = self.read_all().await?;
        let out = f(&mut clients)?;
        self.write_all(&clients).await?;
        Ok(out)
    }

    async fn snapshot(&self) -> StoreResult<Vec<Client>> {
        let _guard = self.lock.lock().await;
        self.read_all().await
    }
}

fn find_owned<'a>(
    clients: &'a mut [Client],
    user_id: &str,
    client_id: &str,
) -> StoreResult<&'a mut Client> {
    clients
        .iter_mut()
        .find(|c| c.id == client_id && c.user_id == user_id)
        .ok_or_else(|| StoreError::ClientNotFound(client_id.to_string()))
}

#[async_trait]
impl ClientStore for JsonClientStore {
    async fn list_clients(&self, user_id: &str) -> StoreResult<Vec<Client>> {
        let mut clients: Vec<Client> = self
            .snapshot()
            .await?
            .into_iter()
            .filter(|c| c.user_id == user_id)
            .collect();
        clients.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(clients)
    }

    async fn get_client(&self, user_id: &str, client_id: &str) -> StoreResult<Option<Client>> {
        Ok(self
            .snapshot()
            .await?
            .into_iter()
            .find(|c| c.id == client_id && c.user_id == user_id))
    }

    async fn create_client(&self, user_id: &str, input: NewClient) -> StoreResult<Client> {
        let client = input.into_client(user_id, new_id(), now_ms())?;
        let created = client.clone();
        self.mutate(move |clients| {
            clients.push(client);
            Ok(())
        })
        .await?;
        Ok(created)
    }

    async fn update_client(
        &self,
        user_id: &str,
        client_id: &str,
        patch: ClientPatch,
    ) -> StoreResult<Client> {
        self.mutate(|clients| {
            let client = find_owned(clients, user_id, client_id)?;
            patch.apply(client, now_ms())?;
            Ok(client.clone())
        })
        .await
    }

    async fn delete_client(&self, user_id: &str, client_id: &str) -> StoreResult<()> {
        self.mutate(|clients| {
            let before = clients.len();
            clients.retain(|c| !(c.id == client_id && c.user_id == user_id));
            if clients.len() == before {
                return Err(StoreError::ClientNotFound(client_id.to_string()));
            }
            Ok(())
        })
        .await
    }

    async fn add_comm(&self, user_id: &str, client_id: &str, input: NewComm) -> StoreResult<Comm> {
        let now = now_ms();
        let comm = input.into_comm(new_id(), now)?;
        let max_comms = self.max_comms;
        self.mutate(|clients| {
            let client = find_owned(clients, user_id, client_id)?;
            push_comm(&mut client.comms, comm.clone(), max_comms);
            client.updated_at = now;
            Ok(comm)
        })
        .await
    }

    async fn list_comms(&self, user_id: &str, client_id: &str) -> StoreResult<Vec<Comm>> {
        self.get_client(user_id, client_id)
            .await?
            .map(|c| c.comms)
            .ok_or_else(|| StoreError::ClientNotFound(client_id.to_string()))
    }

    async fn add_upload(
        &self,
        user_id: &str,
        client_id: &str,
        upload: Upload,
    ) -> StoreResult<()> {
        self.mutate(|clients| {
            let client = find_owned(clients, user_id, client_id)?;
            client.updated_at = upload.uploaded_at;
            client.uploads.push(upload);
            Ok(())
        })
        .await
    }

    async fn remove_upload(
        &self,
        user_id: &str,
        client_id: &str,
        upload_id: &str,
    ) -> StoreResult<Upload> {
        self.mutate(|clients| {
            let client = find_owned(clients, user_id, client_id)?;
            let idx = client
                .uploads
                .iter()
                .position(|u| u.id == upload_id)
                .ok_or_else(|| StoreError::UploadNotFound(upload_id.to_string()))?;
            client.updated_at = now_ms();
            Ok(client.uploads.remove(idx))
        })
        .await
    }

    async fn all_clients(&self) -> StoreResult<Vec<Client>> {
        self.snapshot().await
    }

    async fn import_client(&self, mut client: Client) -> StoreResult<bool> {
        let max_comms = self.max_comms;
        self.mutate(move |clients| {
            if clients.iter().any(|c| c.id == client.id) {
                return Ok(false);
            }
            client.comms.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            client.comms.truncate(max_comms);
            clients.push(client);
            Ok(true)
        })
        .await
    }
}
