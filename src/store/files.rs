//! Uploaded file bytes on local disk.
//!
//! Layout: `<root>/<user_id>/<client_id>/<upload_id>`. Upload metadata lives
//! on the client record; this module only moves bytes.

use std::path::PathBuf;
use tracing::debug;

use super::{StoreError, StoreResult};

/// Directory-backed blob storage for client uploads.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn client_dir(&self, user_id: &str, client_id: &str) -> StoreResult<PathBuf> {
        Ok(self
            .root
            .join(safe_segment(user_id)?)
            .join(safe_segment(client_id)?))
    }

    fn blob_path(&self, user_id: &str, client_id: &str, upload_id: &str) -> StoreResult<PathBuf> {
        Ok(self
            .client_dir(user_id, client_id)?
            .join(safe_segment(upload_id)?))
    }

    /// Write the bytes of an upload.
    pub async fn save(
        &self,
        user_id: &str,
        client_id: &str,
        upload_id: &str,
        bytes: &[u8],
    ) -> StoreResult<()> {
        let dir = self.client_dir(user_id, client_id)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::Io {
                path: dir.clone(),
                source,
            })?;
        let path = dir.join(safe_segment(upload_id)?);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), size = bytes.len(), "Stored upload");
        Ok(())
    }

    /// Read the bytes of an upload. A missing blob is reported as not found.
    pub async fn read(
        &self,
        user_id: &str,
        client_id: &str,
        upload_id: &str,
    ) -> StoreResult<Vec<u8>> {
        let path = self.blob_path(user_id, client_id, upload_id)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::UploadNotFound(upload_id.to_string()))
            }
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Remove the bytes of an upload. Already-missing blobs are fine.
    pub async fn delete(&self, user_id: &str, client_id: &str, upload_id: &str) -> StoreResult<()> {
        let path = self.blob_path(user_id, client_id, upload_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Remove every upload of a client.
    pub async fn delete_client(&self, user_id: &str, client_id: &str) -> StoreResult<()> {
        let dir = self.client_dir(user_id, client_id)?;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path: dir, source }),
        }
    }
}

/// Accept an id as a single path component.
fn safe_segment(id: &str) -> StoreResult<&str> {
    let ok = !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\', '\0'])
        && !id.starts_with('.');
    if ok {
        Ok(id)
    } else {
        Err(StoreError::Validation(crate::types::FieldError::new(
            "id",
            format!("invalid identifier: {}", id),
        )))
    }
}

/// Reduce a client-supplied file name to a safe final component.
pub fn sanitize_file_name(name: &str) -> String {
    let last = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = last
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').trim();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.chars().take(255).collect()
    }
}
