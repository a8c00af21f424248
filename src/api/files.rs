//! Client file uploads.
//!
//! Uploads send the raw bytes as the request body with the file name in the
//! `name` query parameter. The request `Content-Type` is stored and replayed
//! on download.

use axum::Extension;
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use tracing::{info, warn};

use super::{AppState, created};
use crate::auth::AuthUser;
use crate::db::now_ms;
use crate::error::{ApiError, ApiResult};
use crate::store::files::sanitize_file_name;
use crate::store::new_id;
use crate::types::Upload;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub name: Option<String>,
}

/// `GET /files/{client_id}`
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
) -> ApiResult<Json<Vec<Upload>>> {
    let client = state
        .store
        .get_client(&user.id, &client_id)
        .await?
        .ok_or_else(|| ApiError::client_not_found(&client_id))?;
    Ok(Json(client.uploads))
}

/// `POST /files/{client_id}?name=<file name>`
pub async fn upload(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
    params: Result<Query<UploadParams>, QueryRejection>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(params) = params.map_err(|e| ApiError::invalid_body(e.body_text()))?;
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::payload_too_large(state.config.server.max_upload_bytes)
        } else {
            ApiError::invalid_body(rejection.body_text())
        }
    })?;
    if body.is_empty() {
        return Err(ApiError::invalid_body("Upload body is empty"));
    }

    // Ownership check before touching disk
    if state.store.get_client(&user.id, &client_id).await?.is_none() {
        return Err(ApiError::client_not_found(&client_id));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();
    let upload = Upload {
        id: new_id(),
        name: sanitize_file_name(params.name.as_deref().unwrap_or_default()),
        content_type,
        size: body.len() as u64,
        uploaded_at: now_ms(),
    };

    state
        .files
        .save(&user.id, &client_id, &upload.id, &body)
        .await?;
    if let Err(e) = state
        .store
        .add_upload(&user.id, &client_id, upload.clone())
        .await
    {
        // Keep disk and records in step
        if let Err(cleanup) = state.files.delete(&user.id, &client_id, &upload.id).await {
            warn!(upload_id = %upload.id, error = %cleanup, "Failed to remove orphaned upload");
        }
        return Err(e.into());
    }

    info!(
        user_id = %user.id,
        client_id = %client_id,
        upload_id = %upload.id,
        size = upload.size,
        "Stored upload"
    );
    Ok(created(upload))
}

/// `GET /files/{client_id}/{upload_id}`
pub async fn download(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((client_id, upload_id)): Path<(String, String)>,
) -> ApiResult<Response> {
    let client = state
        .store
        .get_client(&user.id, &client_id)
        .await?
        .ok_or_else(|| ApiError::client_not_found(&client_id))?;
    let upload = client
        .uploads
        .into_iter()
        .find(|u| u.id == upload_id)
        .ok_or_else(|| ApiError::upload_not_found(&upload_id))?;

    let bytes = state.files.read(&user.id, &client_id, &upload.id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, upload.content_type.clone()),
            (header::CONTENT_DISPOSITION, content_disposition(&upload.name)),
        ],
        bytes,
    )
        .into_response())
}

/// `DELETE /files/{client_id}/{upload_id}`
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((client_id, upload_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    let upload = state
        .store
        .remove_upload(&user.id, &client_id, &upload_id)
        .await?;
    state.files.delete(&user.id, &client_id, &upload.id).await?;
    info!(user_id = %user.id, client_id = %client_id, upload_id = %upload_id, "Deleted upload");
    Ok(StatusCode::NO_CONTENT)
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 name.
fn content_disposition(name: &str) -> String {
    let ascii: String = name
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(name)
    )
}
