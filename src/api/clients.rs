//! Client CRUD.

use axum::Extension;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use tracing::{info, warn};

use super::{ApiJson, AppState, created};
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::types::{Client, ClientPatch, NewClient};

/// `GET /clients`
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Client>>> {
    Ok(Json(state.store.list_clients(&user.id).await?))
}

/// `POST /clients`
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(input): ApiJson<NewClient>,
) -> ApiResult<impl IntoResponse> {
    let client = state.store.create_client(&user.id, input).await?;
    info!(user_id = %user.id, client_id = %client.id, "Created client");
    Ok(created(client))
}

/// `GET /clients/{id}`
pub async fn get_one(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Client>> {
    state
        .store
        .get_client(&user.id, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::client_not_found(&id))
}

/// `PUT /clients/{id}` and `PATCH /clients/{id}`: partial update.
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ClientPatch>,
) -> ApiResult<Json<Client>> {
    let client = state.store.update_client(&user.id, &id, patch).await?;
    info!(user_id = %user.id, client_id = %id, "Updated client");
    Ok(Json(client))
}

/// `DELETE /clients/{id}`
///
/// Also drops the client's tasks and uploaded files.
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete_client(&user.id, &id).await?;

    let tasks = state.db.delete_tasks_for_client(&user.id, &id)?;
    if let Err(e) = state.files.delete_client(&user.id, &id).await {
        warn!(client_id = %id, error = %e, "Failed to remove client files");
    }

    info!(user_id = %user.id, client_id = %id, tasks, "Deleted client");
    Ok(StatusCode::NO_CONTENT)
}
