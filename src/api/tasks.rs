//! Follow-up tasks.

use axum::Extension;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use tracing::info;

use super::{ApiJson, AppState, created};
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::types::{NewTask, Task, TaskFilter};

/// `GET /tasks?status=open|done&clientId=...`
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    filter: Result<Query<TaskFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<Task>>> {
    let Query(filter) = filter.map_err(|e| ApiError::invalid_body(e.body_text()))?;
    Ok(Json(state.db.list_tasks(&user.id, &filter)?))
}

/// `POST /tasks`
///
/// A `clientId` must name one of the caller's clients.
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(input): ApiJson<NewTask>,
) -> ApiResult<impl IntoResponse> {
    input.validated_title()?;
    if let Some(client_id) = input.client_id.as_deref().map(str::trim)
        && !client_id.is_empty()
        && state.store.get_client(&user.id, client_id).await?.is_none()
    {
        return Err(ApiError::client_not_found(client_id).with_field("clientId"));
    }

    let task = state.db.create_task(&user.id, input)?;
    info!(user_id = %user.id, task_id = %task.id, "Created task");
    Ok(created(task))
}

/// `GET /tasks/{id}`
pub async fn get_one(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    state
        .db
        .get_task(&user.id, &id)?
        .map(Json)
        .ok_or_else(|| ApiError::task_not_found(&id))
}

/// `PATCH /tasks/{id}/complete`
pub async fn complete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let task = state
        .db
        .complete_task(&user.id, &id)?
        .ok_or_else(|| ApiError::task_not_found(&id))?;
    info!(user_id = %user.id, task_id = %id, "Completed task");
    Ok(Json(task))
}

/// `PATCH /tasks/{id}/reopen`
pub async fn reopen(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    let task = state
        .db
        .reopen_task(&user.id, &id)?
        .ok_or_else(|| ApiError::task_not_found(&id))?;
    info!(user_id = %user.id, task_id = %id, "Reopened task");
    Ok(Json(task))
}

/// `DELETE /tasks/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if !state.db.delete_task(&user.id, &id)? {
        return Err(ApiError::task_not_found(&id));
    }
    info!(user_id = %user.id, task_id = %id, "Deleted task");
    Ok(StatusCode::NO_CONTENT)
}
