//! Communication log.

use axum::Extension;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Json};
use tracing::info;

use super::{ApiJson, AppState, created};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::types::{Comm, NewComm};

/// `GET /comms/{client_id}`: newest first.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
) -> ApiResult<Json<Vec<Comm>>> {
    Ok(Json(state.store.list_comms(&user.id, &client_id).await?))
}

/// `POST /comms/{client_id}`
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(client_id): Path<String>,
    ApiJson(input): ApiJson<NewComm>,
) -> ApiResult<impl IntoResponse> {
    let comm = state.store.add_comm(&user.id, &client_id, input).await?;
    info!(
        user_id = %user.id,
        client_id = %client_id,
        comm_type = comm.kind.as_str(),
        "Logged comm"
    );
    Ok(created(comm))
}
