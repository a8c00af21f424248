//! Health, version, dashboard, enrollment extraction and risk reference data.

use axum::Extension;
use axum::extract::State;
use axum::extract::rejection::StringRejection;
use axum::response::Json;
use serde::Serialize;
use tracing::debug;

use super::AppState;
use crate::auth::AuthUser;
use crate::db::now_ms;
use crate::db::risk::{CallOutcome, RiskFactor};
use crate::db::stats::DashboardSummary;
use crate::enrollment::EnrollmentFields;
use crate::error::{ApiError, ApiResult};

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
pub struct VersionResponse {
    name: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
pub struct ExtractResponse {
    fields: EnrollmentFields,
    matched: usize,
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /version`
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /dashboard/summary`
pub async fn dashboard_summary(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<DashboardSummary>> {
    let now = now_ms();
    let clients = state.store.list_clients(&user.id).await?;
    let tasks = state.db.task_counts(&user.id, now)?;
    Ok(Json(DashboardSummary::build(&clients, tasks, now)))
}

/// `POST /enrollment/extract` with the form text as the body.
pub async fn extract_enrollment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Result<String, StringRejection>,
) -> ApiResult<Json<ExtractResponse>> {
    let body = body.map_err(|e| ApiError::invalid_body(e.body_text()))?;
    let fields = state.enrollment.extract(&body);
    let matched = fields.matched();
    debug!(user_id = %user.id, bytes = body.len(), matched, "Extracted enrollment fields");
    Ok(Json(ExtractResponse { fields, matched }))
}

/// `GET /risk/factors`
pub async fn risk_factors(State(state): State<AppState>) -> ApiResult<Json<Vec<RiskFactor>>> {
    Ok(Json(state.db.list_risk_factors(false)?))
}

/// `GET /risk/call-outcomes`
pub async fn call_outcomes(State(state): State<AppState>) -> ApiResult<Json<Vec<CallOutcome>>> {
    Ok(Json(state.db.list_call_outcomes()?))
}
