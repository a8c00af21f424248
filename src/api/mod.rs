//! HTTP API.
//!
//! Routes are grouped per resource. Everything except health, version and
//! the signup/login/logout endpoints sits behind [`require_auth`].

pub mod auth;
pub mod clients;
pub mod comms;
pub mod files;
pub mod system;
pub mod tasks;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, FromRequest, Request};
use axum::http::{HeaderValue, Method, StatusCode, Uri, header};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router, middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::middleware::require_auth;
use crate::auth::{AuthService, CSRF_HEADER};
use crate::config::Config;
use crate::db::Database;
use crate::enrollment::EnrollmentExtractor;
use crate::error::ApiError;
use crate::store::{ClientStore, FileStore};

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub store: Arc<dyn ClientStore>,
    pub files: Arc<FileStore>,
    pub auth: Arc<AuthService>,
    pub enrollment: Arc<EnrollmentExtractor>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire up state from an opened database and client store.
    pub fn new(
        config: Config,
        db: Arc<Database>,
        store: Arc<dyn ClientStore>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            files: Arc::new(FileStore::new(config.storage.files_dir.clone())),
            auth: Arc::new(AuthService::from_config(&config.auth)?),
            enrollment: Arc::new(EnrollmentExtractor::new()?),
            config: Arc::new(config),
            db,
            store,
        })
    }
}

/// JSON body extractor that reports malformed input as an [`ApiError`].
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::invalid_body(rejection.body_text())),
        }
    }
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    let max_upload = state.config.server.max_upload_bytes;

    let public = Router::new()
        .route("/health", get(system::health))
        .route("/version", get(system::version))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout));

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/clients", get(clients::list).post(clients::create))
        .route(
            "/clients/{id}",
            get(clients::get_one)
                .put(clients::update)
                .patch(clients::update)
                .delete(clients::delete),
        )
        .route("/comms/{client_id}", get(comms::list).post(comms::create))
        .route("/tasks", get(tasks::list).post(tasks::create))
        .route("/tasks/{id}", get(tasks::get_one).delete(tasks::delete))
        .route("/tasks/{id}/complete", patch(tasks::complete))
        .route("/tasks/{id}/reopen", patch(tasks::reopen))
        .route(
            "/files/{client_id}",
            get(files::list)
                .post(files::upload)
                .layer(DefaultBodyLimit::max(max_upload)),
        )
        .route(
            "/files/{client_id}/{upload_id}",
            get(files::download).delete(files::delete),
        )
        .route("/dashboard/summary", get(system::dashboard_summary))
        .route("/enrollment/extract", post(system::extract_enrollment))
        .route("/risk/factors", get(system::risk_factors))
        .route("/risk/call-outcomes", get(system::call_outcomes))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            require_auth,
        ));

    let trace = TraceLayer::new_for_http().make_span_with(|req: &Request| {
        tracing::info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
            user_id = tracing::field::Empty,
        )
    });

    public
        .merge(protected)
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(cors_layer(&state.config.server.cors_origins))
        .layer(trace)
        .with_state(state)
}

/// CORS for the SPA. Explicit origins allow credentials; none configured
/// means any origin without credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(methods)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static(CSRF_HEADER),
        ])
        .allow_credentials(true)
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    ApiError::route_not_found(uri.path())
}

async fn method_not_allowed(method: Method, uri: Uri) -> impl IntoResponse {
    ApiError::method_not_allowed(method.as_str(), uri.path())
}

/// Created response with a JSON body.
pub(crate) fn created<T: serde::Serialize>(value: T) -> impl IntoResponse {
    (StatusCode::CREATED, Json(value))
}

/// Start the HTTP server on `addr`.
///
/// Returns a oneshot sender that can be used to signal shutdown,
/// and the actual address the server is bound to.
pub async fn start_server(
    state: AppState,
    addr: SocketAddr,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr)> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("API server listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("API server shutting down");
            })
            .await
        {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr))
}
