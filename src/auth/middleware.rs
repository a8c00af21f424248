//! Request guard for authenticated routes.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

use super::AuthService;
use crate::error::ApiError;

/// Reject unauthenticated requests; otherwise attach [`super::AuthUser`].
pub async fn require_auth(
    State(auth): State<Arc<AuthService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = auth.authenticate(req.method(), req.headers())?;
    tracing::Span::current().record("user_id", user.id.as_str());
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
