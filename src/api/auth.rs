use axum::{
    Json,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState};
use crate::services::LoginOutcome;

/// Session key set once the admin has logged in.
pub const ADMIN_SESSION_KEY: &str = "admin";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
    pub token: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub outcome: LoginOutcome,
}

// ============================================================================
// Middleware
// ============================================================================

/// Rejects requests whose session does not carry the admin flag.
pub async fn auth_middleware(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match session.get::<bool>(ADMIN_SESSION_KEY).await {
        Ok(Some(true)) => {
            tracing::Span::current().record("user_id", "admin");
            Ok(next.run(request).await)
        }
        Ok(_) => Err(ApiError::unauthorized()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read session");
            Err(ApiError::unauthorized())
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
/// Password first; when 2FA is on, repeat with `token` to finish.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let outcome = state
        .auth_service()
        .login(&payload.password, payload.token.as_deref())
        .await?;

    if outcome == LoginOutcome::Authenticated {
        session
            .cycle_id()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to rotate session: {e}")))?;
        session
            .insert(ADMIN_SESSION_KEY, true)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;
    }

    Ok(Json(ApiResponse::success(LoginResponse { outcome })))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> impl IntoResponse {
    if let Err(e) = session.flush().await {
        tracing::warn!(error = %e, "Failed to flush session");
    }
    Json(ApiResponse::success(()))
}
