use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState};
use crate::services::AuthError;

#[derive(Debug, Serialize)]
pub struct SetupResponse {
    pub secret: String,
    pub otpauth_url: String,
    /// PNG data URL of the enrollment link.
    pub qr_code: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub secret: String,
}

/// GET /admin/2fa/setup
/// Issues a fresh secret. Nothing is stored until it is verified.
pub async fn setup(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<SetupResponse>>, ApiError> {
    let enrollment = state.auth_service().begin_two_factor().await?;
    Ok(Json(ApiResponse::success(SetupResponse {
        secret: enrollment.secret,
        otpauth_url: enrollment.otpauth_url,
        qr_code: enrollment.qr_code,
    })))
}

/// POST /admin/2fa/verify
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    match state
        .auth_service()
        .enable_two_factor(payload.secret.trim(), payload.token.trim())
        .await
    {
        Ok(()) => Ok(Json(ApiResponse::success(()))),
        Err(err @ AuthError::InvalidToken) => Err(ApiError::validation(err.to_string())),
        Err(err) => Err(err.into()),
    }
}

/// POST /admin/2fa/disable
pub async fn disable(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.auth_service().disable_two_factor().await?;
    Ok(Json(ApiResponse::success(())))
}
