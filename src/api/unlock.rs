use axum::{Json, extract::State};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::db::content::is_safe_id;
use crate::gate::unlock_cookie;
use crate::keys::RedeemError;
use crate::services::{KeyError, UnlockRequest};

#[derive(Debug, Default, Deserialize)]
pub struct UnlockPayload {
    #[serde(default)]
    pub article_id: String,
    #[serde(default)]
    pub key: String,
    pub fingerprint: Option<String>,
}

/// Unlock replies are always 200; `success` carries the verdict.
#[derive(Debug, Serialize, Deserialize)]
pub struct UnlockResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl UnlockResponse {
    fn granted(content: String) -> Self {
        Self {
            success: true,
            message: None,
            content: Some(content),
        }
    }

    fn denied(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            content: None,
        }
    }
}

/// POST /unlock
pub async fn unlock(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<UnlockPayload>,
) -> Result<(CookieJar, Json<UnlockResponse>), ApiError> {
    let article_id = payload.article_id.trim();
    if !is_safe_id(article_id) {
        let denied = UnlockResponse::denied(KeyError::ArticleNotFound.to_string());
        return Ok((jar, Json(denied)));
    }

    let code = payload.key.trim();
    if code.is_empty() {
        let denied = UnlockResponse::denied(RedeemError::InvalidKey.to_string());
        return Ok((jar, Json(denied)));
    }

    let request = UnlockRequest {
        article_id: article_id.to_string(),
        code: code.to_string(),
        fingerprint: payload.fingerprint.filter(|f| !f.trim().is_empty()),
    };

    match state.key_service().unlock(request).await {
        Ok(html) => {
            let jar = jar.add(unlock_cookie(article_id));
            Ok((jar, Json(UnlockResponse::granted(html))))
        }
        Err(
            err @ (KeyError::Redeem(_) | KeyError::ArticleNotFound | KeyError::ContentReadFailure),
        ) => Ok((jar, Json(UnlockResponse::denied(err.to_string())))),
        Err(err) => Err(err.into()),
    }
}
