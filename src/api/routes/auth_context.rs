//! Authentication context extractor for the HTTP routes.
//!
//! The HTTP write paths require a valid bearer token; this is distinct from
//! the realtime handshake, where authentication is opportunistic and failure
//! downgrades to anonymous instead of rejecting.

use axum::extract::FromRequestParts;
use axum::http::{StatusCode, request::Parts};

use super::app_state::AppState;
use crate::services::JwtService;

/// Authentication context extracted from request
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: String,
    pub username: String,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(JwtService::extract_bearer_token)
            .ok_or_else(|| {
                tracing::warn!("No authorization token provided");
                StatusCode::UNAUTHORIZED
            })?;

        let claims = state.jwt.validate_token(token).map_err(|e| {
            tracing::warn!("JWT validation failed: {}", e);
            StatusCode::UNAUTHORIZED
        })?;

        if claims.sub.is_empty() {
            tracing::warn!("JWT has empty subject claim");
            return Err(StatusCode::BAD_REQUEST);
        }

        Ok(AuthContext {
            user_id: claims.sub,
            username: claims.username,
        })
    }
}
