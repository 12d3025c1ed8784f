//! Bearer token authentication
//!
//! Handlers that need an identity take a [`Principal`] argument. The
//! extractor reads `Authorization: Bearer <token>`, verifies it against the
//! shared secret and loads the user's current role. Public handlers simply
//! don't ask for one.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use interio_common::api::{authenticate, Principal};
use tracing::debug;

use crate::{ApiError, AppState};

const BEARER_PREFIX: &str = "Bearer ";

/// Pull the raw token out of the Authorization header
fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    let value = header
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Malformed Authorization header".to_string()))?;

    let token = value
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Expected a Bearer token".to_string()))?;

    Ok(token)
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let principal = authenticate(&state.db, token, state.shared_secret)
            .await
            .map_err(|e| {
                debug!("Authentication failed: {}", e);
                ApiError::from(e)
            })?;
        Ok(principal)
    }
}
