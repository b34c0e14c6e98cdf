/**
 * Authentication Middleware
 *
 * This module provides middleware for protecting routes that require
 * user authentication. It extracts and verifies JWT tokens from the
 * Authorization header and provides the user ID to handlers.
 *
 * WebSocket upgrades cannot always set headers, so `authenticate` also
 * accepts the token as a `?token=` query parameter.
 */

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::backend::auth::sessions::{user_id_from_token, TokenError};
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;

/// Authenticated user data extracted from JWT token
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Verify the caller's token, preferring `query_token` over the bearer header
pub fn authenticate(
    secret: &str,
    query_token: Option<&str>,
    headers: &HeaderMap,
) -> Result<AuthenticatedUser, BackendError> {
    let token = query_token
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(headers))
        .ok_or_else(|| {
            tracing::debug!("[Auth] Missing token");
            BackendError::unauthorized("missing token")
        })?;

    let user_id = user_id_from_token(token, secret).map_err(|e| {
        match e {
            TokenError::BadSubject => tracing::warn!("[Auth] Invalid user ID in token"),
            TokenError::Invalid(err) => tracing::warn!("[Auth] Invalid token: {}", err),
        }
        BackendError::unauthorized("invalid token")
    })?;

    Ok(AuthenticatedUser { user_id })
}

/// Authentication middleware
///
/// This middleware:
/// 1. Extracts JWT token from Authorization header
/// 2. Verifies the token
/// 3. Attaches user data to request extensions for use in handlers
///
/// Returns 401 Unauthorized if token is missing or invalid
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, BackendError> {
    let user = authenticate(&state.jwt_secret, None, request.headers())?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Axum extractor for authenticated user
///
/// Reads the user that `auth_middleware` attached to the request.
#[derive(Clone, Debug)]
pub struct AuthUser(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                tracing::warn!("[Auth] AuthenticatedUser not found in request extensions");
                BackendError::unauthorized("not authenticated")
            })?;

        Ok(AuthUser(user))
    }
}
