//! Session endpoints for cookie and bearer auth.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

use super::{
    state::AuthState,
    types::SessionResponse,
    utils::{extract_session_token, request_is_secure},
};

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    // Missing or invalid tokens are "no session", never an error.
    let Some(token) = extract_session_token(&headers, auth_state.config().cookie().name()) else {
        return StatusCode::NO_CONTENT.into_response();
    };
    match auth_state.tokens().validate(&token) {
        Some(claims) => {
            let response = SessionResponse {
                username: claims.sub,
                roles: claims.roles,
                expires_at: claims.exp,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    // Tokens are stateless; clearing the cookie is all there is to do.
    let cookie = auth_state
        .config()
        .cookie()
        .clearing_cookie(request_is_secure(&headers));
    let mut response_headers = HeaderMap::new();
    match cookie.to_header_value() {
        Ok(value) => {
            response_headers.insert(SET_COOKIE, value);
        }
        Err(err) => error!("Failed to build clearing cookie header: {err}"),
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}
