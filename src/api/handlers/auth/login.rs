//! Credential login endpoint.

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

use super::{
    credentials::Credentials,
    flow::{LoginError, LoginOutcome, SERVICE_UNAVAILABLE_MESSAGE},
    state::AuthState,
    types::{LoginPayload, LoginRequest},
    utils::{insert_rate_limit_headers, request_is_secure},
};

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success, session cookie set when signing is configured", body = LoginPayload,
            headers(
                ("X-Login-RateLimit" = i64, description = "Login attempt ceiling"),
                ("X-Login-RateLimit-Remaining" = i64, description = "Login attempts left")
            )
        ),
        (status = 400, description = "Missing or invalid payload", body = LoginPayload),
        (status = 401, description = "Invalid credentials", body = LoginPayload),
        (status = 429, description = "Rate limit exceeded", body = LoginPayload),
        (status = 503, description = "User store unavailable", body = LoginPayload)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> impl IntoResponse {
    let mut response_headers = HeaderMap::new();

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!("Rejected login payload: {rejection}");
            return bad_payload(&auth_state, &rejection);
        }
    };

    let credentials = Credentials::new(request.username, request.password);
    let response = auth_state
        .flow()
        .execute(credentials, request_is_secure(&headers))
        .await;

    insert_rate_limit_headers(
        &mut response_headers,
        response.rate_limit.ceiling,
        response.rate_limit.remaining,
    );

    let outcome = match response.result {
        Ok(outcome) => outcome,
        Err(LoginError::StoreUnavailable(_)) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                response_headers,
                Json(LoginPayload::error(SERVICE_UNAVAILABLE_MESSAGE)),
            )
                .into_response();
        }
    };

    let status = match &outcome {
        LoginOutcome::Authenticated { cookie, .. } => {
            if let Some(cookie) = cookie {
                match cookie.to_header_value() {
                    Ok(value) => {
                        response_headers.insert(SET_COOKIE, value);
                    }
                    Err(err) => error!("Failed to build session cookie header: {err}"),
                }
            }
            StatusCode::OK
        }
        LoginOutcome::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        LoginOutcome::Rejected { .. } => StatusCode::UNAUTHORIZED,
    };

    (status, response_headers, Json(outcome.payload())).into_response()
}

// Rejected before the gate, so the budget is reported as it stands.
fn bad_payload(auth_state: &AuthState, rejection: &JsonRejection) -> Response {
    let message = match rejection {
        JsonRejection::MissingJsonContentType(_) => "Missing payload",
        _ => "Invalid payload",
    };
    let limiter = auth_state.rate_limiter();
    let mut headers = HeaderMap::new();
    insert_rate_limit_headers(&mut headers, limiter.ceiling(), limiter.remaining());
    (
        StatusCode::BAD_REQUEST,
        headers,
        Json(LoginPayload::error(message)),
    )
        .into_response()
}
