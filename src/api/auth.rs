// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration and login.

use axum::{
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    auth::{hash_credential, verify_credential, AuthError, IssuedSession, SESSION_COOKIE},
    error::ApiError,
    models::{LoginRequest, SessionResponse, SignupRequest},
    state::AppState,
    storage::normalize_handle,
};

/// Shortest accepted credential, in characters.
const MIN_CREDENTIAL_LEN: usize = 8;

fn session_cookie(session: &IssuedSession, max_age: i64) -> String {
    format!(
        "{SESSION_COOKIE}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        session.token,
        max_age.max(0)
    )
}

fn with_cookie(status: StatusCode, body: SessionResponse) -> Response {
    let max_age = body.session.expires_at - chrono::Utc::now().timestamp();
    let cookie = session_cookie(&body.session, max_age);
    (status, [(SET_COOKIE, cookie)], Json(body)).into_response()
}

/// Register a new identity.
///
/// Generates the identity's custody keypair. When signup funding is
/// configured, a native grant is sent in the background.
#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    tag = "Auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Identity registered", body = SessionResponse),
        (status = 400, description = "Invalid handle or credential"),
        (status = 409, description = "Handle already taken")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<Response, ApiError> {
    if request.credential.chars().count() < MIN_CREDENTIAL_LEN {
        return Err(ApiError::bad_request(format!(
            "Credential must be at least {MIN_CREDENTIAL_LEN} characters"
        )));
    }

    let credential_hash = hash_credential(&request.credential)?;
    let account = state.custody.create(&request.handle, &credential_hash, true)?;
    let session = state.sessions.issue(&account.handle)?;

    let funding_scheduled = match &state.funder {
        Some(funder) => {
            funder.spawn_fund(account.address);
            true
        }
        None => false,
    };

    tracing::info!(handle = %account.handle, address = %account.address, "Identity registered");

    Ok(with_cookie(
        StatusCode::CREATED,
        SessionResponse {
            account,
            session,
            funding_scheduled,
        },
    ))
}

/// Open a session.
///
/// The token is returned in the body and as the `authid` cookie.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = SessionResponse),
        (status = 401, description = "Invalid handle or credential")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let handle = normalize_handle(&request.handle).map_err(|_| AuthError::InvalidCredentials)?;

    let stored = state.custody.credential(&handle)?;
    let account = state.custody.find_by_handle(&handle)?;
    let (Some(stored), Some(account)) = (stored, account) else {
        tracing::debug!(handle = %handle, "Login for unknown handle");
        return Err(AuthError::InvalidCredentials.into());
    };

    if !verify_credential(&request.credential, &stored) {
        tracing::warn!(handle = %handle, "Login with wrong credential");
        return Err(AuthError::InvalidCredentials.into());
    }

    let session = state.sessions.issue(&account.handle)?;
    Ok(with_cookie(
        StatusCode::OK,
        SessionResponse {
            account,
            session,
            funding_scheduled: false,
        },
    ))
}
