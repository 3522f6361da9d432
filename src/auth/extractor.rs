// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated identities.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(identity): Auth) -> impl IntoResponse {
//!     // identity is a custodied Identity
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};

use super::AuthError;
use crate::state::AppState;
use crate::storage::Identity;

/// Name of the session cookie set at login.
pub const SESSION_COOKIE: &str = "authid";

/// Extractor for an authenticated identity.
///
/// Accepts `Authorization: Bearer <token>` first and falls back to the
/// `authid` cookie. The token's handle must still resolve in the custody
/// store.
pub struct Auth(pub Identity);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(parts)?;
        let claims = state.sessions.verify(&token)?;

        let account = state
            .custody
            .find_by_handle(&claims.sub)
            .map_err(|e| AuthError::InternalError(e.to_string()))?
            .ok_or(AuthError::UnknownIdentity)?;

        Ok(Auth(account.identity()))
    }
}

/// Extractor that additionally requires permission to transact.
pub struct Transactor(pub Identity);

impl FromRequestParts<AppState> for Transactor {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(identity) = Auth::from_request_parts(parts, state).await?;

        if !identity.can_transact {
            tracing::warn!(handle = %identity.handle, "Transacting operation refused");
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(Transactor(identity))
    }
}

/// Pull the session token from the request.
fn session_token(parts: &Parts) -> Result<String, AuthError> {
    if let Some(header) = parts.headers.get(AUTHORIZATION) {
        let header = header.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;
        return Ok(token.trim().to_string());
    }

    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::MissingToken)
}
