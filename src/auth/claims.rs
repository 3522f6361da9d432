// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token claims.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the normalised handle
    pub sub: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,
}

/// A freshly issued session token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IssuedSession {
    pub token: String,
    /// Expiration (Unix timestamp)
    pub expires_at: i64,
}
