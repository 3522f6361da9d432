// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Sessions for custodied identities.
//!
//! ## Auth Flow
//!
//! 1. `POST /v1/auth/signup` stores a salted credential hash and creates the
//!    custody keypair
//! 2. `POST /v1/auth/login` checks the credential and issues an HS256 session
//!    token, returned in the body and as the `authid` cookie
//! 3. Every other `/v1` request presents the token as
//!    `Authorization: Bearer <token>` or through the cookie; the [`Auth`]
//!    extractor verifies it and resolves the [`Identity`](crate::storage::Identity)
//!
//! ## Security
//!
//! - Tokens carry only the handle (`sub`), never the credential
//! - Credentials are stored as PBKDF2-HMAC-SHA256 hashes
//! - Clock skew tolerance is 60 seconds
//! - Transfers and asset creation also require the identity's
//!   permission-to-transact flag ([`Transactor`])

pub mod claims;
pub mod error;
pub mod extractor;
pub mod password;
pub mod session;

pub use claims::{IssuedSession, SessionClaims};
pub use error::AuthError;
pub use extractor::{Auth, Transactor, SESSION_COOKIE};
pub use password::{hash_credential, verify_credential};
pub use session::SessionVerifier;
