// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. All types derive
//! `ToSchema` for OpenAPI documentation.
//!
//! ## Operation envelope
//!
//! Transfers and asset creation never fail with a bare error body. They
//! answer with an [`OperationResponse`]:
//!
//! ```json
//! { "status": true,  "receipt": { ... } }
//! { "status": false, "error_code": "receiver_not_opted_in", "message": "..." }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::IssuedSession;
use crate::minting::{MintReceipt, MintResult};
use crate::storage::Account;
use crate::transfer::{TransferReceipt, TransferResult};

// =============================================================================
// Auth Models
// =============================================================================

/// Request to register a new identity.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignupRequest {
    /// Unique handle (case-insensitive)
    pub handle: String,
    /// Secret used to log in
    pub credential: String,
}

/// Request to open a session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub handle: String,
    pub credential: String,
}

/// A custodied account and its new session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionResponse {
    pub account: Account,
    pub session: IssuedSession,
    /// Whether a signup grant was scheduled for the account
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub funding_scheduled: bool,
}

// =============================================================================
// Asset Models
// =============================================================================

/// Request to create a fungible token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateFungibleRequest {
    /// Asset name (at most 32 bytes)
    pub name: String,
    /// Ticker (at most 8 bytes)
    pub unit_name: String,
    /// Supply in whole display units
    pub total_supply: u64,
    /// Fractional digits of the display unit
    pub decimals: u8,
}

/// Request to mint an ARC-3 NFT.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MintNftRequest {
    pub name: String,
    pub unit_name: String,
    #[serde(default)]
    pub description: String,
    /// Supply in whole display units (default 1, zero is rejected)
    #[serde(default)]
    pub total_supply: Option<u64>,
    /// Fractional digits, making a fractional NFT when non-zero
    #[serde(default)]
    pub decimals: u8,
    /// Image content, standard base64
    pub image_base64: String,
    /// File name of the image
    pub image_name: String,
    /// e.g. `image/png`
    pub image_mime_type: String,
    /// Free-form traits written to the metadata document
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

// =============================================================================
// Transfer Models
// =============================================================================

/// A transfer intent.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferRequest {
    /// Receiver address
    pub receiver: String,
    pub asset_id: u64,
    /// Amount in display units, with exactly the asset's decimals
    pub amount: String,
}

// =============================================================================
// Operation envelope
// =============================================================================

/// Tagged result of a ledger operation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OperationResponse<R> {
    pub status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<R>,
}

impl<R> OperationResponse<R> {
    pub fn success(receipt: R) -> Self {
        Self {
            status: true,
            error_code: None,
            message: None,
            receipt: Some(receipt),
        }
    }

    pub fn failure(error_code: &str, message: impl Into<String>) -> Self {
        Self {
            status: false,
            error_code: Some(error_code.to_string()),
            message: Some(message.into()),
            receipt: None,
        }
    }
}

pub type TransferResponse = OperationResponse<TransferReceipt>;
pub type MintResponse = OperationResponse<MintReceipt>;

impl From<TransferResult> for TransferResponse {
    fn from(result: TransferResult) -> Self {
        match result {
            TransferResult::Completed(receipt) => Self::success(receipt),
            TransferResult::Failed(e) => Self::failure(e.code(), e.to_string()),
        }
    }
}

impl From<MintResult> for MintResponse {
    fn from(result: MintResult) -> Self {
        match result {
            MintResult::Created(receipt) => Self::success(receipt),
            MintResult::Failed(e) => Self::failure(e.code(), e.to_string()),
        }
    }
}
