// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Asset minting
//!
//! Creates fungible tokens and ARC-3 non-fungible tokens on behalf of a
//! custodied account.
//!
//! ## NFT flow
//!
//! 1. Hash the image (`sha256-<hex>`)
//! 2. Upload the image, then the metadata document, to the blob store
//! 3. Create the asset with `url = ipfs://<metadata cid>#arc3`; the creator
//!    is manager, reserve, freeze and clawback
//! 4. Wait for confirmation and report the new asset id
//!
//! Upload failures stop the flow before anything reaches the ledger.

pub mod pinning;

use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use crate::ledger::{
    amount::{scale_supply, MAX_DECIMALS},
    explorer_link, wait_for_confirmation, AmountError, AssetParams, Keypair, Ledger, LedgerError,
    Transaction, TransactionError, DIRECT_CONFIRMATION_ROUNDS,
};
use crate::storage::{CustodyStore, Identity, StoreError};

pub use pinning::{BlobStore, BlobStoreError, PinningClient};

/// Ledger limits on asset parameter lengths, in bytes.
const MAX_ASSET_NAME: usize = 32;
const MAX_UNIT_NAME: usize = 8;
const MAX_URL: usize = 96;

#[derive(Debug, thiserror::Error)]
pub enum MintError {
    #[error("No custodied account for `{0}`")]
    IdentityNotFound(String),

    #[error("Invalid asset parameters: {0}")]
    InvalidParams(String),

    #[error("Invalid supply: {0}")]
    Supply(#[from] AmountError),

    #[error("Metadata upload failed: {0}")]
    Upload(#[from] BlobStoreError),

    #[error("No blob store is configured for NFT metadata")]
    BlobStoreUnavailable,

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Transaction rejected: {0}")]
    Submission(String),

    #[error("Transaction {txid} not confirmed after {rounds} rounds")]
    Timeout { txid: String, rounds: u64 },

    #[error("Ledger unavailable: {0}")]
    Ledger(LedgerError),

    #[error("Confirmed transaction {0} did not report an asset id")]
    MissingAssetId(String),

    #[error("Custody store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl MintError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::IdentityNotFound(_) => "identity_not_found",
            Self::InvalidParams(_) => "invalid_params",
            Self::Supply(_) => "invalid_supply",
            Self::Upload(_) => "upload_failed",
            Self::BlobStoreUnavailable => "upload_failed",
            Self::Signing(_) => "signing_error",
            Self::Submission(_) => "submission_error",
            Self::Timeout { .. } => "timeout",
            Self::Ledger(_) => "ledger_unavailable",
            Self::MissingAssetId(_) => "ledger_unavailable",
            Self::Store(_) => "store_unavailable",
        }
    }
}

impl From<LedgerError> for MintError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Submission(message) => Self::Submission(message),
            LedgerError::PoolError { reason, .. } => Self::Submission(reason),
            LedgerError::Timeout { txid, rounds } => Self::Timeout { txid, rounds },
            LedgerError::Encoding(e) => e.into(),
            other => Self::Ledger(other),
        }
    }
}

impl From<TransactionError> for MintError {
    fn from(e: TransactionError) -> Self {
        Self::Signing(e.to_string())
    }
}

// =============================================================================
// Requests and results
// =============================================================================

/// Parameters of a new fungible token.
#[derive(Debug, Clone)]
pub struct FungibleSpec {
    pub name: String,
    pub unit_name: String,
    /// Supply in whole display units
    pub total_supply: u64,
    pub decimals: u8,
}

/// Parameters and content of a new NFT.
#[derive(Debug, Clone)]
pub struct NftSpec {
    pub name: String,
    pub unit_name: String,
    pub description: String,
    /// Supply in whole display units (1 for a unique item)
    pub total_supply: u64,
    pub decimals: u8,
    pub image: Vec<u8>,
    pub image_name: String,
    pub image_mime_type: String,
    pub properties: Vec<(String, String)>,
}

/// Proof of a confirmed asset creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MintReceipt {
    pub asset_id: u64,
    pub txid: String,
    pub confirmed_round: u64,
    pub explorer_url: String,
    /// `ipfs://...#arc3` for NFTs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_url: Option<String>,
}

/// Outcome of a minting operation.
#[derive(Debug)]
pub enum MintResult {
    Created(MintReceipt),
    Failed(MintError),
}

impl MintResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

impl From<Result<MintReceipt, MintError>> for MintResult {
    fn from(result: Result<MintReceipt, MintError>) -> Self {
        match result {
            Ok(receipt) => Self::Created(receipt),
            Err(e) => Self::Failed(e),
        }
    }
}

/// `sha256-<hex>` digest used as the ARC-3 image integrity field.
pub fn integrity_of(bytes: &[u8]) -> String {
    format!("sha256-{}", hex::encode(Sha256::digest(bytes)))
}

#[derive(Serialize)]
struct Arc3Property<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct Arc3Metadata<'a> {
    name: &'a str,
    description: &'a str,
    image: String,
    image_integrity: String,
    image_mimetype: &'a str,
    properties: Vec<Arc3Property<'a>>,
}

fn validate_names(name: &str, unit_name: &str, decimals: u8) -> Result<(), MintError> {
    if name.trim().is_empty() || name.len() > MAX_ASSET_NAME {
        return Err(MintError::InvalidParams(format!(
            "asset name must be 1-{MAX_ASSET_NAME} bytes"
        )));
    }
    if unit_name.trim().is_empty() || unit_name.len() > MAX_UNIT_NAME {
        return Err(MintError::InvalidParams(format!(
            "unit name must be 1-{MAX_UNIT_NAME} bytes"
        )));
    }
    if decimals > MAX_DECIMALS {
        return Err(AmountError::UnsupportedDecimals(decimals).into());
    }
    Ok(())
}

/// Total supply in raw units; a supply of zero is rejected.
fn scaled_supply(total_supply: u64, decimals: u8) -> Result<u64, MintError> {
    match scale_supply(total_supply, decimals)? {
        0 => Err(MintError::InvalidParams("total supply must be positive".into())),
        total => Ok(total),
    }
}

// =============================================================================
// Minter
// =============================================================================

/// Creates assets for custodied accounts.
#[derive(Clone)]
pub struct Minter {
    ledger: Arc<dyn Ledger>,
    custody: Arc<dyn CustodyStore>,
    blobs: Option<Arc<dyn BlobStore>>,
    explorer_url: String,
    rounds: u64,
}

impl Minter {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        custody: Arc<dyn CustodyStore>,
        explorer_url: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            custody,
            blobs: None,
            explorer_url: explorer_url.into(),
            rounds: DIRECT_CONFIRMATION_ROUNDS,
        }
    }

    /// Override the confirmation bound for asset creation.
    pub fn with_confirmation_rounds(mut self, rounds: u64) -> Self {
        self.rounds = rounds.max(1);
        self
    }

    /// Enable NFT minting through `blobs`.
    pub fn with_blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Create a fungible token owned by `creator`.
    pub async fn create_fungible(&self, creator: &Identity, spec: &FungibleSpec) -> MintResult {
        let result = async {
            validate_names(&spec.name, &spec.unit_name, spec.decimals)?;
            let total = scaled_supply(spec.total_supply, spec.decimals)?;

            let keypair = self.signer_for(creator)?;
            let params = AssetParams {
                total,
                decimals: spec.decimals,
                default_frozen: false,
                unit_name: spec.unit_name.clone(),
                asset_name: spec.name.clone(),
                url: None,
                manager: Some(keypair.address()),
                reserve: Some(keypair.address()),
                freeze: Some(keypair.address()),
                clawback: Some(keypair.address()),
            };
            self.create_asset(&keypair, params).await
        }
        .await;

        log_outcome(creator, "fungible", &result);
        result.into()
    }

    /// Upload the NFT's image and metadata, then create the asset.
    pub async fn mint_nft(&self, creator: &Identity, spec: &NftSpec) -> MintResult {
        let result = async {
            validate_names(&spec.name, &spec.unit_name, spec.decimals)?;
            if spec.image.is_empty() {
                return Err(MintError::InvalidParams("image is empty".into()));
            }
            let total = scaled_supply(spec.total_supply, spec.decimals)?;
            let blobs = self.blobs.as_ref().ok_or(MintError::BlobStoreUnavailable)?;
            let keypair = self.signer_for(creator)?;

            let integrity = integrity_of(&spec.image);
            let image_cid = blobs
                .upload(&spec.image_name, &spec.image_mime_type, spec.image.clone())
                .await?;

            let metadata = Arc3Metadata {
                name: &spec.name,
                description: &spec.description,
                image: format!("ipfs://{image_cid}"),
                image_integrity: integrity,
                image_mimetype: &spec.image_mime_type,
                properties: spec
                    .properties
                    .iter()
                    .map(|(key, value)| Arc3Property { key, value })
                    .collect(),
            };
            let document = serde_json::to_vec(&metadata)
                .map_err(|e| MintError::InvalidParams(e.to_string()))?;
            let metadata_cid = blobs
                .upload("metadata.json", "application/json", document)
                .await?;

            let url = format!("ipfs://{metadata_cid}#arc3");
            if url.len() > MAX_URL {
                return Err(MintError::InvalidParams(format!(
                    "metadata url exceeds {MAX_URL} bytes"
                )));
            }

            let params = AssetParams {
                total,
                decimals: spec.decimals,
                default_frozen: false,
                unit_name: spec.unit_name.clone(),
                asset_name: spec.name.clone(),
                url: Some(url.clone()),
                manager: Some(keypair.address()),
                reserve: Some(keypair.address()),
                freeze: Some(keypair.address()),
                clawback: Some(keypair.address()),
            };
            let mut receipt = self.create_asset(&keypair, params).await?;
            receipt.metadata_url = Some(url);
            Ok(receipt)
        }
        .await;

        log_outcome(creator, "nft", &result);
        result.into()
    }

    fn signer_for(&self, creator: &Identity) -> Result<Keypair, MintError> {
        self.custody
            .keypair(&creator.handle)?
            .ok_or_else(|| MintError::IdentityNotFound(creator.handle.clone()))
    }

    async fn create_asset(&self, keypair: &Keypair, asset: AssetParams) -> Result<MintReceipt, MintError> {
        let params = self.ledger.suggested_params().await?;
        let signed = Transaction::asset_create(&params, keypair.address(), asset)
            .with_suggested_fee(&params)?
            .sign(keypair)?;
        let txid = signed.id()?;

        self.ledger.submit(std::slice::from_ref(&signed)).await?;
        let confirmation = wait_for_confirmation(self.ledger.as_ref(), &txid, self.rounds).await?;
        let asset_id = confirmation
            .asset_index
            .ok_or_else(|| MintError::MissingAssetId(txid.clone()))?;

        Ok(MintReceipt {
            asset_id,
            explorer_url: explorer_link(&self.explorer_url, &txid),
            txid,
            confirmed_round: confirmation.confirmed_round,
            metadata_url: None,
        })
    }
}

fn log_outcome(creator: &Identity, kind: &str, result: &Result<MintReceipt, MintError>) {
    match result {
        Ok(receipt) => tracing::info!(
            creator = %creator.handle,
            kind,
            asset_id = receipt.asset_id,
            txid = %receipt.txid,
            "Asset created"
        ),
        Err(e) => tracing::warn!(
            creator = %creator.handle,
            kind,
            code = e.code(),
            error = %e,
            "Asset creation failed"
        ),
    }
}
