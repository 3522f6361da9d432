// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transfer orchestration
//!
//! Moves an asset from a custodied sender to a receiver, handling the
//! ledger's opt-in rule.
//!
//! ## Preconditions (checked in order, first failure wins)
//!
//! 1. The sender identity resolves to a custodied account
//! 2. The asset descriptor resolves (cache, then ledger)
//! 3. The amount has exactly `decimals` fractional digits and does not
//!    exceed the sender's on-ledger holding
//! 4. The receiver has opted in, or is itself custodied
//!
//! ## Paths
//!
//! - **Direct**: receiver already opted in. One transfer signed by the
//!   sender.
//! - **Group**: receiver custodied but not opted in. An atomic group of the
//!   receiver's zero-amount, zero-fee opt-in followed by the transfer,
//!   which pays twice the flat fee to cover both. The ledger applies both
//!   or neither.
//!
//! Every failure comes back as a [`TransferResult::Failed`] value.

pub mod funding;

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use crate::catalog::resolve_descriptor;
use crate::indexer::{Indexer, IndexerError};
use crate::ledger::{
    assign_group_id, explorer_link, to_raw_units, wait_for_confirmation, Address, AmountError,
    Keypair, Ledger, LedgerError, NetworkParams, SignedTransaction, Transaction,
    TransactionError, DIRECT_CONFIRMATION_ROUNDS, GROUP_CONFIRMATION_ROUNDS,
};
use crate::storage::{CustodyStore, DescriptorCache, Identity, StoreError};

pub use funding::Funder;

// =============================================================================
// Errors and results
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("No custodied account for `{0}`")]
    IdentityNotFound(String),

    #[error("Invalid receiver address: {0}")]
    InvalidAddress(String),

    #[error("Asset {0} not found")]
    AssetNotFound(u64),

    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u64, available: u64 },

    #[error("Receiver {receiver} has not opted in to asset {asset_id}")]
    ReceiverNotOptedIn { receiver: Address, asset_id: u64 },

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Transaction rejected: {0}")]
    Submission(String),

    #[error("Transaction {txid} not confirmed after {rounds} rounds")]
    Timeout { txid: String, rounds: u64 },

    #[error("Ledger unavailable: {0}")]
    Ledger(LedgerError),

    #[error("Indexer unavailable: {0}")]
    Indexer(#[from] IndexerError),

    #[error("Custody store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl TransferError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::IdentityNotFound(_) => "identity_not_found",
            Self::InvalidAddress(_) => "invalid_address",
            Self::AssetNotFound(_) => "asset_not_found",
            Self::InvalidAmount(AmountError::DecimalMismatch { .. }) => "decimal_mismatch",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::ReceiverNotOptedIn { .. } => "receiver_not_opted_in",
            Self::Signing(_) => "signing_error",
            Self::Submission(_) => "submission_error",
            Self::Timeout { .. } => "timeout",
            Self::Ledger(_) => "ledger_unavailable",
            Self::Indexer(_) => "indexer_unavailable",
            Self::Store(_) => "store_unavailable",
        }
    }
}

impl From<LedgerError> for TransferError {
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

impl From<TransactionError> for TransferError {
    fn from(e: TransactionError) -> Self {
        Self::Signing(e.to_string())
    }
}

/// Which execution path a transfer took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransferPath {
    Direct,
    Group,
}

/// Proof of a confirmed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TransferReceipt {
    /// Id of the transfer transaction (never the opt-in)
    pub txid: String,
    pub confirmed_round: u64,
    pub path: TransferPath,
    pub explorer_url: String,
}

/// Outcome of [`TransferOrchestrator::transfer`].
#[derive(Debug)]
pub enum TransferResult {
    Completed(TransferReceipt),
    Failed(TransferError),
}

impl TransferResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

impl From<Result<TransferReceipt, TransferError>> for TransferResult {
    fn from(result: Result<TransferReceipt, TransferError>) -> Self {
        match result {
            Ok(receipt) => Self::Completed(receipt),
            Err(e) => Self::Failed(e),
        }
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Executes transfer intents against the ledger.
#[derive(Clone)]
pub struct TransferOrchestrator {
    ledger: Arc<dyn Ledger>,
    indexer: Arc<dyn Indexer>,
    custody: Arc<dyn CustodyStore>,
    descriptors: Arc<dyn DescriptorCache>,
    explorer_url: String,
    direct_rounds: u64,
    group_rounds: u64,
}

/// A validated intent, ready to be turned into transactions.
struct Plan {
    sender: Keypair,
    receiver: Address,
    asset_id: u64,
    raw_amount: u64,
    /// Receiver keypair when an opt-in has to be signed on its behalf
    opt_in_signer: Option<Keypair>,
}

impl TransferOrchestrator {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        indexer: Arc<dyn Indexer>,
        custody: Arc<dyn CustodyStore>,
        descriptors: Arc<dyn DescriptorCache>,
        explorer_url: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            indexer,
            custody,
            descriptors,
            explorer_url: explorer_url.into(),
            direct_rounds: DIRECT_CONFIRMATION_ROUNDS,
            group_rounds: GROUP_CONFIRMATION_ROUNDS,
        }
    }

    /// Override the confirmation bounds of both paths.
    pub fn with_confirmation_rounds(mut self, direct: u64, group: u64) -> Self {
        self.direct_rounds = direct.max(1);
        self.group_rounds = group.max(1);
        self
    }

    /// Transfer `amount` (display units) of `asset_id` from `sender` to
    /// `receiver`.
    pub async fn transfer(
        &self,
        sender: &Identity,
        receiver: &str,
        asset_id: u64,
        amount: &str,
    ) -> TransferResult {
        let result = self.try_transfer(sender, receiver, asset_id, amount).await;
        match &result {
            Ok(receipt) => tracing::info!(
                sender = %sender.handle,
                asset_id,
                txid = %receipt.txid,
                round = receipt.confirmed_round,
                path = ?receipt.path,
                "Transfer confirmed"
            ),
            Err(e) => tracing::warn!(
                sender = %sender.handle,
                asset_id,
                code = e.code(),
                error = %e,
                "Transfer failed"
            ),
        }
        result.into()
    }

    async fn try_transfer(
        &self,
        sender: &Identity,
        receiver: &str,
        asset_id: u64,
        amount: &str,
    ) -> Result<TransferReceipt, TransferError> {
        let plan = self.plan(sender, receiver, asset_id, amount).await?;
        let params = self.ledger.suggested_params().await?;

        match plan.opt_in_signer {
            None => self.execute_direct(&plan, &params).await,
            Some(ref receiver_key) => self.execute_group(&plan, receiver_key, &params).await,
        }
    }

    /// Check every precondition and pick the path.
    async fn plan(
        &self,
        sender: &Identity,
        receiver: &str,
        asset_id: u64,
        amount: &str,
    ) -> Result<Plan, TransferError> {
        let sender_account = self
            .custody
            .find_by_handle(&sender.handle)?
            .ok_or_else(|| TransferError::IdentityNotFound(sender.handle.clone()))?;

        let receiver: Address = receiver
            .parse()
            .map_err(|e| TransferError::InvalidAddress(format!("{e}")))?;

        let descriptor =
            resolve_descriptor(self.ledger.as_ref(), self.descriptors.as_ref(), asset_id)
                .await?
                .ok_or(TransferError::AssetNotFound(asset_id))?;

        let raw_amount = to_raw_units(amount, descriptor.decimals)?;

        let available = self
            .ledger
            .account_info(&sender_account.address)
            .await?
            .holding(asset_id)
            .map(|h| h.amount)
            .unwrap_or(0);
        if raw_amount > available {
            return Err(TransferError::InsufficientBalance {
                requested: raw_amount,
                available,
            });
        }

        let opted_in = self
            .indexer
            .holding_for_asset(&receiver, asset_id)
            .await?
            .is_some();

        let opt_in_signer = if opted_in {
            None
        } else {
            let receiver_account = self
                .custody
                .find_by_address(&receiver)?
                .ok_or(TransferError::ReceiverNotOptedIn { receiver, asset_id })?;
            Some(self.signer_for(&receiver_account.handle)?)
        };

        tracing::debug!(
            sender = %sender_account.address,
            receiver = %receiver,
            asset_id,
            raw_amount,
            group = opt_in_signer.is_some(),
            "Transfer planned"
        );

        Ok(Plan {
            sender: self.signer_for(&sender_account.handle)?,
            receiver,
            asset_id,
            raw_amount,
            opt_in_signer,
        })
    }

    fn signer_for(&self, handle: &str) -> Result<Keypair, TransferError> {
        self.custody
            .keypair(handle)?
            .ok_or_else(|| TransferError::Signing(format!("no signing key for `{handle}`")))
    }

    async fn execute_direct(
        &self,
        plan: &Plan,
        params: &NetworkParams,
    ) -> Result<TransferReceipt, TransferError> {
        let signed = Transaction::asset_transfer(
            params,
            plan.sender.address(),
            plan.receiver,
            plan.asset_id,
            plan.raw_amount,
        )
        .with_suggested_fee(params)?
        .sign(&plan.sender)?;

        self.submit_and_confirm(&[signed], 0, self.direct_rounds, TransferPath::Direct)
            .await
    }

    async fn execute_group(
        &self,
        plan: &Plan,
        receiver_key: &Keypair,
        params: &NetworkParams,
    ) -> Result<TransferReceipt, TransferError> {
        let mut group = [
            Transaction::asset_opt_in(params, plan.receiver, plan.asset_id).with_flat_fee(0),
            Transaction::asset_transfer(
                params,
                plan.sender.address(),
                plan.receiver,
                plan.asset_id,
                plan.raw_amount,
            )
            .with_flat_fee(2 * params.min_fee),
        ];
        assign_group_id(&mut group)?;

        let [opt_in, transfer] = group;
        let signed = [opt_in.sign(receiver_key)?, transfer.sign(&plan.sender)?];

        self.submit_and_confirm(&signed, 1, self.group_rounds, TransferPath::Group)
            .await
    }

    /// Submit `signed` and wait for the member at `tracked` to confirm.
    async fn submit_and_confirm(
        &self,
        signed: &[SignedTransaction],
        tracked: usize,
        rounds: u64,
        path: TransferPath,
    ) -> Result<TransferReceipt, TransferError> {
        let txid = signed[tracked].id()?;

        self.ledger.submit(signed).await?;
        tracing::info!(txid = %txid, members = signed.len(), "Transfer submitted");

        let confirmation = wait_for_confirmation(self.ledger.as_ref(), &txid, rounds).await?;

        Ok(TransferReceipt {
            explorer_url: explorer_link(&self.explorer_url, &txid),
            txid,
            confirmed_round: confirmation.confirmed_round,
            path,
        })
    }
}
