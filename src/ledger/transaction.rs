// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transaction building, encoding and signing.
//!
//! Transactions are encoded as canonical MessagePack: a map whose keys are
//! sorted alphabetically and whose zero-valued fields are omitted. The wire
//! structs below declare their fields in key order so that serde emits the
//! canonical form directly.
//!
//! ## Identifiers
//!
//! - Transaction id: `base32(sha512_256("TX" ‖ msgpack(txn)))`
//! - Group id: `sha512_256("TG" ‖ msgpack({"txlist": [raw ids]}))`
//!
//! The signature covers the same `"TX" ‖ msgpack(txn)` bytes as the id.

use data_encoding::BASE32_NOPAD;
use serde::Serialize;
use serde_bytes::Bytes;
use sha2::{Digest, Sha512_256};

use super::address::Address;
use super::keys::Keypair;
use super::types::NetworkParams;

/// Number of rounds a transaction stays valid after `first_valid`.
pub const VALIDITY_WINDOW: u64 = 1000;

/// Largest atomic group accepted by the ledger.
pub const MAX_GROUP_SIZE: usize = 16;

/// Size added by the signature envelope, used for per-byte fee estimates.
const SIGNATURE_OVERHEAD: u64 = 75;

const TX_PREFIX: &[u8] = b"TX";
const GROUP_PREFIX: &[u8] = b"TG";

/// Errors raised while encoding, grouping or signing transactions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("failed to encode transaction: {0}")]
    Encode(String),

    #[error("signer {signer} does not match transaction sender {sender}")]
    SignerMismatch { signer: Address, sender: Address },

    #[error("a group needs between 1 and {MAX_GROUP_SIZE} transactions, got {0}")]
    GroupSize(usize),
}

/// Parameters of a newly created asset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssetParams {
    pub total: u64,
    pub decimals: u8,
    pub default_frozen: bool,
    pub unit_name: String,
    pub asset_name: String,
    pub url: Option<String>,
    pub manager: Option<Address>,
    pub reserve: Option<Address>,
    pub freeze: Option<Address>,
    pub clawback: Option<Address>,
}

/// What a transaction does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionKind {
    /// Native currency payment (`pay`).
    Payment { receiver: Address, amount: u64 },
    /// Asset transfer (`axfer`). A zero-amount transfer to oneself is an opt-in.
    AssetTransfer {
        asset_id: u64,
        receiver: Address,
        amount: u64,
    },
    /// Asset creation (`acfg` without an asset id).
    AssetCreate(AssetParams),
}

/// An unsigned ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub sender: Address,
    pub fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
    pub group: Option<[u8; 32]>,
    pub kind: TransactionKind,
}

impl Transaction {
    fn with_params(sender: Address, params: &NetworkParams, kind: TransactionKind) -> Self {
        Self {
            sender,
            fee: params.min_fee,
            first_valid: params.last_round,
            last_valid: params.last_round + VALIDITY_WINDOW,
            genesis_id: params.genesis_id.clone(),
            genesis_hash: params.genesis_hash,
            group: None,
            kind,
        }
    }

    /// Transfer `amount` raw units of `asset_id` to `receiver`.
    pub fn asset_transfer(
        params: &NetworkParams,
        sender: Address,
        receiver: Address,
        asset_id: u64,
        amount: u64,
    ) -> Self {
        Self::with_params(
            sender,
            params,
            TransactionKind::AssetTransfer {
                asset_id,
                receiver,
                amount,
            },
        )
    }

    /// Zero-amount transfer from `account` to itself, registering the account
    /// as a holder of `asset_id`.
    pub fn asset_opt_in(params: &NetworkParams, account: Address, asset_id: u64) -> Self {
        Self::asset_transfer(params, account, account, asset_id, 0)
    }

    /// Create a new asset owned by `sender`.
    pub fn asset_create(params: &NetworkParams, sender: Address, asset: AssetParams) -> Self {
        Self::with_params(sender, params, TransactionKind::AssetCreate(asset))
    }

    /// Pay `amount` micro-units of the native currency to `receiver`.
    pub fn payment(
        params: &NetworkParams,
        sender: Address,
        receiver: Address,
        amount: u64,
    ) -> Self {
        Self::with_params(sender, params, TransactionKind::Payment { receiver, amount })
    }

    /// Override the fee with a flat value.
    pub fn with_flat_fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self
    }

    /// Apply the node's per-byte fee, never going below the minimum fee.
    pub fn with_suggested_fee(mut self, params: &NetworkParams) -> Result<Self, TransactionError> {
        let size = self.encode()?.len() as u64 + SIGNATURE_OVERHEAD;
        self.fee = params.fee_per_byte.saturating_mul(size).max(params.min_fee);
        Ok(self)
    }

    /// Whether this transaction is an opt-in (zero-amount self transfer).
    pub fn is_opt_in(&self) -> bool {
        matches!(
            self.kind,
            TransactionKind::AssetTransfer { receiver, amount: 0, .. } if receiver == self.sender
        )
    }

    fn wire(&self) -> WireTransaction<'_> {
        let mut wire = WireTransaction {
            asset_amount: 0,
            amount: 0,
            asset_params: None,
            asset_receiver: None,
            fee: self.fee,
            first_valid: self.first_valid,
            genesis_id: &self.genesis_id,
            genesis_hash: Bytes::new(&self.genesis_hash),
            group: self.group.as_ref().map(|g| Bytes::new(g)),
            last_valid: self.last_valid,
            receiver: None,
            sender: Bytes::new(self.sender.as_bytes()),
            tx_type: "",
            asset_id: 0,
        };

        match &self.kind {
            TransactionKind::Payment { receiver, amount } => {
                wire.tx_type = "pay";
                wire.amount = *amount;
                wire.receiver = Some(Bytes::new(receiver.as_bytes()));
            }
            TransactionKind::AssetTransfer {
                asset_id,
                receiver,
                amount,
            } => {
                wire.tx_type = "axfer";
                wire.asset_id = *asset_id;
                wire.asset_amount = *amount;
                wire.asset_receiver = Some(Bytes::new(receiver.as_bytes()));
            }
            TransactionKind::AssetCreate(asset) => {
                wire.tx_type = "acfg";
                wire.asset_params = Some(WireAssetParams::from(asset));
            }
        }

        wire
    }

    /// Canonical msgpack encoding of the unsigned transaction.
    pub fn encode(&self) -> Result<Vec<u8>, TransactionError> {
        encode(&self.wire())
    }

    /// Raw 32-byte transaction id.
    pub fn raw_id(&self) -> Result<[u8; 32], TransactionError> {
        Ok(prefixed_digest(TX_PREFIX, &self.encode()?))
    }

    /// Transaction id in its base32 text form.
    pub fn id(&self) -> Result<String, TransactionError> {
        Ok(BASE32_NOPAD.encode(&self.raw_id()?))
    }

    /// Sign with `keypair`, which must control the sender address.
    pub fn sign(self, keypair: &Keypair) -> Result<SignedTransaction, TransactionError> {
        if keypair.address() != self.sender {
            return Err(TransactionError::SignerMismatch {
                signer: keypair.address(),
                sender: self.sender,
            });
        }

        let mut message = TX_PREFIX.to_vec();
        message.extend_from_slice(&self.encode()?);
        let signature = keypair.sign(&message);

        Ok(SignedTransaction {
            transaction: self,
            signature,
        })
    }
}

/// Compute the group id of `transactions` and stamp it on every member.
///
/// Any group id already present is cleared before hashing, so calling this
/// twice yields the same id.
pub fn assign_group_id(transactions: &mut [Transaction]) -> Result<[u8; 32], TransactionError> {
    if transactions.is_empty() || transactions.len() > MAX_GROUP_SIZE {
        return Err(TransactionError::GroupSize(transactions.len()));
    }

    let mut ids = Vec::with_capacity(transactions.len());
    for txn in transactions.iter_mut() {
        txn.group = None;
        ids.push(txn.raw_id()?);
    }

    let list = WireGroup {
        txlist: ids.iter().map(|id| Bytes::new(id)).collect(),
    };
    let group_id = prefixed_digest(GROUP_PREFIX, &encode(&list)?);

    for txn in transactions.iter_mut() {
        txn.group = Some(group_id);
    }
    Ok(group_id)
}

/// A transaction together with its sender's signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: [u8; 64],
}

impl SignedTransaction {
    /// Id of the underlying transaction.
    pub fn id(&self) -> Result<String, TransactionError> {
        self.transaction.id()
    }

    /// Canonical msgpack encoding of the signed envelope.
    pub fn encode(&self) -> Result<Vec<u8>, TransactionError> {
        encode(&WireSignedTransaction {
            sig: Bytes::new(&self.signature),
            txn: self.transaction.wire(),
        })
    }
}

/// Encode a group (or a single transaction) for submission: the signed
/// envelopes concatenated in order.
pub fn encode_group(group: &[SignedTransaction]) -> Result<Vec<u8>, TransactionError> {
    let mut out = Vec::new();
    for stxn in group {
        out.extend_from_slice(&stxn.encode()?);
    }
    Ok(out)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, TransactionError> {
    rmp_serde::to_vec_named(value).map_err(|e| TransactionError::Encode(e.to_string()))
}

fn prefixed_digest(prefix: &[u8], payload: &[u8]) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    hasher.update(prefix);
    hasher.update(payload);
    hasher.finalize().into()
}

// =============================================================================
// Wire structs (field order == canonical key order)
// =============================================================================

fn is_zero(value: &u64) -> bool {
    *value == 0
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_empty(value: &&str) -> bool {
    value.is_empty()
}

#[derive(Serialize)]
struct WireTransaction<'a> {
    #[serde(rename = "aamt", skip_serializing_if = "is_zero")]
    asset_amount: u64,
    #[serde(rename = "amt", skip_serializing_if = "is_zero")]
    amount: u64,
    #[serde(rename = "apar", skip_serializing_if = "Option::is_none")]
    asset_params: Option<WireAssetParams<'a>>,
    #[serde(rename = "arcv", skip_serializing_if = "Option::is_none")]
    asset_receiver: Option<&'a Bytes>,
    #[serde(skip_serializing_if = "is_zero")]
    fee: u64,
    #[serde(rename = "fv", skip_serializing_if = "is_zero")]
    first_valid: u64,
    #[serde(rename = "gen", skip_serializing_if = "is_empty")]
    genesis_id: &'a str,
    #[serde(rename = "gh")]
    genesis_hash: &'a Bytes,
    #[serde(rename = "grp", skip_serializing_if = "Option::is_none")]
    group: Option<&'a Bytes>,
    #[serde(rename = "lv", skip_serializing_if = "is_zero")]
    last_valid: u64,
    #[serde(rename = "rcv", skip_serializing_if = "Option::is_none")]
    receiver: Option<&'a Bytes>,
    #[serde(rename = "snd")]
    sender: &'a Bytes,
    #[serde(rename = "type")]
    tx_type: &'static str,
    #[serde(rename = "xaid", skip_serializing_if = "is_zero")]
    asset_id: u64,
}

#[derive(Serialize)]
struct WireAssetParams<'a> {
    #[serde(rename = "an", skip_serializing_if = "is_empty")]
    asset_name: &'a str,
    #[serde(rename = "au", skip_serializing_if = "is_empty")]
    url: &'a str,
    #[serde(rename = "c", skip_serializing_if = "Option::is_none")]
    clawback: Option<&'a Bytes>,
    #[serde(rename = "dc", skip_serializing_if = "is_zero")]
    decimals: u64,
    #[serde(rename = "df", skip_serializing_if = "is_false")]
    default_frozen: bool,
    #[serde(rename = "f", skip_serializing_if = "Option::is_none")]
    freeze: Option<&'a Bytes>,
    #[serde(rename = "m", skip_serializing_if = "Option::is_none")]
    manager: Option<&'a Bytes>,
    #[serde(rename = "r", skip_serializing_if = "Option::is_none")]
    reserve: Option<&'a Bytes>,
    #[serde(rename = "t", skip_serializing_if = "is_zero")]
    total: u64,
    #[serde(rename = "un", skip_serializing_if = "is_empty")]
    unit_name: &'a str,
}

impl<'a> From<&'a AssetParams> for WireAssetParams<'a> {
    fn from(asset: &'a AssetParams) -> Self {
        let addr = |a: &'a Option<Address>| a.as_ref().map(|a| Bytes::new(a.as_bytes()));
        Self {
            asset_name: &asset.asset_name,
            url: asset.url.as_deref().unwrap_or(""),
            clawback: addr(&asset.clawback),
            decimals: u64::from(asset.decimals),
            default_frozen: asset.default_frozen,
            freeze: addr(&asset.freeze),
            manager: addr(&asset.manager),
            reserve: addr(&asset.reserve),
            total: asset.total,
            unit_name: &asset.unit_name,
        }
    }
}

#[derive(Serialize)]
struct WireSignedTransaction<'a> {
    sig: &'a Bytes,
    txn: WireTransaction<'a>,
}

#[derive(Serialize)]
struct WireGroup<'a> {
    txlist: Vec<&'a Bytes>,
}
