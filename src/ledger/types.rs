// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger types and network presets.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::address::Address;

/// Ledger network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// algod REST endpoint
    pub algod_url: &'static str,
    /// Indexer REST endpoint
    pub indexer_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
}

/// Public test network served by the free Nodely endpoints.
pub const TESTNET: NetworkConfig = NetworkConfig {
    name: "testnet",
    algod_url: "https://testnet-api.algonode.cloud",
    indexer_url: "https://testnet-idx.algonode.cloud",
    explorer_url: "https://testnet.explorer.perawallet.app",
};

/// Main network.
pub const MAINNET: NetworkConfig = NetworkConfig {
    name: "mainnet",
    algod_url: "https://mainnet-api.algonode.cloud",
    indexer_url: "https://mainnet-idx.algonode.cloud",
    explorer_url: "https://explorer.perawallet.app",
};

/// Look up a network preset by name (`testnet` when unset).
pub fn network_by_name(raw: Option<&str>) -> Result<NetworkConfig, String> {
    match raw.unwrap_or("testnet").trim().to_ascii_lowercase().as_str() {
        "testnet" => Ok(TESTNET),
        "mainnet" => Ok(MAINNET),
        other => Err(format!("Unknown network `{other}`")),
    }
}

/// Suggested parameters for building transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkParams {
    /// Fee per byte suggested by the node (usually 0 outside congestion)
    pub fee_per_byte: u64,
    /// Minimum (standard flat) fee in micro-units
    pub min_fee: u64,
    /// Latest round seen by the node
    pub last_round: u64,
    /// Genesis id, e.g. `testnet-v1.0`
    pub genesis_id: String,
    /// Genesis hash
    pub genesis_hash: [u8; 32],
}

/// A single asset balance row of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AssetHolding {
    /// Asset id
    pub asset_id: u64,
    /// Balance in raw units
    pub amount: u64,
    /// Whether the holding is frozen
    #[serde(default)]
    pub is_frozen: bool,
}

/// Account state as reported by the ledger node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub address: Address,
    /// Native balance in micro-units
    pub balance: u64,
    /// Asset holdings, including zero-amount opt-ins
    pub holdings: Vec<AssetHolding>,
}

impl AccountInfo {
    /// The account's holding of `asset_id`, if it has opted in.
    pub fn holding(&self, asset_id: u64) -> Option<&AssetHolding> {
        self.holdings.iter().find(|h| h.asset_id == asset_id)
    }
}

/// Immutable asset parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AssetDescriptor {
    /// Asset id
    pub asset_id: u64,
    /// Creator account
    #[schema(value_type = String)]
    pub creator: Address,
    /// Display name
    pub name: String,
    /// Unit name
    pub unit_name: String,
    /// Total supply in raw units
    pub total: u64,
    /// Decimal places (0..=19)
    pub decimals: u8,
    /// Whether new holdings start frozen
    pub default_frozen: bool,
    /// Off-chain metadata URL (present for non-fungible assets)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl AssetDescriptor {
    /// Assets with a metadata URL are treated as non-fungible.
    pub fn is_non_fungible(&self) -> bool {
        self.url.is_some()
    }
}

/// Outcome of waiting for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Round in which the transaction was committed
    pub confirmed_round: u64,
    /// Id of the asset created by the transaction, if any
    pub asset_index: Option<u64>,
}

/// Pending-pool view of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingTransaction {
    pub confirmed_round: Option<u64>,
    pub pool_error: Option<String>,
    pub asset_index: Option<u64>,
}
