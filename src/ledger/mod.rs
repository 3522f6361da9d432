// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Ledger integration
//!
//! Everything needed to talk to an Algorand-compatible ledger:
//!
//! - [`address`] – account addresses and their checksummed text form
//! - [`amount`] – exact display/raw unit conversion
//! - [`keys`] – custody keypairs
//! - [`transaction`] – canonical encoding, grouping and signing
//! - [`client`] – the [`Ledger`] trait and its algod implementation

pub mod address;
pub mod amount;
pub mod client;
pub mod keys;
pub mod transaction;
pub mod types;

pub use address::{Address, AddressError};
pub use amount::{format_micro_units, to_display_units, to_raw_units, AmountError};
pub use client::{wait_for_confirmation, AlgodClient, Ledger, LedgerError};
pub use keys::{KeyError, Keypair};
pub use transaction::{
    assign_group_id, AssetParams, SignedTransaction, Transaction, TransactionError,
    TransactionKind,
};
pub use types::*;

/// Rounds to wait for a single transfer to confirm.
pub const DIRECT_CONFIRMATION_ROUNDS: u64 = 3;

/// Rounds to wait for an atomic group to confirm.
pub const GROUP_CONFIRMATION_ROUNDS: u64 = 4;

/// Link to a transaction in the block explorer.
pub fn explorer_link(explorer_url: &str, txid: &str) -> String {
    format!("{}/tx/{}", explorer_url.trim_end_matches('/'), txid)
}
