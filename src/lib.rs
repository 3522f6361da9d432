// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Assets - Custodial Asset Service
//!
//! Custodies signing keys for registered identities and, on their behalf,
//! creates fungible tokens, mints ARC-3 NFTs and transfers assets on an
//! Algorand-compatible ledger.
//!
//! ## Modules
//!
//! - `ledger` - addresses, amounts, transactions and the algod client
//! - `indexer` - paginated holding and created-asset queries
//! - `catalog` - classified holdings with off-chain metadata
//! - `transfer` - opt-in aware transfers (direct or atomic group)
//! - `minting` - token creation and NFT minting
//! - `storage` - embedded custody database and caches
//! - `auth` - sessions and credential hashing
//! - `api` - HTTP API handlers (Axum)

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod indexer;
pub mod ledger;
pub mod minting;
pub mod models;
pub mod state;
pub mod storage;
pub mod tls;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testing;
