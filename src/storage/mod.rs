// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state lives in a single embedded redb database under
//! `DATA_DIR`:
//!
//! ```text
//! {DATA_DIR}/
//!   service.redb
//!     accounts            # handle -> account record (with credential hash)
//!     address_index       # address -> handle
//!     signing_keys        # handle -> Ed25519 seed (NEVER exposed via API)
//!     asset_descriptors   # asset id -> AssetDescriptor
//! ```
//!
//! Off-chain metadata is memoised in memory only ([`MetadataCache`]).

pub mod custody;
pub mod database;
pub mod descriptors;
pub mod metadata_cache;

pub use custody::{normalize_handle, Account, CustodyStore, Identity};
pub use database::{Database, StoreError, StoreResult};
pub use descriptors::DescriptorCache;
pub use metadata_cache::MetadataCache;

/// File name of the database inside the data directory.
pub const DATABASE_FILE: &str = "service.redb";
