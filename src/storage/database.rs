// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded service database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `accounts`: normalised handle → serialized account record
//! - `address_index`: address text → handle
//! - `signing_keys`: handle → 32-byte Ed25519 seed
//! - `asset_descriptors`: asset id → serialized AssetDescriptor

use std::path::{Path, PathBuf};

use redb::{ReadableDatabase, TableDefinition};

// =============================================================================
// Table Definitions
// =============================================================================

pub(super) const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

pub(super) const ADDRESS_INDEX: TableDefinition<&str, &str> = TableDefinition::new("address_index");

pub(super) const SIGNING_KEYS: TableDefinition<&str, &[u8]> = TableDefinition::new("signing_keys");

pub(super) const ASSET_DESCRIPTORS: TableDefinition<u64, &[u8]> =
    TableDefinition::new("asset_descriptors");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("handle `{0}` is already taken")]
    HandleTaken(String),

    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("cannot create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Database
// =============================================================================

/// Embedded ACID database holding custody records and the descriptor cache.
pub struct Database {
    pub(super) db: redb::Database,
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let db = redb::Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(ADDRESS_INDEX)?;
            let _ = write_txn.open_table(SIGNING_KEYS)?;
            let _ = write_txn.open_table(ASSET_DESCRIPTORS)?;
        }
        write_txn.commit()?;

        tracing::debug!(path = %path.display(), "Database opened");
        Ok(Self { db })
    }

    /// Cheap liveness probe used by the readiness endpoint.
    pub fn ping(&self) -> StoreResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(ACCOUNTS)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn temp_db() -> (Database, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Database::open(&dir.path().join("service.redb")).expect("open db");
    (db, dir)
}
