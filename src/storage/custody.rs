// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custody store: identities, their accounts and signing keys.
//!
//! ## Security
//!
//! - Seeds are written once at account creation and only read back to sign
//! - Seeds and credentials are NEVER part of [`Account`]
//! - Handles are unique after NFKC normalisation and lower-casing

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use utoipa::ToSchema;

use super::database::{Database, StoreError, StoreResult, ACCOUNTS, ADDRESS_INDEX, SIGNING_KEYS};
use crate::ledger::{Address, Keypair};

/// Longest accepted handle, in characters.
const MAX_HANDLE_LEN: usize = 64;

/// Identity claim resolved at the request boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub handle: String,
    /// Whether the identity may submit transfers and create assets
    pub can_transact: bool,
}

/// A custodied account (never includes key material).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Account {
    pub handle: String,
    #[schema(value_type = String)]
    pub address: Address,
    pub can_transact: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn identity(&self) -> Identity {
        Identity {
            handle: self.handle.clone(),
            can_transact: self.can_transact,
        }
    }
}

/// Persistent identity → account → keypair mapping.
pub trait CustodyStore: Send + Sync {
    /// Look up an account by handle (normalised before lookup).
    fn find_by_handle(&self, handle: &str) -> StoreResult<Option<Account>>;

    /// Look up the custodied account controlling `address`.
    fn find_by_address(&self, address: &Address) -> StoreResult<Option<Account>>;

    /// Register a new identity with a fresh keypair.
    ///
    /// Fails with [`StoreError::HandleTaken`] when the handle exists.
    fn create(&self, handle: &str, credential: &str, can_transact: bool) -> StoreResult<Account>;

    /// Stored credential hash for `handle`.
    fn credential(&self, handle: &str) -> StoreResult<Option<String>>;

    /// Signing keypair of `handle`.
    fn keypair(&self, handle: &str) -> StoreResult<Option<Keypair>>;
}

/// Canonical form of a handle: NFKC, trimmed, lower-cased.
pub fn normalize_handle(raw: &str) -> StoreResult<String> {
    let handle: String = raw.trim().nfkc().collect::<String>().to_lowercase();

    if handle.is_empty() {
        return Err(StoreError::InvalidHandle("handle is empty".to_string()));
    }
    if handle.chars().count() > MAX_HANDLE_LEN {
        return Err(StoreError::InvalidHandle(format!(
            "handle is longer than {MAX_HANDLE_LEN} characters"
        )));
    }
    if handle.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(StoreError::InvalidHandle(
            "handle must not contain whitespace".to_string(),
        ));
    }
    Ok(handle)
}

/// On-disk account record.
#[derive(Serialize, Deserialize)]
struct StoredAccount {
    handle: String,
    address: Address,
    can_transact: bool,
    credential: String,
    created_at: DateTime<Utc>,
}

impl From<StoredAccount> for Account {
    fn from(stored: StoredAccount) -> Self {
        Self {
            handle: stored.handle,
            address: stored.address,
            can_transact: stored.can_transact,
            created_at: stored.created_at,
        }
    }
}

impl Database {
    fn stored_account(&self, handle: &str) -> StoreResult<Option<StoredAccount>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        match table.get(handle)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }
}

impl CustodyStore for Database {
    fn find_by_handle(&self, handle: &str) -> StoreResult<Option<Account>> {
        let handle = normalize_handle(handle)?;
        Ok(self.stored_account(&handle)?.map(Into::into))
    }

    fn find_by_address(&self, address: &Address) -> StoreResult<Option<Account>> {
        let handle = {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(ADDRESS_INDEX)?;
            match table.get(address.to_string().as_str())? {
                Some(v) => v.value().to_string(),
                None => return Ok(None),
            }
        };
        Ok(self.stored_account(&handle)?.map(Into::into))
    }

    fn create(&self, handle: &str, credential: &str, can_transact: bool) -> StoreResult<Account> {
        let handle = normalize_handle(handle)?;
        let keypair = Keypair::generate();
        let stored = StoredAccount {
            handle: handle.clone(),
            address: keypair.address(),
            can_transact,
            credential: credential.to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_vec(&stored)?;
        let address = stored.address.to_string();

        let write_txn = self.db.begin_write()?;
        {
            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            if accounts.get(handle.as_str())?.is_some() {
                return Err(StoreError::HandleTaken(handle));
            }
            accounts.insert(handle.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(ADDRESS_INDEX)?;
            index.insert(address.as_str(), handle.as_str())?;

            let mut keys = write_txn.open_table(SIGNING_KEYS)?;
            keys.insert(handle.as_str(), keypair.seed().as_slice())?;
        }
        write_txn.commit()?;

        tracing::info!(handle = %handle, address = %address, "Custody account created");
        Ok(stored.into())
    }

    fn credential(&self, handle: &str) -> StoreResult<Option<String>> {
        let handle = normalize_handle(handle)?;
        Ok(self.stored_account(&handle)?.map(|a| a.credential))
    }

    fn keypair(&self, handle: &str) -> StoreResult<Option<Keypair>> {
        let handle = normalize_handle(handle)?;
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SIGNING_KEYS)?;
        let Some(seed) = table.get(handle.as_str())? else {
            return Ok(None);
        };
        Keypair::from_seed(seed.value())
            .map(Some)
            .map_err(|e| StoreError::Corrupt(format!("signing key for {handle}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::temp_db;

    #[test]
    fn create_and_find() {
        let (db, _dir) = temp_db();
        let account = db.create("Alice", "hash", true).unwrap();
        assert_eq!(account.handle, "alice");
        assert!(account.can_transact);

        let by_handle = db.find_by_handle("ALICE").unwrap().unwrap();
        assert_eq!(by_handle, account);

        let by_address = db.find_by_address(&account.address).unwrap().unwrap();
        assert_eq!(by_address.handle, "alice");

        assert!(db.find_by_handle("bob").unwrap().is_none());
        assert!(db.find_by_address(&Address::zero()).unwrap().is_none());
    }

    #[test]
    fn duplicate_handle_is_rejected() {
        let (db, _dir) = temp_db();
        db.create("alice", "h1", true).unwrap();
        let err = db.create(" ALICE ", "h2", false).unwrap_err();
        assert!(matches!(err, StoreError::HandleTaken(h) if h == "alice"));
        assert_eq!(db.credential("alice").unwrap().as_deref(), Some("h1"));
    }

    #[test]
    fn keypair_matches_account_address() {
        let (db, _dir) = temp_db();
        let account = db.create("carol", "h", false).unwrap();
        let keypair = db.keypair("carol").unwrap().unwrap();
        assert_eq!(keypair.address(), account.address);
        assert!(db.keypair("nobody").unwrap().is_none());
    }

    #[test]
    fn handle_normalisation() {
        // Fullwidth letters fold to ASCII under NFKC.
        assert_eq!(normalize_handle("ＡＬＩＣＥ").unwrap(), "alice");
        assert_eq!(normalize_handle("  Bob ").unwrap(), "bob");
        assert!(normalize_handle("   ").is_err());
        assert!(normalize_handle("a b").is_err());
        assert!(normalize_handle(&"x".repeat(65)).is_err());
    }

    #[test]
    fn identity_from_account() {
        let (db, _dir) = temp_db();
        let account = db.create("dave", "h", true).unwrap();
        assert_eq!(
            account.identity(),
            Identity {
                handle: "dave".to_string(),
                can_transact: true
            }
        );
    }
}
