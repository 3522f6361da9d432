// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local cache of asset descriptors, keyed by asset id.
//!
//! Asset parameters never change after creation, so the cache is
//! append-only. Concurrent misses for the same id may both fetch and both
//! insert; the second insert is a no-op.

use redb::{ReadableDatabase, ReadableTable};

use super::database::{Database, StoreResult, ASSET_DESCRIPTORS};
use crate::ledger::AssetDescriptor;

/// Idempotent descriptor store.
pub trait DescriptorCache: Send + Sync {
    fn get_descriptor(&self, asset_id: u64) -> StoreResult<Option<AssetDescriptor>>;

    /// Insert `descriptor` unless its id is already cached.
    fn put_descriptor(&self, descriptor: &AssetDescriptor) -> StoreResult<()>;
}

impl DescriptorCache for Database {
    fn get_descriptor(&self, asset_id: u64) -> StoreResult<Option<AssetDescriptor>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ASSET_DESCRIPTORS)?;
        match table.get(asset_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn put_descriptor(&self, descriptor: &AssetDescriptor) -> StoreResult<()> {
        let json = serde_json::to_vec(descriptor)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ASSET_DESCRIPTORS)?;
            if table.get(descriptor.asset_id)?.is_none() {
                table.insert(descriptor.asset_id, json.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}
