// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU memo of off-chain metadata per asset id.
//!
//! Metadata is immutable once published, so entries never expire; the LRU
//! bound only limits memory.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::catalog::OffChainMetadata;

/// Default number of assets whose metadata is kept in memory.
pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process metadata cache.
pub struct MetadataCache {
    cache: Mutex<LruCache<u64, OffChainMetadata>>,
}

impl MetadataCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        }
    }

    pub fn get(&self, asset_id: u64) -> Option<OffChainMetadata> {
        let mut cache = self.cache.lock().ok()?;
        cache.get(&asset_id).cloned()
    }

    pub fn put(&self, asset_id: u64, metadata: OffChainMetadata) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(asset_id, metadata);
        }
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
