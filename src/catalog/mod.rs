// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Asset catalog
//!
//! Read path behind every asset page. Holdings come from the indexer and
//! are joined with asset descriptors (local cache first, ledger on a miss),
//! split into fungible and non-fungible buckets, and non-fungible entries
//! are enriched with off-chain metadata.
//!
//! ## Failure isolation
//!
//! - A holding of an asset the ledger does not know is omitted with a warning
//! - Any other descriptor lookup failure fails the whole listing, so a node
//!   outage is never reported as an empty account
//! - A failed metadata fetch leaves that entry's `metadata` empty; the entry
//!   itself is still listed
//!
//! Output keeps discovery order (indexer page order); nothing is sorted.

pub mod gateway;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::{stream, StreamExt, TryStreamExt};
use serde::Serialize;
use utoipa::ToSchema;

use crate::indexer::{self, Indexer, IndexerError};
use crate::ledger::{
    format_micro_units, to_display_units, Address, AssetDescriptor, AssetHolding, Ledger,
    LedgerError,
};
use crate::storage::{Account, DescriptorCache, MetadataCache};

pub use gateway::{GatewayError, HttpGateway, MetadataSource, OffChainMetadata};

/// Default number of metadata fetches in flight.
pub const DEFAULT_METADATA_CONCURRENCY: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Indexer error: {0}")]
    Indexer(#[from] IndexerError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

// =============================================================================
// Output types
// =============================================================================

/// An asset together with the account's position in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct HeldAsset {
    #[serde(flatten)]
    pub descriptor: AssetDescriptor,
    /// Balance in raw units
    pub amount: u64,
    /// Balance in display units
    pub balance: String,
    /// Whether the account created this asset
    pub is_created: bool,
}

impl HeldAsset {
    fn new(descriptor: AssetDescriptor, amount: u64, owner: &Address) -> Self {
        Self {
            balance: to_display_units(amount, descriptor.decimals),
            is_created: descriptor.creator == *owner,
            descriptor,
            amount,
        }
    }
}

/// A non-fungible holding with its off-chain metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct NonFungibleAsset {
    #[serde(flatten)]
    pub asset: HeldAsset,
    /// Whether the asset can be held in fractions
    pub is_fractional: bool,
    /// Absent when the metadata could not be fetched
    pub metadata: Option<OffChainMetadata>,
}

/// Holdings of an account, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct AssetListing {
    pub fungible: Vec<HeldAsset>,
    pub non_fungible: Vec<NonFungibleAsset>,
}

/// Overview of a custodied account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AccountSummary {
    pub handle: String,
    #[schema(value_type = String)]
    pub address: Address,
    pub can_transact: bool,
    /// Native balance in display units
    pub balance: String,
    /// Native balance in micro-units
    pub balance_micro: u64,
    pub holdings: Vec<HeldAsset>,
}

// =============================================================================
// Descriptor resolution
// =============================================================================

/// Resolve an asset descriptor: local cache first, then the ledger.
///
/// A ledger hit is written back to the cache. `Ok(None)` means the ledger
/// does not know the asset. Cache failures are logged and bypassed.
pub async fn resolve_descriptor(
    ledger: &dyn Ledger,
    cache: &dyn DescriptorCache,
    asset_id: u64,
) -> Result<Option<AssetDescriptor>, LedgerError> {
    match cache.get_descriptor(asset_id) {
        Ok(Some(descriptor)) => return Ok(Some(descriptor)),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, asset_id, "Descriptor cache read failed"),
    }

    let descriptor = match ledger.asset_info(asset_id).await {
        Ok(descriptor) => descriptor,
        Err(LedgerError::NotFound(_)) => return Ok(None),
        Err(e) => return Err(e),
    };

    if let Err(e) = cache.put_descriptor(&descriptor) {
        tracing::warn!(error = %e, asset_id, "Descriptor cache write failed");
    }
    Ok(Some(descriptor))
}

// =============================================================================
// AssetCatalog
// =============================================================================

/// Aggregates holdings, descriptors and metadata for display.
#[derive(Clone)]
pub struct AssetCatalog {
    ledger: Arc<dyn Ledger>,
    indexer: Arc<dyn Indexer>,
    descriptors: Arc<dyn DescriptorCache>,
    metadata: Arc<dyn MetadataSource>,
    memo: Arc<MetadataCache>,
    concurrency: usize,
}

impl AssetCatalog {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        indexer: Arc<dyn Indexer>,
        descriptors: Arc<dyn DescriptorCache>,
        metadata: Arc<dyn MetadataSource>,
    ) -> Self {
        Self {
            ledger,
            indexer,
            descriptors,
            metadata,
            memo: Arc::new(MetadataCache::default()),
            concurrency: DEFAULT_METADATA_CONCURRENCY,
        }
    }

    /// Bound the number of concurrent metadata fetches.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// All holdings of `address`, classified and enriched.
    pub async fn list_account_assets(&self, address: &Address) -> Result<AssetListing, CatalogError> {
        let holdings: Vec<AssetHolding> = indexer::list_holdings(self.indexer.as_ref(), *address)
            .try_collect()
            .await?;

        let held = self.join_descriptors(holdings, address).await?;

        let mut listing = AssetListing::default();
        let mut non_fungible = Vec::new();
        for asset in held {
            if asset.descriptor.is_non_fungible() {
                non_fungible.push(asset);
            } else {
                listing.fungible.push(asset);
            }
        }
        listing.non_fungible = self.attach_metadata(non_fungible).await;

        tracing::debug!(
            address = %address,
            fungible = listing.fungible.len(),
            non_fungible = listing.non_fungible.len(),
            "Listed account assets"
        );
        Ok(listing)
    }

    /// Every asset `address` created, with the account's own balance of it.
    pub async fn list_created_assets(&self, address: &Address) -> Result<Vec<HeldAsset>, CatalogError> {
        let created: Vec<AssetDescriptor> =
            indexer::list_created_assets(self.indexer.as_ref(), *address)
                .try_collect()
                .await?;
        let holdings: HashMap<u64, u64> = indexer::list_holdings(self.indexer.as_ref(), *address)
            .map_ok(|h| (h.asset_id, h.amount))
            .try_collect()
            .await?;

        Ok(created
            .into_iter()
            .map(|descriptor| {
                if let Err(e) = self.descriptors.put_descriptor(&descriptor) {
                    tracing::warn!(error = %e, asset_id = descriptor.asset_id, "Descriptor cache write failed");
                }
                let amount = holdings.get(&descriptor.asset_id).copied().unwrap_or(0);
                HeldAsset::new(descriptor, amount, address)
            })
            .collect())
    }

    /// Native balance and holdings of a custodied account.
    ///
    /// Degrades to a zero balance with no holdings when the ledger cannot
    /// be queried.
    pub async fn account_summary(&self, account: &Account) -> AccountSummary {
        let summary = match self.ledger.account_info(&account.address).await {
            Ok(info) => self
                .join_descriptors(info.holdings, &account.address)
                .await
                .map(|held| (info.balance, held)),
            Err(e) => Err(e),
        };
        let (balance, holdings) = match summary {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(error = %e, address = %account.address, "Account lookup failed, reporting empty account");
                (0, Vec::new())
            }
        };

        AccountSummary {
            handle: account.handle.clone(),
            address: account.address,
            can_transact: account.can_transact,
            balance: format_micro_units(balance),
            balance_micro: balance,
            holdings,
        }
    }

    /// Resolve descriptors for distinct asset ids, keeping discovery order.
    ///
    /// Assets unknown to the ledger are skipped; any other lookup failure is
    /// returned.
    async fn join_descriptors(
        &self,
        holdings: Vec<AssetHolding>,
        owner: &Address,
    ) -> Result<Vec<HeldAsset>, LedgerError> {
        let mut seen = HashSet::new();
        let distinct: Vec<AssetHolding> = holdings
            .into_iter()
            .filter(|h| seen.insert(h.asset_id))
            .collect();

        let resolved: Vec<Option<HeldAsset>> = stream::iter(distinct)
            .map(|holding| async move {
                let resolved = resolve_descriptor(
                    self.ledger.as_ref(),
                    self.descriptors.as_ref(),
                    holding.asset_id,
                )
                .await;
                match resolved {
                    Ok(Some(descriptor)) => Ok(Some(HeldAsset::new(descriptor, holding.amount, owner))),
                    Ok(None) => {
                        tracing::warn!(asset_id = holding.asset_id, "Asset not found on ledger, skipping");
                        Ok(None)
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, asset_id = holding.asset_id, "Descriptor lookup failed");
                        Err(e)
                    }
                }
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(resolved.into_iter().flatten().collect())
    }

    /// Fetch metadata for each non-fungible entry, best-effort and in order.
    async fn attach_metadata(&self, assets: Vec<HeldAsset>) -> Vec<NonFungibleAsset> {
        stream::iter(assets)
            .map(|asset| async move {
                let metadata = self.metadata_for(&asset.descriptor).await;
                NonFungibleAsset {
                    is_fractional: asset.descriptor.decimals > 0,
                    asset,
                    metadata,
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn metadata_for(&self, descriptor: &AssetDescriptor) -> Option<OffChainMetadata> {
        let url = descriptor.url.as_deref()?;
        if let Some(cached) = self.memo.get(descriptor.asset_id) {
            return Some(cached);
        }

        match self.metadata.fetch(url).await {
            Ok(metadata) => {
                self.memo.put(descriptor.asset_id, metadata.clone());
                Some(metadata)
            }
            Err(e) => {
                tracing::warn!(error = %e, asset_id = descriptor.asset_id, url, "Metadata fetch failed");
                None
            }
        }
    }
}
