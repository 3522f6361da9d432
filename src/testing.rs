// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory doubles for the ledger, indexer, gateway and blob store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::catalog::{GatewayError, MetadataSource, OffChainMetadata};
use crate::indexer::{Indexer, IndexerError, Page};
use crate::ledger::{
    AccountInfo, Address, AssetDescriptor, AssetHolding, Ledger, LedgerError, NetworkParams,
    PendingTransaction, SignedTransaction, TransactionKind,
};
use crate::minting::{BlobStore, BlobStoreError};

pub const MIN_FEE: u64 = 1000;

pub fn params() -> NetworkParams {
    NetworkParams {
        fee_per_byte: 0,
        min_fee: MIN_FEE,
        last_round: 100,
        genesis_id: "testnet-v1.0".to_string(),
        genesis_hash: [7u8; 32],
    }
}

pub fn descriptor(asset_id: u64, decimals: u8, url: Option<&str>, creator: Address) -> AssetDescriptor {
    AssetDescriptor {
        asset_id,
        creator,
        name: format!("Asset {asset_id}"),
        unit_name: format!("A{asset_id}"),
        total: 1_000_000,
        decimals,
        default_frozen: false,
        url: url.map(str::to_string),
    }
}

pub fn holding(asset_id: u64, amount: u64) -> AssetHolding {
    AssetHolding {
        asset_id,
        amount,
        is_frozen: false,
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// Ledger double that applies accepted transfers to its account table.
#[derive(Default)]
pub struct MockLedger {
    pub accounts: Mutex<HashMap<Address, AccountInfo>>,
    pub assets: Mutex<HashMap<u64, AssetDescriptor>>,
    pub reject_with: Mutex<Option<String>>,
    pub submitted: Mutex<Vec<Vec<SignedTransaction>>>,
    pub created_assets: Mutex<HashMap<String, u64>>,
    pub calls: AtomicUsize,
    pub asset_info_calls: AtomicUsize,
    /// `asset_info` answers 503 for every asset.
    pub assets_unavailable: bool,
    /// Accepted transactions never leave the pool.
    pub stalled: bool,
    next_asset_id: AtomicU64,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            next_asset_id: AtomicU64::new(5000),
            ..Default::default()
        }
    }

    pub fn with_asset(self, descriptor: AssetDescriptor) -> Self {
        self.assets
            .lock()
            .unwrap()
            .insert(descriptor.asset_id, descriptor);
        self
    }

    pub fn with_account(self, address: Address, balance: u64, holdings: Vec<AssetHolding>) -> Self {
        self.accounts.lock().unwrap().insert(
            address,
            AccountInfo {
                address,
                balance,
                holdings,
            },
        );
        self
    }

    pub fn with_assets_unavailable(mut self) -> Self {
        self.assets_unavailable = true;
        self
    }

    pub fn stalled(mut self) -> Self {
        self.stalled = true;
        self
    }

    pub fn reject(&self, message: &str) {
        *self.reject_with.lock().unwrap() = Some(message.to_string());
    }

    pub fn holding_of(&self, address: &Address, asset_id: u64) -> Option<AssetHolding> {
        self.accounts
            .lock()
            .unwrap()
            .get(address)
            .and_then(|a| a.holding(asset_id).cloned())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn apply(&self, group: &[SignedTransaction]) -> Result<(), LedgerError> {
        let mut accounts = self.accounts.lock().unwrap();
        for stxn in group {
            let txn = &stxn.transaction;
            match &txn.kind {
                TransactionKind::AssetTransfer {
                    asset_id,
                    receiver,
                    amount,
                } => {
                    let receiver_account = accounts.entry(*receiver).or_insert(AccountInfo {
                        address: *receiver,
                        balance: 0,
                        holdings: Vec::new(),
                    });
                    if receiver_account.holding(*asset_id).is_none() {
                        if txn.sender != *receiver {
                            return Err(LedgerError::Submission(format!(
                                "receiver {receiver} not opted in to asset {asset_id}"
                            )));
                        }
                        receiver_account.holdings.push(holding(*asset_id, 0));
                    }
                    if *amount > 0 {
                        let sender = accounts
                            .get_mut(&txn.sender)
                            .and_then(|a| a.holdings.iter_mut().find(|h| h.asset_id == *asset_id))
                            .ok_or_else(|| LedgerError::Submission("sender holds nothing".into()))?;
                        if sender.amount < *amount {
                            return Err(LedgerError::Submission("overspend".to_string()));
                        }
                        sender.amount -= amount;
                        let receiver = accounts
                            .get_mut(receiver)
                            .and_then(|a| a.holdings.iter_mut().find(|h| h.asset_id == *asset_id))
                            .ok_or_else(|| LedgerError::Submission("missing holding".into()))?;
                        receiver.amount += amount;
                    }
                }
                TransactionKind::Payment { receiver, amount } => {
                    accounts
                        .entry(*receiver)
                        .or_insert(AccountInfo {
                            address: *receiver,
                            balance: 0,
                            holdings: Vec::new(),
                        })
                        .balance += amount;
                }
                TransactionKind::AssetCreate(_) => {
                    let asset_id = self.next_asset_id.fetch_add(1, Ordering::SeqCst);
                    self.created_assets
                        .lock()
                        .unwrap()
                        .insert(stxn.id()?, asset_id);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn suggested_params(&self) -> Result<NetworkParams, LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(params())
    }

    async fn submit(&self, group: &[SignedTransaction]) -> Result<String, LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(group.to_vec());
        if let Some(message) = self.reject_with.lock().unwrap().clone() {
            return Err(LedgerError::Submission(message));
        }

        // All-or-nothing: apply to a scratch copy first.
        let snapshot = self.accounts.lock().unwrap().clone();
        if let Err(e) = self.apply(group) {
            *self.accounts.lock().unwrap() = snapshot;
            return Err(e);
        }
        Ok(group[0].id()?)
    }

    async fn last_round(&self) -> Result<u64, LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(100)
    }

    async fn wait_for_block_after(&self, round: u64) -> Result<u64, LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(round + 1)
    }

    async fn pending(&self, txid: &str) -> Result<PendingTransaction, LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.stalled {
            return Ok(PendingTransaction {
                confirmed_round: None,
                pool_error: None,
                asset_index: None,
            });
        }
        Ok(PendingTransaction {
            confirmed_round: Some(101),
            pool_error: None,
            asset_index: self.created_assets.lock().unwrap().get(txid).copied(),
        })
    }

    async fn account_info(&self, address: &Address) -> Result<AccountInfo, LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.accounts
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(address.to_string()))
    }

    async fn asset_info(&self, asset_id: u64) -> Result<AssetDescriptor, LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.asset_info_calls.fetch_add(1, Ordering::SeqCst);
        if self.assets_unavailable {
            return Err(LedgerError::Status {
                status: 503,
                body: "node is catching up".to_string(),
            });
        }
        self.assets
            .lock()
            .unwrap()
            .get(&asset_id)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(format!("asset {asset_id}")))
    }
}

// =============================================================================
// Indexer
// =============================================================================

/// Indexer double serving pre-split holding pages per address.
#[derive(Default)]
pub struct MockIndexer {
    pub holdings: Mutex<HashMap<Address, Vec<Vec<AssetHolding>>>>,
    pub created: Mutex<HashMap<Address, Vec<AssetDescriptor>>>,
    pub unavailable: bool,
    pub calls: AtomicUsize,
}

impl MockIndexer {
    pub fn with_pages(self, address: Address, pages: Vec<Vec<AssetHolding>>) -> Self {
        self.holdings.lock().unwrap().insert(address, pages);
        self
    }

    pub fn with_created(self, address: Address, assets: Vec<AssetDescriptor>) -> Self {
        self.created.lock().unwrap().insert(address, assets);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), IndexerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(IndexerError::Request("indexer unavailable".to_string()));
        }
        Ok(())
    }
}

fn page_at<T: Clone>(pages: &[Vec<T>], next: Option<&str>) -> Page<T> {
    let index: usize = next
        .and_then(|t| t.strip_prefix('p'))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0);
    let items = pages.get(index).cloned().unwrap_or_default();
    let next = (index + 1 < pages.len()).then(|| format!("p{}", index + 1));
    Page { items, next }
}

#[async_trait]
impl Indexer for MockIndexer {
    async fn holdings_page(
        &self,
        address: &Address,
        next: Option<&str>,
    ) -> Result<Page<AssetHolding>, IndexerError> {
        self.check()?;
        let holdings = self.holdings.lock().unwrap();
        Ok(holdings
            .get(address)
            .map(|pages| page_at(pages, next))
            .unwrap_or_else(|| Page::last(Vec::new())))
    }

    async fn created_assets_page(
        &self,
        address: &Address,
        next: Option<&str>,
    ) -> Result<Page<AssetDescriptor>, IndexerError> {
        self.check()?;
        let created = self.created.lock().unwrap();
        // Two assets per page to exercise pagination.
        let pages: Vec<Vec<AssetDescriptor>> = created
            .get(address)
            .map(|all| all.chunks(2).map(<[_]>::to_vec).collect())
            .unwrap_or_default();
        Ok(page_at(&pages, next))
    }

    async fn holding_for_asset(
        &self,
        address: &Address,
        asset_id: u64,
    ) -> Result<Option<AssetHolding>, IndexerError> {
        self.check()?;
        let holdings = self.holdings.lock().unwrap();
        Ok(holdings.get(address).and_then(|pages| {
            pages
                .iter()
                .flatten()
                .find(|h| h.asset_id == asset_id)
                .cloned()
        }))
    }
}

// =============================================================================
// Gateway and blob store
// =============================================================================

/// Metadata source failing for any URL containing `broken`.
///
/// Each fetch takes a few milliseconds so overlapping requests are visible
/// in `peak_in_flight`.
#[derive(Default)]
pub struct MockGateway {
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

#[async_trait]
impl MetadataSource for MockGateway {
    async fn fetch(&self, metadata_url: &str) -> Result<OffChainMetadata, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if metadata_url.contains("broken") {
            return Err(GatewayError::Status {
                status: 504,
                url: metadata_url.to_string(),
            });
        }
        Ok(OffChainMetadata {
            name: Some(format!("meta:{metadata_url}")),
            ..Default::default()
        })
    }
}

/// Blob store handing out sequential content ids.
#[derive(Default)]
pub struct MockBlobStore {
    pub uploads: Mutex<Vec<(String, String, Vec<u8>)>>,
    pub fail: bool,
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn upload(
        &self,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BlobStoreError> {
        if self.fail {
            return Err(BlobStoreError::Request("pinning service down".to_string()));
        }
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((name.to_string(), content_type.to_string(), bytes));
        Ok(format!("bafycid{}", uploads.len()))
    }
}
