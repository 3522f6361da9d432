// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::SessionVerifier;
use crate::catalog::{AssetCatalog, GatewayError, HttpGateway, MetadataSource};
use crate::config::AppConfig;
use crate::indexer::{Indexer, IndexerClient, IndexerError};
use crate::ledger::{AlgodClient, KeyError, Keypair, Ledger, LedgerError};
use crate::minting::{BlobStore, BlobStoreError, Minter, PinningClient};
use crate::storage::{CustodyStore, Database, StoreError, DATABASE_FILE};
use crate::transfer::{Funder, TransferOrchestrator};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Database: {0}")]
    Store(#[from] StoreError),

    #[error("Ledger client: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Indexer client: {0}")]
    Indexer(#[from] IndexerError),

    #[error("Content gateway: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Pinning client: {0}")]
    BlobStore(#[from] BlobStoreError),

    #[error("FUNDING_SEED: {0}")]
    FundingKey(#[from] KeyError),

    #[error("Data directory: {0}")]
    DataDir(#[from] std::io::Error),
}

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub database: Arc<Database>,
    pub custody: Arc<dyn CustodyStore>,
    pub ledger: Arc<dyn Ledger>,
    pub sessions: Arc<SessionVerifier>,
    pub catalog: AssetCatalog,
    pub transfers: TransferOrchestrator,
    pub minter: Minter,
    /// Signup funding, when a funding key is configured
    pub funder: Option<Funder>,
}

impl AppState {
    pub fn new(
        database: Arc<Database>,
        ledger: Arc<dyn Ledger>,
        indexer: Arc<dyn Indexer>,
        metadata: Arc<dyn MetadataSource>,
        sessions: SessionVerifier,
        explorer_url: &str,
    ) -> Self {
        let custody: Arc<dyn CustodyStore> = database.clone();
        let catalog = AssetCatalog::new(
            ledger.clone(),
            indexer.clone(),
            database.clone(),
            metadata,
        );
        let transfers = TransferOrchestrator::new(
            ledger.clone(),
            indexer,
            custody.clone(),
            database.clone(),
            explorer_url,
        );
        let minter = Minter::new(ledger.clone(), custody.clone(), explorer_url);

        Self {
            database,
            custody,
            ledger,
            sessions: Arc::new(sessions),
            catalog,
            transfers,
            minter,
            funder: None,
        }
    }

    pub fn with_blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.minter = self.minter.with_blob_store(blobs);
        self
    }

    pub fn with_funder(mut self, funder: Funder) -> Self {
        self.funder = Some(funder);
        self
    }

    /// Wire the production clients described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, StartupError> {
        std::fs::create_dir_all(&config.data_dir)?;
        let database = Arc::new(Database::open(&config.data_dir.join(DATABASE_FILE))?);

        let ledger: Arc<dyn Ledger> =
            Arc::new(AlgodClient::new(&config.algod_url, config.algod_token.clone())?);
        let indexer: Arc<dyn Indexer> =
            Arc::new(IndexerClient::new(&config.indexer_url, config.indexer_token.clone())?);
        let gateway: Arc<dyn MetadataSource> = Arc::new(HttpGateway::new(&config.ipfs_gateway)?);

        let mut state = Self::new(
            database,
            ledger.clone(),
            indexer,
            gateway,
            SessionVerifier::new(config.jwt_secret.as_bytes()),
            &config.explorer_url,
        );
        state.catalog = state.catalog.with_concurrency(config.metadata_concurrency);
        state.transfers = state.transfers.with_confirmation_rounds(
            config.direct_confirmation_rounds,
            config.group_confirmation_rounds,
        );
        state.minter = state
            .minter
            .with_confirmation_rounds(config.direct_confirmation_rounds);

        if let Some(url) = &config.pinning_url {
            let pinning = PinningClient::new(url, config.pinning_token.clone())?;
            state = state.with_blob_store(Arc::new(pinning));
        } else {
            tracing::warn!("PINNING_URL not set, NFT minting is disabled");
        }

        if let Some(seed) = &config.funding_seed {
            let funder = Funder::new(ledger, Keypair::from_hex_seed(seed)?);
            tracing::info!(funder = %funder.address(), "Signup funding enabled");
            state = state.with_funder(funder);
        }

        Ok(state)
    }
}

#[cfg(test)]
pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
    use crate::testing::{MockIndexer, MockLedger};

    test_state_with(Arc::new(MockLedger::new()), Arc::new(MockIndexer::default()))
}

#[cfg(test)]
pub(crate) fn test_state_with(
    ledger: Arc<crate::testing::MockLedger>,
    indexer: Arc<crate::testing::MockIndexer>,
) -> (AppState, tempfile::TempDir) {
    use crate::testing::{MockBlobStore, MockGateway};

    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let database = Database::open(&dir.path().join(DATABASE_FILE)).expect("Failed to open database");
    let state = AppState::new(
        Arc::new(database),
        ledger,
        indexer,
        Arc::new(MockGateway::default()),
        SessionVerifier::new(b"test-secret-test-secret-test-secret"),
        "https://explorer.test",
    )
    .with_blob_store(Arc::new(MockBlobStore::default()));
    (state, dir)
}
