// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger node client.
//!
//! [`Ledger`] is the seam the rest of the service talks to. [`AlgodClient`]
//! implements it against the algod v2 REST API; tests substitute in-memory
//! doubles.

use std::time::Duration;

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use serde::Deserialize;

use super::address::Address;
use super::transaction::{encode_group, SignedTransaction, TransactionError};
use super::types::*;

/// Errors that can occur while talking to the ledger node.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid node URL: {0}")]
    InvalidUrl(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Node returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transaction rejected: {0}")]
    Submission(String),

    #[error("Transaction {txid} was dropped from the pool: {reason}")]
    PoolError { txid: String, reason: String },

    #[error("Transaction {txid} not confirmed after {rounds} rounds")]
    Timeout { txid: String, rounds: u64 },

    #[error("Encoding error: {0}")]
    Encoding(#[from] TransactionError),
}

/// Operations the service needs from a ledger node.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Fee and validity parameters for new transactions.
    async fn suggested_params(&self) -> Result<NetworkParams, LedgerError>;

    /// Submit a signed transaction or atomic group. Returns the id of the
    /// first member as reported by the node.
    async fn submit(&self, group: &[SignedTransaction]) -> Result<String, LedgerError>;

    /// Last committed round.
    async fn last_round(&self) -> Result<u64, LedgerError>;

    /// Block until a round after `round` is committed and return the new
    /// last round.
    async fn wait_for_block_after(&self, round: u64) -> Result<u64, LedgerError>;

    /// Pending-pool state of a transaction.
    async fn pending(&self, txid: &str) -> Result<PendingTransaction, LedgerError>;

    /// Balance and asset holdings of an account.
    async fn account_info(&self, address: &Address) -> Result<AccountInfo, LedgerError>;

    /// Parameters of an asset.
    async fn asset_info(&self, asset_id: u64) -> Result<AssetDescriptor, LedgerError>;
}

/// Wait until `txid` is committed, giving up after `max_rounds` rounds.
///
/// Returns [`LedgerError::PoolError`] as soon as the node reports that the
/// transaction was evicted, and [`LedgerError::Timeout`] when the window
/// elapses without a confirmation.
pub async fn wait_for_confirmation(
    ledger: &dyn Ledger,
    txid: &str,
    max_rounds: u64,
) -> Result<Confirmation, LedgerError> {
    let start = ledger.last_round().await? + 1;
    let mut current = start;

    while current < start + max_rounds {
        let pending = ledger.pending(txid).await?;

        if let Some(round) = pending.confirmed_round.filter(|r| *r > 0) {
            return Ok(Confirmation {
                confirmed_round: round,
                asset_index: pending.asset_index,
            });
        }
        if let Some(reason) = pending.pool_error.filter(|e| !e.is_empty()) {
            return Err(LedgerError::PoolError {
                txid: txid.to_string(),
                reason,
            });
        }

        ledger.wait_for_block_after(current).await?;
        current += 1;
    }

    Err(LedgerError::Timeout {
        txid: txid.to_string(),
        rounds: max_rounds,
    })
}

// =============================================================================
// algod REST client
// =============================================================================

const TOKEN_HEADER: &str = "X-Algo-API-Token";

/// [`Ledger`] backed by an algod node.
#[derive(Clone)]
pub struct AlgodClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl AlgodClient {
    /// Create a client for the node at `base_url`.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, LedgerError> {
        let parsed = url::Url::parse(base_url).map_err(|e| LedgerError::InvalidUrl(e.to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LedgerError::Request(e.to_string()))?;

        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            http,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.header(TOKEN_HEADER, token),
            None => builder,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, LedgerError> {
        let response = self
            .request(reqwest::Method::GET, path)
            .send()
            .await
            .map_err(|e| LedgerError::Request(format!("GET {path} failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LedgerError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(format!("GET {path}: {e}")))
    }
}

#[async_trait]
impl Ledger for AlgodClient {
    async fn suggested_params(&self) -> Result<NetworkParams, LedgerError> {
        let wire: WireParams = self.get_json("/v2/transactions/params").await?;
        wire.try_into()
    }

    async fn submit(&self, group: &[SignedTransaction]) -> Result<String, LedgerError> {
        let payload = encode_group(group)?;

        let response = self
            .request(reqwest::Method::POST, "/v2/transactions")
            .header(reqwest::header::CONTENT_TYPE, "application/x-binary")
            .body(payload)
            .send()
            .await
            .map_err(|e| LedgerError::Request(format!("submit failed: {e}")))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::Submission(rejection_message(&body)));
        }

        let accepted: WireSubmitResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(format!("submit: {e}")))?;
        Ok(accepted.tx_id)
    }

    async fn last_round(&self) -> Result<u64, LedgerError> {
        let status: WireStatus = self.get_json("/v2/status").await?;
        Ok(status.last_round)
    }

    async fn wait_for_block_after(&self, round: u64) -> Result<u64, LedgerError> {
        let status: WireStatus = self
            .get_json(&format!("/v2/status/wait-for-block-after/{round}"))
            .await?;
        Ok(status.last_round)
    }

    async fn pending(&self, txid: &str) -> Result<PendingTransaction, LedgerError> {
        let wire: WirePending = self
            .get_json(&format!("/v2/transactions/pending/{txid}"))
            .await?;
        Ok(PendingTransaction {
            confirmed_round: wire.confirmed_round,
            pool_error: wire.pool_error,
            asset_index: wire.asset_index,
        })
    }

    async fn account_info(&self, address: &Address) -> Result<AccountInfo, LedgerError> {
        let wire: WireAccount = self.get_json(&format!("/v2/accounts/{address}")).await?;
        Ok(AccountInfo {
            address: *address,
            balance: wire.amount,
            holdings: wire.assets.into_iter().map(Into::into).collect(),
        })
    }

    async fn asset_info(&self, asset_id: u64) -> Result<AssetDescriptor, LedgerError> {
        let wire: WireAsset = self.get_json(&format!("/v2/assets/{asset_id}")).await?;
        wire.try_into()
    }
}

/// Pull the `message` field out of an algod error body, falling back to the
/// raw body.
fn rejection_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.to_string())
}

// =============================================================================
// Wire types (algod / indexer JSON)
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct WireParams {
    fee: u64,
    min_fee: u64,
    last_round: u64,
    genesis_id: String,
    genesis_hash: String,
}

impl TryFrom<WireParams> for NetworkParams {
    type Error = LedgerError;

    fn try_from(wire: WireParams) -> Result<Self, Self::Error> {
        let hash = Base64::decode_vec(&wire.genesis_hash)
            .map_err(|e| LedgerError::InvalidResponse(format!("genesis hash: {e}")))?;
        let genesis_hash: [u8; 32] = hash.try_into().map_err(|h: Vec<u8>| {
            LedgerError::InvalidResponse(format!("genesis hash has {} bytes", h.len()))
        })?;

        Ok(NetworkParams {
            fee_per_byte: wire.fee,
            min_fee: wire.min_fee,
            last_round: wire.last_round,
            genesis_id: wire.genesis_id,
            genesis_hash,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireSubmitResponse {
    #[serde(rename = "txId")]
    tx_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct WireStatus {
    last_round: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct WirePending {
    #[serde(default)]
    confirmed_round: Option<u64>,
    #[serde(default)]
    pool_error: Option<String>,
    #[serde(default)]
    asset_index: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireAccount {
    amount: u64,
    #[serde(default)]
    assets: Vec<WireHolding>,
}

/// Asset holding row, shared with the indexer client.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct WireHolding {
    pub asset_id: u64,
    pub amount: u64,
    #[serde(default)]
    pub is_frozen: bool,
}

impl From<WireHolding> for AssetHolding {
    fn from(wire: WireHolding) -> Self {
        AssetHolding {
            asset_id: wire.asset_id,
            amount: wire.amount,
            is_frozen: wire.is_frozen,
        }
    }
}

/// Asset record, shared with the indexer client.
#[derive(Debug, Deserialize)]
pub(crate) struct WireAsset {
    pub index: u64,
    pub params: WireAssetParams,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct WireAssetParams {
    pub creator: String,
    #[serde(default)]
    pub decimals: u8,
    #[serde(default)]
    pub default_frozen: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unit_name: Option<String>,
    pub total: u64,
    #[serde(default)]
    pub url: Option<String>,
}

impl TryFrom<WireAsset> for AssetDescriptor {
    type Error = LedgerError;

    fn try_from(wire: WireAsset) -> Result<Self, Self::Error> {
        let creator: Address = wire
            .params
            .creator
            .parse()
            .map_err(|e| LedgerError::InvalidResponse(format!("asset creator: {e}")))?;

        Ok(AssetDescriptor {
            asset_id: wire.index,
            creator,
            name: wire.params.name.unwrap_or_default(),
            unit_name: wire.params.unit_name.unwrap_or_default(),
            total: wire.params.total,
            decimals: wire.params.decimals,
            default_frozen: wire.params.default_frozen,
            url: wire.params.url.filter(|u| !u.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    #[test]
    fn parses_suggested_params() {
        let json = r#"{
            "consensus-version": "future",
            "fee": 0,
            "genesis-hash": "SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI=",
            "genesis-id": "testnet-v1.0",
            "last-round": 41234567,
            "min-fee": 1000
        }"#;
        let wire: WireParams = serde_json::from_str(json).unwrap();
        let params = NetworkParams::try_from(wire).unwrap();

        assert_eq!(params.min_fee, 1000);
        assert_eq!(params.fee_per_byte, 0);
        assert_eq!(params.last_round, 41234567);
        assert_eq!(params.genesis_id, "testnet-v1.0");
        assert_eq!(params.genesis_hash[0], 0x48);
    }

    #[test]
    fn rejects_short_genesis_hash() {
        let wire = WireParams {
            fee: 0,
            min_fee: 1000,
            last_round: 1,
            genesis_id: "x".to_string(),
            genesis_hash: "AAAA".to_string(),
        };
        assert!(matches!(
            NetworkParams::try_from(wire),
            Err(LedgerError::InvalidResponse(_))
        ));
    }

    #[test]
    fn parses_account_and_asset() {
        let creator = Address::new([5u8; 32]);
        let account = format!(
            r#"{{"address":"{creator}","amount":2500000,"assets":[{{"amount":10,"asset-id":77,"is-frozen":false}}]}}"#
        );
        let wire: WireAccount = serde_json::from_str(&account).unwrap();
        assert_eq!(wire.amount, 2_500_000);
        let holding: AssetHolding = wire.assets.into_iter().next().unwrap().into();
        assert_eq!(holding.asset_id, 77);

        let asset = format!(
            r#"{{"index":77,"params":{{"creator":"{creator}","decimals":2,"default-frozen":false,"name":"Coin","unit-name":"CN","total":100000,"url":""}}}}"#
        );
        let wire: WireAsset = serde_json::from_str(&asset).unwrap();
        let descriptor = AssetDescriptor::try_from(wire).unwrap();
        assert_eq!(descriptor.asset_id, 77);
        assert_eq!(descriptor.creator, creator);
        assert_eq!(descriptor.decimals, 2);
        assert_eq!(descriptor.url, None);
    }

    #[test]
    fn extracts_rejection_message() {
        assert_eq!(
            rejection_message(r#"{"message":"overspend"}"#),
            "overspend"
        );
        assert_eq!(rejection_message("plain"), "plain");
    }

    #[test]
    fn rejects_invalid_url() {
        assert!(matches!(
            AlgodClient::new("not a url", None),
            Err(LedgerError::InvalidUrl(_))
        ));
        assert!(AlgodClient::new("https://testnet-api.algonode.cloud/", None).is_ok());
    }

    /// Ledger double that confirms after a fixed number of polls.
    struct ScriptedLedger {
        round: AtomicU64,
        confirm_at_poll: Option<u64>,
        pool_error: Option<String>,
        polls: Mutex<u64>,
    }

    impl ScriptedLedger {
        fn new(confirm_at_poll: Option<u64>, pool_error: Option<&str>) -> Self {
            Self {
                round: AtomicU64::new(100),
                confirm_at_poll,
                pool_error: pool_error.map(str::to_string),
                polls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl Ledger for ScriptedLedger {
        async fn suggested_params(&self) -> Result<NetworkParams, LedgerError> {
            unimplemented!()
        }
        async fn submit(&self, _: &[SignedTransaction]) -> Result<String, LedgerError> {
            unimplemented!()
        }
        async fn last_round(&self) -> Result<u64, LedgerError> {
            Ok(self.round.load(Ordering::SeqCst))
        }
        async fn wait_for_block_after(&self, round: u64) -> Result<u64, LedgerError> {
            self.round.store(round + 1, Ordering::SeqCst);
            Ok(round + 1)
        }
        async fn pending(&self, _: &str) -> Result<PendingTransaction, LedgerError> {
            let mut polls = self.polls.lock().unwrap();
            *polls += 1;
            if self.confirm_at_poll == Some(*polls) {
                return Ok(PendingTransaction {
                    confirmed_round: Some(self.round.load(Ordering::SeqCst)),
                    pool_error: None,
                    asset_index: Some(5),
                });
            }
            Ok(PendingTransaction {
                confirmed_round: None,
                pool_error: self.pool_error.clone(),
                asset_index: None,
            })
        }
        async fn account_info(&self, _: &Address) -> Result<AccountInfo, LedgerError> {
            unimplemented!()
        }
        async fn asset_info(&self, _: u64) -> Result<AssetDescriptor, LedgerError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn confirmation_within_window() {
        let ledger = ScriptedLedger::new(Some(3), None);
        let confirmation = wait_for_confirmation(&ledger, "TXID", 3).await.unwrap();
        assert_eq!(confirmation.asset_index, Some(5));
        assert_eq!(*ledger.polls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn confirmation_times_out() {
        let ledger = ScriptedLedger::new(Some(5), None);
        let err = wait_for_confirmation(&ledger, "TXID", 3).await.unwrap_err();
        assert!(matches!(err, LedgerError::Timeout { rounds: 3, .. }));
        assert_eq!(*ledger.polls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn pool_error_stops_waiting() {
        let ledger = ScriptedLedger::new(None, Some("overspend"));
        let err = wait_for_confirmation(&ledger, "TXID", 4).await.unwrap_err();
        assert!(matches!(err, LedgerError::PoolError { ref reason, .. } if reason == "overspend"));
    }
}
