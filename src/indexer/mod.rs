// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Indexer client
//!
//! Read-heavy listings go through the indexer, a paginated and eventually
//! consistent query service over ledger state.
//!
//! ## Pagination
//!
//! Every list endpoint returns at most one page plus an opaque `next-token`.
//! The listing is complete only once a page comes back without a token, so
//! [`paginate`] keeps following tokens until then. The resulting stream is
//! lazy, finite and not restartable: polling it again after exhaustion
//! yields nothing, and a new call re-issues the network queries.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, Stream, TryStreamExt};
use serde::Deserialize;

use crate::ledger::client::{WireAsset, WireHolding};
use crate::ledger::{Address, AssetDescriptor, AssetHolding};

/// Errors raised by indexer queries.
#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    #[error("Invalid indexer URL: {0}")]
    InvalidUrl(String),

    #[error("Indexer request failed: {0}")]
    Request(String),

    #[error("Indexer returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid indexer response: {0}")]
    InvalidResponse(String),
}

/// One page of results and the token for the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

impl<T> Page<T> {
    /// A page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Page-level indexer queries.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// One page of an account's asset holdings, zero-amount opt-ins included.
    async fn holdings_page(
        &self,
        address: &Address,
        next: Option<&str>,
    ) -> Result<Page<AssetHolding>, IndexerError>;

    /// One page of the assets an account created.
    async fn created_assets_page(
        &self,
        address: &Address,
        next: Option<&str>,
    ) -> Result<Page<AssetDescriptor>, IndexerError>;

    /// The account's holding row for `asset_id`. A returned row, whatever its
    /// amount, means the account has opted in.
    async fn holding_for_asset(
        &self,
        address: &Address,
        asset_id: u64,
    ) -> Result<Option<AssetHolding>, IndexerError>;
}

/// Turn a page fetcher into a lazy stream of items, following continuation
/// tokens until a page arrives without one. Item order follows page order.
pub fn paginate<'a, T, F, Fut>(fetch: F) -> impl Stream<Item = Result<T, IndexerError>> + 'a
where
    T: 'a,
    F: FnMut(Option<String>) -> Fut + 'a,
    Fut: Future<Output = Result<Page<T>, IndexerError>> + 'a,
{
    // `Some(token)` means another page is due; `None` means exhausted.
    let start: Option<Option<String>> = Some(None);

    stream::try_unfold((fetch, start), |(mut fetch, cursor)| async move {
        let Some(token) = cursor else {
            return Ok::<_, IndexerError>(None);
        };
        let page = fetch(token).await?;
        let cursor = page.next.filter(|t| !t.is_empty()).map(Some);
        Ok(Some((page.items, (fetch, cursor))))
    })
    .map_ok(|items| stream::iter(items.into_iter().map(Ok::<T, IndexerError>)))
    .try_flatten()
}

/// Every holding of `address`, across all pages.
pub fn list_holdings<'a>(
    indexer: &'a dyn Indexer,
    address: Address,
) -> impl Stream<Item = Result<AssetHolding, IndexerError>> + 'a {
    paginate(move |next: Option<String>| async move {
        indexer.holdings_page(&address, next.as_deref()).await
    })
}

/// Every asset created by `address`, across all pages.
pub fn list_created_assets<'a>(
    indexer: &'a dyn Indexer,
    address: Address,
) -> impl Stream<Item = Result<AssetDescriptor, IndexerError>> + 'a {
    paginate(move |next: Option<String>| async move {
        indexer.created_assets_page(&address, next.as_deref()).await
    })
}

// =============================================================================
// REST implementation
// =============================================================================

const TOKEN_HEADER: &str = "X-Indexer-API-Token";

/// [`Indexer`] backed by the indexer v2 REST API.
#[derive(Clone)]
pub struct IndexerClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl IndexerClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, IndexerError> {
        let parsed =
            url::Url::parse(base_url).map_err(|e| IndexerError::InvalidUrl(e.to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IndexerError::Request(e.to_string()))?;

        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            http,
        })
    }

    /// GET `path` with query parameters. `Ok(None)` on 404.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, IndexerError> {
        let mut request = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(query);
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IndexerError::Request(format!("GET {path} failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| IndexerError::InvalidResponse(format!("GET {path}: {e}")))
    }
}

fn next_query(next: Option<&str>) -> Vec<(&'static str, String)> {
    next.map(|t| vec![("next", t.to_string())]).unwrap_or_default()
}

#[async_trait]
impl Indexer for IndexerClient {
    async fn holdings_page(
        &self,
        address: &Address,
        next: Option<&str>,
    ) -> Result<Page<AssetHolding>, IndexerError> {
        let page: Option<WireHoldingsPage> = self
            .get_json(&format!("/v2/accounts/{address}/assets"), &next_query(next))
            .await?;
        Ok(page.map(Into::into).unwrap_or_else(|| Page::last(Vec::new())))
    }

    async fn created_assets_page(
        &self,
        address: &Address,
        next: Option<&str>,
    ) -> Result<Page<AssetDescriptor>, IndexerError> {
        let page: Option<WireCreatedPage> = self
            .get_json(
                &format!("/v2/accounts/{address}/created-assets"),
                &next_query(next),
            )
            .await?;
        match page {
            Some(page) => page.try_into(),
            None => Ok(Page::last(Vec::new())),
        }
    }

    async fn holding_for_asset(
        &self,
        address: &Address,
        asset_id: u64,
    ) -> Result<Option<AssetHolding>, IndexerError> {
        let page: Option<WireHoldingsPage> = self
            .get_json(
                &format!("/v2/accounts/{address}/assets"),
                &[("asset-id", asset_id.to_string())],
            )
            .await?;

        Ok(page.and_then(|page| {
            Page::from(page)
                .items
                .into_iter()
                .find(|h| h.asset_id == asset_id)
        }))
    }
}

#[derive(Debug, Deserialize)]
struct WireHoldingsPage {
    #[serde(default)]
    assets: Vec<WireIndexedHolding>,
    #[serde(rename = "next-token", default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireIndexedHolding {
    #[serde(flatten)]
    holding: WireHolding,
    #[serde(default)]
    deleted: bool,
}

impl From<WireHoldingsPage> for Page<AssetHolding> {
    fn from(page: WireHoldingsPage) -> Self {
        Page {
            items: page
                .assets
                .into_iter()
                .filter(|row| !row.deleted)
                .map(|row| row.holding.into())
                .collect(),
            next: page.next_token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireCreatedPage {
    #[serde(default)]
    assets: Vec<WireIndexedAsset>,
    #[serde(rename = "next-token", default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireIndexedAsset {
    #[serde(flatten)]
    asset: WireAsset,
    #[serde(default)]
    deleted: bool,
}

impl TryFrom<WireCreatedPage> for Page<AssetDescriptor> {
    type Error = IndexerError;

    fn try_from(page: WireCreatedPage) -> Result<Self, Self::Error> {
        let items = page
            .assets
            .into_iter()
            .filter(|row| !row.deleted)
            .map(|row| {
                AssetDescriptor::try_from(row.asset)
                    .map_err(|e| IndexerError::InvalidResponse(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            next: page.next_token,
        })
    }
}
