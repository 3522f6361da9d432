// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Content gateway for off-chain (ARC-3) metadata.
//!
//! `ipfs://CID[/path][#fragment]` resolves to `{gateway}/CID[/path]`.
//! `http(s)://` URLs are fetched as they are. A bare value without a scheme
//! is treated as a content id.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Public gateway used when none is configured.
pub const DEFAULT_GATEWAY: &str = "https://ipfs.algonode.xyz/ipfs";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Unsupported metadata URL: {0}")]
    UnsupportedUrl(String),

    #[error("Metadata request failed: {0}")]
    Request(String),

    #[error("Gateway returned {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Metadata is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Metadata at {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },
}

/// Off-chain metadata of a non-fungible asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OffChainMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    /// `sha256-<hex>` digest of the image
    pub integrity: Option<String>,
    pub mime_type: Option<String>,
    pub properties: BTreeMap<String, String>,
    /// Image location, already resolved through the gateway
    pub image_url: Option<String>,
}

/// Source of off-chain metadata.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch and parse the metadata document behind an asset's URL.
    async fn fetch(&self, metadata_url: &str) -> Result<OffChainMetadata, GatewayError>;
}

/// Map an asset URL onto a fetchable HTTP URL.
pub fn resolve_url(gateway: &str, url: &str) -> Result<String, GatewayError> {
    let gateway = gateway.trim_end_matches('/');
    let url = url.trim();

    if let Some(rest) = url.strip_prefix("ipfs://") {
        let path = rest.split('#').next().unwrap_or_default();
        let path = path.strip_prefix("ipfs/").unwrap_or(path);
        if path.is_empty() {
            return Err(GatewayError::UnsupportedUrl(url.to_string()));
        }
        return Ok(format!("{gateway}/{path}"));
    }
    if url.starts_with("https://") || url.starts_with("http://") {
        return Ok(url.to_string());
    }
    if url.is_empty() || url.contains("://") {
        return Err(GatewayError::UnsupportedUrl(url.to_string()));
    }
    Ok(format!("{gateway}/{}", url.split('#').next().unwrap_or_default()))
}

// =============================================================================
// ARC-3 document
// =============================================================================

/// Metadata document as published next to the asset.
#[derive(Debug, Deserialize)]
struct Arc3Document {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    image_integrity: Option<String>,
    #[serde(default)]
    image_mimetype: Option<String>,
    #[serde(default)]
    properties: Option<RawProperties>,
}

/// `properties` is either an object or a `[{key, value}]` list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawProperties {
    Map(BTreeMap<String, serde_json::Value>),
    List(Vec<RawProperty>),
}

#[derive(Debug, Deserialize)]
struct RawProperty {
    key: String,
    #[serde(default)]
    value: serde_json::Value,
}

fn property_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl RawProperties {
    fn into_map(self) -> BTreeMap<String, String> {
        match self {
            Self::Map(map) => map
                .into_iter()
                .map(|(k, v)| (k, property_text(v)))
                .collect(),
            Self::List(list) => list
                .into_iter()
                .filter(|p| !p.key.is_empty())
                .map(|p| (p.key, property_text(p.value)))
                .collect(),
        }
    }
}

/// Parse a metadata document, resolving its image through `gateway`.
pub fn parse_metadata(gateway: &str, body: &[u8]) -> Result<OffChainMetadata, GatewayError> {
    let doc: Arc3Document =
        serde_json::from_slice(body).map_err(|e| GatewayError::InvalidJson(e.to_string()))?;

    Ok(OffChainMetadata {
        name: doc.name,
        description: doc.description,
        integrity: doc.image_integrity,
        mime_type: doc.image_mimetype,
        properties: doc
            .properties
            .map(RawProperties::into_map)
            .unwrap_or_default(),
        image_url: doc
            .image
            .and_then(|image| resolve_url(gateway, &image).ok()),
    })
}

// =============================================================================
// HTTP gateway
// =============================================================================

/// Largest metadata document accepted from a gateway.
pub const MAX_METADATA_BYTES: usize = 1024 * 1024;

/// Read a response body, failing once it grows past `limit` bytes.
async fn read_capped(
    mut response: reqwest::Response,
    url: &str,
    limit: usize,
) -> Result<Vec<u8>, GatewayError> {
    let too_large = || GatewayError::TooLarge {
        url: url.to_string(),
        limit,
    };
    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Err(too_large());
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| GatewayError::Request(format!("GET {url}: {e}")))?
    {
        if body.len() + chunk.len() > limit {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// [`MetadataSource`] fetching through an HTTP content gateway.
#[derive(Clone)]
pub struct HttpGateway {
    base_url: String,
    http: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Result<Self, GatewayError> {
        url::Url::parse(base_url).map_err(|e| GatewayError::UnsupportedUrl(e.to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl MetadataSource for HttpGateway {
    async fn fetch(&self, metadata_url: &str) -> Result<OffChainMetadata, GatewayError> {
        let url = resolve_url(&self.base_url, metadata_url)?;

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Request(format!("GET {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(GatewayError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let body = read_capped(response, &url, MAX_METADATA_BYTES).await?;
        parse_metadata(&self.base_url, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GW: &str = "https://gw.example/ipfs/";

    #[test]
    fn resolves_ipfs_urls() {
        assert_eq!(
            resolve_url(GW, "ipfs://bafyabc#arc3").unwrap(),
            "https://gw.example/ipfs/bafyabc"
        );
        assert_eq!(
            resolve_url(GW, "ipfs://bafyabc/metadata.json#arc3").unwrap(),
            "https://gw.example/ipfs/bafyabc/metadata.json"
        );
        assert_eq!(
            resolve_url(GW, "ipfs://ipfs/bafyabc").unwrap(),
            "https://gw.example/ipfs/bafyabc"
        );
    }

    #[test]
    fn passes_through_http_and_bare_ids() {
        assert_eq!(
            resolve_url(GW, "https://host/meta.json").unwrap(),
            "https://host/meta.json"
        );
        assert_eq!(resolve_url(GW, "bafyabc").unwrap(), "https://gw.example/ipfs/bafyabc");
    }

    #[test]
    fn rejects_unknown_schemes() {
        assert!(matches!(
            resolve_url(GW, "ftp://x/y"),
            Err(GatewayError::UnsupportedUrl(_))
        ));
        assert!(resolve_url(GW, "ipfs://").is_err());
        assert!(resolve_url(GW, "").is_err());
    }

    #[test]
    fn parses_list_properties() {
        let body = br#"{
            "name": "Sunset",
            "description": "An image",
            "image": "ipfs://bafyimg/sunset.png",
            "image_integrity": "sha256-abcd",
            "image_mimetype": "image/png",
            "properties": [{"key": "artist", "value": "ana"}, {"key": "year", "value": 2024}]
        }"#;
        let meta = parse_metadata(GW, body).unwrap();

        assert_eq!(meta.name.as_deref(), Some("Sunset"));
        assert_eq!(meta.integrity.as_deref(), Some("sha256-abcd"));
        assert_eq!(meta.mime_type.as_deref(), Some("image/png"));
        assert_eq!(
            meta.image_url.as_deref(),
            Some("https://gw.example/ipfs/bafyimg/sunset.png")
        );
        assert_eq!(meta.properties["artist"], "ana");
        assert_eq!(meta.properties["year"], "2024");
    }

    #[test]
    fn parses_object_properties_and_missing_fields() {
        let meta = parse_metadata(GW, br#"{"properties": {"rarity": "rare"}}"#).unwrap();
        assert_eq!(meta.properties["rarity"], "rare");
        assert!(meta.name.is_none());
        assert!(meta.image_url.is_none());

        assert!(matches!(
            parse_metadata(GW, b"not json"),
            Err(GatewayError::InvalidJson(_))
        ));
    }

    fn response(body: &[u8]) -> reqwest::Response {
        axum::http::Response::builder()
            .status(200)
            .body(body.to_vec())
            .unwrap()
            .into()
    }

    #[tokio::test]
    async fn reads_bodies_within_limit() {
        let body = br#"{"name": "Sunset"}"#;
        let read = read_capped(response(body), "https://gw.example/ipfs/x", 64)
            .await
            .unwrap();
        assert_eq!(read, body.to_vec());
    }

    #[tokio::test]
    async fn oversized_bodies_are_refused() {
        let body = vec![b' '; 65];
        let result = read_capped(response(&body), "https://gw.example/ipfs/x", 64).await;
        assert!(matches!(result, Err(GatewayError::TooLarge { limit: 64, .. })));
    }
}
