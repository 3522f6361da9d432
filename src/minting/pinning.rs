// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Content-addressed blob storage through an HTTP pinning service.
//!
//! The service accepts `POST {base}/upload` with the raw bytes and answers
//! with the content id, either as `{"cid": ...}` or wrapped as
//! `{"ok": true, "value": {"cid": ...}}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("Invalid pinning URL: {0}")]
    InvalidUrl(String),

    #[error("Upload failed: {0}")]
    Request(String),

    #[error("Pinning service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid pinning response: {0}")]
    InvalidResponse(String),
}

/// Content-addressable blob store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` and return their content id.
    async fn upload(
        &self,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BlobStoreError>;
}

/// [`BlobStore`] backed by a pinning service.
#[derive(Clone)]
pub struct PinningClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl PinningClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, BlobStoreError> {
        let parsed =
            url::Url::parse(base_url).map_err(|e| BlobStoreError::InvalidUrl(e.to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| BlobStoreError::Request(e.to_string()))?;

        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            http,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UploadResponse {
    Wrapped { value: CidBody },
    Plain(CidBody),
}

#[derive(Debug, Deserialize)]
struct CidBody {
    cid: String,
}

impl UploadResponse {
    fn cid(self) -> String {
        match self {
            Self::Wrapped { value } => value.cid,
            Self::Plain(body) => body.cid,
        }
    }
}

fn parse_upload_response(body: &[u8]) -> Result<String, BlobStoreError> {
    let response: UploadResponse = serde_json::from_slice(body)
        .map_err(|e| BlobStoreError::InvalidResponse(e.to_string()))?;
    let cid = response.cid();
    if cid.trim().is_empty() {
        return Err(BlobStoreError::InvalidResponse(
            "response did not include a cid".to_string(),
        ));
    }
    Ok(cid)
}

#[async_trait]
impl BlobStore for PinningClient {
    async fn upload(
        &self,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BlobStoreError> {
        let size = bytes.len();
        let mut request = self
            .http
            .post(format!("{}/upload", self.base_url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("X-Name", name)
            .body(bytes);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BlobStoreError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BlobStoreError::Status { status, body });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| BlobStoreError::Request(e.to_string()))?;
        let cid = parse_upload_response(&body)?;

        tracing::debug!(name, size, cid = %cid, "Blob uploaded");
        Ok(cid)
    }
}
