// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTPS configuration from PEM files.

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsPaths;

#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("Failed to load certificate {cert} / key {key}: {source}")]
    Load {
        cert: String,
        key: String,
        source: std::io::Error,
    },
}

/// Install the ring crypto provider for rustls.
///
/// Must run before any TLS configuration is built.
pub fn install_crypto_provider() {
    // Err only means a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Build the server TLS configuration from a certificate chain and key.
pub async fn load_tls_config(paths: &TlsPaths) -> Result<RustlsConfig, TlsError> {
    install_crypto_provider();
    RustlsConfig::from_pem_file(&paths.cert, &paths.key)
        .await
        .map_err(|source| TlsError::Load {
            cert: paths.cert.display().to_string(),
            key: paths.key.display().to_string(),
            source,
        })
}
