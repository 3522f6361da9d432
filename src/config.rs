// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into
//! [`AppConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the database | `./data` |
//! | `NETWORK` | Ledger preset (`testnet` or `mainnet`) | `testnet` |
//! | `ALGOD_URL` / `ALGOD_TOKEN` | Ledger node endpoint and token | preset |
//! | `INDEXER_URL` / `INDEXER_TOKEN` | Indexer endpoint and token | preset |
//! | `IPFS_GATEWAY` | Gateway for `ipfs://` URLs | `https://ipfs.algonode.xyz/ipfs` |
//! | `PINNING_URL` / `PINNING_TOKEN` | Blob store used when minting | Required to mint NFTs |
//! | `EXPLORER_URL` | Block explorer base for receipts | preset |
//! | `JWT_SECRET` | HS256 session secret | Required |
//! | `FUNDING_SEED` | Hex seed of the signup funding account | Optional |
//! | `METADATA_CONCURRENCY` | Metadata fetches in flight | `4` |
//! | `DIRECT_CONFIRMATION_ROUNDS` | Rounds to wait for a direct transfer or asset creation | `3` |
//! | `GROUP_CONFIRMATION_ROUNDS` | Rounds to wait for an opt-in group | `4` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files enabling HTTPS | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{env, net::SocketAddr, path::PathBuf};

use crate::catalog::gateway::DEFAULT_GATEWAY;
use crate::catalog::DEFAULT_METADATA_CONCURRENCY;
use crate::ledger::{network_by_name, DIRECT_CONFIRMATION_ROUNDS, GROUP_CONFIRMATION_ROUNDS};

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Minimum accepted length of `JWT_SECRET`, in bytes.
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Logging output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Certificate and key for HTTPS.
#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Fully resolved service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub network: &'static str,
    pub algod_url: String,
    pub algod_token: Option<String>,
    pub indexer_url: String,
    pub indexer_token: Option<String>,
    pub ipfs_gateway: String,
    pub pinning_url: Option<String>,
    pub pinning_token: Option<String>,
    pub explorer_url: String,
    pub jwt_secret: String,
    pub funding_seed: Option<String>,
    pub metadata_concurrency: usize,
    pub direct_confirmation_rounds: u64,
    pub group_confirmation_rounds: u64,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let network = network_by_name(var("NETWORK").as_deref())
            .map_err(|reason| ConfigError::Invalid { name: "NETWORK", reason })?;

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_or(var("PORT"), "PORT", 8080)?;
        let bind_addr = format!("{host}:{port}")
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "HOST",
                reason: e.to_string(),
            })?;

        let jwt_secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                reason: format!("must be at least {MIN_SECRET_LEN} bytes"),
            });
        }

        let tls = match (var("TLS_CERT_PATH"), var("TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: "TLS_CERT_PATH",
                    reason: "TLS_CERT_PATH and TLS_KEY_PATH must be set together".to_string(),
                })
            }
        };

        let log_format = match var("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            bind_addr,
            data_dir: var(DATA_DIR_ENV).unwrap_or_else(|| "./data".to_string()).into(),
            network: network.name,
            algod_url: var("ALGOD_URL").unwrap_or_else(|| network.algod_url.to_string()),
            algod_token: var("ALGOD_TOKEN"),
            indexer_url: var("INDEXER_URL").unwrap_or_else(|| network.indexer_url.to_string()),
            indexer_token: var("INDEXER_TOKEN"),
            ipfs_gateway: var("IPFS_GATEWAY").unwrap_or_else(|| DEFAULT_GATEWAY.to_string()),
            pinning_url: var("PINNING_URL"),
            pinning_token: var("PINNING_TOKEN"),
            explorer_url: var("EXPLORER_URL").unwrap_or_else(|| network.explorer_url.to_string()),
            jwt_secret,
            funding_seed: var("FUNDING_SEED"),
            metadata_concurrency: parse_or(
                var("METADATA_CONCURRENCY"),
                "METADATA_CONCURRENCY",
                DEFAULT_METADATA_CONCURRENCY,
            )?
            .max(1),
            direct_confirmation_rounds: parse_rounds(
                var("DIRECT_CONFIRMATION_ROUNDS"),
                "DIRECT_CONFIRMATION_ROUNDS",
                DIRECT_CONFIRMATION_ROUNDS,
            )?,
            group_confirmation_rounds: parse_rounds(
                var("GROUP_CONFIRMATION_ROUNDS"),
                "GROUP_CONFIRMATION_ROUNDS",
                GROUP_CONFIRMATION_ROUNDS,
            )?,
            tls,
            log_format,
        })
    }
}

fn parse_or<T>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

/// A confirmation bound of zero rounds would time out every transaction.
fn parse_rounds(raw: Option<String>, name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match parse_or(raw, name, default)? {
        0 => Err(ConfigError::Invalid {
            name,
            reason: "must be at least 1".to_string(),
        }),
        rounds => Ok(rounds),
    }
}
