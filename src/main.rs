// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use relational_asset_server::{
    api::router,
    config::{AppConfig, LogFormat},
    state::AppState,
    tls::load_tls_config,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Time allowed for in-flight requests after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

/// Cancel `token` on SIGINT or SIGTERM.
fn spawn_signal_listener(token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }
        tracing::info!("Shutdown signal received");
        token.cancel();
    });
}

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_format);

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialise services");
            std::process::exit(1);
        }
    };
    let app = router(state);

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    let addr = config.bind_addr;
    tracing::info!(
        network = config.network,
        algod = %config.algod_url,
        indexer = %config.indexer_url,
        "Ledger endpoints configured"
    );

    if let Some(paths) = &config.tls {
        let tls_config = match load_tls_config(paths).await {
            Ok(tls_config) => tls_config,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load TLS credentials");
                std::process::exit(1);
            }
        };

        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            shutdown_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });

        tracing::info!(%addr, "Relational Assets listening on https (docs at /docs)");
        if let Err(e) = axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(app.into_make_service())
            .await
        {
            tracing::error!(error = %e, "HTTPS server failed");
            std::process::exit(1);
        }
    } else {
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, %addr, "Failed to bind");
                std::process::exit(1);
            }
        };

        tracing::warn!(%addr, "TLS not configured, Relational Assets listening on plain http (docs at /docs)");
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
        {
            tracing::error!(error = %e, "HTTP server failed");
            std::process::exit(1);
        }
    }

    tracing::info!("Server stopped");
}
