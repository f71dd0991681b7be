// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! routerkey-proxy: server-side OpenRouter code exchange and chat relay.

pub mod config;
pub mod error;
pub mod state;
pub mod transport;
pub mod upstream;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::ProxyConfig;
use crate::state::ProxyState;
use crate::transport::build_router;

/// Install the ring crypto provider for rustls. Idempotent.
pub fn ensure_crypto() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Run the proxy server until shutdown.
pub async fn run(config: ProxyConfig) -> anyhow::Result<()> {
    ensure_crypto();
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    tracing::info!(
        upstream = %config.upstream_url,
        fallback_key = config.fallback_key().is_some(),
        demo_mode = config.demo_mode,
        "routerkey-proxy listening on {addr}"
    );
    if config.demo_mode {
        tracing::warn!("demo mode enabled: failed code exchanges return throwaway keys");
    }

    let state = Arc::new(ProxyState::new(config));
    let router = build_router(state);

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutting down");
                shutdown.cancel();
            }
        });
    }

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    Ok(())
}
