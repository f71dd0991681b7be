// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod callback;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod navigate;
pub mod pkce;
pub mod proxy_client;
pub mod store;
#[cfg(test)]
pub(crate) mod test_support;

/// Install the ring crypto provider for rustls. Idempotent.
///
/// reqwest is built without a default provider, so this must run before
/// the first HTTPS request.
pub fn ensure_crypto() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
