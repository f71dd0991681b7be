// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport for the proxy.

pub mod auth;
pub mod chat;
pub mod exchange;
pub mod http;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::ProxyState;

/// Build the axum `Router` with all proxy routes.
pub fn build_router(state: Arc<ProxyState>) -> Router {
    Router::new()
        .route("/api/health", get(http::health))
        .route("/api/models", get(http::models))
        .route("/api/exchange-code", post(exchange::exchange_code))
        .route("/api/chat", post(chat::chat))
        .route("/api/v1/chat/completions", post(chat::chat))
        // The browser app calls from its own origin.
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state)
}
