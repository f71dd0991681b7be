// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health and model-list handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::ProxyState;
use crate::transport::auth::resolve_credential;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub fallback_key: bool,
    pub demo_mode: bool,
}

/// `GET /api/health`
pub async fn health(State(s): State<Arc<ProxyState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "running".to_owned(),
        fallback_key: s.config.fallback_key().is_some(),
        demo_mode: s.config.demo_mode,
    })
}

/// `GET /api/models`: the upstream model list, fetched anonymously when no
/// credential is available.
pub async fn models(
    State(s): State<Arc<ProxyState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let credential = resolve_credential(&headers, None, s.config.fallback_key());
    let reply = s.upstream.models(credential.map(|(token, _)| token)).await?;
    if !reply.is_success() {
        return Err(reply.to_error());
    }
    Ok(reply.into_response())
}
