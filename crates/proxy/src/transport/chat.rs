// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `POST /api/chat` and `POST /api/v1/chat/completions`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::error::{ApiError, ProxyError};
use crate::state::ProxyState;
use crate::transport::auth::{resolve_credential, BODY_KEY_FIELD};

/// Forward a chat-completions request with the resolved credential.
///
/// Success passes through verbatim; failures are normalized to
/// `{message, error}` with the upstream status.
pub async fn chat(
    State(s): State<Arc<ProxyState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let mut body: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::new(ProxyError::BadRequest, format!("invalid request body: {e}")))?;
    let Some(fields) = body.as_object_mut() else {
        return Err(ApiError::new(ProxyError::BadRequest, "request body must be a JSON object"));
    };
    let body_key = match fields.remove(BODY_KEY_FIELD) {
        Some(serde_json::Value::String(k)) => Some(k),
        _ => None,
    };

    let Some((token, source)) =
        resolve_credential(&headers, body_key.as_deref(), s.config.fallback_key())
    else {
        tracing::warn!("chat request without a credential");
        return Err(ApiError::new(ProxyError::MissingCredential, "no API credential provided"));
    };

    let model = body.get("model").and_then(|m| m.as_str()).unwrap_or("-");
    tracing::info!(source = %source, model, "forwarding chat request");

    let reply = s.upstream.chat_completions(token, &body).await?;
    if !reply.is_success() {
        let err = reply.to_error();
        tracing::warn!(code = err.code.as_str(), status = %err.status(), "upstream chat failed");
        return Err(err);
    }
    Ok(reply.into_response())
}
