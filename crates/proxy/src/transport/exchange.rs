// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `POST /api/exchange-code`: trade an authorization code for an API key.
//!
//! The browser can't call the provider's key endpoint directly, so it posts
//! the code and its verifier here and the proxy forwards them server-side.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ProxyError};
use crate::state::ProxyState;
use crate::upstream::KeyExchange;

pub const DEFAULT_CHALLENGE_METHOD: &str = "S256";
pub const DEMO_KEY_PREFIX: &str = "demo-sk-or-v1-";

/// Accepts both the provider's snake_case names and the camelCase aliases
/// older clients send.
#[derive(Debug, Default, Deserialize)]
pub struct ExchangeCodeRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, alias = "codeVerifier")]
    pub code_verifier: Option<String>,
    #[serde(default, alias = "codeMethod")]
    pub code_challenge_method: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExchangeCodeResponse {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub demo: bool,
}

/// `POST /api/exchange-code`
pub async fn exchange_code(State(s): State<Arc<ProxyState>>, body: Bytes) -> Response {
    let req = match parse_request(&body) {
        Ok(req) => req,
        Err(e) => return e.into_response(),
    };

    match forward(&s, &req).await {
        Ok(resp) => {
            tracing::info!("code exchange succeeded");
            Json(resp).into_response()
        }
        Err(e) if s.config.demo_mode => demo_exchange(&e).into_response(),
        Err(e) => {
            tracing::warn!(code = e.code.as_str(), status = %e.status(), "code exchange failed");
            e.into_response()
        }
    }
}

/// Borrowed, validated view of an exchange request.
struct Validated<'a> {
    code: &'a str,
    verifier: &'a str,
    method: &'a str,
}

fn parse_request(body: &[u8]) -> Result<ExchangeCodeRequest, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::new(ProxyError::BadRequest, format!("invalid request body: {e}")))
}

fn validate(req: &ExchangeCodeRequest) -> Result<Validated<'_>, ApiError> {
    let non_empty: for<'a> fn(&'a Option<String>) -> Option<&'a str> =
        |v| v.as_deref().filter(|s| !s.is_empty());
    let code = non_empty(&req.code)
        .ok_or_else(|| ApiError::new(ProxyError::BadRequest, "missing authorization code"))?;
    let verifier = non_empty(&req.code_verifier)
        .ok_or_else(|| ApiError::new(ProxyError::BadRequest, "missing code verifier"))?;
    let method = non_empty(&req.code_challenge_method).unwrap_or(DEFAULT_CHALLENGE_METHOD);
    Ok(Validated { code, verifier, method })
}

async fn forward(s: &ProxyState, req: &ExchangeCodeRequest) -> Result<ExchangeCodeResponse, ApiError> {
    let v = validate(req)?;
    let reply = s
        .upstream
        .exchange_code(&KeyExchange {
            code: v.code,
            code_verifier: v.verifier,
            code_challenge_method: v.method,
        })
        .await?;

    if !reply.is_success() {
        return Err(reply.to_error());
    }

    let parsed = serde_json::from_slice::<ExchangeCodeResponse>(&reply.body)
        .ok()
        .filter(|r| !r.key.is_empty());
    parsed.ok_or_else(|| {
        ApiError::new(ProxyError::UpstreamNonJson, "upstream response did not include a key")
            .with_status(502)
    })
}

/// Demo-mode stand-in for a failed exchange. Only reachable with
/// `--demo-mode`; malformed requests are still rejected.
fn demo_exchange(err: &ApiError) -> Response {
    if err.code == ProxyError::BadRequest {
        return err.clone().into_response();
    }
    tracing::warn!(code = err.code.as_str(), "code exchange failed; issuing demo key");
    Json(ExchangeCodeResponse {
        key: format!("{DEMO_KEY_PREFIX}{}", uuid::Uuid::new_v4()),
        user_id: None,
        demo: true,
    })
    .into_response()
}
