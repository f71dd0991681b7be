// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the routerkey proxy (code exchange + chat).
//!
//! Every call takes a [`CancellationToken`]; a cancelled call resolves to
//! [`AuthError::Cancelled`] without waiting for the response.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::AuthError;
use crate::event::BROWSER_MODE_SENTINEL;
use crate::pkce::{CodeVerifier, CHALLENGE_METHOD};

pub const EXCHANGE_PATH: &str = "/api/exchange-code";
pub const CHAT_PATH: &str = "/api/chat";

pub const DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TOP_P: f32 = 1.0;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Body of `POST /api/exchange-code`. Field names are the provider's.
#[derive(Debug, Serialize)]
struct ExchangeRequest<'a> {
    code: &'a str,
    code_verifier: &'a str,
    code_challenge_method: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    key: Option<String>,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_owned(), content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_owned(), content: content.into() }
    }
}

/// Chat-completions request in the upstream schema.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Extra upstream parameters passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: Some(DEFAULT_TEMPERATURE),
            top_p: Some(DEFAULT_TOP_P),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            extra: serde_json::Map::new(),
        }
    }
}

/// Pull the first choice's message text out of a chat-completions response.
pub fn first_content(response: &serde_json::Value) -> Option<&str> {
    response.get("choices")?.get(0)?.get("message")?.get("content")?.as_str()
}

/// Client for one proxy instance.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    base_url: String,
    client: Client,
}

impl ProxyClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_default();
        Self { base_url: base_url.into().trim_end_matches('/').to_owned(), client }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Trade an authorization code (plus the verifier that produced its
    /// challenge) for an API key.
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &CodeVerifier,
        cancel: &CancellationToken,
    ) -> Result<String, AuthError> {
        let body = ExchangeRequest {
            code,
            code_verifier: verifier.as_str(),
            code_challenge_method: CHALLENGE_METHOD,
        };
        let req = self.client.post(self.url(EXCHANGE_PATH)).json(&body);

        let (status, value) = cancellable(cancel, send_json(req)).await?;
        let parsed: ExchangeResponse = serde_json::from_value(value)
            .map_err(|_| AuthError::UpstreamNonJson { status })?;
        match parsed.key {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(AuthError::UpstreamNonJson { status }),
        }
    }

    /// Send one chat-completions request through the proxy.
    pub async fn chat(
        &self,
        api_key: &str,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, AuthError> {
        if api_key == BROWSER_MODE_SENTINEL {
            return Err(AuthError::BrowserMode);
        }
        if api_key.is_empty() {
            return Err(AuthError::MissingCredential);
        }
        let req = self.client.post(self.url(CHAT_PATH)).bearer_auth(api_key).json(request);
        let (_, value) = cancellable(cancel, send_json(req)).await?;
        Ok(value)
    }
}

/// Race `fut` against cancellation.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, AuthError>>,
) -> Result<T, AuthError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AuthError::Cancelled),
        res = fut => res,
    }
}

/// Send and decode a JSON response, normalizing failures.
async fn send_json(req: reqwest::RequestBuilder) -> Result<(u16, serde_json::Value), AuthError> {
    let resp = req.send().await?;
    let status = resp.status();
    let bytes = resp.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<serde_json::Value>(&bytes)
            .ok()
            .and_then(|v| error_message(&v))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_owned());
        return Err(AuthError::UpstreamHttp { status: status.as_u16(), message });
    }

    let value = serde_json::from_slice(&bytes)
        .map_err(|_| AuthError::UpstreamNonJson { status: status.as_u16() })?;
    Ok((status.as_u16(), value))
}

/// Extract a human-readable message from `{message}`, `{error: {message}}`,
/// or `{error: "..."}`.
pub fn error_message(body: &serde_json::Value) -> Option<String> {
    if let Some(m) = body.get("message").and_then(|m| m.as_str()) {
        return Some(m.to_owned());
    }
    match body.get("error")? {
        serde_json::Value::String(s) => Some(s.clone()),
        other => other.get("message").and_then(|m| m.as_str()).map(String::from),
    }
}

#[cfg(test)]
#[path = "proxy_client_tests.rs"]
mod tests;
