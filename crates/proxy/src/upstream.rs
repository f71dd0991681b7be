// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the OpenRouter API.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use reqwest::Client;
use serde::Serialize;

use crate::config::ProxyConfig;
use crate::error::{ApiError, ProxyError};

/// Body of `POST <upstream>/auth/keys`. Field names are the provider's.
#[derive(Debug, Serialize)]
pub struct KeyExchange<'a> {
    pub code: &'a str,
    pub code_verifier: &'a str,
    pub code_challenge_method: &'a str,
}

/// A buffered upstream response.
#[derive(Debug)]
pub struct UpstreamReply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UpstreamReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// Normalize a failed reply into `{message, error}` with the upstream's
    /// status.
    pub fn to_error(&self) -> ApiError {
        match self.json() {
            Some(body) => {
                let message = error_message(&body).unwrap_or_else(|| self.reason().to_owned());
                ApiError::new(ProxyError::UpstreamHttp, message).with_status(self.status)
            }
            None => ApiError::new(
                ProxyError::UpstreamNonJson,
                format!("upstream returned a non-JSON response ({})", self.status),
            )
            .with_status(self.status),
        }
    }

    fn reason(&self) -> &'static str {
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("upstream request failed")
    }
}

/// Verbatim passthrough: status, content type, and body bytes.
impl IntoResponse for UpstreamReply {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY);
        let mut resp = (status, self.body).into_response();
        if let Some(ct) = self.content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
            resp.headers_mut().insert(header::CONTENT_TYPE, ct);
        }
        resp
    }
}

/// Extract a message from `{message}`, `{error: {message}}`, or `{error: "..."}`.
pub fn error_message(body: &serde_json::Value) -> Option<String> {
    if let Some(m) = body.get("message").and_then(|m| m.as_str()) {
        return Some(m.to_owned());
    }
    match body.get("error")? {
        serde_json::Value::String(s) => Some(s.clone()),
        other => other.get("message").and_then(|m| m.as_str()).map(String::from),
    }
}

/// HTTP client wrapper for the OpenRouter API.
pub struct UpstreamClient {
    base_url: String,
    referer: Option<String>,
    title: String,
    client: Client,
}

impl UpstreamClient {
    pub fn new(config: &ProxyConfig) -> Self {
        let client =
            Client::builder().timeout(config.upstream_timeout()).build().unwrap_or_default();
        Self {
            base_url: config.upstream_url.trim_end_matches('/').to_owned(),
            referer: config.referer.clone(),
            title: config.title.clone(),
            client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// OpenRouter attribution headers.
    fn attribute(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let req = match self.referer {
            Some(ref r) => req.header("HTTP-Referer", r),
            None => req,
        };
        req.header("X-Title", &self.title)
    }

    /// `POST /auth/keys`: trade an authorization code for an API key.
    pub async fn exchange_code(&self, body: &KeyExchange<'_>) -> Result<UpstreamReply, ApiError> {
        let req = self.client.post(self.url("/auth/keys")).json(body);
        send(self.attribute(req)).await
    }

    /// `POST /chat/completions` with the resolved credential.
    pub async fn chat_completions(
        &self,
        token: &str,
        body: &serde_json::Value,
    ) -> Result<UpstreamReply, ApiError> {
        let req = self.client.post(self.url("/chat/completions")).bearer_auth(token).json(body);
        send(self.attribute(req)).await
    }

    /// `GET /models`. The list is public, so the credential is optional.
    pub async fn models(&self, token: Option<&str>) -> Result<UpstreamReply, ApiError> {
        let req = self.client.get(self.url("/models"));
        let req = match token {
            Some(t) => req.bearer_auth(t),
            None => req,
        };
        send(self.attribute(req)).await
    }
}

async fn send(req: reqwest::RequestBuilder) -> Result<UpstreamReply, ApiError> {
    let resp = req.send().await?;
    let status = resp.status().as_u16();
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let body = resp.bytes().await?;
    Ok(UpstreamReply { status, content_type, body })
}

#[cfg(test)]
#[path = "upstream_tests.rs"]
mod tests;
