// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for the proxy API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProxyError {
    BadRequest,
    MissingCredential,
    UpstreamHttp,
    UpstreamNonJson,
    Network,
    Internal,
}

impl ProxyError {
    /// Default status. Upstream failures usually carry the upstream's own.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::MissingCredential => 401,
            Self::UpstreamHttp => 502,
            Self::UpstreamNonJson => 502,
            Self::Network => 502,
            Self::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::MissingCredential => "MISSING_CREDENTIAL",
            Self::UpstreamHttp => "UPSTREAM_HTTP_ERROR",
            Self::UpstreamNonJson => "UPSTREAM_NON_JSON",
            Self::Network => "NETWORK_ERROR",
            Self::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error body: human-readable message plus machine-readable code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    pub error: String,
}

/// A handler failure: code, message, and an optional status override.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub code: ProxyError,
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ProxyError, message: impl Into<String>) -> Self {
        Self { code, status: None, message: message.into() }
    }

    /// Answer with `status` instead of the code's default. Non-error
    /// statuses are ignored.
    pub fn with_status(mut self, status: u16) -> Self {
        if (400..600).contains(&status) {
            self.status = Some(status);
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        let code = self.status.unwrap_or_else(|| self.code.http_status());
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn to_http_response(&self) -> (StatusCode, Json<ErrorResponse>) {
        let body =
            ErrorResponse { message: self.message.clone(), error: self.code.as_str().to_owned() };
        (self.status(), Json(body))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.status(), self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.to_http_response().into_response()
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        // A builder error is our fault (bad upstream URL), not the network's.
        let code = if e.is_builder() { ProxyError::Internal } else { ProxyError::Network };
        Self::new(code, e.without_url().to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
