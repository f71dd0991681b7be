// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential resolution for proxied requests.

use std::fmt;

use axum::http::HeaderMap;

/// Stand-in credential of clients running models in the browser. Never a
/// real key; never forwarded.
pub const BROWSER_MODE_SENTINEL: &str = "browser-local-mode";

/// Body field a client may carry its key in. Stripped before forwarding.
pub const BODY_KEY_FIELD: &str = "apiKey";

/// Where a resolved credential came from. Safe to log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Authorization,
    ApiKeyHeader,
    Body,
    Env,
}

impl CredentialSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorization => "authorization",
            Self::ApiKeyHeader => "x-api-key",
            Self::Body => "body",
            Self::Env => "env",
        }
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn usable(token: &str) -> Option<&str> {
    let token = token.trim();
    if token.is_empty() || token == BROWSER_MODE_SENTINEL {
        None
    } else {
        Some(token)
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get("authorization")?.to_str().ok()?;
    let (scheme, token) = value.trim_start().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token)
}

/// Pick the credential for an upstream call.
///
/// Priority: `Authorization: Bearer` (any scheme case), then `x-api-key`,
/// then the body's `apiKey`, then the server fallback. Blank values and the
/// browser-mode sentinel count as absent.
pub fn resolve_credential<'a>(
    headers: &'a HeaderMap,
    body_key: Option<&'a str>,
    fallback: Option<&'a str>,
) -> Option<(&'a str, CredentialSource)> {
    let header_key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    [
        (bearer(headers), CredentialSource::Authorization),
        (header_key, CredentialSource::ApiKeyHeader),
        (body_key, CredentialSource::Body),
        (fallback, CredentialSource::Env),
    ]
    .into_iter()
    .find_map(|(candidate, source)| candidate.and_then(usable).map(|t| (t, source)))
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
