// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::io;

/// Failures surfaced by the authentication core.
///
/// None of these are fatal to the process: callers report them and leave
/// the controller in (or return it to) `Unauthenticated`.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authorization response did not include a code")]
    MissingCode,

    #[error("authorization was denied: {0}")]
    AuthorizationDenied(String),

    #[error("no code verifier saved for this authorization; start the login again")]
    MissingVerifier,

    #[error("could not derive code challenge: {0}")]
    ChallengeDerivation(String),

    #[error("upstream returned a non-JSON response ({status})")]
    UpstreamNonJson { status: u16 },

    #[error("upstream error ({status}): {message}")]
    UpstreamHttp { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("no API credential available")]
    MissingCredential,

    #[error("browser model mode has no remote credential")]
    BrowserMode,

    #[error("request cancelled")]
    Cancelled,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("credential storage: {0}")]
    Storage(#[from] io::Error),
}

impl AuthError {
    /// Stable machine-readable code, mirroring the proxy's error codes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingCode => "MISSING_CODE",
            Self::AuthorizationDenied(_) => "AUTHORIZATION_DENIED",
            Self::MissingVerifier => "MISSING_VERIFIER",
            Self::ChallengeDerivation(_) => "CHALLENGE_DERIVATION_FAILURE",
            Self::UpstreamNonJson { .. } => "UPSTREAM_NON_JSON",
            Self::UpstreamHttp { .. } => "UPSTREAM_HTTP_ERROR",
            Self::Network(_) => "NETWORK_ERROR",
            Self::MissingCredential => "MISSING_CREDENTIAL",
            Self::BrowserMode => "BROWSER_MODE",
            Self::Cancelled => "CANCELLED",
            Self::InvalidUrl(_) => "INVALID_URL",
            Self::Navigation(_) => "NAVIGATION",
            Self::Storage(_) => "STORAGE",
        }
    }

    /// Whether this error was raised before any network call was attempted.
    pub fn is_pre_network(&self) -> bool {
        matches!(
            self,
            Self::MissingCode
                | Self::AuthorizationDenied(_)
                | Self::MissingVerifier
                | Self::ChallengeDerivation(_)
                | Self::MissingCredential
                | Self::BrowserMode
                | Self::InvalidUrl(_)
        )
    }

    /// Upstream HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::UpstreamNonJson { status } | Self::UpstreamHttp { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest includes the URL in its Display; never the headers.
        Self::Network(e.without_url().to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
