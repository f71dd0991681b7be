// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auth state types and the change notification broadcast to subscribers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed marker stored in place of an API key while running against the
/// in-browser model. Never a real credential; never sent upstream.
pub const BROWSER_MODE_SENTINEL: &str = "browser-local-mode";

/// Prefix of keys issued from the OpenRouter key settings page.
pub const MANUAL_KEY_PREFIX: &str = "sk-or-";

/// How the current credential was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    OAuth,
    Manual,
    Browser,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OAuth => "oauth",
            Self::Manual => "manual",
            Self::Browser => "browser",
        }
    }

    /// Whether requests under this method carry a remote key.
    pub fn is_remote(&self) -> bool {
        !matches!(self, Self::Browser)
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuthMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "oauth" => Ok(Self::OAuth),
            "manual" => Ok(Self::Manual),
            "browser" => Ok(Self::Browser),
            other => anyhow::bail!("invalid auth method: {other}"),
        }
    }
}

/// Controller state. Exactly one method is active while authenticated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticated(AuthMethod),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn method(&self) -> Option<AuthMethod> {
        match self {
            Self::Authenticated(m) => Some(*m),
            Self::Unauthenticated => None,
        }
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => f.write_str("unauthenticated"),
            Self::Authenticated(m) => write!(f, "authenticated ({m})"),
        }
    }
}

/// Broadcast after every committed auth write.
///
/// Sent only after the store write it describes has completed, so a
/// subscriber reading the store on receipt sees the new values.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthChange {
    pub api_key: Option<String>,
    pub method: Option<AuthMethod>,
}

impl AuthChange {
    pub fn signed_in(api_key: impl Into<String>, method: AuthMethod) -> Self {
        Self { api_key: Some(api_key.into()), method: Some(method) }
    }

    pub fn signed_out() -> Self {
        Self { api_key: None, method: None }
    }

    pub fn state(&self) -> AuthState {
        match (self.api_key.as_ref(), self.method) {
            (Some(_), Some(m)) => AuthState::Authenticated(m),
            _ => AuthState::Unauthenticated,
        }
    }
}

impl fmt::Debug for AuthChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthChange")
            .field("api_key", &self.api_key.as_deref().map(mask_key))
            .field("method", &self.method)
            .finish()
    }
}

/// Render a credential for display: first 8 and last 2 characters.
pub fn mask_key(key: &str) -> String {
    if key == BROWSER_MODE_SENTINEL {
        return key.to_owned();
    }
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "…".repeat(3);
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}…{tail}")
}
