// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Completes the OAuth flow when the provider redirects back.

use std::sync::Arc;

use reqwest::Url;

use crate::controller::AuthController;
use crate::error::AuthError;
use crate::pkce;
use crate::proxy_client::ProxyClient;

/// Parameters the provider appends to the callback URL.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        for (k, v) in url.query_pairs() {
            let slot = match k.as_ref() {
                "code" => &mut params.code,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            if slot.is_none() && !v.is_empty() {
                *slot = Some(v.into_owned());
            }
        }
        params
    }
}

pub struct CallbackHandler {
    controller: Arc<AuthController>,
    proxy: ProxyClient,
}

impl CallbackHandler {
    pub fn new(controller: Arc<AuthController>, proxy: ProxyClient) -> Self {
        Self { controller, proxy }
    }

    /// Handle a landing on the callback route.
    ///
    /// On success the key is committed, the change broadcast, and the app's
    /// main view (returned) navigated to. On failure the state stays
    /// `Unauthenticated` and the verifier is kept, so the same login attempt
    /// can be retried.
    pub async fn handle(&self, landing_url: &str) -> Result<Url, AuthError> {
        let url = Url::parse(landing_url)
            .map_err(|e| AuthError::InvalidUrl(format!("{landing_url}: {e}")))?;
        let params = CallbackParams::from_url(&url);

        if let Some(error) = params.error {
            let detail = match params.error_description {
                Some(desc) => format!("{error}: {desc}"),
                None => error,
            };
            tracing::warn!(error = %detail, "authorization denied by provider");
            return Err(AuthError::AuthorizationDenied(detail));
        }
        let Some(code) = params.code else {
            tracing::warn!("callback without authorization code");
            return Err(AuthError::MissingCode);
        };
        let Some(verifier) = self.controller.store().code_verifier() else {
            tracing::warn!("callback without a saved code verifier");
            return Err(AuthError::MissingVerifier);
        };
        let home = pkce::app_home_url(url.as_str())?;

        let token = self.controller.session_token();
        let key = match self.proxy.exchange_code(&code, &verifier, &token).await {
            Ok(key) => key,
            Err(e) => {
                tracing::error!(err = %e, code = e.as_str(), "code exchange failed");
                return Err(e);
            }
        };

        self.controller.commit_oauth_key(&key, &token)?;
        self.controller.navigator().navigate(&home)?;
        Ok(home)
    }
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
