// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auth state controller: the single writer of auth state.
//!
//! Owns the credential store, drives the three sign-in methods, and
//! publishes every committed change on a typed broadcast channel (plus a
//! watch channel holding the latest [`AuthState`]). Subscribers only read.
//!
//! Each sign-in or sign-out rotates the session [`CancellationToken`].
//! Outbound requests started under an older session are cancelled, and a
//! late response can no longer be committed.

use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::Url;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::error::AuthError;
use crate::event::{AuthChange, AuthMethod, AuthState, BROWSER_MODE_SENTINEL, MANUAL_KEY_PREFIX};
use crate::navigate::Navigator;
use crate::pkce::{self, CodeVerifier};
use crate::store::CredentialStore;

pub const DEFAULT_AUTH_URL: &str = "https://openrouter.ai/auth";

/// What to do with a stored credential that has no recorded method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrphanPolicy {
    /// Treat it as invalid: clear it and require a fresh sign-in.
    #[default]
    Reject,
    /// Guess the method from the key's shape and persist the guess.
    Classify,
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Provider authorization endpoint.
    pub auth_url: String,
    pub orphan_policy: OrphanPolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self { auth_url: DEFAULT_AUTH_URL.to_owned(), orphan_policy: OrphanPolicy::default() }
    }
}

/// Best-effort method for a credential stored without one.
///
/// Ambiguous by nature: OAuth-issued keys share the manual prefix, so an
/// OAuth key restored this way reads as `manual`.
pub fn classify_orphan(key: &str) -> AuthMethod {
    if key == BROWSER_MODE_SENTINEL {
        AuthMethod::Browser
    } else if key.starts_with(MANUAL_KEY_PREFIX) {
        AuthMethod::Manual
    } else {
        AuthMethod::OAuth
    }
}

pub struct AuthController {
    store: CredentialStore,
    navigator: Arc<dyn Navigator>,
    config: ControllerConfig,
    state_tx: watch::Sender<AuthState>,
    change_tx: broadcast::Sender<AuthChange>,
    /// Token for the current session; replaced on every transition.
    session: Mutex<CancellationToken>,
    /// Serializes store commits against session rotation.
    commit: Mutex<()>,
}

impl AuthController {
    /// Build the controller from whatever the store holds.
    ///
    /// Restoration is optimistic: a stored credential is trusted without a
    /// round trip to the server.
    pub fn restore(
        store: CredentialStore,
        navigator: Arc<dyn Navigator>,
        config: ControllerConfig,
    ) -> Result<Self, AuthError> {
        let initial = restore_state(&store, config.orphan_policy)?;
        let (state_tx, _) = watch::channel(initial);
        let (change_tx, _) = broadcast::channel(16);
        tracing::debug!(state = %initial, "auth state restored");
        Ok(Self {
            store,
            navigator,
            config,
            state_tx,
            change_tx,
            session: Mutex::new(CancellationToken::new()),
            commit: Mutex::new(()),
        })
    }

    pub fn state(&self) -> AuthState {
        *self.state_tx.borrow()
    }

    /// Latest-value view of the state.
    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    /// Every committed change, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.change_tx.subscribe()
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub(crate) fn navigator(&self) -> &dyn Navigator {
        self.navigator.as_ref()
    }

    /// The credential for outbound calls, if the session has one.
    pub fn api_key(&self) -> Option<String> {
        if !self.state().is_authenticated() {
            return None;
        }
        self.store.api_key()
    }

    /// A token cancelled when the current session ends.
    pub fn session_token(&self) -> CancellationToken {
        self.session.lock().child_token()
    }

    /// `Unauthenticated → Authenticated(manual)`.
    pub fn submit_manual_key(&self, key: &str) -> Result<(), AuthError> {
        let key = key.trim();
        if key.is_empty() || key == BROWSER_MODE_SENTINEL {
            return Err(AuthError::MissingCredential);
        }
        self.sign_in(key, AuthMethod::Manual)?;
        tracing::info!(method = "manual", "signed in");
        Ok(())
    }

    /// `Unauthenticated → Authenticated(browser)` with the sentinel credential.
    pub fn enable_browser_mode(&self) -> Result<(), AuthError> {
        self.sign_in(BROWSER_MODE_SENTINEL, AuthMethod::Browser)?;
        tracing::info!(method = "browser", "browser model mode enabled");
        Ok(())
    }

    /// Begin the OAuth redirect. Returns the authorization URL navigated to.
    ///
    /// The state does not change here; the callback handler completes the
    /// transition after the provider redirects back. Nothing is persisted and
    /// no navigation happens if the challenge cannot be derived.
    pub fn start_oauth(&self, current_url: &str) -> Result<Url, AuthError> {
        self.start_oauth_with(current_url, pkce::generate_code_verifier())
    }

    pub(crate) fn start_oauth_with(
        &self,
        current_url: &str,
        verifier: CodeVerifier,
    ) -> Result<Url, AuthError> {
        let challenge = pkce::create_sha256_code_challenge(&verifier)?;
        let callback_url = pkce::callback_url_for(current_url)?;
        let auth_url =
            pkce::build_authorization_url(&self.config.auth_url, &callback_url, &challenge)?;

        self.store.save_code_verifier(&verifier)?;
        tracing::info!(callback = %callback_url, "redirecting to authorization");
        self.navigator.navigate(&auth_url)?;
        Ok(auth_url)
    }

    /// `Authenticated(*) → Unauthenticated`. Cancels in-flight requests.
    pub fn logout(&self) -> Result<(), AuthError> {
        let _guard = self.commit.lock();
        self.rotate_session();
        self.store.clear_auth()?;
        self.publish(AuthChange::signed_out());
        tracing::info!("signed out");
        Ok(())
    }

    /// Commit a key obtained from the code exchange.
    ///
    /// Refuses with [`AuthError::Cancelled`] if `token`'s session ended while
    /// the exchange was in flight.
    pub(crate) fn commit_oauth_key(
        &self,
        key: &str,
        token: &CancellationToken,
    ) -> Result<(), AuthError> {
        let _guard = self.commit.lock();
        if token.is_cancelled() {
            tracing::warn!("discarding exchanged key: session ended during exchange");
            return Err(AuthError::Cancelled);
        }
        self.store.commit_credential(key, AuthMethod::OAuth)?;
        self.publish(AuthChange::signed_in(key, AuthMethod::OAuth));
        tracing::info!(method = "oauth", "signed in");
        Ok(())
    }

    fn sign_in(&self, key: &str, method: AuthMethod) -> Result<(), AuthError> {
        let _guard = self.commit.lock();
        // A new method supersedes any pending OAuth attempt.
        self.rotate_session();
        self.store.commit_credential(key, method)?;
        self.publish(AuthChange::signed_in(key, method));
        Ok(())
    }

    fn rotate_session(&self) {
        let mut session = self.session.lock();
        session.cancel();
        *session = CancellationToken::new();
    }

    /// Publish after the store write; the send is synchronous.
    fn publish(&self, change: AuthChange) {
        self.state_tx.send_replace(change.state());
        // No subscribers is fine.
        let _ = self.change_tx.send(change);
    }
}

fn restore_state(store: &CredentialStore, policy: OrphanPolicy) -> Result<AuthState, AuthError> {
    let key = store.api_key().filter(|k| !k.is_empty());
    let method = store.auth_method();

    match (key, method) {
        (Some(_), Some(m)) => Ok(AuthState::Authenticated(m)),
        (None, None) => Ok(AuthState::Unauthenticated),
        (None, Some(m)) => {
            tracing::warn!(method = %m, "stored auth method without a credential; clearing");
            store.set_auth_method(None)?;
            Ok(AuthState::Unauthenticated)
        }
        (Some(key), None) => match policy {
            OrphanPolicy::Reject => {
                tracing::warn!("stored credential without an auth method; sign in again");
                store.set_api_key(None)?;
                Ok(AuthState::Unauthenticated)
            }
            OrphanPolicy::Classify => {
                let m = classify_orphan(&key);
                tracing::warn!(method = %m, "inferred auth method for stored credential");
                store.set_auth_method(Some(m))?;
                Ok(AuthState::Authenticated(m))
            }
        },
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
