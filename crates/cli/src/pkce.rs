// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PKCE (RFC 7636) primitives and the URL arithmetic around the redirect.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use reqwest::Url;
use sha2::{Digest, Sha256};

use crate::error::AuthError;

/// The only challenge method this client ever sends.
pub const CHALLENGE_METHOD: &str = "S256";

/// RFC 7636 §4.1 bounds.
pub const VERIFIER_MIN_LEN: usize = 43;
pub const VERIFIER_MAX_LEN: usize = 128;

/// Path segment the provider redirects back to.
pub const CALLBACK_SEGMENT: &str = "callback";

/// High-entropy secret bound to one authorization attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct CodeVerifier(String);

impl CodeVerifier {
    /// Validate a verifier that came from outside the generator (e.g. storage).
    pub fn parse(s: impl Into<String>) -> Result<Self, AuthError> {
        let s = s.into();
        validate_verifier(&s)?;
        Ok(Self(s))
    }

    /// Wrap without validation. Derivation re-checks before hashing.
    pub fn from_stored(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Verifiers are secrets; keep them out of debug logs.
impl fmt::Debug for CodeVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CodeVerifier(<{} chars>)", self.0.len())
    }
}

/// Public S256 derivative of a [`CodeVerifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeChallenge(String);

impl CodeChallenge {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodeChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generate a PKCE code verifier: 32 random bytes, base64url without padding
/// (43 characters, all unreserved).
pub fn generate_code_verifier() -> CodeVerifier {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    CodeVerifier(URL_SAFE_NO_PAD.encode(bytes))
}

/// Compute code_challenge = base64url_nopad(sha256(utf8(verifier))).
///
/// Refuses verifiers outside RFC 7636 rather than hashing them; there is no
/// fallback to the `plain` method.
pub fn create_sha256_code_challenge(verifier: &CodeVerifier) -> Result<CodeChallenge, AuthError> {
    validate_verifier(verifier.as_str())?;
    let hash = Sha256::digest(verifier.as_str().as_bytes());
    Ok(CodeChallenge(URL_SAFE_NO_PAD.encode(hash)))
}

fn validate_verifier(s: &str) -> Result<(), AuthError> {
    if s.len() < VERIFIER_MIN_LEN || s.len() > VERIFIER_MAX_LEN {
        return Err(AuthError::ChallengeDerivation(format!(
            "verifier length {} outside {VERIFIER_MIN_LEN}..={VERIFIER_MAX_LEN}",
            s.len()
        )));
    }
    if let Some(c) = s.chars().find(|c| !is_unreserved(*c)) {
        return Err(AuthError::ChallengeDerivation(format!(
            "verifier contains reserved character {c:?}"
        )));
    }
    Ok(())
}

/// RFC 3986 unreserved characters.
pub fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

/// Derive the redirect target from the page the login started on.
///
/// The last path segment is replaced by `callback`, so an app served from a
/// sub-path (hosted previews) keeps its base path. Query and fragment are
/// dropped.
pub fn callback_url_for(current_url: &str) -> Result<Url, AuthError> {
    let current = parse_url(current_url)?;
    current.join(CALLBACK_SEGMENT).map_err(|e| AuthError::InvalidUrl(e.to_string()))
}

/// The application's main view: the directory containing the callback route.
pub fn app_home_url(callback_url: &str) -> Result<Url, AuthError> {
    let callback = parse_url(callback_url)?;
    callback.join("./").map_err(|e| AuthError::InvalidUrl(e.to_string()))
}

/// Build the provider authorization URL.
///
/// Parameter order: callback_url, code_challenge, code_challenge_method.
pub fn build_authorization_url(
    auth_url: &str,
    callback_url: &Url,
    challenge: &CodeChallenge,
) -> Result<Url, AuthError> {
    let base = auth_url.trim_end_matches('?');
    let full = format!(
        "{base}?callback_url={callback}&code_challenge={challenge}&code_challenge_method={CHALLENGE_METHOD}",
        callback = urlencoding(callback_url.as_str()),
        challenge = urlencoding(challenge.as_str()),
    );
    parse_url(&full)
}

fn parse_url(s: &str) -> Result<Url, AuthError> {
    Url::parse(s).map_err(|e| AuthError::InvalidUrl(format!("{s}: {e}")))
}

/// Percent-encode everything outside the unreserved set.
fn urlencoding(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if is_unreserved(char::from(b)) {
            out.push(char::from(b));
        } else {
            out.push('%');
            out.push(char::from(HEX[(b >> 4) as usize]));
            out.push(char::from(HEX[(b & 0xf) as usize]));
        }
    }
    out
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";

#[cfg(test)]
#[path = "pkce_tests.rs"]
mod tests;
