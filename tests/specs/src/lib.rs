// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end sign-in and chat flows.
//!
//! Provides a mock OpenRouter that enforces PKCE, the real proxy (in-process
//! or as the compiled binary), and a client wired to a file-backed store.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Once};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use reqwest::Url;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::net::TcpListener;

use routerkey::controller::{AuthController, ControllerConfig};
use routerkey::error::AuthError;
use routerkey::navigate::Navigator;
use routerkey::proxy_client::ProxyClient;
use routerkey::store::CredentialStore;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Resolve the path to a compiled workspace binary.
pub fn binary(name: &str) -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs → tests → workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join(name)
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

async fn serve(app: Router) -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    Ok(addr)
}

// -- Mock OpenRouter ----------------------------------------------------------

#[derive(Default)]
struct Provider {
    /// Outstanding authorization codes and the challenge each was issued for.
    codes: HashMap<String, String>,
    next_code: u32,
    /// Keys issued, in order.
    issued: Vec<String>,
    /// `Authorization` headers seen on chat requests.
    chat_auth: Vec<String>,
}

/// In-process OpenRouter stand-in. Codes are single-use and only redeem
/// with the verifier whose S256 challenge they were issued for.
#[derive(Clone)]
pub struct MockOpenRouter {
    addr: SocketAddr,
    inner: Arc<Mutex<Provider>>,
}

impl MockOpenRouter {
    pub async fn start() -> anyhow::Result<Self> {
        let inner = Arc::new(Mutex::new(Provider::default()));
        let app = Router::new()
            .route("/api/v1/auth/keys", post(redeem_code))
            .route("/api/v1/chat/completions", post(chat_completions))
            .with_state(Arc::clone(&inner));
        let addr = serve(app).await?;
        Ok(Self { addr, inner })
    }

    /// API base URL, as the proxy's `--upstream-url`.
    pub fn api_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    /// Play the user approving the authorization page: read the challenge
    /// off `auth_url` and return the landing URL with a fresh code.
    pub fn approve(&self, auth_url: &Url) -> anyhow::Result<String> {
        let query: HashMap<_, _> = auth_url.query_pairs().into_owned().collect();
        let challenge = query
            .get("code_challenge")
            .ok_or_else(|| anyhow::anyhow!("authorization URL without code_challenge"))?;
        anyhow::ensure!(query.get("code_challenge_method").map(String::as_str) == Some("S256"));
        let callback = query
            .get("callback_url")
            .ok_or_else(|| anyhow::anyhow!("authorization URL without callback_url"))?;

        let mut p = self.inner.lock();
        p.next_code += 1;
        let code = format!("code-{}", p.next_code);
        p.codes.insert(code.clone(), challenge.clone());
        Ok(format!("{callback}?code={code}"))
    }

    pub fn issued_keys(&self) -> Vec<String> {
        self.inner.lock().issued.clone()
    }

    pub fn chat_auth(&self) -> Vec<String> {
        self.inner.lock().chat_auth.clone()
    }
}

async fn redeem_code(State(p): State<Arc<Mutex<Provider>>>, Json(body): Json<Value>) -> Response {
    let code = body["code"].as_str().unwrap_or_default();
    let verifier = body["code_verifier"].as_str().unwrap_or_default();

    let mut p = p.lock();
    let Some(challenge) = p.codes.remove(code) else {
        return forbidden("Invalid code");
    };
    let derived = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
    if derived != challenge || body["code_challenge_method"] != "S256" {
        return forbidden("Invalid code verifier");
    }
    let key = format!("sk-or-v1-issued-{}", p.issued.len() + 1);
    p.issued.push(key.clone());
    Json(json!({ "key": key, "user_id": "user_1" })).into_response()
}

fn forbidden(message: &str) -> Response {
    (StatusCode::FORBIDDEN, Json(json!({ "error": { "message": message, "code": 403 } })))
        .into_response()
}

async fn chat_completions(
    State(p): State<Arc<Mutex<Provider>>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let auth = headers.get("authorization").and_then(|v| v.to_str().ok()).unwrap_or_default();
    p.lock().chat_auth.push(auth.to_owned());
    let last = body["messages"].as_array().and_then(|m| m.last()).cloned().unwrap_or_default();
    Json(json!({
        "id": "gen-1",
        "model": body["model"],
        "choices": [{ "message": { "role": "assistant", "content": format!("echo: {}", last["content"].as_str().unwrap_or_default()) } }],
    }))
}

// -- Proxy --------------------------------------------------------------------

/// Run the proxy router in-process against `upstream`. Returns its base URL.
pub async fn spawn_proxy(upstream: &MockOpenRouter) -> anyhow::Result<String> {
    ensure_crypto();
    let config = routerkey_proxy::config::ProxyConfig::for_upstream(upstream.api_url());
    let state = Arc::new(routerkey_proxy::state::ProxyState::new(config));
    let addr = serve(routerkey_proxy::transport::build_router(state)).await?;
    Ok(format!("http://{addr}"))
}

/// A running `routerkey-proxy` process that is killed on drop.
pub struct ProxyProcess {
    child: Child,
    port: u16,
}

impl ProxyProcess {
    pub fn start(upstream_url: &str, extra_args: &[&str]) -> anyhow::Result<Self> {
        ensure_crypto();
        let binary = binary("routerkey-proxy");
        anyhow::ensure!(binary.exists(), "routerkey-proxy binary not found at {}", binary.display());

        let port = free_port()?;
        let child = Command::new(&binary)
            .args(["--host", "127.0.0.1", "--port", &port.to_string()])
            .args(["--upstream-url", upstream_url, "--log-level", "warn"])
            .args(extra_args)
            .env_remove("OPENROUTER_API_KEY")
            .env_remove("ROUTERKEY_DEMO_MODE")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(Self { child, port })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Poll `/api/health` until it answers or `timeout` elapses.
    pub async fn wait_healthy(&self, timeout: Duration) -> anyhow::Result<()> {
        let url = format!("{}/api/health", self.base_url());
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Ok(resp) = reqwest::get(&url).await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            anyhow::ensure!(tokio::time::Instant::now() < deadline, "proxy not healthy in time");
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for ProxyProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

// -- Client -------------------------------------------------------------------

/// Captures navigations instead of opening a browser.
#[derive(Default)]
pub struct CapturingNavigator {
    visited: Mutex<Vec<Url>>,
}

impl CapturingNavigator {
    pub fn last(&self) -> Option<Url> {
        self.visited.lock().last().cloned()
    }
}

impl Navigator for CapturingNavigator {
    fn navigate(&self, url: &Url) -> Result<(), AuthError> {
        self.visited.lock().push(url.clone());
        Ok(())
    }
}

/// A client whose store lives in a temp dir, so it can be "reloaded".
pub struct Client {
    pub controller: Arc<AuthController>,
    pub navigator: Arc<CapturingNavigator>,
    pub proxy: ProxyClient,
    pub state_dir: tempfile::TempDir,
}

impl Client {
    pub fn new(proxy_url: &str) -> anyhow::Result<Self> {
        let state_dir = tempfile::tempdir()?;
        let navigator = Arc::new(CapturingNavigator::default());
        let controller = open_controller(state_dir.path(), Arc::clone(&navigator))?;
        let proxy = ProxyClient::new(proxy_url, Duration::from_secs(10));
        Ok(Self { controller: Arc::new(controller), navigator, proxy, state_dir })
    }

    /// A fresh controller over the same on-disk store, as after a restart.
    pub fn reload(&self) -> anyhow::Result<AuthController> {
        open_controller(self.state_dir.path(), Arc::clone(&self.navigator))
    }
}

fn open_controller(dir: &Path, navigator: Arc<CapturingNavigator>) -> anyhow::Result<AuthController> {
    let store = CredentialStore::open_dir(dir)?;
    Ok(AuthController::restore(store, navigator, ControllerConfig::default())?)
}
