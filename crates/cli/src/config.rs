// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::command::auth::{CallbackArgs, KeyArgs};
use crate::command::chat::ChatArgs;
use crate::controller::{ControllerConfig, OrphanPolicy, DEFAULT_AUTH_URL};

/// OpenRouter sign-in and chat client.
#[derive(Debug, Parser)]
#[command(name = "routerkey", version, about)]
pub struct Config {
    /// Directory holding the credential store.
    #[arg(long, env = "ROUTERKEY_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Base URL of the routerkey proxy.
    #[arg(long, env = "ROUTERKEY_PROXY_URL", default_value = "http://127.0.0.1:3001")]
    pub proxy_url: String,

    /// Provider authorization endpoint.
    #[arg(long, env = "ROUTERKEY_AUTH_URL", default_value = DEFAULT_AUTH_URL)]
    pub auth_url: String,

    /// URL of the page a login starts from; the callback route sits beside it.
    #[arg(long, global = true, env = "ROUTERKEY_APP_URL", default_value = "http://localhost:3000/")]
    pub app_url: String,

    /// Guess the method of a stored key that has none, instead of discarding it.
    #[arg(long, env = "ROUTERKEY_INFER_ORPHAN_METHOD")]
    pub infer_orphan_method: bool,

    /// Print URLs instead of opening a browser.
    #[arg(long)]
    pub no_browser: bool,

    /// Request timeout for proxy calls, in seconds.
    #[arg(long, env = "ROUTERKEY_TIMEOUT_SECS", default_value = "60")]
    pub timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "ROUTERKEY_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Log format (text, json).
    #[arg(long, default_value = "text")]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Show the current sign-in state.
    Status,
    /// Sign in with OpenRouter (OAuth PKCE).
    Login,
    /// Complete a login from the URL the browser landed on.
    Callback(CallbackArgs),
    /// Sign in with an API key pasted by hand.
    Key(KeyArgs),
    /// Use in-browser models; no remote credential.
    Browser,
    /// Sign out and clear stored credentials.
    Logout,
    /// Send one chat prompt through the proxy.
    Chat(ChatArgs),
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn orphan_policy(&self) -> OrphanPolicy {
        if self.infer_orphan_method {
            OrphanPolicy::Classify
        } else {
            OrphanPolicy::Reject
        }
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig { auth_url: self.auth_url.clone(), orphan_policy: self.orphan_policy() }
    }

    /// `--state-dir`, else `$XDG_STATE_HOME/routerkey`, else
    /// `$HOME/.local/state/routerkey`, else `./.routerkey`.
    pub fn state_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.state_dir {
            return dir.clone();
        }
        default_state_dir(
            std::env::var_os("XDG_STATE_HOME").map(PathBuf::from),
            std::env::var_os("HOME").map(PathBuf::from),
        )
    }
}

fn default_state_dir(xdg_state_home: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    let non_empty = |p: &PathBuf| !p.as_os_str().is_empty();
    if let Some(xdg) = xdg_state_home.filter(non_empty) {
        return xdg.join("routerkey");
    }
    if let Some(home) = home.filter(non_empty) {
        return home.join(".local").join("state").join("routerkey");
    }
    PathBuf::from(".routerkey")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
