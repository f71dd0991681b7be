// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

pub const DEFAULT_UPSTREAM_URL: &str = "https://openrouter.ai/api/v1";

/// Configuration for the routerkey proxy.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "routerkey-proxy", version, about)]
pub struct ProxyConfig {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "ROUTERKEY_PROXY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 3001, env = "ROUTERKEY_PROXY_PORT")]
    pub port: u16,

    /// OpenRouter API base URL.
    #[arg(long, default_value = DEFAULT_UPSTREAM_URL, env = "ROUTERKEY_UPSTREAM_URL")]
    pub upstream_url: String,

    /// Fallback API key for chat requests that carry no credential.
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Answer failed code exchanges with a throwaway demo key.
    #[arg(long, env = "ROUTERKEY_DEMO_MODE")]
    pub demo_mode: bool,

    /// `HTTP-Referer` attribution header sent upstream.
    #[arg(long, env = "ROUTERKEY_REFERER")]
    pub referer: Option<String>,

    /// `X-Title` attribution header sent upstream.
    #[arg(long, default_value = "routerkey", env = "ROUTERKEY_TITLE")]
    pub title: String,

    /// Upstream request timeout in seconds.
    #[arg(long, default_value_t = 60, env = "ROUTERKEY_TIMEOUT_SECS")]
    pub timeout_secs: u64,

    /// Log format (text, json).
    #[arg(long, default_value = "text")]
    pub log_format: String,

    /// Log level filter.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl ProxyConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The fallback key, if one is configured and non-blank.
    pub fn fallback_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// Config pointed at `upstream_url` with every other field at its default.
    pub fn for_upstream(upstream_url: impl Into<String>) -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 0,
            upstream_url: upstream_url.into(),
            api_key: None,
            demo_mode: false,
            referer: None,
            title: "routerkey".to_owned(),
            timeout_secs: 60,
            log_format: "text".to_owned(),
            log_level: "info".to_owned(),
        }
    }
}
