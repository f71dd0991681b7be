// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Smoke tests against the compiled `routerkey-proxy` binary.

use std::time::Duration;

use routerkey_specs::{MockOpenRouter, ProxyProcess};

const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn binary_serves_health() -> anyhow::Result<()> {
    let provider = MockOpenRouter::start().await?;
    let proxy = ProxyProcess::start(&provider.api_url(), &[])?;
    proxy.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value =
        reqwest::get(format!("{}/api/health", proxy.base_url())).await?.json().await?;

    assert_eq!(resp["status"], "running");
    assert_eq!(resp["fallback_key"], false);
    assert_eq!(resp["demo_mode"], false);
    Ok(())
}

#[tokio::test]
async fn binary_demo_mode_flag() -> anyhow::Result<()> {
    let provider = MockOpenRouter::start().await?;
    let proxy = ProxyProcess::start(&provider.api_url(), &["--demo-mode"])?;
    proxy.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value = reqwest::Client::new()
        .post(format!("{}/api/exchange-code", proxy.base_url()))
        .json(&serde_json::json!({ "code": "never-issued", "code_verifier": "v" }))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(resp["demo"], true);
    assert!(resp["key"].as_str().is_some_and(|k| k.starts_with("demo-sk-or-v1-")));
    Ok(())
}

#[tokio::test]
async fn binary_forwards_fallback_key() -> anyhow::Result<()> {
    let provider = MockOpenRouter::start().await?;
    let proxy = ProxyProcess::start(&provider.api_url(), &["--api-key", "sk-or-v1-env"])?;
    proxy.wait_healthy(TIMEOUT).await?;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/v1/chat/completions", proxy.base_url()))
        .json(&serde_json::json!({ "model": "m", "messages": [] }))
        .send()
        .await?;

    assert!(resp.status().is_success());
    assert_eq!(provider.chat_auth(), vec!["Bearer sk-or-v1-env".to_owned()]);
    Ok(())
}
