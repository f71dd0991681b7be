// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end sign-in flows: client core → real proxy → mock OpenRouter.

use reqwest::Url;
use tokio_util::sync::CancellationToken;

use routerkey::callback::CallbackHandler;
use routerkey::error::AuthError;
use routerkey::event::{AuthChange, AuthMethod, AuthState, BROWSER_MODE_SENTINEL};
use routerkey::proxy_client::{first_content, ChatMessage, ChatRequest, DEFAULT_MODEL};
use routerkey::store::CredentialStore;
use routerkey_specs::{spawn_proxy, Client, MockOpenRouter};

async fn setup() -> anyhow::Result<(MockOpenRouter, Client)> {
    let provider = MockOpenRouter::start().await?;
    let proxy_url = spawn_proxy(&provider).await?;
    Ok((provider, Client::new(&proxy_url)?))
}

fn ping() -> ChatRequest {
    ChatRequest::new(DEFAULT_MODEL, vec![ChatMessage::user("ping")])
}

#[tokio::test]
async fn oauth_sign_in_persists_and_chats() -> anyhow::Result<()> {
    let (provider, client) = setup().await?;
    let mut changes = client.controller.subscribe();

    let auth_url = client.controller.start_oauth("http://localhost:3000/app/page")?;
    assert_eq!(client.navigator.last(), Some(auth_url.clone()));

    let landing = provider.approve(&auth_url)?;
    assert!(landing.starts_with("http://localhost:3000/app/callback?code="));

    let handler = CallbackHandler::new(client.controller.clone(), client.proxy.clone());
    let home = handler.handle(&landing).await?;
    assert_eq!(home.as_str(), "http://localhost:3000/app/");

    let key = provider.issued_keys().pop().ok_or_else(|| anyhow::anyhow!("no key issued"))?;
    assert_eq!(client.controller.state(), AuthState::Authenticated(AuthMethod::OAuth));
    assert_eq!(changes.recv().await?, AuthChange::signed_in(key.as_str(), AuthMethod::OAuth));

    // Survives a restart.
    let reloaded = client.reload()?;
    assert_eq!(reloaded.state(), AuthState::Authenticated(AuthMethod::OAuth));
    assert_eq!(reloaded.api_key().as_deref(), Some(key.as_str()));
    assert_eq!(reloaded.store().code_verifier(), None);

    let resp = client.proxy.chat(&key, &ping(), &client.controller.session_token()).await?;
    assert_eq!(first_content(&resp), Some("echo: ping"));
    assert_eq!(provider.chat_auth(), vec![format!("Bearer {key}")]);
    Ok(())
}

#[tokio::test]
async fn superseded_verifier_cannot_redeem_old_code() -> anyhow::Result<()> {
    let (provider, client) = setup().await?;

    let first = client.controller.start_oauth("http://localhost:3000/")?;
    let stale_landing = provider.approve(&first)?;
    // A second login replaces the verifier the first code was bound to.
    client.controller.start_oauth("http://localhost:3000/")?;

    let handler = CallbackHandler::new(client.controller.clone(), client.proxy.clone());
    let err = handler.handle(&stale_landing).await;

    match err {
        Err(AuthError::UpstreamHttp { status, message }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "Invalid code verifier");
        }
        other => anyhow::bail!("unexpected: {other:?}"),
    }
    assert_eq!(client.controller.state(), AuthState::Unauthenticated);
    assert!(client.controller.store().code_verifier().is_some());
    assert!(provider.issued_keys().is_empty());
    Ok(())
}

#[tokio::test]
async fn retry_after_failed_exchange_uses_kept_verifier() -> anyhow::Result<()> {
    let (provider, client) = setup().await?;
    let auth_url = client.controller.start_oauth("http://localhost:3000/")?;
    let handler = CallbackHandler::new(client.controller.clone(), client.proxy.clone());

    let err = handler.handle("http://localhost:3000/callback?code=forged").await;
    assert!(matches!(err, Err(AuthError::UpstreamHttp { status: 403, .. })), "{err:?}");

    let landing = provider.approve(&auth_url)?;
    handler.handle(&landing).await?;
    assert_eq!(client.controller.state(), AuthState::Authenticated(AuthMethod::OAuth));
    Ok(())
}

#[tokio::test]
async fn manual_key_chats_through_proxy() -> anyhow::Result<()> {
    let (provider, client) = setup().await?;

    client.controller.submit_manual_key("  sk-or-v1-manual  ")?;
    let key = client.controller.api_key().ok_or_else(|| anyhow::anyhow!("no key"))?;
    assert_eq!(key, "sk-or-v1-manual");

    client.proxy.chat(&key, &ping(), &client.controller.session_token()).await?;
    assert_eq!(provider.chat_auth(), vec!["Bearer sk-or-v1-manual".to_owned()]);
    Ok(())
}

#[tokio::test]
async fn x_api_key_reaches_upstream_as_bearer() -> anyhow::Result<()> {
    let provider = MockOpenRouter::start().await?;
    let proxy_url = spawn_proxy(&provider).await?;

    let resp = reqwest::Client::new()
        .post(format!("{proxy_url}/api/chat"))
        .header("x-api-key", "sk-or-v1-test")
        .json(&serde_json::json!({ "model": "m", "messages": [{ "role": "user", "content": "hi" }] }))
        .send()
        .await?;

    assert!(resp.status().is_success());
    assert_eq!(provider.chat_auth(), vec!["Bearer sk-or-v1-test".to_owned()]);
    Ok(())
}

#[tokio::test]
async fn browser_mode_never_reaches_upstream() -> anyhow::Result<()> {
    let (provider, client) = setup().await?;

    client.controller.enable_browser_mode()?;
    let key = client.controller.api_key().ok_or_else(|| anyhow::anyhow!("no key"))?;
    assert_eq!(key, BROWSER_MODE_SENTINEL);

    let err = client.proxy.chat(&key, &ping(), &CancellationToken::new()).await;
    assert!(matches!(err, Err(AuthError::BrowserMode)), "{err:?}");
    assert!(provider.chat_auth().is_empty());
    Ok(())
}

#[tokio::test]
async fn logout_clears_persisted_state() -> anyhow::Result<()> {
    let (_provider, client) = setup().await?;
    client.controller.submit_manual_key("sk-or-v1-manual")?;

    client.controller.logout()?;

    let store = CredentialStore::open_dir(client.state_dir.path())?;
    assert_eq!(store.api_key(), None);
    assert_eq!(store.auth_method(), None);
    assert_eq!(client.reload()?.state(), AuthState::Unauthenticated);
    Ok(())
}

#[tokio::test]
async fn authorization_url_shape() -> anyhow::Result<()> {
    let (_provider, client) = setup().await?;
    let url = client.controller.start_oauth("https://foo.example/app/page")?;

    let names: Vec<String> = url.query_pairs().map(|(k, _)| k.into_owned()).collect();
    assert_eq!(names, ["callback_url", "code_challenge", "code_challenge_method"]);
    let callback = url
        .query_pairs()
        .find(|(k, _)| k == "callback_url")
        .map(|(_, v)| v.into_owned())
        .ok_or_else(|| anyhow::anyhow!("no callback_url"))?;
    assert_eq!(Url::parse(&callback)?.as_str(), "https://foo.example/app/callback");
    Ok(())
}
