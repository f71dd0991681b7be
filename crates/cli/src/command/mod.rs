// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI subcommands: `status`, `login`, `callback`, `key`, `browser`,
//! `logout`, `chat`.

pub mod auth;
pub mod chat;

use std::sync::Arc;

use crate::config::{Command, Config};
use crate::controller::AuthController;
use crate::navigate::SystemBrowser;
use crate::proxy_client::ProxyClient;
use crate::store::CredentialStore;

/// Everything a subcommand needs: the controller over the on-disk store and
/// a client for the proxy.
pub struct Context {
    pub controller: Arc<AuthController>,
    pub proxy: ProxyClient,
}

impl Context {
    pub fn open(config: &Config, open_browser: bool) -> anyhow::Result<Self> {
        let state_dir = config.state_dir();
        // Sign-out must work even when the document can't be read.
        let store = match config.command {
            Command::Logout => CredentialStore::open_dir_discarding_corrupt(&state_dir)?,
            _ => CredentialStore::open_dir(&state_dir)?,
        };
        tracing::debug!(dir = %state_dir.display(), "opened credential store");

        let navigator = Arc::new(SystemBrowser { open: open_browser && !config.no_browser });
        let controller = AuthController::restore(store, navigator, config.controller_config())?;
        let proxy = ProxyClient::new(&config.proxy_url, config.timeout());
        Ok(Self { controller: Arc::new(controller), proxy })
    }
}

/// Run the selected subcommand. Returns a process exit code.
pub async fn run(config: Config) -> i32 {
    // Only `login` hands a URL to the browser; the post-callback return to
    // the app is printed.
    let open_browser = matches!(config.command, Command::Login);
    let ctx = match Context::open(&config, open_browser) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("error: {e:#}");
            return 2;
        }
    };

    match config.command {
        Command::Status => auth::cmd_status(&ctx),
        Command::Login => auth::cmd_login(&ctx, &config),
        Command::Callback(ref args) => auth::cmd_callback(&ctx, args).await,
        Command::Key(ref args) => auth::cmd_key(&ctx, args),
        Command::Browser => auth::cmd_browser(&ctx),
        Command::Logout => auth::cmd_logout(&ctx),
        Command::Chat(ref args) => chat::run(&ctx, args).await,
    }
}
