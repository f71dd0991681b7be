// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sign-in subcommands.

use std::io::BufRead;

use crate::callback::CallbackHandler;
use crate::config::Config;
use crate::event::mask_key;

use super::Context;

#[derive(Debug, clap::Args)]
pub struct CallbackArgs {
    /// Full URL the browser landed on after authorizing.
    pub url: String,
}

#[derive(Debug, clap::Args)]
pub struct KeyArgs {
    /// API key; read from stdin when omitted.
    pub key: Option<String>,
}

pub fn cmd_status(ctx: &Context) -> i32 {
    let state = ctx.controller.state();
    match ctx.controller.api_key() {
        Some(key) => println!("{state} ({})", mask_key(&key)),
        None => println!("{state}"),
    }
    if ctx.controller.store().code_verifier().is_some() {
        println!("login pending: run `routerkey callback <url>` to finish");
    }
    0
}

pub fn cmd_login(ctx: &Context, config: &Config) -> i32 {
    match ctx.controller.start_oauth(&config.app_url) {
        Ok(_) => {
            eprintln!("Authorize in the browser, then run `routerkey callback <url>` with the URL it lands on.");
            0
        }
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

pub async fn cmd_callback(ctx: &Context, args: &CallbackArgs) -> i32 {
    let handler = CallbackHandler::new(ctx.controller.clone(), ctx.proxy.clone());
    match handler.handle(&args.url).await {
        Ok(_) => {
            eprintln!("Signed in with OpenRouter.");
            0
        }
        Err(e) => {
            eprintln!("error ({}): {e}", e.as_str());
            1
        }
    }
}

pub fn cmd_key(ctx: &Context, args: &KeyArgs) -> i32 {
    let key = match args.key {
        Some(ref k) => k.clone(),
        None => {
            let mut line = String::new();
            if let Err(e) = std::io::stdin().lock().read_line(&mut line) {
                eprintln!("error: {e}");
                return 1;
            }
            line
        }
    };
    match ctx.controller.submit_manual_key(&key) {
        Ok(()) => {
            eprintln!("Signed in with API key {}.", mask_key(key.trim()));
            0
        }
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

pub fn cmd_browser(ctx: &Context) -> i32 {
    match ctx.controller.enable_browser_mode() {
        Ok(()) => {
            eprintln!("Browser model mode enabled; chat requests stay local.");
            0
        }
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

pub fn cmd_logout(ctx: &Context) -> i32 {
    match ctx.controller.logout() {
        Ok(()) => {
            eprintln!("Signed out.");
            0
        }
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}
