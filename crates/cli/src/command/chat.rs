// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `routerkey chat`: one prompt through the proxy with the stored credential.

use crate::proxy_client::{
    first_content, ChatMessage, ChatRequest, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
    DEFAULT_TEMPERATURE, DEFAULT_TOP_P,
};

use super::Context;

#[derive(Debug, clap::Args)]
pub struct ChatArgs {
    /// Prompt text.
    pub prompt: String,
    /// Optional system message.
    #[arg(long)]
    pub system: Option<String>,
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,
    #[arg(long, default_value_t = DEFAULT_TOP_P)]
    pub top_p: f32,
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,
    /// Print the full JSON response.
    #[arg(long)]
    pub raw: bool,
}

impl ChatArgs {
    fn request(&self) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(ref system) = self.system {
            messages.push(ChatMessage::system(system.as_str()));
        }
        messages.push(ChatMessage::user(self.prompt.as_str()));

        let mut req = ChatRequest::new(&self.model, messages);
        req.temperature = Some(self.temperature);
        req.top_p = Some(self.top_p);
        req.max_tokens = Some(self.max_tokens);
        req
    }
}

pub async fn run(ctx: &Context, args: &ChatArgs) -> i32 {
    let Some(key) = ctx.controller.api_key() else {
        eprintln!("error: not signed in; run `routerkey login` or `routerkey key`");
        return 1;
    };
    if ctx.controller.state().method().is_some_and(|m| !m.is_remote()) {
        eprintln!("error: browser model mode has no remote credential; sign in to chat via the proxy");
        return 1;
    }

    let cancel = ctx.controller.session_token();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match ctx.proxy.chat(&key, &args.request(), &cancel).await {
        Ok(resp) => {
            match (args.raw, first_content(&resp)) {
                (false, Some(text)) => println!("{text}"),
                _ => println!("{}", serde_json::to_string_pretty(&resp).unwrap_or_default()),
            }
            0
        }
        Err(e) => {
            eprintln!("error ({}): {e}", e.as_str());
            1
        }
    }
}
