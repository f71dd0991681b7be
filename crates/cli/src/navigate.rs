// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Full-page navigation: where the authorization redirect and the post-login
//! return actually go.

use reqwest::Url;

use crate::error::AuthError;

pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url) -> Result<(), AuthError>;
}

/// Opens URLs in the user's default browser and always prints them, so a
/// headless session can still copy the link.
#[derive(Debug, Clone, Copy)]
pub struct SystemBrowser {
    pub open: bool,
}

impl Navigator for SystemBrowser {
    fn navigate(&self, url: &Url) -> Result<(), AuthError> {
        println!("{url}");
        if !self.open {
            return Ok(());
        }
        if let Err(e) = webbrowser::open(url.as_str()) {
            tracing::warn!(err = %e, "could not open browser; open the URL above manually");
        }
        Ok(())
    }
}
