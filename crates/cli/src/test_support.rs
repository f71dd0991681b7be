// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: a recording navigator, a storage backend
//! that can be made to fail, and proxy address helpers.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::Url;

use crate::error::AuthError;
use crate::navigate::Navigator;
use crate::store::{MemoryBackend, StorageBackend};

/// Records every navigation instead of performing it.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<Url>>,
    fail_with: Mutex<Option<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make subsequent navigations fail with `message`.
    pub fn fail_with(&self, message: &str) {
        *self.fail_with.lock() = Some(message.to_owned());
    }

    pub fn visited(&self) -> Vec<Url> {
        self.visited.lock().clone()
    }

    pub fn last(&self) -> Option<Url> {
        self.visited.lock().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &Url) -> Result<(), AuthError> {
        if let Some(msg) = self.fail_with.lock().clone() {
            return Err(AuthError::Navigation(msg));
        }
        self.visited.lock().push(url.clone());
        Ok(())
    }
}

/// Memory storage whose writes fail, once armed, whenever they remove a key.
#[derive(Debug, Default)]
pub struct FailingRemoveBackend {
    inner: MemoryBackend,
    armed: AtomicBool,
}

impl FailingRemoveBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

impl StorageBackend for FailingRemoveBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn apply(&self, set: &[(&str, &str)], remove: &[&str]) -> io::Result<()> {
        if !remove.is_empty() && self.armed.load(Ordering::SeqCst) {
            return Err(io::Error::other("disk full"));
        }
        self.inner.apply(set, remove)
    }
}

/// Base URL for a server bound to `addr`.
pub fn base_url(addr: SocketAddr) -> String {
    format!("http://{addr}")
}
