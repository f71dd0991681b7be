// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential store: a typed facade over a synchronous key/value medium.
//!
//! The medium stands in for origin-scoped browser storage. Multi-key writes
//! and removals go through one backend call so readers never observe half
//! of a credential pair or a partially cleared session.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::event::AuthMethod;
use crate::pkce::CodeVerifier;

pub const API_KEY: &str = "openrouter.api_key";
pub const AUTH_METHOD: &str = "openrouter.auth_method";
pub const CODE_VERIFIER: &str = "openrouter.code_verifier";

/// File name of the document under the state dir.
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Persistent key/value storage.
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Write `set` and remove `remove` as one unit: either every change
    /// lands or none does. Missing keys are ignored.
    fn apply(&self, set: &[(&str, &str)], remove: &[&str]) -> io::Result<()>;

    fn set_many(&self, pairs: &[(&str, &str)]) -> io::Result<()> {
        self.apply(pairs, &[])
    }

    fn remove_many(&self, keys: &[&str]) -> io::Result<()> {
        self.apply(&[], keys)
    }
}

fn apply_to(entries: &mut HashMap<String, String>, set: &[(&str, &str)], remove: &[&str]) {
    for k in remove {
        entries.remove(*k);
    }
    for (k, v) in set {
        entries.insert((*k).to_owned(), (*v).to_owned());
    }
}

/// In-process storage; contents die with the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn apply(&self, set: &[(&str, &str)], remove: &[&str]) -> io::Result<()> {
        apply_to(&mut self.entries.lock(), set, remove);
        Ok(())
    }
}

/// JSON-file storage with atomic rewrites (write tmp + rename).
///
/// The document is cached in memory; each mutation rewrites the whole file
/// under the lock, so concurrent writers in this process serialize and the
/// file on disk is always one complete document.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileBackend {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => HashMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| corrupt(&path, e))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e),
        };
        Ok(Self { path, entries: Mutex::new(entries) })
    }

    fn mutate(&self, f: impl FnOnce(&mut HashMap<String, String>)) -> io::Result<()> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        f(&mut next);
        save(&self.path, &next)?;
        *entries = next;
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn apply(&self, set: &[(&str, &str)], remove: &[&str]) -> io::Result<()> {
        self.mutate(|entries| apply_to(entries, set, remove))
    }
}

fn corrupt(path: &Path, err: serde_json::Error) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!(
            "{}: unreadable credential store ({err}); run `routerkey logout` or delete the file",
            path.display()
        ),
    )
}

/// Save the document atomically.
///
/// Uses a unique temp filename (PID + counter) so two processes sharing the
/// state dir never interleave writes into the same `.tmp` file.
fn save(path: &Path, entries: &HashMap<String, String>) -> io::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let json = serde_json::to_string_pretty(entries)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    let written =
        write_private(&tmp_path, json.as_bytes()).and_then(|()| std::fs::rename(&tmp_path, path));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}

/// Create `path` owner-only (0o600 on unix) and write `bytes` to it.
fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Typed access to the three auth entries. No network, no key validation.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn StorageBackend>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Open the file-backed store at `<state_dir>/credentials.json`.
    pub fn open_dir(state_dir: &Path) -> io::Result<Self> {
        let backend = FileBackend::open(state_dir.join(CREDENTIALS_FILE))?;
        Ok(Self::new(Arc::new(backend)))
    }

    /// Like [`open_dir`](Self::open_dir), but an unreadable document is
    /// deleted and the store starts empty. For sign-out, which clears
    /// everything anyway.
    pub fn open_dir_discarding_corrupt(state_dir: &Path) -> io::Result<Self> {
        let path = state_dir.join(CREDENTIALS_FILE);
        let backend = match FileBackend::open(&path) {
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                tracing::warn!(path = %path.display(), "discarding unreadable credential store");
                std::fs::remove_file(&path)?;
                FileBackend::open(&path)?
            }
            other => other?,
        };
        Ok(Self::new(Arc::new(backend)))
    }

    pub fn api_key(&self) -> Option<String> {
        self.backend.get(API_KEY)
    }

    /// `None` removes the stored key.
    pub fn set_api_key(&self, key: Option<&str>) -> io::Result<()> {
        match key {
            Some(k) => self.backend.set_many(&[(API_KEY, k)]),
            None => self.backend.remove_many(&[API_KEY]),
        }
    }

    /// The stored method. Unrecognized values read as absent.
    pub fn auth_method(&self) -> Option<AuthMethod> {
        let raw = self.backend.get(AUTH_METHOD)?;
        match raw.parse() {
            Ok(m) => Some(m),
            Err(_) => {
                tracing::warn!(value = %raw, "ignoring unrecognized stored auth method");
                None
            }
        }
    }

    /// `None` removes the stored method.
    pub fn set_auth_method(&self, method: Option<AuthMethod>) -> io::Result<()> {
        match method {
            Some(m) => self.backend.set_many(&[(AUTH_METHOD, m.as_str())]),
            None => self.backend.remove_many(&[AUTH_METHOD]),
        }
    }

    /// Write key and method together.
    pub fn set_credential(&self, key: &str, method: AuthMethod) -> io::Result<()> {
        self.backend.set_many(&[(API_KEY, key), (AUTH_METHOD, method.as_str())])
    }

    /// Write key and method and drop any pending verifier, in one backend
    /// call.
    pub(crate) fn commit_credential(&self, key: &str, method: AuthMethod) -> io::Result<()> {
        self.backend.apply(&[(API_KEY, key), (AUTH_METHOD, method.as_str())], &[CODE_VERIFIER])
    }

    pub fn save_code_verifier(&self, verifier: &CodeVerifier) -> io::Result<()> {
        self.backend.set_many(&[(CODE_VERIFIER, verifier.as_str())])
    }

    pub fn code_verifier(&self) -> Option<CodeVerifier> {
        self.backend.get(CODE_VERIFIER).filter(|v| !v.is_empty()).map(CodeVerifier::from_stored)
    }

    /// Remove the verifier, returning it if one was stored.
    pub fn take_code_verifier(&self) -> io::Result<Option<CodeVerifier>> {
        let verifier = self.code_verifier();
        if verifier.is_some() {
            self.backend.remove_many(&[CODE_VERIFIER])?;
        }
        Ok(verifier)
    }

    /// Remove key, method, and verifier in one backend call.
    pub fn clear_auth(&self) -> io::Result<()> {
        self.backend.remove_many(&[API_KEY, AUTH_METHOD, CODE_VERIFIER])
    }

    /// True iff an API key is present, whatever the method.
    pub fn is_authenticated(&self) -> bool {
        self.api_key().is_some_and(|k| !k.is_empty())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
