//! Per-profile conversation identity.
//!
//! A [`KeyValueStore`] plays the part of browser local storage: string keys,
//! string values, surviving restarts when file-backed. [`StoredIdentity`]
//! layers the get-or-create contract on top of it.

use anyhow::{Context, Result};
use rand::Rng;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

pub const CONVERSATION_KEY: &str = "conversationHash";

const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TOKEN_LEN: usize = 26;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Hands out the identifier that accompanies every relay request.
pub trait IdentityProvider: Send + Sync {
    /// Returns the persisted identifier, generating and storing one on first use.
    fn get_or_create(&self) -> Result<String>;
}

pub struct StoredIdentity<S> {
    store: S,
    guard: Mutex<()>,
}

impl<S: KeyValueStore> StoredIdentity<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            guard: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: KeyValueStore> IdentityProvider for StoredIdentity<S> {
    fn get_or_create(&self) -> Result<String> {
        let _lock = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = self.store.get(CONVERSATION_KEY)? {
            if !existing.is_empty() {
                return Ok(existing);
            }
        }

        let token = generate_token();
        self.store
            .set(CONVERSATION_KEY, &token)
            .context("failed to persist conversation hash")?;
        log::info!("created conversation hash {token}");
        Ok(token)
    }
}

/// Random lowercase base-36 token. Not collision-resistant across profiles.
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LEN)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk, re-read on every access so several widgets sharing
/// a profile see each other's writes.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create storage dir: {}", parent.display()))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read storage: {}", self.path.display()));
            }
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse storage: {}", self.path.display()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        let json = serde_json::to_string_pretty(&entries)?;

        let tmp = self.path.with_extension("json.tmp");
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)
            .with_context(|| format!("failed to open storage: {}", tmp.display()))?;
        file.write_all(json.as_bytes())
            .context("failed to write storage")?;
        file.flush().context("failed to flush storage")?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace storage: {}", self.path.display()))?;
        Ok(())
    }
}
