//! Local hydration cache.
//!
//! Maps a scope cache key to the last merged [`Settings`] seen for that
//! scope. Used only to paint something sensible before the remote load
//! finishes; it is never a source of truth and never a persistence target.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use scopesync_core::settings::Settings;

use crate::error::SyncResult;

/// Keyed local store of serialized settings.
///
/// Calls are synchronous: hydration happens inside the scope switch, before
/// any await point.
pub trait CacheStore: Send + Sync {
    fn read(&self, key: &str) -> SyncResult<Option<String>>;
    fn write(&self, key: &str, value: &str) -> SyncResult<()>;
    fn remove(&self, key: &str) -> SyncResult<()>;
}

/// Serialize merged settings for the cache, dropping large binary assets.
pub fn encode_entry(settings: &Settings) -> SyncResult<String> {
    Ok(serde_json::to_string(&settings.without_assets())?)
}

/// Read and decode a cached entry.
///
/// Read errors and malformed entries are logged and reported as a miss.
pub fn hydrate(cache: &dyn CacheStore, key: &str) -> Option<Settings> {
    let raw = match cache.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(cache_key = key, error = %e, "Failed to read settings cache");
            return None;
        }
    };
    match serde_json::from_str::<Settings>(&raw) {
        Ok(settings) => Some(settings),
        Err(e) => {
            tracing::warn!(cache_key = key, error = %e, "Ignoring malformed settings cache entry");
            None
        }
    }
}

/// Write merged settings to the cache, logging instead of failing.
pub fn store(cache: &dyn CacheStore, key: &str, settings: &Settings) {
    let result = encode_entry(settings).and_then(|raw| cache.write(key, &raw));
    if let Err(e) = result {
        tracing::warn!(cache_key = key, error = %e, "Failed to write settings cache");
    }
}

// ---------------------------------------------------------------------------
// FileCacheStore
// ---------------------------------------------------------------------------

/// One JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    /// Create the store, creating `dir` if needed.
    pub fn open(dir: impl AsRef<Path>) -> SyncResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

impl CacheStore for FileCacheStore {
    fn read(&self, key: &str) -> SyncResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> SyncResult<()> {
        // Temp file + rename: readers only ever see a complete entry.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> SyncResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryCacheStore
// ---------------------------------------------------------------------------

/// Process-local cache, for tests and clients without a writable disk.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CacheStore for MemoryCacheStore {
    fn read(&self, key: &str) -> SyncResult<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> SyncResult<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> SyncResult<()> {
        self.entries().remove(key);
        Ok(())
    }
}
