use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use scopesync_core::roles::{PermissionGate, DEFAULT_ELEVATED_ROLES};
use scopesync_core::scope::DEFAULT_CACHE_NAMESPACE;

use crate::error::{SyncError, SyncResult};

/// Default debounce window for persisting local edits.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Default number of recent principal records scanned by the branding fallback.
pub const DEFAULT_FALLBACK_WINDOW: i64 = 20;

/// Default directory for the file-backed cache.
pub const DEFAULT_CACHE_DIR: &str = ".scopesync-cache";

/// Engine configuration.
///
/// All fields have defaults suitable for local use. Override via environment
/// variables with [`EngineConfig::from_env`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quiet period after the last edit before it is written back.
    pub debounce: Duration,
    /// How many recently updated principal records the fallback inspects.
    pub fallback_window: i64,
    /// Prefix of local cache keys.
    pub cache_namespace: String,
    /// Directory for [`FileCacheStore`](crate::cache::FileCacheStore).
    pub cache_dir: PathBuf,
    /// Roles allowed to write shared tenant branding.
    pub elevated_roles: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            fallback_window: DEFAULT_FALLBACK_WINDOW,
            cache_namespace: DEFAULT_CACHE_NAMESPACE.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            elevated_roles: DEFAULT_ELEVATED_ROLES.iter().map(|r| r.to_string()).collect(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                                  |
    /// |----------------------------|------------------------------------------|
    /// | `SETTINGS_DEBOUNCE_MS`     | `1000`                                   |
    /// | `SETTINGS_FALLBACK_WINDOW` | `20`                                     |
    /// | `SETTINGS_CACHE_NAMESPACE` | `settings`                               |
    /// | `SETTINGS_CACHE_DIR`       | `.scopesync-cache`                       |
    /// | `SETTINGS_ELEVATED_ROLES`  | `owner,admin,administrator,controller`   |
    pub fn from_env() -> SyncResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> SyncResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let debounce = match lookup("SETTINGS_DEBOUNCE_MS") {
            Some(raw) => Duration::from_millis(parse_var("SETTINGS_DEBOUNCE_MS", &raw)?),
            None => defaults.debounce,
        };

        let fallback_window = match lookup("SETTINGS_FALLBACK_WINDOW") {
            Some(raw) => parse_var::<i64>("SETTINGS_FALLBACK_WINDOW", &raw)?,
            None => defaults.fallback_window,
        };
        if fallback_window < 1 {
            return Err(SyncError::Config(format!(
                "SETTINGS_FALLBACK_WINDOW must be at least 1, got {fallback_window}"
            )));
        }

        let cache_namespace = lookup("SETTINGS_CACHE_NAMESPACE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.cache_namespace);

        let cache_dir = lookup("SETTINGS_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_dir);

        let elevated_roles = match lookup("SETTINGS_ELEVATED_ROLES") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.elevated_roles,
        };

        Ok(Self {
            debounce,
            fallback_window,
            cache_namespace,
            cache_dir,
            elevated_roles,
        })
    }

    /// The permission gate for the configured elevated role set.
    pub fn permission_gate(&self) -> PermissionGate {
        PermissionGate::new(self.elevated_roles.iter().cloned())
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> SyncResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| SyncError::Config(format!("{key} must be a valid number: {e}")))
}
