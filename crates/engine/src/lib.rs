//! Scoped configuration sync engine.
//!
//! Loads, merges, caches, applies and persists per-tenant and per-principal
//! settings for a client that can switch tenants while running.
//!
//! - [`SyncEngine`]: the facade. Feed it identity changes with
//!   [`set_scope`](SyncEngine::set_scope) and user edits with
//!   [`mutate`](SyncEngine::mutate).
//! - [`ScopeResolver`]: scope identity plus the generation counter that
//!   fences off stale work.
//! - [`RemoteSettingsStore`] / [`MembershipDirectory`]: remote collaborators,
//!   with Postgres and in-memory adapters.
//! - [`CacheStore`]: local hydration cache.
//! - [`ApplicationSink`]: where color tokens are pushed.
//! - [`PersistenceScheduler`]: debounced write-back.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod scheduler;
pub mod scope;
pub mod sink;
pub mod store;

pub use cache::{CacheStore, FileCacheStore, MemoryCacheStore};
pub use config::EngineConfig;
pub use engine::{LoadStatus, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use scheduler::PersistenceScheduler;
pub use scope::{Generation, ScopeResolver};
pub use sink::{ApplicationSink, TracingSink};
pub use store::memory::MemorySettingsStore;
pub use store::postgres::PgSettingsStore;
pub use store::{MembershipDirectory, PrincipalRecord, RemoteSettingsStore};
