//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use scopesync_core::settings::{ColorMap, SettingsOverlay};
use scopesync_core::types::{PrincipalId, TenantId};
use scopesync_engine::store::memory::StoreWrite;
use scopesync_events::SettingsEvent;
use tokio::sync::broadcast;
use scopesync_engine::{
    ApplicationSink, EngineConfig, MembershipDirectory, MemoryCacheStore, MemorySettingsStore,
    PrincipalRecord, RemoteSettingsStore, SyncEngine, SyncResult,
};

pub const TENANT_A: TenantId = 1;
pub const TENANT_B: TenantId = 2;
pub const OWNER: PrincipalId = 10;
pub const MEMBER: PrincipalId = 11;
pub const OTHER_MEMBER: PrincipalId = 12;

pub const DEBOUNCE: Duration = Duration::from_millis(1000);

pub fn colors(pairs: &[(&str, &str)]) -> ColorMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// Sink that keeps the current tokens and a log of every call.
#[derive(Default)]
pub struct RecordingSink {
    tokens: Mutex<BTreeMap<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn token(&self, role: &str) -> Option<String> {
        self.tokens.lock().unwrap().get(role).cloned()
    }

    pub fn tokens(&self) -> BTreeMap<String, String> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ApplicationSink for RecordingSink {
    fn set_token(&self, role: &str, token: &str) {
        self.tokens
            .lock()
            .unwrap()
            .insert(role.to_string(), token.to_string());
        self.calls.lock().unwrap().push(format!("set {role}={token}"));
    }

    fn remove_token(&self, role: &str) {
        self.tokens.lock().unwrap().remove(role);
        self.calls.lock().unwrap().push(format!("remove {role}"));
    }
}

// ---------------------------------------------------------------------------
// DelayedStore
// ---------------------------------------------------------------------------

/// Wraps a [`MemorySettingsStore`] and delays reads per tenant.
pub struct DelayedStore {
    pub inner: Arc<MemorySettingsStore>,
    delays: Mutex<HashMap<TenantId, Duration>>,
}

impl DelayedStore {
    pub fn new(inner: Arc<MemorySettingsStore>) -> Self {
        Self {
            inner,
            delays: Mutex::new(HashMap::new()),
        }
    }

    pub fn delay(&self, tenant_id: TenantId, delay: Duration) {
        self.delays.lock().unwrap().insert(tenant_id, delay);
    }

    async fn wait(&self, tenant_id: TenantId) {
        let delay = self.delays.lock().unwrap().get(&tenant_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RemoteSettingsStore for DelayedStore {
    async fn get(
        &self,
        tenant_id: TenantId,
        principal_id: Option<PrincipalId>,
    ) -> SyncResult<Option<SettingsOverlay>> {
        self.wait(tenant_id).await;
        self.inner.get(tenant_id, principal_id).await
    }

    async fn list_recent(&self, tenant_id: TenantId, limit: i64) -> SyncResult<Vec<PrincipalRecord>> {
        self.wait(tenant_id).await;
        self.inner.list_recent(tenant_id, limit).await
    }

    async fn upsert(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
        settings: &SettingsOverlay,
    ) -> SyncResult<()> {
        self.inner.upsert(tenant_id, principal_id, settings).await
    }

    async fn exists(&self, tenant_id: TenantId, principal_id: Option<PrincipalId>) -> SyncResult<bool> {
        self.inner.exists(tenant_id, principal_id).await
    }

    async fn insert(
        &self,
        tenant_id: TenantId,
        principal_id: Option<PrincipalId>,
        settings: &SettingsOverlay,
    ) -> SyncResult<()> {
        self.inner.insert(tenant_id, principal_id, settings).await
    }

    async fn update(
        &self,
        tenant_id: TenantId,
        principal_id: Option<PrincipalId>,
        settings: &SettingsOverlay,
    ) -> SyncResult<()> {
        self.inner.update(tenant_id, principal_id, settings).await
    }
}

#[async_trait]
impl MembershipDirectory for DelayedStore {
    async fn role_of(&self, tenant_id: TenantId, principal_id: PrincipalId) -> SyncResult<Option<String>> {
        self.wait(tenant_id).await;
        self.inner.role_of(tenant_id, principal_id).await
    }

    async fn principals_with_roles(
        &self,
        tenant_id: TenantId,
        roles: &[String],
    ) -> SyncResult<Vec<PrincipalId>> {
        self.inner.principals_with_roles(tenant_id, roles).await
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub engine: SyncEngine,
    pub store: Arc<MemorySettingsStore>,
    pub delayed: Arc<DelayedStore>,
    pub cache: Arc<MemoryCacheStore>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    /// Engine over a delayable in-memory store with one owner and two members
    /// in tenant A.
    pub fn new() -> Self {
        Self::with_cache(Arc::new(MemoryCacheStore::new()))
    }

    pub fn with_cache(cache: Arc<MemoryCacheStore>) -> Self {
        let store = Arc::new(MemorySettingsStore::new());
        store.put_member(TENANT_A, OWNER, "owner");
        store.put_member(TENANT_A, MEMBER, "member");
        store.put_member(TENANT_A, OTHER_MEMBER, "member");
        store.put_member(TENANT_B, OWNER, "member");

        let delayed = Arc::new(DelayedStore::new(Arc::clone(&store)));
        let sink = Arc::new(RecordingSink::default());
        let config = EngineConfig {
            debounce: DEBOUNCE,
            ..EngineConfig::default()
        };
        let engine = SyncEngine::new(
            config,
            delayed.clone(),
            delayed.clone(),
            cache.clone(),
            sink.clone(),
        );
        Self {
            engine,
            store,
            delayed,
            cache,
            sink,
        }
    }

    /// Seed the tenant-wide record.
    pub fn seed_tenant(&self, tenant_id: TenantId, settings: SettingsOverlay) {
        self.store.put_record(tenant_id, None, settings, Utc::now());
    }

    /// Switch scope and wait for the load to commit.
    pub async fn enter(&self, tenant_id: TenantId, principal_id: PrincipalId) {
        let handle = self
            .engine
            .set_scope(Some(tenant_id), Some(principal_id))
            .await
            .expect("scope change should start a load");
        handle.await.expect("load task panicked");
    }

    pub fn upserts(&self) -> Vec<StoreWrite> {
        self.store
            .writes()
            .into_iter()
            .filter(|w| matches!(w, StoreWrite::Upsert { .. }))
            .collect()
    }

    pub fn tenant_writes(&self) -> Vec<StoreWrite> {
        self.store
            .writes()
            .into_iter()
            .filter(StoreWrite::is_tenant_wide)
            .collect()
    }
}

/// Every event received so far, without waiting.
pub fn drain(rx: &mut broadcast::Receiver<SettingsEvent>) -> Vec<SettingsEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
