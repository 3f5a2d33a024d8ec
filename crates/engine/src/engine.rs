//! The [`SyncEngine`] facade.
//!
//! Owns the single state lock. The generation bump on a scope change, every
//! load commit check and every sink push happen while that lock is held, so
//! work started under an older generation can never overwrite what a newer
//! one applied.

use std::collections::BTreeSet;
use std::sync::{Arc, Weak};

use scopesync_core::merge::merge;
use scopesync_core::roles::PermissionGate;
use scopesync_core::scope::ScopeKey;
use scopesync_core::settings::{Settings, SettingsField, SettingsOverlay};
use scopesync_core::types::{PrincipalId, TenantId};
use scopesync_events::bus::{
    SCOPE_CHANGED, SCOPE_CLEARED, SETTINGS_HYDRATED, SETTINGS_LOADED, SETTINGS_LOAD_FAILED,
    SETTINGS_PERSISTED, SETTINGS_PERSIST_FAILED, SETTINGS_STALE_DISCARDED,
};
use scopesync_events::{EventBus, SettingsEvent};
use serde_json::json;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::cache::{self, CacheStore};
use crate::config::EngineConfig;
use crate::error::SyncResult;
use crate::loader::{fetch_scope, FetchOutcome};
use crate::scheduler::PersistenceScheduler;
use crate::scope::{Generation, ScopeChange, ScopeResolver};
use crate::sink::{clear_colors, push_colors, ApplicationSink};
use crate::store::{MembershipDirectory, RemoteSettingsStore};

/// Where the current scope's settings came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// No scope, or a scope whose load has not produced anything yet.
    Idle,
    /// Painted from the local cache; the remote load is still running.
    Hydrated,
    /// Remote load committed. Only this state allows persistence.
    Loaded,
    /// Both remote reads failed. Persistence stays blocked until a reload.
    Failed,
}

impl LoadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Hydrated => "hydrated",
            Self::Loaded => "loaded",
            Self::Failed => "failed",
        }
    }
}

struct EngineState {
    resolver: ScopeResolver,
    status: LoadStatus,
    role: Option<String>,
    /// Tenant-wide record (or synthesized fallback) for the current scope.
    tenant: Option<SettingsOverlay>,
    /// Principal record with local edits layered on top.
    principal: SettingsOverlay,
    /// Edits made before the remote load committed, replayed over it.
    pending: SettingsOverlay,
    /// An elevated color edit has not reached the tenant-wide record yet.
    colors_dirty: bool,
    effective: Settings,
    /// Color roles currently set on the sink.
    applied: BTreeSet<String>,
}

struct Inner {
    config: EngineConfig,
    gate: PermissionGate,
    defaults: Settings,
    store: Arc<dyn RemoteSettingsStore>,
    directory: Arc<dyn MembershipDirectory>,
    cache: Arc<dyn CacheStore>,
    sink: Arc<dyn ApplicationSink>,
    events: EventBus,
    state: Mutex<EngineState>,
}

/// Scoped settings synchronization engine.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
    scheduler: Arc<PersistenceScheduler>,
}

impl SyncEngine {
    /// Build an engine and spawn its persistence task.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn RemoteSettingsStore>,
        directory: Arc<dyn MembershipDirectory>,
        cache: Arc<dyn CacheStore>,
        sink: Arc<dyn ApplicationSink>,
    ) -> Self {
        let defaults = Settings::default();
        let inner = Arc::new(Inner {
            gate: config.permission_gate(),
            config,
            defaults: defaults.clone(),
            store,
            directory,
            cache,
            sink,
            events: EventBus::default(),
            state: Mutex::new(EngineState {
                resolver: ScopeResolver::new(),
                status: LoadStatus::Idle,
                role: None,
                tenant: None,
                principal: SettingsOverlay::default(),
                pending: SettingsOverlay::default(),
                colors_dirty: false,
                effective: defaults,
                applied: BTreeSet::new(),
            }),
        });

        let weak: Weak<Inner> = Arc::downgrade(&inner);
        let scheduler = PersistenceScheduler::spawn(inner.config.debounce, move |tag| {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.flush(tag).await;
                }
            }
        });

        Self {
            inner,
            scheduler: Arc::new(scheduler),
        }
    }

    /// Feed the active tenant and principal identities.
    ///
    /// Returns the handle of the spawned load task when both identities are
    /// present and differ from the current ones. Absent identities reset the
    /// engine to defaults and clear every color override.
    pub async fn set_scope(
        &self,
        tenant_id: Option<TenantId>,
        principal_id: Option<PrincipalId>,
    ) -> Option<JoinHandle<()>> {
        let mut state = self.inner.state.lock().await;
        let change = state.resolver.resolve(tenant_id, principal_id);
        self.inner.enter(&mut state, change, &self.scheduler)
    }

    /// Re-run the load pipeline for the current scope under a new generation.
    pub async fn reload(&self) -> Option<JoinHandle<()>> {
        let mut state = self.inner.state.lock().await;
        let change = state.resolver.renew();
        self.inner.enter(&mut state, change, &self.scheduler)
    }

    /// Apply a local edit and schedule its write-back.
    ///
    /// The edit is visible immediately. It is persisted once the debounce
    /// window elapses, provided the scope is still the same and fully loaded.
    /// Edits made while the load is in flight are replayed over the remote
    /// records when it commits and written after that. Edits without an
    /// active scope are ignored.
    pub async fn mutate(&self, patch: SettingsOverlay) -> SyncResult<()> {
        patch.validate()?;
        if patch.is_empty() {
            return Ok(());
        }

        let mut state = self.inner.state.lock().await;
        if state.resolver.current().is_none() {
            tracing::debug!("Ignoring settings edit without an active scope");
            return Ok(());
        }

        state.principal.layer(&patch);
        if matches!(state.status, LoadStatus::Idle | LoadStatus::Hydrated) {
            state.pending.layer(&patch);
        }
        self.inner.share_colors(&mut state, &patch);
        self.inner.apply(&mut state);

        let generation = state.resolver.generation();
        drop(state);

        if !self.scheduler.schedule(generation) {
            tracing::warn!(%generation, "Persistence scheduler stopped; edit will not be saved");
        }
        Ok(())
    }

    /// The current effective settings.
    pub async fn effective(&self) -> Settings {
        self.inner.state.lock().await.effective.clone()
    }

    pub async fn status(&self) -> LoadStatus {
        self.inner.state.lock().await.status
    }

    pub async fn generation(&self) -> Generation {
        self.inner.state.lock().await.resolver.generation()
    }

    /// The principal's role in the current tenant, if known.
    pub async fn role(&self) -> Option<String> {
        self.inner.state.lock().await.role.clone()
    }

    /// Subscribe to engine lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SettingsEvent> {
        self.inner.events.subscribe()
    }

    /// Stop the persistence task, flushing a pending edit first.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
        tracing::info!("Settings engine stopped");
    }
}

impl Inner {
    /// Act on a resolver outcome. Runs with the state lock held.
    fn enter(
        self: &Arc<Self>,
        state: &mut EngineState,
        change: ScopeChange,
        scheduler: &Arc<PersistenceScheduler>,
    ) -> Option<JoinHandle<()>> {
        match change {
            ScopeChange::Unchanged => None,
            ScopeChange::Cleared { generation } => {
                self.reset(state);
                tracing::info!(%generation, "Scope cleared; settings reset to defaults");
                self.events
                    .publish(SettingsEvent::new(SCOPE_CLEARED, generation.get()));
                None
            }
            ScopeChange::Active { scope, generation } => {
                self.reset(state);
                tracing::info!(
                    tenant_id = scope.tenant_id,
                    principal_id = scope.principal_id,
                    %generation,
                    "Scope changed"
                );
                self.events
                    .publish(SettingsEvent::new(SCOPE_CHANGED, generation.get()).with_scope(scope));
                self.hydrate(state, scope, generation);

                let inner = Arc::clone(self);
                let scheduler = Arc::clone(scheduler);
                Some(tokio::spawn(async move {
                    if inner.load(scope, generation).await && !scheduler.schedule(generation) {
                        tracing::warn!(%generation, "Persistence scheduler stopped; edits will not be saved");
                    }
                }))
            }
        }
    }

    /// Drop everything scope-specific and clear the sink.
    fn reset(&self, state: &mut EngineState) {
        state.status = LoadStatus::Idle;
        state.role = None;
        state.tenant = None;
        state.principal = SettingsOverlay::default();
        state.pending = SettingsOverlay::default();
        state.colors_dirty = false;
        state.effective = self.defaults.clone();
        clear_colors(&*self.sink, &state.applied);
        state.applied.clear();
    }

    /// Paint the cached entry for `scope`, if any.
    fn hydrate(&self, state: &mut EngineState, scope: ScopeKey, generation: Generation) {
        let key = scope.cache_key(&self.config.cache_namespace);
        let Some(cached) = cache::hydrate(&*self.cache, &key) else {
            return;
        };
        state.principal = SettingsOverlay::from(&cached);
        self.apply(state);
        state.status = LoadStatus::Hydrated;
        tracing::debug!(cache_key = %key, %generation, "Settings hydrated from cache");
        self.events
            .publish(SettingsEvent::new(SETTINGS_HYDRATED, generation.get()).with_scope(scope));
    }

    /// Mirror a permitted color edit into the tenant-wide snapshot and mark
    /// it for the next flush.
    fn share_colors(&self, state: &mut EngineState, patch: &SettingsOverlay) {
        if patch.custom_colors.is_none()
            || !self.gate.allows(SettingsField::CustomColors, state.role.as_deref())
        {
            return;
        }
        state
            .tenant
            .get_or_insert_with(SettingsOverlay::default)
            .custom_colors
            .clone_from(&patch.custom_colors);
        state.colors_dirty = true;
    }

    /// Recompute the effective settings and push colors to the sink.
    fn apply(&self, state: &mut EngineState) {
        state.effective = merge(&self.defaults, state.tenant.as_ref(), Some(&state.principal));
        state.applied = push_colors(&*self.sink, &state.applied, &state.effective.custom_colors);
    }

    /// Fetch and commit the remote records for `scope`.
    ///
    /// Returns `true` when edits made during the load were replayed and
    /// still need a write.
    async fn load(&self, scope: ScopeKey, generation: Generation) -> bool {
        let sources = fetch_scope(
            &*self.store,
            &*self.directory,
            &self.gate,
            scope,
            self.config.fallback_window,
        )
        .await;

        let mut state = self.state.lock().await;
        if !state.resolver.is_current(generation) {
            tracing::debug!(
                tenant_id = scope.tenant_id,
                principal_id = scope.principal_id,
                %generation,
                current = %state.resolver.generation(),
                "Discarding stale settings load"
            );
            self.events.publish(
                SettingsEvent::new(SETTINGS_STALE_DISCARDED, generation.get())
                    .with_scope(scope)
                    .with_payload(json!({ "stage": "load" })),
            );
            return false;
        }

        if sources.outcome == FetchOutcome::Failed {
            state.status = LoadStatus::Failed;
            tracing::warn!(
                tenant_id = scope.tenant_id,
                principal_id = scope.principal_id,
                %generation,
                "Settings load failed; keeping current view"
            );
            self.events
                .publish(SettingsEvent::new(SETTINGS_LOAD_FAILED, generation.get()).with_scope(scope));
            return false;
        }

        let partial = sources.outcome == FetchOutcome::Partial;
        let pending = std::mem::take(&mut state.pending);
        let replayed = !pending.is_empty();
        state.role = sources.role;
        state.tenant = sources.tenant;
        state.principal = sources.principal.unwrap_or_default();
        state.principal.layer(&pending);
        self.share_colors(&mut state, &pending);
        self.apply(&mut state);
        cache::store(
            &*self.cache,
            &scope.cache_key(&self.config.cache_namespace),
            &state.effective,
        );
        state.status = LoadStatus::Loaded;

        tracing::info!(
            tenant_id = scope.tenant_id,
            principal_id = scope.principal_id,
            %generation,
            role = state.role.as_deref().unwrap_or("-"),
            partial,
            replayed,
            "Settings loaded"
        );
        self.events.publish(
            SettingsEvent::new(SETTINGS_LOADED, generation.get())
                .with_scope(scope)
                .with_payload(json!({
                    "role": state.role,
                    "fallbackFrom": sources.fallback_from,
                    "partial": partial,
                })),
        );
        replayed
    }

    /// Write back the settings in effect for the scope tagged `tag`.
    async fn flush(&self, tag: Generation) {
        let (scope, principal_payload, tenant_payload, snapshot) = {
            let mut state = self.state.lock().await;
            if !state.resolver.is_current(tag) {
                tracing::debug!(
                    %tag,
                    current = %state.resolver.generation(),
                    "Discarding stale settings write"
                );
                self.events.publish(
                    SettingsEvent::new(SETTINGS_STALE_DISCARDED, tag.get())
                        .with_payload(json!({ "stage": "persist" })),
                );
                return;
            }
            if state.status != LoadStatus::Loaded {
                tracing::debug!(
                    %tag,
                    status = state.status.as_str(),
                    "Skipping settings write before load completed"
                );
                return;
            }
            let Some(scope) = state.resolver.current() else {
                return;
            };

            let may_share = self
                .gate
                .allows(SettingsField::CustomColors, state.role.as_deref());
            let snapshot = state.effective.without_assets();
            let mut principal_payload = SettingsOverlay::from(&snapshot);
            if !may_share {
                principal_payload.custom_colors = None;
            }
            // A cleared map still has to reach the tenant-wide record.
            let colors_dirty = std::mem::take(&mut state.colors_dirty);
            let write_colors = colors_dirty || !snapshot.custom_colors.is_empty();
            let tenant_payload = (may_share && write_colors)
                .then(|| SettingsOverlay::colors_only(snapshot.custom_colors.clone()));
            (scope, principal_payload, tenant_payload, snapshot)
        };

        let ScopeKey {
            tenant_id,
            principal_id,
        } = scope;

        if let Some(payload) = tenant_payload {
            if let Err(e) = self.write_tenant_colors(tenant_id, &payload).await {
                tracing::error!(tenant_id, error = %e, "Failed to write tenant-wide colors");
                let mut state = self.state.lock().await;
                if state.resolver.is_current(tag) {
                    state.colors_dirty = true;
                }
                drop(state);
                self.events.publish(
                    SettingsEvent::new(SETTINGS_PERSIST_FAILED, tag.get())
                        .with_scope(scope)
                        .with_payload(json!({ "target": "tenant", "error": e.to_string() })),
                );
            }
        }

        match self
            .store
            .upsert(tenant_id, principal_id, &principal_payload)
            .await
        {
            Ok(()) => {
                let state = self.state.lock().await;
                if state.resolver.is_current(tag) {
                    cache::store(
                        &*self.cache,
                        &scope.cache_key(&self.config.cache_namespace),
                        &snapshot,
                    );
                }
                drop(state);
                tracing::info!(tenant_id, principal_id, %tag, "Settings persisted");
                self.events
                    .publish(SettingsEvent::new(SETTINGS_PERSISTED, tag.get()).with_scope(scope));
            }
            Err(e) => {
                tracing::error!(tenant_id, principal_id, error = %e, "Failed to persist settings");
                self.events.publish(
                    SettingsEvent::new(SETTINGS_PERSIST_FAILED, tag.get())
                        .with_scope(scope)
                        .with_payload(json!({ "target": "principal", "error": e.to_string() })),
                );
            }
        }
    }

    /// The tenant-wide record is created once and merged into afterwards.
    async fn write_tenant_colors(
        &self,
        tenant_id: TenantId,
        payload: &SettingsOverlay,
    ) -> SyncResult<()> {
        if self.store.exists(tenant_id, None).await? {
            self.store.update(tenant_id, None, payload).await
        } else {
            self.store.insert(tenant_id, None, payload).await
        }
    }
}
