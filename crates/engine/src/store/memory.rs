//! In-process settings store and membership directory.
//!
//! Behaves like the Postgres adapter (one record per key, top-level merge on
//! `update`) and keeps a log of every write so callers can inspect what
//! would have been sent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use scopesync_core::error::CoreError;
use scopesync_core::settings::SettingsOverlay;
use scopesync_core::types::{PrincipalId, TenantId, Timestamp};

use super::{MembershipDirectory, PrincipalRecord, RemoteSettingsStore};
use crate::error::{SyncError, SyncResult};

type RecordKey = (TenantId, Option<PrincipalId>);

/// A write the store received.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    Upsert {
        tenant_id: TenantId,
        principal_id: PrincipalId,
        settings: SettingsOverlay,
    },
    Insert {
        tenant_id: TenantId,
        principal_id: Option<PrincipalId>,
        settings: SettingsOverlay,
    },
    Update {
        tenant_id: TenantId,
        principal_id: Option<PrincipalId>,
        settings: SettingsOverlay,
    },
}

impl StoreWrite {
    /// Returns `true` for writes addressed to the tenant-wide record.
    pub fn is_tenant_wide(&self) -> bool {
        match self {
            StoreWrite::Upsert { .. } => false,
            StoreWrite::Insert { principal_id, .. } | StoreWrite::Update { principal_id, .. } => {
                principal_id.is_none()
            }
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    records: HashMap<RecordKey, (SettingsOverlay, Timestamp)>,
    members: HashMap<(TenantId, PrincipalId), String>,
    writes: Vec<StoreWrite>,
}

/// In-memory [`RemoteSettingsStore`] and [`MembershipDirectory`].
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    tables: Mutex<Tables>,
    reads: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed or replace a record with an explicit update time.
    pub fn put_record(
        &self,
        tenant_id: TenantId,
        principal_id: Option<PrincipalId>,
        settings: SettingsOverlay,
        updated_at: Timestamp,
    ) {
        self.tables()
            .records
            .insert((tenant_id, principal_id), (settings, updated_at));
    }

    /// Seed a tenant membership.
    pub fn put_member(&self, tenant_id: TenantId, principal_id: PrincipalId, role: &str) {
        self.tables()
            .members
            .insert((tenant_id, principal_id), role.to_string());
    }

    /// Current content of a record.
    pub fn record(
        &self,
        tenant_id: TenantId,
        principal_id: Option<PrincipalId>,
    ) -> Option<SettingsOverlay> {
        self.tables()
            .records
            .get(&(tenant_id, principal_id))
            .map(|(s, _)| s.clone())
    }

    /// Every write received so far, in order.
    pub fn writes(&self) -> Vec<StoreWrite> {
        self.tables().writes.clone()
    }

    /// Number of read calls (`get`, `list_recent`, `exists`) served.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Make every read fail with [`SyncError::Unavailable`].
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail with [`SyncError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn begin_read(&self) -> SyncResult<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SyncError::Unavailable("reads disabled".into()));
        }
        Ok(())
    }

    fn begin_write(&self) -> SyncResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SyncError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }
}

/// Top-level key merge, the same semantics as Postgres `jsonb || jsonb`.
fn merge_top_level(base: &SettingsOverlay, patch: &SettingsOverlay) -> SyncResult<SettingsOverlay> {
    let mut doc = serde_json::to_value(base)?;
    if let (Some(target), serde_json::Value::Object(fields)) =
        (doc.as_object_mut(), serde_json::to_value(patch)?)
    {
        target.extend(fields);
    }
    Ok(serde_json::from_value(doc)?)
}

#[async_trait]
impl RemoteSettingsStore for MemorySettingsStore {
    async fn get(
        &self,
        tenant_id: TenantId,
        principal_id: Option<PrincipalId>,
    ) -> SyncResult<Option<SettingsOverlay>> {
        self.begin_read()?;
        Ok(self.record(tenant_id, principal_id))
    }

    async fn list_recent(
        &self,
        tenant_id: TenantId,
        limit: i64,
    ) -> SyncResult<Vec<PrincipalRecord>> {
        self.begin_read()?;
        let mut records: Vec<PrincipalRecord> = self
            .tables()
            .records
            .iter()
            .filter_map(|((tenant, principal), (settings, updated_at))| match principal {
                Some(principal_id) if *tenant == tenant_id => Some(PrincipalRecord {
                    principal_id: *principal_id,
                    settings: settings.clone(),
                    updated_at: *updated_at,
                }),
                _ => None,
            })
            .collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        records.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(records)
    }

    async fn upsert(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
        settings: &SettingsOverlay,
    ) -> SyncResult<()> {
        self.begin_write()?;
        let mut tables = self.tables();
        tables.writes.push(StoreWrite::Upsert {
            tenant_id,
            principal_id,
            settings: settings.clone(),
        });
        tables
            .records
            .insert((tenant_id, Some(principal_id)), (settings.clone(), Utc::now()));
        Ok(())
    }

    async fn exists(
        &self,
        tenant_id: TenantId,
        principal_id: Option<PrincipalId>,
    ) -> SyncResult<bool> {
        self.begin_read()?;
        Ok(self.tables().records.contains_key(&(tenant_id, principal_id)))
    }

    async fn insert(
        &self,
        tenant_id: TenantId,
        principal_id: Option<PrincipalId>,
        settings: &SettingsOverlay,
    ) -> SyncResult<()> {
        self.begin_write()?;
        let mut tables = self.tables();
        if tables.records.contains_key(&(tenant_id, principal_id)) {
            return Err(SyncError::Core(CoreError::Conflict(
                format!("settings record for tenant {tenant_id} already exists"),
            )));
        }
        tables.writes.push(StoreWrite::Insert {
            tenant_id,
            principal_id,
            settings: settings.clone(),
        });
        tables
            .records
            .insert((tenant_id, principal_id), (settings.clone(), Utc::now()));
        Ok(())
    }

    async fn update(
        &self,
        tenant_id: TenantId,
        principal_id: Option<PrincipalId>,
        settings: &SettingsOverlay,
    ) -> SyncResult<()> {
        self.begin_write()?;
        let mut tables = self.tables();
        let Some((current, _)) = tables.records.get(&(tenant_id, principal_id)) else {
            return Err(SyncError::Core(CoreError::NotFound {
                entity: "SettingsRecord",
                id: tenant_id,
            }));
        };
        let merged = merge_top_level(current, settings)?;
        tables.writes.push(StoreWrite::Update {
            tenant_id,
            principal_id,
            settings: settings.clone(),
        });
        tables
            .records
            .insert((tenant_id, principal_id), (merged, Utc::now()));
        Ok(())
    }
}

#[async_trait]
impl MembershipDirectory for MemorySettingsStore {
    async fn role_of(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
    ) -> SyncResult<Option<String>> {
        self.begin_read()?;
        Ok(self.tables().members.get(&(tenant_id, principal_id)).cloned())
    }

    async fn principals_with_roles(
        &self,
        tenant_id: TenantId,
        roles: &[String],
    ) -> SyncResult<Vec<PrincipalId>> {
        self.begin_read()?;
        let mut ids: Vec<PrincipalId> = self
            .tables()
            .members
            .iter()
            .filter(|((tenant, _), role)| {
                *tenant == tenant_id && roles.iter().any(|r| r.eq_ignore_ascii_case(role))
            })
            .map(|((_, principal), _)| *principal)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}
