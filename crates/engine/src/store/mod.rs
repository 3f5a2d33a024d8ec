//! Remote collaborators: the settings record store and the membership
//! directory that supplies roles.

use async_trait::async_trait;
use scopesync_core::settings::SettingsOverlay;
use scopesync_core::types::{PrincipalId, TenantId, Timestamp};

use crate::error::SyncResult;

pub mod memory;
pub mod postgres;

/// A principal-specific record as returned by [`RemoteSettingsStore::list_recent`].
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalRecord {
    pub principal_id: PrincipalId,
    pub settings: SettingsOverlay,
    pub updated_at: Timestamp,
}

/// Read and write access to settings records.
///
/// `principal_id = None` addresses the tenant-wide record. Implementations
/// must keep at most one record per (tenant, principal) pair.
#[async_trait]
pub trait RemoteSettingsStore: Send + Sync {
    /// Fetch one record, `None` if it does not exist.
    async fn get(
        &self,
        tenant_id: TenantId,
        principal_id: Option<PrincipalId>,
    ) -> SyncResult<Option<SettingsOverlay>>;

    /// Principal-specific records of a tenant, most recently updated first.
    async fn list_recent(&self, tenant_id: TenantId, limit: i64)
        -> SyncResult<Vec<PrincipalRecord>>;

    /// Create or fully replace a principal-specific record.
    async fn upsert(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
        settings: &SettingsOverlay,
    ) -> SyncResult<()>;

    async fn exists(&self, tenant_id: TenantId, principal_id: Option<PrincipalId>)
        -> SyncResult<bool>;

    async fn insert(
        &self,
        tenant_id: TenantId,
        principal_id: Option<PrincipalId>,
        settings: &SettingsOverlay,
    ) -> SyncResult<()>;

    /// Replace the top-level fields present in `settings`, keep the rest.
    async fn update(
        &self,
        tenant_id: TenantId,
        principal_id: Option<PrincipalId>,
        settings: &SettingsOverlay,
    ) -> SyncResult<()>;
}

/// Tenant membership lookups owned by the identity subsystem.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    /// The principal's role in the tenant, `None` if not a member.
    async fn role_of(&self, tenant_id: TenantId, principal_id: PrincipalId)
        -> SyncResult<Option<String>>;

    /// Principals of the tenant holding any of `roles`.
    async fn principals_with_roles(
        &self,
        tenant_id: TenantId,
        roles: &[String],
    ) -> SyncResult<Vec<PrincipalId>>;
}
