//! Postgres-backed store over the `scopesync-db` repositories.

use async_trait::async_trait;
use scopesync_core::error::CoreError;
use scopesync_core::settings::SettingsOverlay;
use scopesync_core::types::{PrincipalId, TenantId};
use scopesync_db::models::settings_record::SettingsRecord;
use scopesync_db::repositories::{MemberRepo, SettingsRepo};
use scopesync_db::DbPool;

use super::{MembershipDirectory, PrincipalRecord, RemoteSettingsStore};
use crate::error::SyncResult;

/// Settings store and membership directory backed by one connection pool.
#[derive(Debug, Clone)]
pub struct PgSettingsStore {
    pool: DbPool,
}

impl PgSettingsStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode(record: SettingsRecord) -> SyncResult<SettingsOverlay> {
    Ok(serde_json::from_value(record.settings)?)
}

#[async_trait]
impl RemoteSettingsStore for PgSettingsStore {
    async fn get(
        &self,
        tenant_id: TenantId,
        principal_id: Option<PrincipalId>,
    ) -> SyncResult<Option<SettingsOverlay>> {
        SettingsRepo::find(&self.pool, tenant_id, principal_id)
            .await?
            .map(decode)
            .transpose()
    }

    async fn list_recent(
        &self,
        tenant_id: TenantId,
        limit: i64,
    ) -> SyncResult<Vec<PrincipalRecord>> {
        let rows = SettingsRepo::list_recent_principal_records(&self.pool, tenant_id, limit).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(principal_id) = row.principal_id else {
                continue;
            };
            let updated_at = row.updated_at;
            // One undecodable legacy record must not hide the others.
            match decode(row) {
                Ok(settings) => records.push(PrincipalRecord {
                    principal_id,
                    settings,
                    updated_at,
                }),
                Err(e) => tracing::warn!(
                    tenant_id,
                    principal_id,
                    error = %e,
                    "Skipping undecodable settings record"
                ),
            }
        }
        Ok(records)
    }

    async fn upsert(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
        settings: &SettingsOverlay,
    ) -> SyncResult<()> {
        let doc = serde_json::to_value(settings)?;
        SettingsRepo::upsert_principal(&self.pool, tenant_id, principal_id, &doc).await?;
        Ok(())
    }

    async fn exists(
        &self,
        tenant_id: TenantId,
        principal_id: Option<PrincipalId>,
    ) -> SyncResult<bool> {
        Ok(SettingsRepo::exists(&self.pool, tenant_id, principal_id).await?)
    }

    async fn insert(
        &self,
        tenant_id: TenantId,
        principal_id: Option<PrincipalId>,
        settings: &SettingsOverlay,
    ) -> SyncResult<()> {
        let doc = serde_json::to_value(settings)?;
        SettingsRepo::insert(&self.pool, tenant_id, principal_id, &doc).await?;
        Ok(())
    }

    async fn update(
        &self,
        tenant_id: TenantId,
        principal_id: Option<PrincipalId>,
        settings: &SettingsOverlay,
    ) -> SyncResult<()> {
        let doc = serde_json::to_value(settings)?;
        SettingsRepo::merge_update(&self.pool, tenant_id, principal_id, &doc)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "SettingsRecord",
                id: tenant_id,
            })?;
        Ok(())
    }
}

#[async_trait]
impl MembershipDirectory for PgSettingsStore {
    async fn role_of(
        &self,
        tenant_id: TenantId,
        principal_id: PrincipalId,
    ) -> SyncResult<Option<String>> {
        Ok(MemberRepo::find(&self.pool, tenant_id, principal_id)
            .await?
            .map(|m| m.role))
    }

    async fn principals_with_roles(
        &self,
        tenant_id: TenantId,
        roles: &[String],
    ) -> SyncResult<Vec<PrincipalId>> {
        Ok(MemberRepo::list_principals_with_roles(&self.pool, tenant_id, roles).await?)
    }
}
