//! Repository for the `tenant_settings` table.
//!
//! The tenant-wide record is keyed by `principal_id IS NULL`. Because a NULL
//! key is not a stable `ON CONFLICT` target, only principal records are
//! upserted; the tenant-wide record is written with an explicit
//! [`exists`](SettingsRepo::exists) check followed by
//! [`insert`](SettingsRepo::insert) or [`merge_update`](SettingsRepo::merge_update).

use sqlx::PgPool;
use scopesync_core::types::DbId;

use crate::models::settings_record::SettingsRecord;

/// Column list for `tenant_settings` queries.
const COLUMNS: &str = "id, tenant_id, principal_id, settings, created_at, updated_at";

/// Provides data access for settings records.
pub struct SettingsRepo;

impl SettingsRepo {
    /// Find the record for a tenant and principal (`None` = tenant-wide).
    pub async fn find(
        pool: &PgPool,
        tenant_id: DbId,
        principal_id: Option<DbId>,
    ) -> Result<Option<SettingsRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tenant_settings \
             WHERE tenant_id = $1 AND principal_id IS NOT DISTINCT FROM $2"
        );
        sqlx::query_as::<_, SettingsRecord>(&query)
            .bind(tenant_id)
            .bind(principal_id)
            .fetch_optional(pool)
            .await
    }

    /// Returns `true` if a record exists for the tenant and principal.
    pub async fn exists(
        pool: &PgPool,
        tenant_id: DbId,
        principal_id: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM tenant_settings \
             WHERE tenant_id = $1 AND principal_id IS NOT DISTINCT FROM $2)",
        )
        .bind(tenant_id)
        .bind(principal_id)
        .fetch_one(pool)
        .await
    }

    /// List principal-specific records of a tenant, most recently updated first.
    pub async fn list_recent_principal_records(
        pool: &PgPool,
        tenant_id: DbId,
        limit: i64,
    ) -> Result<Vec<SettingsRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tenant_settings \
             WHERE tenant_id = $1 AND principal_id IS NOT NULL \
             ORDER BY updated_at DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, SettingsRecord>(&query)
            .bind(tenant_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Insert or replace a principal-specific record.
    ///
    /// The whole `settings` document is replaced, not merged.
    pub async fn upsert_principal(
        pool: &PgPool,
        tenant_id: DbId,
        principal_id: DbId,
        settings: &serde_json::Value,
    ) -> Result<SettingsRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO tenant_settings (tenant_id, principal_id, settings) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (tenant_id, principal_id) WHERE principal_id IS NOT NULL \
             DO UPDATE SET settings = EXCLUDED.settings \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SettingsRecord>(&query)
            .bind(tenant_id)
            .bind(principal_id)
            .bind(settings)
            .fetch_one(pool)
            .await
    }

    /// Insert a new record.
    pub async fn insert(
        pool: &PgPool,
        tenant_id: DbId,
        principal_id: Option<DbId>,
        settings: &serde_json::Value,
    ) -> Result<SettingsRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO tenant_settings (tenant_id, principal_id, settings) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SettingsRecord>(&query)
            .bind(tenant_id)
            .bind(principal_id)
            .bind(settings)
            .fetch_one(pool)
            .await
    }

    /// Merge the top-level keys of `settings` into an existing record.
    ///
    /// Keys not present in `settings` are left untouched. Returns `None` if
    /// no record matched.
    pub async fn merge_update(
        pool: &PgPool,
        tenant_id: DbId,
        principal_id: Option<DbId>,
        settings: &serde_json::Value,
    ) -> Result<Option<SettingsRecord>, sqlx::Error> {
        let query = format!(
            "UPDATE tenant_settings SET settings = settings || $3 \
             WHERE tenant_id = $1 AND principal_id IS NOT DISTINCT FROM $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SettingsRecord>(&query)
            .bind(tenant_id)
            .bind(principal_id)
            .bind(settings)
            .fetch_optional(pool)
            .await
    }
}
