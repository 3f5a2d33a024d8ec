//! Repository for the `tenant_members` table (read-only).

use sqlx::PgPool;
use scopesync_core::types::DbId;

use crate::models::tenant_member::TenantMember;

/// Column list for `tenant_members` queries.
const COLUMNS: &str = "tenant_id, principal_id, role, created_at";

/// Provides read access to tenant membership and roles.
pub struct MemberRepo;

impl MemberRepo {
    /// Find a principal's membership in a tenant.
    pub async fn find(
        pool: &PgPool,
        tenant_id: DbId,
        principal_id: DbId,
    ) -> Result<Option<TenantMember>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tenant_members WHERE tenant_id = $1 AND principal_id = $2"
        );
        sqlx::query_as::<_, TenantMember>(&query)
            .bind(tenant_id)
            .bind(principal_id)
            .fetch_optional(pool)
            .await
    }

    /// List ids of principals in a tenant whose role is one of `roles`.
    ///
    /// Role comparison is case-insensitive.
    pub async fn list_principals_with_roles(
        pool: &PgPool,
        tenant_id: DbId,
        roles: &[String],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let lowered: Vec<String> = roles.iter().map(|r| r.to_lowercase()).collect();
        sqlx::query_scalar::<_, DbId>(
            "SELECT principal_id FROM tenant_members \
             WHERE tenant_id = $1 AND lower(role) = ANY($2) \
             ORDER BY principal_id",
        )
        .bind(tenant_id)
        .bind(&lowered)
        .fetch_all(pool)
        .await
    }
}
