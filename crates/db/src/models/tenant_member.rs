use serde::Serialize;
use sqlx::FromRow;
use scopesync_core::types::{DbId, Timestamp};

/// A row from the `tenant_members` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TenantMember {
    pub tenant_id: DbId,
    pub principal_id: DbId,
    pub role: String,
    pub created_at: Timestamp,
}
