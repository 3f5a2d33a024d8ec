//! Settings record model (`tenant_settings` table).

use serde::Serialize;
use sqlx::FromRow;
use scopesync_core::types::{DbId, Timestamp};

/// A row from the `tenant_settings` table.
///
/// `principal_id` is `None` for the tenant-wide default record. `settings`
/// holds a partial configuration document in camelCase JSON.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SettingsRecord {
    pub id: DbId,
    pub tenant_id: DbId,
    pub principal_id: Option<DbId>,
    pub settings: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
