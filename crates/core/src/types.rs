/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Identifier of a tenant ("company").
pub type TenantId = DbId;

/// Identifier of a principal (user) within a tenant.
pub type PrincipalId = DbId;
