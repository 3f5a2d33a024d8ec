//! Scope identity: which tenant and which principal a configuration belongs to.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{PrincipalId, TenantId};

/// Default namespace prefix for local cache keys.
pub const DEFAULT_CACHE_NAMESPACE: &str = "settings";

/// The (tenant, principal) pair a configuration is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeKey {
    pub tenant_id: TenantId,
    pub principal_id: PrincipalId,
}

impl ScopeKey {
    pub fn new(tenant_id: TenantId, principal_id: PrincipalId) -> Self {
        Self {
            tenant_id,
            principal_id,
        }
    }

    /// Build a key only when both identities are present.
    pub fn from_parts(tenant_id: Option<TenantId>, principal_id: Option<PrincipalId>) -> Option<Self> {
        Some(Self::new(tenant_id?, principal_id?))
    }

    /// Local cache key in the form `"{namespace}:{tenant_id}:{principal_id}"`.
    pub fn cache_key(&self, namespace: &str) -> String {
        format!("{namespace}:{}:{}", self.tenant_id, self.principal_id)
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tenant {} / principal {}", self.tenant_id, self.principal_id)
    }
}
