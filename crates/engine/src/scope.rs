//! Scope resolution and the generation counter.
//!
//! Every change of tenant or principal identity bumps the [`Generation`].
//! Loads and pending writes carry the generation they were started under;
//! a completion whose tag no longer matches is stale and must be dropped.

use std::fmt;

use scopesync_core::scope::ScopeKey;
use scopesync_core::types::{PrincipalId, TenantId};

/// Monotonic scope-change counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn get(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of feeding an identity pair to the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeChange {
    /// Same identities as before; nothing happened.
    Unchanged,
    /// Both identities present; a load must start under `generation`.
    Active { scope: ScopeKey, generation: Generation },
    /// At least one identity absent; state must reset to defaults.
    Cleared { generation: Generation },
}

/// Derives the current scope from the active tenant and principal.
#[derive(Debug, Default)]
pub struct ScopeResolver {
    tenant_id: Option<TenantId>,
    principal_id: Option<PrincipalId>,
    generation: Generation,
}

impl ScopeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record new identities, bumping the generation if either changed.
    pub fn resolve(
        &mut self,
        tenant_id: Option<TenantId>,
        principal_id: Option<PrincipalId>,
    ) -> ScopeChange {
        if self.tenant_id == tenant_id && self.principal_id == principal_id {
            return ScopeChange::Unchanged;
        }
        self.tenant_id = tenant_id;
        self.principal_id = principal_id;
        self.generation = self.generation.next();
        self.classify()
    }

    /// Start a new generation for the same identities (used by reload).
    pub fn renew(&mut self) -> ScopeChange {
        self.generation = self.generation.next();
        self.classify()
    }

    fn classify(&self) -> ScopeChange {
        match ScopeKey::from_parts(self.tenant_id, self.principal_id) {
            Some(scope) => ScopeChange::Active {
                scope,
                generation: self.generation,
            },
            None => ScopeChange::Cleared {
                generation: self.generation,
            },
        }
    }

    /// The scope for the current identities, if both are present.
    pub fn current(&self) -> Option<ScopeKey> {
        ScopeKey::from_parts(self.tenant_id, self.principal_id)
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Returns `true` if work tagged with `tag` may still touch shared state.
    pub fn is_current(&self, tag: Generation) -> bool {
        self.generation == tag
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn first_full_identity_activates_generation_one() {
        let mut resolver = ScopeResolver::new();
        let change = resolver.resolve(Some(1), Some(10));
        assert_matches!(
            change,
            ScopeChange::Active { scope, generation } if scope == ScopeKey::new(1, 10) && generation.get() == 1
        );
    }

    #[test]
    fn same_identity_is_unchanged() {
        let mut resolver = ScopeResolver::new();
        resolver.resolve(Some(1), Some(10));
        assert_eq!(resolver.resolve(Some(1), Some(10)), ScopeChange::Unchanged);
        assert_eq!(resolver.generation().get(), 1);
    }

    #[test]
    fn every_change_bumps_once() {
        let mut resolver = ScopeResolver::new();
        resolver.resolve(Some(1), Some(10));
        resolver.resolve(Some(2), Some(10));
        resolver.resolve(Some(2), Some(11));
        assert_eq!(resolver.generation().get(), 3);
    }

    #[test]
    fn missing_identity_clears_scope_and_still_bumps() {
        let mut resolver = ScopeResolver::new();
        resolver.resolve(Some(1), Some(10));
        let change = resolver.resolve(None, Some(10));
        assert_matches!(change, ScopeChange::Cleared { generation } if generation.get() == 2);
        assert!(resolver.current().is_none());
    }

    #[test]
    fn stale_tags_are_rejected() {
        let mut resolver = ScopeResolver::new();
        resolver.resolve(Some(1), Some(10));
        let old = resolver.generation();
        resolver.resolve(Some(2), Some(10));
        assert!(!resolver.is_current(old));
        assert!(resolver.is_current(resolver.generation()));
    }

    #[test]
    fn renew_keeps_scope_with_new_generation() {
        let mut resolver = ScopeResolver::new();
        resolver.resolve(Some(1), Some(10));
        let change = resolver.renew();
        assert_matches!(change, ScopeChange::Active { generation, .. } if generation.get() == 2);
        assert_eq!(resolver.current(), Some(ScopeKey::new(1, 10)));
    }
}
