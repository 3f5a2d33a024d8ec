//! Remote load pipeline for one scope.
//!
//! Issues the tenant-wide read, the principal read and the role lookup
//! concurrently, then applies the legacy branding fallback. Nothing here
//! touches engine state; the caller commits the result only if its
//! generation is still current.

use std::collections::HashSet;

use scopesync_core::roles::PermissionGate;
use scopesync_core::scope::ScopeKey;
use scopesync_core::settings::{ColorMap, SettingsOverlay};
use scopesync_core::types::{PrincipalId, TenantId};

use crate::store::{MembershipDirectory, RemoteSettingsStore};

/// How many of the primary reads succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Both record reads succeeded (records may still be absent).
    Complete,
    /// One record read failed and is treated as absent.
    Partial,
    /// Both record reads failed; there is no baseline to commit.
    Failed,
}

/// Everything the remote side knows about a scope.
#[derive(Debug, Clone)]
pub struct LoadedSources {
    /// Tenant-wide record, possibly with synthesized fallback colors.
    pub tenant: Option<SettingsOverlay>,
    pub principal: Option<SettingsOverlay>,
    /// The principal's role in the tenant, `None` if unknown.
    pub role: Option<String>,
    /// Principal whose colors were adopted as the tenant default.
    pub fallback_from: Option<PrincipalId>,
    pub outcome: FetchOutcome,
}

/// Fetch the tenant-wide record, principal record and role for `scope`.
///
/// Read failures are logged and treated as absent data.
pub async fn fetch_scope(
    store: &dyn RemoteSettingsStore,
    directory: &dyn MembershipDirectory,
    gate: &PermissionGate,
    scope: ScopeKey,
    fallback_window: i64,
) -> LoadedSources {
    let ScopeKey {
        tenant_id,
        principal_id,
    } = scope;

    let (tenant_res, principal_res, role_res) = tokio::join!(
        store.get(tenant_id, None),
        store.get(tenant_id, Some(principal_id)),
        directory.role_of(tenant_id, principal_id),
    );

    let failures = usize::from(tenant_res.is_err()) + usize::from(principal_res.is_err());
    let outcome = match failures {
        0 => FetchOutcome::Complete,
        1 => FetchOutcome::Partial,
        _ => FetchOutcome::Failed,
    };

    let mut tenant = tenant_res.unwrap_or_else(|e| {
        tracing::warn!(tenant_id, error = %e, "Failed to read tenant-wide settings");
        None
    });
    let principal = principal_res.unwrap_or_else(|e| {
        tracing::warn!(tenant_id, principal_id, error = %e, "Failed to read principal settings");
        None
    });
    let role = role_res.unwrap_or_else(|e| {
        tracing::warn!(tenant_id, principal_id, error = %e, "Failed to look up tenant role");
        None
    });

    // An explicit empty map on the tenant record means branding was cleared.
    let tenant_sets_colors = tenant.as_ref().is_some_and(|t| t.custom_colors.is_some());
    let mut fallback_from = None;
    if outcome != FetchOutcome::Failed && !tenant_sets_colors {
        if let Some((source, colors)) =
            find_fallback_colors(store, directory, gate, tenant_id, fallback_window).await
        {
            tracing::info!(
                tenant_id,
                source_principal_id = source,
                "Adopting elevated principal's colors as tenant default"
            );
            tenant.get_or_insert_with(SettingsOverlay::default).custom_colors = Some(colors);
            fallback_from = Some(source);
        }
    }

    LoadedSources {
        tenant,
        principal,
        role,
        fallback_from,
        outcome,
    }
}

/// Find the most recently updated elevated principal record that carries
/// colors.
///
/// Covers tenants where a privileged user only ever saved personal branding
/// and no shared default exists.
pub async fn find_fallback_colors(
    store: &dyn RemoteSettingsStore,
    directory: &dyn MembershipDirectory,
    gate: &PermissionGate,
    tenant_id: TenantId,
    window: i64,
) -> Option<(PrincipalId, ColorMap)> {
    let (recent, elevated) = tokio::join!(
        store.list_recent(tenant_id, window),
        directory.principals_with_roles(tenant_id, gate.elevated_roles()),
    );

    let recent = recent
        .map_err(|e| tracing::warn!(tenant_id, error = %e, "Fallback: failed to list recent records"))
        .ok()?;
    let elevated: HashSet<PrincipalId> = elevated
        .map_err(|e| tracing::warn!(tenant_id, error = %e, "Fallback: failed to list elevated principals"))
        .ok()?
        .into_iter()
        .collect();

    recent
        .into_iter()
        .filter(|r| elevated.contains(&r.principal_id))
        .find(|r| r.settings.has_custom_colors())
        .and_then(|r| Some((r.principal_id, r.settings.custom_colors?)))
}
