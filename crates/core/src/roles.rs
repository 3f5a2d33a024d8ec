//! Well-known tenant role names and the settings write permission gate.
//!
//! Role vocabulary is owned by the identity subsystem; these constants match
//! the values seeded into `tenant_members.role`.

use crate::settings::SettingsField;

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_ADMINISTRATOR: &str = "administrator";
pub const ROLE_CONTROLLER: &str = "controller";
pub const ROLE_MEMBER: &str = "member";

/// Roles allowed to write shared tenant branding unless configured otherwise.
pub const DEFAULT_ELEVATED_ROLES: &[&str] =
    &[ROLE_OWNER, ROLE_ADMIN, ROLE_ADMINISTRATOR, ROLE_CONTROLLER];

/// Decides which settings fields a principal may persist.
///
/// Only [`SettingsField::CustomColors`] is gated: it feeds the tenant-wide
/// record, so it requires an elevated role. Every other field is always
/// writable by the owning principal to their own record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGate {
    elevated: Vec<String>,
}

impl PermissionGate {
    /// Build a gate from an explicit elevated role set.
    pub fn new<I, S>(elevated: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            elevated: elevated.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if `role` belongs to the elevated set.
    ///
    /// Comparison is case-insensitive; a missing role is never elevated.
    pub fn is_elevated(&self, role: Option<&str>) -> bool {
        match role {
            Some(role) => self
                .elevated
                .iter()
                .any(|r| r.eq_ignore_ascii_case(role.trim())),
            None => false,
        }
    }

    /// Returns `true` if a principal holding `role` may persist `field`.
    pub fn allows(&self, field: SettingsField, role: Option<&str>) -> bool {
        match field {
            SettingsField::CustomColors => self.is_elevated(role),
            _ => true,
        }
    }

    /// The configured elevated role names.
    pub fn elevated_roles(&self) -> &[String] {
        &self.elevated
    }
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new(DEFAULT_ELEVATED_ROLES.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_gate_elevates_privileged_roles() {
        let gate = PermissionGate::default();
        assert!(gate.is_elevated(Some(ROLE_OWNER)));
        assert!(gate.is_elevated(Some(ROLE_ADMIN)));
        assert!(gate.is_elevated(Some(ROLE_ADMINISTRATOR)));
        assert!(gate.is_elevated(Some(ROLE_CONTROLLER)));
    }

    #[test]
    fn test_ordinary_and_missing_roles_are_not_elevated() {
        let gate = PermissionGate::default();
        assert!(!gate.is_elevated(Some(ROLE_MEMBER)));
        assert!(!gate.is_elevated(Some("")));
        assert!(!gate.is_elevated(None));
    }

    #[test]
    fn test_role_comparison_ignores_case_and_whitespace() {
        let gate = PermissionGate::default();
        assert!(gate.is_elevated(Some(" Owner ")));
    }

    #[test]
    fn test_only_custom_colors_is_gated() {
        let gate = PermissionGate::default();
        assert!(!gate.allows(SettingsField::CustomColors, Some(ROLE_MEMBER)));
        assert!(gate.allows(SettingsField::CustomColors, Some(ROLE_OWNER)));
        assert!(gate.allows(SettingsField::DateFormat, Some(ROLE_MEMBER)));
        assert!(gate.allows(SettingsField::Notifications, None));
    }

    #[test]
    fn test_custom_elevated_set_replaces_defaults() {
        let gate = PermissionGate::new(["brand-manager"]);
        assert!(gate.is_elevated(Some("brand-manager")));
        assert!(!gate.is_elevated(Some(ROLE_OWNER)));
        assert_eq!(gate.elevated_roles(), ["brand-manager".to_string()]);
    }
}
