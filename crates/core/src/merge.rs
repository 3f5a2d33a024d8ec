//! Merge engine: built-in defaults < tenant-wide record < principal record.

use crate::settings::{ColorMap, Settings, SettingsOverlay};

/// Merge the three configuration sources into one effective [`Settings`].
///
/// Later sources override earlier ones field by field. After the generic
/// merge the effective color set is recomputed: a tenant-wide record that
/// defines colors wins outright, so principals cannot privately override
/// shared branding.
pub fn merge(
    defaults: &Settings,
    tenant: Option<&SettingsOverlay>,
    principal: Option<&SettingsOverlay>,
) -> Settings {
    let mut merged = defaults.clone();
    if let Some(tenant) = tenant {
        merged.apply(tenant);
    }
    if let Some(principal) = principal {
        merged.apply(principal);
    }
    if let Some(colors) = shared_colors(tenant) {
        merged.custom_colors = colors.clone();
    }
    merged
}

/// The tenant-wide color map if it is defined and non-empty.
pub fn shared_colors(tenant: Option<&SettingsOverlay>) -> Option<&ColorMap> {
    tenant
        .and_then(|t| t.custom_colors.as_ref())
        .filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DateFormat, NavigationMode, NotificationOverlay};

    fn colors(pairs: &[(&str, &str)]) -> ColorMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_only_when_no_records() {
        assert_eq!(merge(&Settings::default(), None, None), Settings::default());
    }

    #[test]
    fn principal_overrides_tenant_field_by_field() {
        let tenant = SettingsOverlay {
            date_format: Some(DateFormat::DayMonthYear),
            navigation_mode: Some(NavigationMode::Topbar),
            ..Default::default()
        };
        let principal = SettingsOverlay {
            date_format: Some(DateFormat::Iso),
            ..Default::default()
        };

        let merged = merge(&Settings::default(), Some(&tenant), Some(&principal));
        assert_eq!(merged.date_format, DateFormat::Iso);
        assert_eq!(merged.navigation_mode, NavigationMode::Topbar);
    }

    #[test]
    fn notification_toggles_merge_across_sources() {
        let tenant = SettingsOverlay {
            notifications: Some(NotificationOverlay {
                email: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };
        let principal = SettingsOverlay {
            notifications: Some(NotificationOverlay {
                weekly_digest: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = merge(&Settings::default(), Some(&tenant), Some(&principal));
        assert!(!merged.notifications.email);
        assert!(merged.notifications.weekly_digest);
    }

    #[test]
    fn tenant_colors_win_over_principal_colors() {
        let tenant = SettingsOverlay::colors_only(colors(&[("primary", "#112233")]));
        let principal = SettingsOverlay::colors_only(colors(&[
            ("primary", "#ffffff"),
            ("accent", "#000000"),
        ]));

        let merged = merge(&Settings::default(), Some(&tenant), Some(&principal));
        assert_eq!(merged.custom_colors, colors(&[("primary", "#112233")]));
    }

    #[test]
    fn principal_colors_stand_when_tenant_defines_none() {
        let tenant = SettingsOverlay {
            compact_mode: Some(true),
            ..Default::default()
        };
        let principal = SettingsOverlay::colors_only(colors(&[("primary", "#ffffff")]));

        let merged = merge(&Settings::default(), Some(&tenant), Some(&principal));
        assert_eq!(merged.custom_colors, colors(&[("primary", "#ffffff")]));
    }

    #[test]
    fn empty_tenant_color_map_does_not_override() {
        let tenant = SettingsOverlay::colors_only(ColorMap::new());
        let principal = SettingsOverlay::colors_only(colors(&[("primary", "#ffffff")]));

        let merged = merge(&Settings::default(), Some(&tenant), Some(&principal));
        assert_eq!(merged.custom_colors, colors(&[("primary", "#ffffff")]));
    }

    #[test]
    fn merge_is_idempotent() {
        let tenant = SettingsOverlay::colors_only(colors(&[("primary", "#112233")]));
        let principal = SettingsOverlay {
            items_per_page: Some(50),
            custom_colors: Some(colors(&[("accent", "#abcdef")])),
            ..Default::default()
        };

        let first = merge(&Settings::default(), Some(&tenant), Some(&principal));
        let second = merge(&Settings::default(), Some(&tenant), Some(&principal));
        assert_eq!(first, second);
        assert_eq!(first.custom_colors, second.custom_colors);
    }
}
