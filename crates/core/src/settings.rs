//! Settings data model.
//!
//! [`Settings`] is the complete, merged configuration: every field carries a
//! built-in default so a merged value is never missing anything.
//! [`SettingsOverlay`] is the partial shape used for stored records, local
//! patches and cache payloads; absent fields mean "inherit".

use std::collections::BTreeMap;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;

/// Semantic color role name -> color (hex literal or HSL token).
pub type ColorMap = BTreeMap<String, String>;

/* --------------------------------------------------------------------------
   Constants
   -------------------------------------------------------------------------- */

/// Allowed values for `itemsPerPage`.
pub const VALID_PAGE_SIZES: &[u16] = &[10, 25, 50, 100];

/// Default `itemsPerPage`.
pub const DEFAULT_PAGE_SIZE: u16 = 25;

/// Maximum size in bytes of an inline company logo (2 MB).
pub const MAX_LOGO_BYTES: usize = 2 * 1024 * 1024;

/// Color roles the rendering layer knows about.
///
/// A reset removes every one of these in addition to any role that was
/// applied before.
pub const COLOR_ROLES: &[&str] = &[
    "primary",
    "secondary",
    "accent",
    "background",
    "foreground",
    "sidebar",
    "muted",
    "border",
];

/// Returns `true` if the given page size is one of [`VALID_PAGE_SIZES`].
pub fn is_valid_page_size(size: u16) -> bool {
    VALID_PAGE_SIZES.contains(&size)
}

/* --------------------------------------------------------------------------
   Enumerated options
   -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationMode {
    #[default]
    Sidebar,
    Topbar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "MM/DD/YYYY")]
    MonthDayYear,
    #[serde(rename = "DD/MM/YYYY")]
    DayMonthYear,
    #[serde(rename = "YYYY-MM-DD")]
    Iso,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "12h")]
    TwelveHour,
    #[serde(rename = "24h")]
    TwentyFourHour,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyFormat {
    #[default]
    Usd,
    Eur,
    Gbp,
    Cad,
    Aud,
}

/// Names of the top-level settings fields, used by the permission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsField {
    NavigationMode,
    DateFormat,
    TimeFormat,
    CurrencyFormat,
    ItemsPerPage,
    CompactMode,
    Notifications,
    CustomColors,
    CompanyLogo,
}

/* --------------------------------------------------------------------------
   Complete settings
   -------------------------------------------------------------------------- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationSettings {
    pub email: bool,
    pub push: bool,
    pub timecard_reminders: bool,
    pub invoice_alerts: bool,
    pub weekly_digest: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
            timecard_reminders: true,
            invoice_alerts: true,
            weekly_digest: false,
        }
    }
}

/// The effective configuration for one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub navigation_mode: NavigationMode,
    pub date_format: DateFormat,
    pub time_format: TimeFormat,
    pub currency_format: CurrencyFormat,
    pub items_per_page: u16,
    pub compact_mode: bool,
    pub notifications: NotificationSettings,
    pub custom_colors: ColorMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_logo: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            navigation_mode: NavigationMode::default(),
            date_format: DateFormat::default(),
            time_format: TimeFormat::default(),
            currency_format: CurrencyFormat::default(),
            items_per_page: DEFAULT_PAGE_SIZE,
            compact_mode: false,
            notifications: NotificationSettings::default(),
            custom_colors: ColorMap::new(),
            company_logo: None,
        }
    }
}

impl Settings {
    /// Overwrite every field the overlay defines.
    ///
    /// Notification toggles merge key by key; `custom_colors` is replaced as
    /// a whole. A stored page size outside [`VALID_PAGE_SIZES`] is ignored.
    pub fn apply(&mut self, overlay: &SettingsOverlay) {
        if let Some(v) = overlay.navigation_mode {
            self.navigation_mode = v;
        }
        if let Some(v) = overlay.date_format {
            self.date_format = v;
        }
        if let Some(v) = overlay.time_format {
            self.time_format = v;
        }
        if let Some(v) = overlay.currency_format {
            self.currency_format = v;
        }
        if let Some(v) = overlay.items_per_page.filter(|v| is_valid_page_size(*v)) {
            self.items_per_page = v;
        }
        if let Some(v) = overlay.compact_mode {
            self.compact_mode = v;
        }
        if let Some(n) = &overlay.notifications {
            self.notifications.apply(n);
        }
        if let Some(colors) = &overlay.custom_colors {
            self.custom_colors = colors.clone();
        }
        if let Some(logo) = &overlay.company_logo {
            self.company_logo = Some(logo.clone());
        }
    }

    /// A copy with large binary assets removed, for caching and persistence.
    pub fn without_assets(&self) -> Self {
        Self {
            company_logo: None,
            ..self.clone()
        }
    }
}

impl NotificationSettings {
    fn apply(&mut self, overlay: &NotificationOverlay) {
        if let Some(v) = overlay.email {
            self.email = v;
        }
        if let Some(v) = overlay.push {
            self.push = v;
        }
        if let Some(v) = overlay.timecard_reminders {
            self.timecard_reminders = v;
        }
        if let Some(v) = overlay.invoice_alerts {
            self.invoice_alerts = v;
        }
        if let Some(v) = overlay.weekly_digest {
            self.weekly_digest = v;
        }
    }
}

/* --------------------------------------------------------------------------
   Partial settings
   -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationOverlay {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub email: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub push: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub timecard_reminders: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub invoice_alerts: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub weekly_digest: Option<bool>,
}

impl NotificationOverlay {
    fn layer(&mut self, other: &NotificationOverlay) {
        self.email = other.email.or(self.email);
        self.push = other.push.or(self.push);
        self.timecard_reminders = other.timecard_reminders.or(self.timecard_reminders);
        self.invoice_alerts = other.invoice_alerts.or(self.invoice_alerts);
        self.weekly_digest = other.weekly_digest.or(self.weekly_digest);
    }
}

/// A field value that either decodes or is skipped.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Valid(T),
    Invalid(#[allow(dead_code)] IgnoredAny),
}

/// Decode an optional field, treating a malformed value as absent.
///
/// Stored records may carry values written by older or newer clients; one
/// bad field must not discard the rest of the record.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<Lenient<T>>::deserialize(deserializer)? {
        Some(Lenient::Valid(value)) => Some(value),
        _ => None,
    })
}

/// A partial settings record: a stored tenant-wide or principal record, a
/// local patch, or a write payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsOverlay {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub navigation_mode: Option<NavigationMode>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub date_format: Option<DateFormat>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub time_format: Option<TimeFormat>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub currency_format: Option<CurrencyFormat>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub items_per_page: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub compact_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub notifications: Option<NotificationOverlay>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub custom_colors: Option<ColorMap>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub company_logo: Option<String>,
}

impl SettingsOverlay {
    /// An overlay carrying only a color map.
    pub fn colors_only(colors: ColorMap) -> Self {
        Self {
            custom_colors: Some(colors),
            ..Self::default()
        }
    }

    /// Returns `true` if the overlay defines a non-empty color map.
    pub fn has_custom_colors(&self) -> bool {
        self.custom_colors.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Layer `other` on top of `self`; fields `other` defines win.
    pub fn layer(&mut self, other: &SettingsOverlay) {
        self.navigation_mode = other.navigation_mode.or(self.navigation_mode);
        self.date_format = other.date_format.or(self.date_format);
        self.time_format = other.time_format.or(self.time_format);
        self.currency_format = other.currency_format.or(self.currency_format);
        self.items_per_page = other.items_per_page.or(self.items_per_page);
        self.compact_mode = other.compact_mode.or(self.compact_mode);
        if let Some(n) = &other.notifications {
            self.notifications.get_or_insert_with(Default::default).layer(n);
        }
        if other.custom_colors.is_some() {
            self.custom_colors.clone_from(&other.custom_colors);
        }
        if other.company_logo.is_some() {
            self.company_logo.clone_from(&other.company_logo);
        }
    }

    /// Check a local patch before it is applied.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(size) = self.items_per_page {
            if !is_valid_page_size(size) {
                return Err(CoreError::Validation(format!(
                    "Invalid itemsPerPage {size}. Must be one of: {VALID_PAGE_SIZES:?}"
                )));
            }
        }
        if let Some(colors) = &self.custom_colors {
            for (role, value) in colors {
                if role.trim().is_empty() {
                    return Err(CoreError::Validation(
                        "Color role name must not be empty".to_string(),
                    ));
                }
                if value.trim().is_empty() {
                    return Err(CoreError::Validation(format!(
                        "Color value for role '{role}' must not be empty"
                    )));
                }
            }
        }
        if let Some(logo) = &self.company_logo {
            if logo.len() > MAX_LOGO_BYTES {
                return Err(CoreError::Validation(format!(
                    "Company logo too large: {} bytes (max {MAX_LOGO_BYTES})",
                    logo.len()
                )));
            }
        }
        Ok(())
    }
}

impl From<&Settings> for SettingsOverlay {
    fn from(s: &Settings) -> Self {
        Self {
            navigation_mode: Some(s.navigation_mode),
            date_format: Some(s.date_format),
            time_format: Some(s.time_format),
            currency_format: Some(s.currency_format),
            items_per_page: Some(s.items_per_page),
            compact_mode: Some(s.compact_mode),
            notifications: Some(NotificationOverlay {
                email: Some(s.notifications.email),
                push: Some(s.notifications.push),
                timecard_reminders: Some(s.notifications.timecard_reminders),
                invoice_alerts: Some(s.notifications.invoice_alerts),
                weekly_digest: Some(s.notifications.weekly_digest),
            }),
            custom_colors: Some(s.custom_colors.clone()),
            company_logo: s.company_logo.clone(),
        }
    }
}
