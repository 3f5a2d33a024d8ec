//! Application sink: the rendering layer's inbound interface for color tokens.

use std::collections::BTreeSet;

use scopesync_core::color::to_hsl_token;
use scopesync_core::settings::{ColorMap, COLOR_ROLES};

/// Receives color tokens. There is no feedback channel.
pub trait ApplicationSink: Send + Sync {
    /// Set the token for a semantic color role, e.g. `("primary", "210 100% 56%")`.
    fn set_token(&self, role: &str, token: &str);

    /// Drop the override for a role so baseline styling applies.
    fn remove_token(&self, role: &str);
}

/// Push one batch of colors and return the set of roles now applied.
///
/// Every color is translated to an HSL token. Roles applied by the previous
/// batch but absent from this one are removed.
pub(crate) fn push_colors(
    sink: &dyn ApplicationSink,
    previous: &BTreeSet<String>,
    colors: &ColorMap,
) -> BTreeSet<String> {
    for (role, value) in colors {
        sink.set_token(role, &to_hsl_token(value));
    }
    for role in previous.iter().filter(|r| !colors.contains_key(*r)) {
        sink.remove_token(role);
    }
    colors.keys().cloned().collect()
}

/// Remove every known role and every previously applied role.
pub(crate) fn clear_colors(sink: &dyn ApplicationSink, previous: &BTreeSet<String>) {
    let mut roles: BTreeSet<&str> = COLOR_ROLES.iter().copied().collect();
    roles.extend(previous.iter().map(String::as_str));
    for role in roles {
        sink.remove_token(role);
    }
}

/// Sink that logs every token, for headless runs.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ApplicationSink for TracingSink {
    fn set_token(&self, role: &str, token: &str) {
        tracing::info!(role, token, "Color token applied");
    }

    fn remove_token(&self, role: &str) {
        tracing::info!(role, "Color token removed");
    }
}
