//! Settings sync lifecycle events.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`SettingsEvent`]: the event envelope.

pub mod bus;

pub use bus::{EventBus, SettingsEvent};
