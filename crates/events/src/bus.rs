//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] lets observers (diagnostics, tests, the worker binary) follow
//! what the sync engine does without coupling to its internals. Share it via
//! `Arc<EventBus>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use scopesync_core::scope::ScopeKey;
use scopesync_core::types::{PrincipalId, TenantId};

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

pub const SCOPE_CHANGED: &str = "scope.changed";
pub const SCOPE_CLEARED: &str = "scope.cleared";
pub const SETTINGS_HYDRATED: &str = "settings.hydrated";
pub const SETTINGS_LOADED: &str = "settings.loaded";
pub const SETTINGS_LOAD_FAILED: &str = "settings.load_failed";
pub const SETTINGS_STALE_DISCARDED: &str = "settings.stale_discarded";
pub const SETTINGS_PERSISTED: &str = "settings.persisted";
pub const SETTINGS_PERSIST_FAILED: &str = "settings.persist_failed";

// ---------------------------------------------------------------------------
// SettingsEvent
// ---------------------------------------------------------------------------

/// Something the sync engine did.
///
/// Constructed via [`SettingsEvent::new`] and enriched with
/// [`with_scope`](SettingsEvent::with_scope) and
/// [`with_payload`](SettingsEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsEvent {
    /// Dot-separated event name, e.g. `"settings.loaded"`.
    pub event_type: String,

    /// Generation the event belongs to.
    pub generation: u64,

    pub tenant_id: Option<TenantId>,

    pub principal_id: Option<PrincipalId>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl SettingsEvent {
    /// Create a new event for a generation with no scope attached.
    pub fn new(event_type: impl Into<String>, generation: u64) -> Self {
        Self {
            event_type: event_type.into(),
            generation,
            tenant_id: None,
            principal_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Attach the scope the event concerns.
    pub fn with_scope(mut self, scope: ScopeKey) -> Self {
        self.tenant_id = Some(scope.tenant_id);
        self.principal_id = Some(scope.principal_id);
        self
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use scopesync_events::bus::{EventBus, SettingsEvent, SETTINGS_LOADED};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(SettingsEvent::new(SETTINGS_LOADED, 1));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<SettingsEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: SettingsEvent) {
        // Ignore the SendError: it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<SettingsEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let event = SettingsEvent::new(SETTINGS_LOADED, 3)
            .with_scope(ScopeKey::new(42, 7))
            .with_payload(serde_json::json!({"fallback": true}));

        bus.publish(event);

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, SETTINGS_LOADED);
        assert_eq!(received.generation, 3);
        assert_eq!(received.tenant_id, Some(42));
        assert_eq!(received.principal_id, Some(7));
        assert_eq!(received.payload["fallback"], true);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(SettingsEvent::new(SCOPE_CLEARED, 1));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(e1.event_type, SCOPE_CLEARED);
        assert_eq!(e2.event_type, SCOPE_CLEARED);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(SettingsEvent::new(SETTINGS_PERSISTED, 9));
    }

    #[test]
    fn default_event_has_no_scope() {
        let event = SettingsEvent::new(SCOPE_CHANGED, 0);
        assert!(event.tenant_id.is_none());
        assert!(event.principal_id.is_none());
        assert!(event.payload.is_object());
    }
}
