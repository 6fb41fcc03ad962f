//! Core data model.
//!
//! An item is something that needs doing under a topic. Each worker that
//! handles it answers with an ack; the producer gets every ack back as a
//! single batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// A unit of work handed to every worker registered for its topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier.
    pub id: ItemId,

    /// Routing key. Any string is valid, including the empty one.
    pub topic: String,

    /// Arbitrary payload for the workers. The queue doesn't interpret it.
    pub data: serde_json::Value,

    pub pushed_at: DateTime<Utc>,
}

impl Item {
    pub(crate) fn new(topic: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: ItemId::new(),
            topic: topic.into(),
            data,
            pushed_at: Utc::now(),
        }
    }
}

/// Newtype for item IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Ack
// ---------------------------------------------------------------------------

/// One worker's answer to an item.
///
/// A failing worker reports through `error`; the queue never raises it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    /// Arbitrary result data. Opaque to the queue.
    pub data: serde_json::Value,
    /// Error message if the worker failed.
    pub error: Option<String>,
}

impl Ack {
    /// A successful ack carrying `data`.
    pub fn ok(data: impl Into<serde_json::Value>) -> Self {
        Self {
            data: data.into(),
            error: None,
        }
    }

    /// A failed ack with no data.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            data: serde_json::Value::Null,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle state of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Constructed. Push and register work, nothing is dispatched.
    Created,
    /// Ticker running, buffer drained continuously.
    Active,
    /// Ticker halted. Buffer, registry and lineup are kept.
    Stopped,
}

impl Lifecycle {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: Lifecycle) -> bool {
        use Lifecycle::*;
        matches!(
            (self, to),
            (Created, Active) | (Active, Stopped) | (Stopped, Active)
        )
    }

    pub fn is_active(self) -> bool {
        self == Lifecycle::Active
    }
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Lifecycle::Created => "created",
            Lifecycle::Active => "active",
            Lifecycle::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lifecycle_allows_restart_but_not_double_start() {
        use Lifecycle::*;
        assert!(Created.can_transition_to(Active));
        assert!(Active.can_transition_to(Stopped));
        assert!(Stopped.can_transition_to(Active));

        assert!(!Active.can_transition_to(Active));
        assert!(!Created.can_transition_to(Stopped));
        assert!(!Stopped.can_transition_to(Created));
    }

    #[test]
    fn lifecycle_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(Lifecycle::Stopped).unwrap(),
            json!("stopped")
        );
        assert_eq!(Lifecycle::Active.to_string(), "active");
    }

    #[test]
    fn ack_constructors() {
        let ok = Ack::ok("hi");
        assert!(ok.is_ok());
        assert_eq!(ok.data, json!("hi"));

        let failed = Ack::err("boom");
        assert!(!failed.is_ok());
        assert_eq!(failed.data, serde_json::Value::Null);
        assert_eq!(failed.error.as_deref(), Some("boom"));

        assert_eq!(Ack::default(), Ack::ok(serde_json::Value::Null));
    }

    #[test]
    fn item_id_displays_short_form() {
        let id = ItemId::new();
        assert_eq!(id.to_string().len(), 8);
        assert!(id.0.to_string().starts_with(&id.to_string()));
    }

    #[test]
    fn item_new_keeps_topic_and_payload() {
        let item = Item::new("", json!({"n": 5}));
        assert_eq!(item.topic, "");
        assert_eq!(item.data["n"], 5);
    }
}
