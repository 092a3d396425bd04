use chrono::{DateTime, Utc};
use clinicops_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::audience::Audience;

/// Something that happened in the clinic and may be worth telling people
/// about. `title` and `message` become the notification text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicEvent {
    /// Dotted name such as `inventory.low_stock`.
    pub event_type: String,
    pub title: String,
    pub message: String,
    /// Kind and id of the record the event is about, if any.
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub actor_user_id: Option<DbId>,
    pub audience: Audience,
    /// Event-specific extras; an empty object when unused.
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl ClinicEvent {
    pub fn new(
        event_type: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            title: title.into(),
            message: message.into(),
            entity_type: None,
            entity_id: None,
            actor_user_id: None,
            audience: Audience::None,
            payload: serde_json::json!({}),
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id);
        self
    }

    /// The user whose action raised the event. They are never notified.
    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_audience(mut self, audience: Audience) -> Self {
        self.audience = audience;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}
