use crate::shared::core::outbox_event::OutboxEvent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreated {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserEvent {
    UserCreated(UserCreated),
}

impl OutboxEvent for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::UserCreated(_) => "UserCreated",
        }
    }

    fn to_payload(&self) -> Result<String, serde_json::Error> {
        match self {
            UserEvent::UserCreated(event) => serde_json::to_string(event),
        }
    }
}
