use serde::{Deserialize, Serialize};

/// Well-known action types emitted by collaborating flows
pub mod actions {
    pub const ITEM_LISTED: &str = "item_listed";
    pub const ITEM_SOLD: &str = "item_sold";
    pub const POST_CREATED: &str = "post_created";
    pub const COMMENT_CREATED: &str = "comment_created";
    pub const COMMENT_MARKED_HELPFUL: &str = "comment_marked_helpful";
    pub const REACTION_GIVEN: &str = "reaction_given";
    pub const TRANSACTION_COMPLETED: &str = "transaction_completed";
    pub const CHECK_IN: &str = "check_in";

    // Raised by the engine itself to drive achievement cascades
    pub const QUEST_COMPLETED: &str = "quest_completed";
    pub const LEVEL_UP: &str = "level_up";
}

/// Authenticated identity of the acting user, passed explicitly into every call
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// "User performed action X with value V"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub user_id: UserId,
    pub action_type: String,
    /// Magnitude of the action (number of items, reactions, ...)
    #[serde(default = "default_value")]
    pub value: u32,
    /// Structured association used for quest and achievement matching
    #[serde(default)]
    pub category: Option<String>,
    /// Opaque collaborator data, stored with the activity log
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

fn default_value() -> u32 {
    1
}

impl ActivityEvent {
    pub fn new(user_id: impl Into<UserId>, action_type: impl Into<String>, value: u32) -> Self {
        Self {
            user_id: user_id.into(),
            action_type: action_type.into(),
            value,
            category: None,
            payload: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_defaults_when_deserialized() {
        let event: ActivityEvent =
            serde_json::from_str(r#"{"user_id":"alice","action_type":"item_listed"}"#).unwrap();
        assert_eq!(event.user_id.as_str(), "alice");
        assert_eq!(event.value, 1);
        assert!(event.category.is_none());
    }

    #[test]
    fn test_builder() {
        let event = ActivityEvent::new("bob", actions::ITEM_LISTED, 2)
            .with_category("electronics")
            .with_payload(serde_json::json!({"item_id": 42}));
        assert_eq!(event.category.as_deref(), Some("electronics"));
        assert_eq!(event.payload.unwrap()["item_id"], 42);
    }
}
