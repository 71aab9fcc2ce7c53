use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of a published notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Countdown,
    DrawStarted,
    Winner,
    Upload,
    Error,
    System,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Countdown => "countdown",
            NotificationKind::DrawStarted => "draw_started",
            NotificationKind::Winner => "winner",
            NotificationKind::Upload => "upload",
            NotificationKind::Error => "error",
            NotificationKind::System => "system",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a publisher hands to the broadcaster. The broadcaster fills in
/// identity, timestamp and read state.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDraft {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub urgent: bool,
    pub payload: Option<serde_json::Value>,
}

impl NotificationDraft {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            urgent: false,
            payload: None,
        }
    }

    pub fn urgent(mut self, urgent: bool) -> Self {
        self.urgent = urgent;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// A notification as observed by subscribers and stored in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Sortable id: creation millis followed by a per-process sequence.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub urgent: bool,
    pub created_at: DateTime<Utc>,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag_and_camel_case() {
        let n = Notification {
            id: "0000000000001-000001".into(),
            kind: NotificationKind::DrawStarted,
            title: "Draw".into(),
            message: "Picking a winner".into(),
            urgent: true,
            created_at: Utc::now(),
            read: false,
            payload: None,
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "draw_started");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn draft_builder_sets_flags() {
        let draft = NotificationDraft::new(NotificationKind::Winner, "t", "m")
            .urgent(true)
            .with_payload(serde_json::json!({"entryId": "2"}));
        assert!(draft.urgent);
        assert_eq!(draft.payload.unwrap()["entryId"], "2");
    }
}
