//! Notification entity definitions

use serde::{Deserialize, Serialize};

/// Typed alert delivered to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub related_entity_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotificationRequest {
    pub user_id: i64,
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
    pub related_entity_id: Option<String>,
}

/// Notification type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    Message,
    Proposal,
    Job,
    Review,
    System,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Message => "message",
            NotificationType::Proposal => "proposal",
            NotificationType::Job => "job",
            NotificationType::Review => "review",
            NotificationType::System => "system",
        }
    }
}

impl From<&str> for NotificationType {
    fn from(s: &str) -> Self {
        match s {
            "message" => NotificationType::Message,
            "proposal" => NotificationType::Proposal,
            "job" => NotificationType::Job,
            "review" => NotificationType::Review,
            _ => NotificationType::System,
        }
    }
}

impl ToString for NotificationType {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}
