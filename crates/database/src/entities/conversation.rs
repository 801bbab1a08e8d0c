//! Conversation entity definitions

use serde::{Deserialize, Serialize};

/// Conversation between marketplace participants, optionally linked to a job.
///
/// `participant_ids` holds the public ids of the participating users;
/// `last_message_id` is a denormalized pointer to the newest message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub public_id: String,
    pub participant_ids: Vec<String>,
    pub job_id: Option<i64>,
    pub last_message_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConversationRequest {
    pub participant_ids: Vec<String>,
    pub job_id: Option<i64>,
}
