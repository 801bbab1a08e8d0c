//! Saved-freelancer bookmark entity definitions

use serde::{Deserialize, Serialize};

/// Bookmark recording a client saving a freelancer.
///
/// Unique on (user_id, freelancer_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedFreelancer {
    pub id: i64,
    pub user_id: i64,
    pub freelancer_id: i64,
    pub created_at: String,
}
