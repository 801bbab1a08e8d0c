//! Review entity definitions

use serde::{Deserialize, Serialize};

/// Rating and comment left by one user for another, optionally tied to a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub public_id: String,
    pub author_id: i64,
    pub recipient_id: i64,
    pub job_id: Option<i64>,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewRequest {
    pub author_id: i64,
    pub recipient_id: i64,
    pub job_id: Option<i64>,
    pub rating: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

/// Aggregated rating summary for a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub review_count: i64,
    pub average_rating: Option<f64>,
}
