//! Proposal entity definitions

use serde::{Deserialize, Serialize};

/// A freelancer's bid on a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: i64,
    pub public_id: String,
    pub job_id: i64,
    pub freelancer_id: i64,
    pub cover_letter: String,
    pub bid_amount: f64,
    pub status: ProposalStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProposalRequest {
    pub job_id: i64,
    pub freelancer_id: i64,
    pub cover_letter: String,
    pub bid_amount: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProposalRequest {
    pub cover_letter: Option<String>,
    pub bid_amount: Option<f64>,
    pub status: Option<ProposalStatus>,
}

/// Proposal status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Withdrawn => "withdrawn",
        }
    }
}

impl From<&str> for ProposalStatus {
    fn from(s: &str) -> Self {
        match s {
            "accepted" => ProposalStatus::Accepted,
            "rejected" => ProposalStatus::Rejected,
            "withdrawn" => ProposalStatus::Withdrawn,
            _ => ProposalStatus::Pending,
        }
    }
}

impl ToString for ProposalStatus {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}
