//! Domain entities for the database layer
//!
//! Row structs, request shapes, and enum domains used by the repositories

pub mod conversation;
pub mod job;
pub mod message;
pub mod notification;
pub mod proposal;
pub mod review;
pub mod saved_freelancer;
pub mod user;

// Re-export all entity types
pub use conversation::{Conversation, CreateConversationRequest};
pub use job::{CreateJobRequest, Job, JobStatus, UpdateJobRequest};
pub use message::{CreateMessageRequest, Message};
pub use notification::{CreateNotificationRequest, Notification, NotificationType};
pub use proposal::{CreateProposalRequest, Proposal, ProposalStatus, UpdateProposalRequest};
pub use review::{CreateReviewRequest, RatingSummary, Review, UpdateReviewRequest};
pub use saved_freelancer::SavedFreelancer;
pub use user::{CreateUserRequest, UpdateUserRequest, User, UserRole};
