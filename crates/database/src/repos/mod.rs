//! Database repository implementations

pub mod conversation_repository;
pub mod job_repository;
pub mod message_repository;
pub mod notification_repository;
pub mod proposal_repository;
pub mod review_repository;
pub mod saved_freelancer_repository;
pub mod user_repository;

// Re-export all repositories for convenience
pub use conversation_repository::*;
pub use job_repository::*;
pub use message_repository::*;
pub use notification_repository::*;
pub use proposal_repository::*;
pub use review_repository::*;
pub use saved_freelancer_repository::*;
pub use user_repository::*;
