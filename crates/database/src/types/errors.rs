//! Error types for the database layer

use thiserror::Error;

/// General database error
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    #[error("Database query error: {0}")]
    QueryError(String),

    #[error("Database migration error: {0}")]
    MigrationError(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// User-specific database errors
#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    UserNotFound,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Username already exists")]
    UsernameAlreadyExists,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Job and proposal database errors
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found")]
    JobNotFound,

    #[error("Proposal not found")]
    ProposalNotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Review-specific database errors
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Review not found")]
    ReviewNotFound,

    #[error("Rating out of range")]
    RatingOutOfRange,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Conversation and message database errors
#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("Conversation not found")]
    ConversationNotFound,

    #[error("Message not found")]
    MessageNotFound,

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Notification-specific database errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification not found")]
    NotificationNotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Saved-freelancer bookmark errors
#[derive(Debug, Error)]
pub enum SavedFreelancerError {
    #[error("Bookmark not found")]
    BookmarkNotFound,

    #[error("Freelancer already saved")]
    AlreadySaved,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
