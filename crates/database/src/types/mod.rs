//! Shared types and result types for the database layer

pub mod errors;

// Re-export common types
pub use errors::{
    DatabaseError, JobError, MessagingError, NotificationError, ReviewError,
    SavedFreelancerError, UserError,
};

// Common result types
pub type DatabaseResult<T> = Result<T, DatabaseError>;
pub type UserResult<T> = Result<T, UserError>;
pub type JobResult<T> = Result<T, JobError>;
pub type ReviewResult<T> = Result<T, ReviewError>;
pub type MessagingResult<T> = Result<T, MessagingError>;
pub type NotificationResult<T> = Result<T, NotificationError>;
pub type SavedFreelancerResult<T> = Result<T, SavedFreelancerError>;

/// Sort direction applied to a repository listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Desc
    }
}

/// Limit/offset pagination window for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

/// Transaction isolation level vocabulary.
///
/// SQLite only distinguishes read-uncommitted from its default serializable
/// behaviour; the remaining levels are accepted and mapped to the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "read_uncommitted",
            IsolationLevel::ReadCommitted => "read_committed",
            IsolationLevel::RepeatableRead => "repeatable_read",
            IsolationLevel::Serializable => "serializable",
        }
    }
}

impl From<&str> for IsolationLevel {
    fn from(s: &str) -> Self {
        match s {
            "read_uncommitted" => IsolationLevel::ReadUncommitted,
            "read_committed" => IsolationLevel::ReadCommitted,
            "repeatable_read" => IsolationLevel::RepeatableRead,
            _ => IsolationLevel::Serializable,
        }
    }
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
