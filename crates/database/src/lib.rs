//! Gigboard Database Crate
//!
//! This crate provides database functionality for the Gigboard freelance
//! marketplace, including connection management, migrations, and repository
//! implementations for the marketplace entities.

use sqlx::SqlitePool;

use gigboard_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::{prepare_database, DatabaseConnection};
pub use migrations::run_migrations;

// Re-export repositories
pub use repos::{
    ConversationRepository, JobRepository, MessageRepository, NotificationRepository,
    ProposalRepository, ReviewRepository, SavedFreelancerRepository, UserRepository,
};

// Re-export entities
pub use entities::{
    conversation::{Conversation, CreateConversationRequest},
    job::{CreateJobRequest, Job, JobStatus, UpdateJobRequest},
    message::{CreateMessageRequest, Message},
    notification::{CreateNotificationRequest, Notification, NotificationType},
    proposal::{CreateProposalRequest, Proposal, ProposalStatus, UpdateProposalRequest},
    review::{CreateReviewRequest, RatingSummary, Review, UpdateReviewRequest},
    saved_freelancer::SavedFreelancer,
    user::{CreateUserRequest, UpdateUserRequest, User, UserRole},
};

// Re-export types
pub use types::{
    errors::{
        DatabaseError, JobError, MessagingError, NotificationError, ReviewError,
        SavedFreelancerError, UserError,
    },
    DatabaseResult, IsolationLevel, JobResult, MessagingResult, NotificationResult, Page,
    ReviewResult, SavedFreelancerResult, SortOrder, UserResult,
};

/// Re-export commonly used types for convenience
pub use sqlx::Pool;

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_database() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 1,
            busy_timeout_ms: 5_000,
        };

        let pool = initialize_database(&config).await.unwrap();
        (pool, temp_dir)
    }

    #[tokio::test]
    async fn test_database_initialization() {
        let (_pool, _temp_dir) = create_test_database().await;
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let (pool, _temp_dir) = create_test_database().await;

        let result: (bool,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert!(result.0);
    }

    #[tokio::test]
    async fn test_foreign_keys_are_enforced() {
        let (pool, _temp_dir) = create_test_database().await;

        // A job referencing a nonexistent client must be rejected
        let result = sqlx::query(
            "INSERT INTO jobs (public_id, client_id, title, description, status, created_at, \
             updated_at) VALUES ('abc', 9999, 't', 'd', 'open', '2026-01-01', '2026-01-01')",
        )
        .execute(&pool)
        .await;

        assert!(result.is_err());
    }
}
