//! Repository for saved-freelancer bookmarks.

use crate::entities::SavedFreelancer;
use crate::types::{Page, SavedFreelancerError, SavedFreelancerResult, SortOrder};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

const SAVED_COLUMNS: &str = "id, user_id, freelancer_id, created_at";

/// Repository for saved-freelancer database operations
#[derive(Clone)]
pub struct SavedFreelancerRepository {
    pool: SqlitePool,
}

impl SavedFreelancerRepository {
    /// Create a new saved-freelancer repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find the bookmark linking a user and a freelancer
    pub async fn find(
        &self,
        user_id: i64,
        freelancer_id: i64,
    ) -> SavedFreelancerResult<Option<SavedFreelancer>> {
        let row = sqlx::query(&format!(
            "SELECT {SAVED_COLUMNS} FROM saved_freelancers \
             WHERE user_id = ? AND freelancer_id = ?"
        ))
        .bind(user_id)
        .bind(freelancer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(map_saved).transpose()
    }

    /// Save a freelancer for a user.
    ///
    /// Idempotent upsert keyed on the (user_id, freelancer_id) unique
    /// constraint; re-saving returns the existing bookmark.
    pub async fn save(
        &self,
        user_id: i64,
        freelancer_id: i64,
    ) -> SavedFreelancerResult<SavedFreelancer> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO saved_freelancers (user_id, freelancer_id, created_at) \
             VALUES (?, ?, ?) \
             ON CONFLICT(user_id, freelancer_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(freelancer_id)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        info!(user_id, freelancer_id, "saved freelancer");

        self.find(user_id, freelancer_id).await?.ok_or_else(|| {
            SavedFreelancerError::DatabaseError("failed to retrieve saved bookmark".to_string())
        })
    }

    /// Remove a bookmark
    pub async fn unsave(&self, user_id: i64, freelancer_id: i64) -> SavedFreelancerResult<()> {
        let result = sqlx::query(
            "DELETE FROM saved_freelancers WHERE user_id = ? AND freelancer_id = ?",
        )
        .bind(user_id)
        .bind(freelancer_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(SavedFreelancerError::BookmarkNotFound);
        }

        info!(user_id, freelancer_id, "removed saved freelancer");
        Ok(())
    }

    /// Whether a user has saved a freelancer
    pub async fn is_saved(&self, user_id: i64, freelancer_id: i64) -> SavedFreelancerResult<bool> {
        Ok(self.find(user_id, freelancer_id).await?.is_some())
    }

    /// List a user's bookmarks, newest first
    pub async fn list_for_user(
        &self,
        user_id: i64,
        page: Page,
    ) -> SavedFreelancerResult<Vec<SavedFreelancer>> {
        let rows = sqlx::query(&format!(
            "SELECT {SAVED_COLUMNS} FROM saved_freelancers WHERE user_id = ? \
             ORDER BY created_at {}, id {} LIMIT ? OFFSET ?",
            SortOrder::Desc.as_sql(),
            SortOrder::Desc.as_sql()
        ))
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(map_saved).collect()
    }

    /// Count how many users have saved a freelancer
    pub async fn count_saves_of(&self, freelancer_id: i64) -> SavedFreelancerResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM saved_freelancers WHERE freelancer_id = ?",
        )
        .bind(freelancer_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        row.try_get("count").map_err(db_err)
    }
}

fn map_saved(row: SqliteRow) -> SavedFreelancerResult<SavedFreelancer> {
    Ok(SavedFreelancer {
        id: row.try_get("id").map_err(db_err)?,
        user_id: row.try_get("user_id").map_err(db_err)?,
        freelancer_id: row.try_get("freelancer_id").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn db_err(e: sqlx::Error) -> SavedFreelancerError {
    SavedFreelancerError::DatabaseError(e.to_string())
}
