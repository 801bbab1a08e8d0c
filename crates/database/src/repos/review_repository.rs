//! Review repository for database operations.

use crate::entities::{CreateReviewRequest, RatingSummary, Review, UpdateReviewRequest};
use crate::types::{Page, ReviewError, ReviewResult, SortOrder};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::info;

const REVIEW_COLUMNS: &str =
    "id, public_id, author_id, recipient_id, job_id, rating, comment, created_at";

/// Repository for review database operations
#[derive(Clone)]
pub struct ReviewRepository {
    pool: SqlitePool,
}

impl ReviewRepository {
    /// Create a new review repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find review by ID
    pub async fn find_by_id(&self, id: i64) -> ReviewResult<Option<Review>> {
        let row = sqlx::query(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(map_review).transpose()
    }

    /// Find review by public ID
    pub async fn find_by_public_id(&self, public_id: &str) -> ReviewResult<Option<Review>> {
        let row = sqlx::query(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(map_review).transpose()
    }

    /// Create a new review
    pub async fn create(&self, request: &CreateReviewRequest) -> ReviewResult<Review> {
        if !(1..=5).contains(&request.rating) {
            return Err(ReviewError::RatingOutOfRange);
        }

        let now = Utc::now().to_rfc3339();
        let public_id = cuid2::cuid();

        let result = sqlx::query(
            "INSERT INTO reviews (public_id, author_id, recipient_id, job_id, rating, comment, \
             created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(request.author_id)
        .bind(request.recipient_id)
        .bind(request.job_id)
        .bind(request.rating)
        .bind(&request.comment)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let review_id = result.last_insert_rowid();
        info!(
            review_id,
            author_id = request.author_id,
            recipient_id = request.recipient_id,
            "created new review"
        );

        self.find_by_id(review_id).await?.ok_or_else(|| {
            ReviewError::DatabaseError("failed to retrieve created review".to_string())
        })
    }

    /// Update a review's rating or comment
    pub async fn update(
        &self,
        review_id: i64,
        request: &UpdateReviewRequest,
    ) -> ReviewResult<Review> {
        if let Some(rating) = request.rating {
            if !(1..=5).contains(&rating) {
                return Err(ReviewError::RatingOutOfRange);
            }
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE reviews SET ");
        let mut touched = false;

        {
            let mut fields = qb.separated(", ");
            if let Some(rating) = request.rating {
                fields.push("rating = ");
                fields.push_bind_unseparated(rating);
                touched = true;
            }
            if let Some(comment) = &request.comment {
                fields.push("comment = ");
                fields.push_bind_unseparated(comment.clone());
                touched = true;
            }
        }

        if !touched {
            return self
                .find_by_id(review_id)
                .await?
                .ok_or(ReviewError::ReviewNotFound);
        }

        qb.push(" WHERE id = ");
        qb.push_bind(review_id);

        qb.build().execute(&self.pool).await.map_err(db_err)?;

        self.find_by_id(review_id)
            .await?
            .ok_or(ReviewError::ReviewNotFound)
    }

    /// Delete a review
    pub async fn delete(&self, id: i64) -> ReviewResult<()> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(ReviewError::ReviewNotFound);
        }

        info!(review_id = id, "deleted review");
        Ok(())
    }

    /// List reviews received by a user, newest first
    pub async fn list_received(&self, recipient_id: i64, page: Page) -> ReviewResult<Vec<Review>> {
        self.list_by_column("recipient_id", recipient_id, page).await
    }

    /// List reviews written by a user, newest first
    pub async fn list_authored(&self, author_id: i64, page: Page) -> ReviewResult<Vec<Review>> {
        self.list_by_column("author_id", author_id, page).await
    }

    /// List reviews attached to a job
    pub async fn list_for_job(&self, job_id: i64, page: Page) -> ReviewResult<Vec<Review>> {
        self.list_by_column("job_id", job_id, page).await
    }

    async fn list_by_column(
        &self,
        column: &'static str,
        value: i64,
        page: Page,
    ) -> ReviewResult<Vec<Review>> {
        let rows = sqlx::query(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE {column} = ? \
             ORDER BY created_at {} LIMIT ? OFFSET ?",
            SortOrder::Desc.as_sql()
        ))
        .bind(value)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(map_review).collect()
    }

    /// Average rating and review count for a user
    pub async fn rating_summary_for_user(&self, recipient_id: i64) -> ReviewResult<RatingSummary> {
        let row = sqlx::query(
            "SELECT COUNT(*) as review_count, AVG(rating) as average_rating \
             FROM reviews WHERE recipient_id = ?",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(RatingSummary {
            review_count: row.try_get("review_count").map_err(db_err)?,
            average_rating: row.try_get("average_rating").map_err(db_err)?,
        })
    }

    /// Count a user's received reviews grouped by rating value
    pub async fn count_by_rating_for_user(
        &self,
        recipient_id: i64,
    ) -> ReviewResult<Vec<(i64, i64)>> {
        let rows = sqlx::query(
            "SELECT rating, COUNT(*) as count FROM reviews WHERE recipient_id = ? \
             GROUP BY rating ORDER BY rating",
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut by_rating = Vec::new();
        for row in rows {
            let rating: i64 = row.try_get("rating").map_err(db_err)?;
            let count: i64 = row.try_get("count").map_err(db_err)?;
            by_rating.push((rating, count));
        }
        Ok(by_rating)
    }
}

fn map_review(row: SqliteRow) -> ReviewResult<Review> {
    Ok(Review {
        id: row.try_get("id").map_err(db_err)?,
        public_id: row.try_get("public_id").map_err(db_err)?,
        author_id: row.try_get("author_id").map_err(db_err)?,
        recipient_id: row.try_get("recipient_id").map_err(db_err)?,
        job_id: row.try_get("job_id").map_err(db_err)?,
        rating: row.try_get("rating").map_err(db_err)?,
        comment: row.try_get("comment").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn db_err(e: sqlx::Error) -> ReviewError {
    ReviewError::DatabaseError(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{CreateUserRequest, UserRole};
    use crate::repos::UserRepository;
    use tempfile::TempDir;

    async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_reviews.db");
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePool::connect(&db_url).await.unwrap();
        crate::migrations::MIGRATOR.run(&pool).await.unwrap();
        (pool, temp_dir)
    }

    async fn create_user(pool: &SqlitePool, email: &str) -> i64 {
        UserRepository::new(pool.clone())
            .create(&CreateUserRequest {
                email: email.to_string(),
                username: None,
                display_name: None,
                role: UserRole::Freelancer,
                avatar_url: None,
                bio: None,
            })
            .await
            .unwrap()
            .id
    }

    fn review_request(author_id: i64, recipient_id: i64, rating: i64) -> CreateReviewRequest {
        CreateReviewRequest {
            author_id,
            recipient_id,
            job_id: None,
            rating,
            comment: Some("Great work".to_string()),
        }
    }

    #[tokio::test]
    async fn test_review_creation_and_lookup() {
        let (pool, _temp_dir) = create_test_pool().await;
        let author = create_user(&pool, "author@example.com").await;
        let recipient = create_user(&pool, "recipient@example.com").await;
        let repo = ReviewRepository::new(pool);

        let created = repo
            .create(&review_request(author, recipient, 5))
            .await
            .unwrap();
        assert_eq!(created.rating, 5);
        assert_eq!(created.job_id, None);

        let found = repo
            .find_by_public_id(&created.public_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, created);
    }

    #[tokio::test]
    async fn test_rating_bounds_are_enforced() {
        let (pool, _temp_dir) = create_test_pool().await;
        let author = create_user(&pool, "author@example.com").await;
        let recipient = create_user(&pool, "recipient@example.com").await;
        let repo = ReviewRepository::new(pool);

        for bad_rating in [0, 6, -1] {
            let err = repo
                .create(&review_request(author, recipient, bad_rating))
                .await
                .unwrap_err();
            assert!(matches!(err, ReviewError::RatingOutOfRange));
        }
    }

    #[tokio::test]
    async fn test_received_and_authored_listings() {
        let (pool, _temp_dir) = create_test_pool().await;
        let author = create_user(&pool, "author@example.com").await;
        let recipient = create_user(&pool, "recipient@example.com").await;
        let repo = ReviewRepository::new(pool);

        repo.create(&review_request(author, recipient, 4))
            .await
            .unwrap();
        repo.create(&review_request(recipient, author, 3))
            .await
            .unwrap();

        let received = repo.list_received(recipient, Page::default()).await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].rating, 4);

        let authored = repo.list_authored(recipient, Page::default()).await.unwrap();
        assert_eq!(authored.len(), 1);
        assert_eq!(authored[0].rating, 3);
    }

    #[tokio::test]
    async fn test_rating_summary_and_histogram() {
        let (pool, _temp_dir) = create_test_pool().await;
        let a = create_user(&pool, "a@example.com").await;
        let b = create_user(&pool, "b@example.com").await;
        let recipient = create_user(&pool, "recipient@example.com").await;
        let repo = ReviewRepository::new(pool);

        repo.create(&review_request(a, recipient, 5)).await.unwrap();
        repo.create(&review_request(b, recipient, 3)).await.unwrap();

        let summary = repo.rating_summary_for_user(recipient).await.unwrap();
        assert_eq!(summary.review_count, 2);
        assert_eq!(summary.average_rating, Some(4.0));

        let histogram = repo.count_by_rating_for_user(recipient).await.unwrap();
        assert_eq!(histogram, vec![(3, 1), (5, 1)]);

        let empty = repo.rating_summary_for_user(a).await.unwrap();
        assert_eq!(empty.review_count, 0);
        assert_eq!(empty.average_rating, None);
    }

    #[tokio::test]
    async fn test_update_review() {
        let (pool, _temp_dir) = create_test_pool().await;
        let author = create_user(&pool, "author@example.com").await;
        let recipient = create_user(&pool, "recipient@example.com").await;
        let repo = ReviewRepository::new(pool);

        let created = repo
            .create(&review_request(author, recipient, 4))
            .await
            .unwrap();

        let updated = repo
            .update(
                created.id,
                &UpdateReviewRequest {
                    rating: Some(2),
                    comment: Some("Revised opinion".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.rating, 2);
        assert_eq!(updated.comment.as_deref(), Some("Revised opinion"));

        let err = repo
            .update(
                created.id,
                &UpdateReviewRequest {
                    rating: Some(9),
                    comment: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::RatingOutOfRange));

        let unchanged = repo
            .update(created.id, &UpdateReviewRequest::default())
            .await
            .unwrap();
        assert_eq!(unchanged.rating, 2);
    }

    #[tokio::test]
    async fn test_delete_review() {
        let (pool, _temp_dir) = create_test_pool().await;
        let author = create_user(&pool, "author@example.com").await;
        let recipient = create_user(&pool, "recipient@example.com").await;
        let repo = ReviewRepository::new(pool);

        let created = repo
            .create(&review_request(author, recipient, 4))
            .await
            .unwrap();
        repo.delete(created.id).await.unwrap();

        assert!(repo.find_by_id(created.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(created.id).await.unwrap_err(),
            ReviewError::ReviewNotFound
        ));
    }
}
