//! Notification repository for database operations.

use crate::entities::{CreateNotificationRequest, Notification, NotificationType};
use crate::types::{NotificationError, NotificationResult, Page, SortOrder};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, notification_type, title, body, is_read, related_entity_id, created_at";

/// Repository for notification database operations
#[derive(Clone)]
pub struct NotificationRepository {
    pool: SqlitePool,
}

impl NotificationRepository {
    /// Create a new notification repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find notification by ID
    pub async fn find_by_id(&self, id: i64) -> NotificationResult<Option<Notification>> {
        let row = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(map_notification).transpose()
    }

    /// Create a new notification
    pub async fn create(
        &self,
        request: &CreateNotificationRequest,
    ) -> NotificationResult<Notification> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO notifications (user_id, notification_type, title, body, is_read, \
             related_entity_id, created_at) VALUES (?, ?, ?, ?, false, ?, ?)",
        )
        .bind(request.user_id)
        .bind(request.notification_type.to_string())
        .bind(&request.title)
        .bind(&request.body)
        .bind(&request.related_entity_id)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let notification_id = result.last_insert_rowid();
        info!(
            notification_id,
            user_id = request.user_id,
            notification_type = request.notification_type.as_str(),
            "created new notification"
        );

        self.find_by_id(notification_id).await?.ok_or_else(|| {
            NotificationError::DatabaseError("failed to retrieve created notification".to_string())
        })
    }

    /// Insert a batch of notifications atomically, returning the number of
    /// inserted rows. A failure rolls back the whole batch.
    pub async fn create_many(
        &self,
        requests: &[CreateNotificationRequest],
    ) -> NotificationResult<u64> {
        if requests.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut inserted = 0;
        for request in requests {
            sqlx::query(
                "INSERT INTO notifications (user_id, notification_type, title, body, is_read, \
                 related_entity_id, created_at) VALUES (?, ?, ?, ?, false, ?, ?)",
            )
            .bind(request.user_id)
            .bind(request.notification_type.to_string())
            .bind(&request.title)
            .bind(&request.body)
            .bind(&request.related_entity_id)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
            inserted += 1;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(inserted)
    }

    /// List a user's notifications, newest first, optionally unread only
    pub async fn list_for_user(
        &self,
        user_id: i64,
        unread_only: bool,
        page: Page,
    ) -> NotificationResult<Vec<Notification>> {
        let unread_clause = if unread_only {
            " AND is_read = false"
        } else {
            ""
        };

        let rows = sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = ?{unread_clause} \
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

        rows.into_iter().map(map_notification).collect()
    }

    /// Mark a single notification as read
    pub async fn mark_read(&self, id: i64) -> NotificationResult<()> {
        let result = sqlx::query("UPDATE notifications SET is_read = true WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(NotificationError::NotificationNotFound);
        }
        Ok(())
    }

    /// Mark all of a user's notifications as read, returning the number affected
    pub async fn mark_all_read(&self, user_id: i64) -> NotificationResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true WHERE user_id = ? AND is_read = false",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected())
    }

    /// Count a user's unread notifications
    pub async fn unread_count(&self, user_id: i64) -> NotificationResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM notifications WHERE user_id = ? AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        row.try_get("count").map_err(db_err)
    }

    /// Count a user's notifications grouped by type
    pub async fn count_by_type(
        &self,
        user_id: i64,
    ) -> NotificationResult<Vec<(NotificationType, i64)>> {
        let rows = sqlx::query(
            "SELECT notification_type, COUNT(*) as count FROM notifications \
             WHERE user_id = ? GROUP BY notification_type",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut by_type = Vec::new();
        for row in rows {
            let kind: String = row.try_get("notification_type").map_err(db_err)?;
            let count: i64 = row.try_get("count").map_err(db_err)?;
            by_type.push((NotificationType::from(kind.as_str()), count));
        }
        Ok(by_type)
    }

    /// Delete a notification
    pub async fn delete(&self, id: i64) -> NotificationResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(NotificationError::NotificationNotFound);
        }
        Ok(())
    }

    /// Delete all of a user's read notifications, returning the number removed
    pub async fn delete_read(&self, user_id: i64) -> NotificationResult<u64> {
        let result =
            sqlx::query("DELETE FROM notifications WHERE user_id = ? AND is_read = true")
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(result.rows_affected())
    }
}

fn map_notification(row: SqliteRow) -> NotificationResult<Notification> {
    let kind: String = row.try_get("notification_type").map_err(db_err)?;

    Ok(Notification {
        id: row.try_get("id").map_err(db_err)?,
        user_id: row.try_get("user_id").map_err(db_err)?,
        notification_type: NotificationType::from(kind.as_str()),
        title: row.try_get("title").map_err(db_err)?,
        body: row.try_get("body").map_err(db_err)?,
        is_read: row.try_get("is_read").map_err(db_err)?,
        related_entity_id: row.try_get("related_entity_id").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn db_err(e: sqlx::Error) -> NotificationError {
    NotificationError::DatabaseError(e.to_string())
}
