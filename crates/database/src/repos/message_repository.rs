//! Repository for message data access operations.

use crate::entities::{CreateMessageRequest, Message};
use crate::types::{MessagingError, MessagingResult, Page, SortOrder};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::info;

const MESSAGE_COLUMNS: &str =
    "id, public_id, conversation_id, sender_id, receiver_id, content, is_read, created_at";

/// Repository for message database operations
#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    /// Create a new message repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find message by ID
    pub async fn find_by_id(&self, id: i64) -> MessagingResult<Option<Message>> {
        let row = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(map_message).transpose()
    }

    /// Find message by public ID
    pub async fn find_by_public_id(&self, public_id: &str) -> MessagingResult<Option<Message>> {
        let row = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(map_message).transpose()
    }

    /// Create a new message
    pub async fn create(&self, request: &CreateMessageRequest) -> MessagingResult<Message> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        Self::create_tx(&mut conn, request).await
    }

    /// Transaction-scoped message insert.
    ///
    /// Pair with `ConversationRepository::set_last_message_tx` so the insert
    /// and the denormalized pointer update commit together.
    pub async fn create_tx(
        conn: &mut SqliteConnection,
        request: &CreateMessageRequest,
    ) -> MessagingResult<Message> {
        let public_id = cuid2::cuid();
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO messages (public_id, conversation_id, sender_id, receiver_id, content, \
             is_read, created_at) VALUES (?, ?, ?, ?, ?, false, ?)",
        )
        .bind(&public_id)
        .bind(request.conversation_id)
        .bind(request.sender_id)
        .bind(request.receiver_id)
        .bind(&request.content)
        .bind(&now)
        .execute(conn)
        .await
        .map_err(db_err)?;

        let message_id = result.last_insert_rowid();
        info!(
            message_id,
            public_id = %public_id,
            conversation_id = request.conversation_id,
            sender_id = request.sender_id,
            "created new message"
        );

        Ok(Message {
            id: message_id,
            public_id,
            conversation_id: request.conversation_id,
            sender_id: request.sender_id,
            receiver_id: request.receiver_id,
            content: request.content.clone(),
            is_read: false,
            created_at: now,
        })
    }

    /// Insert a batch of messages atomically, returning the number of
    /// inserted rows. A failure rolls back the whole batch.
    pub async fn create_many(&self, requests: &[CreateMessageRequest]) -> MessagingResult<u64> {
        if requests.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut inserted = 0;
        for request in requests {
            Self::create_tx(&mut tx, request).await?;
            inserted += 1;
        }
        tx.commit().await.map_err(db_err)?;
        Ok(inserted)
    }

    /// List messages in a conversation with pagination, newest first
    pub async fn list_for_conversation(
        &self,
        conversation_id: i64,
        page: Page,
    ) -> MessagingResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ? \
             ORDER BY created_at {}, id {} LIMIT ? OFFSET ?",
            SortOrder::Desc.as_sql(),
            SortOrder::Desc.as_sql()
        ))
        .bind(conversation_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(map_message).collect()
    }

    /// Mark a single message as read
    pub async fn mark_read(&self, id: i64) -> MessagingResult<()> {
        let result = sqlx::query("UPDATE messages SET is_read = true WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(MessagingError::MessageNotFound);
        }
        Ok(())
    }

    /// Mark every unread message addressed to a user in a conversation as read,
    /// returning the number of affected rows
    pub async fn mark_conversation_read(
        &self,
        conversation_id: i64,
        receiver_id: i64,
    ) -> MessagingResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = true \
             WHERE conversation_id = ? AND receiver_id = ? AND is_read = false",
        )
        .bind(conversation_id)
        .bind(receiver_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected())
    }

    /// Count unread messages addressed to a user
    pub async fn unread_count(&self, receiver_id: i64) -> MessagingResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM messages WHERE receiver_id = ? AND is_read = false",
        )
        .bind(receiver_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        row.try_get("count").map_err(db_err)
    }

    /// Unread message counts bucketed per conversation for a user
    pub async fn unread_count_by_conversation(
        &self,
        receiver_id: i64,
    ) -> MessagingResult<Vec<(i64, i64)>> {
        let rows = sqlx::query(
            "SELECT conversation_id, COUNT(*) as count FROM messages \
             WHERE receiver_id = ? AND is_read = false \
             GROUP BY conversation_id ORDER BY conversation_id",
        )
        .bind(receiver_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut by_conversation = Vec::new();
        for row in rows {
            let conversation_id: i64 = row.try_get("conversation_id").map_err(db_err)?;
            let count: i64 = row.try_get("count").map_err(db_err)?;
            by_conversation.push((conversation_id, count));
        }
        Ok(by_conversation)
    }

    /// Delete a message
    pub async fn delete(&self, id: i64) -> MessagingResult<()> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(MessagingError::MessageNotFound);
        }

        info!(message_id = id, "deleted message");
        Ok(())
    }
}

fn map_message(row: SqliteRow) -> MessagingResult<Message> {
    Ok(Message {
        id: row.try_get("id").map_err(db_err)?,
        public_id: row.try_get("public_id").map_err(db_err)?,
        conversation_id: row.try_get("conversation_id").map_err(db_err)?,
        sender_id: row.try_get("sender_id").map_err(db_err)?,
        receiver_id: row.try_get("receiver_id").map_err(db_err)?,
        content: row.try_get("content").map_err(db_err)?,
        is_read: row.try_get("is_read").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn db_err(e: sqlx::Error) -> MessagingError {
    MessagingError::DatabaseError(e.to_string())
}
