//! Conversation repository for database operations.

use crate::entities::{Conversation, CreateConversationRequest};
use crate::types::{MessagingError, MessagingResult, Page, SortOrder};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::info;

const CONVERSATION_COLUMNS: &str =
    "id, public_id, participant_ids, job_id, last_message_id, created_at, updated_at";

/// Repository for conversation database operations
#[derive(Clone)]
pub struct ConversationRepository {
    pool: SqlitePool,
}

impl ConversationRepository {
    /// Create a new conversation repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find conversation by ID
    pub async fn find_by_id(&self, id: i64) -> MessagingResult<Option<Conversation>> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(map_conversation).transpose()
    }

    /// Find conversation by public ID
    pub async fn find_by_public_id(&self, public_id: &str) -> MessagingResult<Option<Conversation>> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(map_conversation).transpose()
    }

    /// Create a new conversation
    pub async fn create(&self, request: &CreateConversationRequest) -> MessagingResult<Conversation> {
        let now = Utc::now().to_rfc3339();
        let public_id = cuid2::cuid();
        let participants = serde_json::to_string(&request.participant_ids)
            .map_err(|e| MessagingError::SerializationError(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO conversations (public_id, participant_ids, job_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&participants)
        .bind(request.job_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let conversation_id = result.last_insert_rowid();
        info!(conversation_id, public_id = %public_id, "created new conversation");

        self.find_by_id(conversation_id).await?.ok_or_else(|| {
            MessagingError::DatabaseError("failed to retrieve created conversation".to_string())
        })
    }

    /// List conversations a user participates in, most recently updated first
    pub async fn find_by_participant(
        &self,
        user_public_id: &str,
        page: Page,
    ) -> MessagingResult<Vec<Conversation>> {
        let rows = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE EXISTS (SELECT 1 FROM json_each(conversations.participant_ids) \
             WHERE json_each.value = ?) \
             ORDER BY updated_at {} LIMIT ? OFFSET ?",
            SortOrder::Desc.as_sql()
        ))
        .bind(user_public_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(map_conversation).collect()
    }

    /// List conversations attached to a job
    pub async fn find_by_job(&self, job_id: i64) -> MessagingResult<Vec<Conversation>> {
        let rows = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE job_id = ? \
             ORDER BY updated_at DESC"
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(map_conversation).collect()
    }

    /// Point the conversation at its newest message
    pub async fn set_last_message(
        &self,
        conversation_id: i64,
        message_id: i64,
    ) -> MessagingResult<()> {
        let result = sqlx::query(
            "UPDATE conversations SET last_message_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(message_id)
        .bind(Utc::now().to_rfc3339())
        .bind(conversation_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(MessagingError::ConversationNotFound);
        }
        Ok(())
    }

    /// Transaction-scoped variant of [`Self::set_last_message`]
    pub async fn set_last_message_tx(
        conn: &mut SqliteConnection,
        conversation_id: i64,
        message_id: i64,
    ) -> MessagingResult<()> {
        let result = sqlx::query(
            "UPDATE conversations SET last_message_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(message_id)
        .bind(Utc::now().to_rfc3339())
        .bind(conversation_id)
        .execute(conn)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(MessagingError::ConversationNotFound);
        }
        Ok(())
    }

    /// Count conversations a user participates in
    pub async fn count_for_participant(&self, user_public_id: &str) -> MessagingResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM conversations \
             WHERE EXISTS (SELECT 1 FROM json_each(conversations.participant_ids) \
             WHERE json_each.value = ?)",
        )
        .bind(user_public_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        row.try_get("count").map_err(db_err)
    }

    /// Delete a conversation and, via foreign keys, its messages
    pub async fn delete(&self, id: i64) -> MessagingResult<()> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(MessagingError::ConversationNotFound);
        }

        info!(conversation_id = id, "deleted conversation");
        Ok(())
    }
}

fn map_conversation(row: SqliteRow) -> MessagingResult<Conversation> {
    let participants_raw: String = row.try_get("participant_ids").map_err(db_err)?;
    let participant_ids = serde_json::from_str(&participants_raw)
        .map_err(|e| MessagingError::SerializationError(e.to_string()))?;

    Ok(Conversation {
        id: row.try_get("id").map_err(db_err)?,
        public_id: row.try_get("public_id").map_err(db_err)?,
        participant_ids,
        job_id: row.try_get("job_id").map_err(db_err)?,
        last_message_id: row.try_get("last_message_id").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn db_err(e: sqlx::Error) -> MessagingError {
    MessagingError::DatabaseError(e.to_string())
}
