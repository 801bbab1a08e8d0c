//! Proposal repository for database operations.

use crate::entities::{CreateProposalRequest, Proposal, ProposalStatus, UpdateProposalRequest};
use crate::types::{JobError, JobResult, Page, SortOrder};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::info;

const PROPOSAL_COLUMNS: &str = "id, public_id, job_id, freelancer_id, cover_letter, bid_amount, \
     status, created_at, updated_at";

/// Aggregated bid figures for a job's proposals
#[derive(Debug, Clone, PartialEq)]
pub struct BidStats {
    pub proposal_count: i64,
    pub min_bid: Option<f64>,
    pub max_bid: Option<f64>,
    pub avg_bid: Option<f64>,
}

/// Repository for proposal database operations
#[derive(Clone)]
pub struct ProposalRepository {
    pool: SqlitePool,
}

impl ProposalRepository {
    /// Create a new proposal repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find proposal by ID
    pub async fn find_by_id(&self, id: i64) -> JobResult<Option<Proposal>> {
        let row = sqlx::query(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(map_proposal).transpose()
    }

    /// Find proposal by public ID
    pub async fn find_by_public_id(&self, public_id: &str) -> JobResult<Option<Proposal>> {
        let row = sqlx::query(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(map_proposal).transpose()
    }

    /// Find a freelancer's proposal on a specific job
    pub async fn find_by_job_and_freelancer(
        &self,
        job_id: i64,
        freelancer_id: i64,
    ) -> JobResult<Option<Proposal>> {
        let row = sqlx::query(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE job_id = ? AND freelancer_id = ?"
        ))
        .bind(job_id)
        .bind(freelancer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(map_proposal).transpose()
    }

    /// Create a new proposal
    pub async fn create(&self, request: &CreateProposalRequest) -> JobResult<Proposal> {
        let now = Utc::now().to_rfc3339();
        let public_id = cuid2::cuid();

        let result = sqlx::query(
            "INSERT INTO proposals (public_id, job_id, freelancer_id, cover_letter, bid_amount, \
             status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, 'pending', ?, ?)",
        )
        .bind(&public_id)
        .bind(request.job_id)
        .bind(request.freelancer_id)
        .bind(&request.cover_letter)
        .bind(request.bid_amount)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let proposal_id = result.last_insert_rowid();
        info!(
            proposal_id,
            job_id = request.job_id,
            freelancer_id = request.freelancer_id,
            "created new proposal"
        );

        self.find_by_id(proposal_id).await?.ok_or_else(|| {
            JobError::DatabaseError("failed to retrieve created proposal".to_string())
        })
    }

    /// Update a proposal
    pub async fn update(
        &self,
        proposal_id: i64,
        request: &UpdateProposalRequest,
    ) -> JobResult<Proposal> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE proposals SET ");
        let mut touched = false;

        {
            let mut fields = qb.separated(", ");
            if let Some(cover_letter) = &request.cover_letter {
                fields.push("cover_letter = ");
                fields.push_bind_unseparated(cover_letter.clone());
                touched = true;
            }
            if let Some(bid_amount) = request.bid_amount {
                fields.push("bid_amount = ");
                fields.push_bind_unseparated(bid_amount);
                touched = true;
            }
            if let Some(status) = request.status {
                fields.push("status = ");
                fields.push_bind_unseparated(status.to_string());
                touched = true;
            }
        }

        if !touched {
            return self
                .find_by_id(proposal_id)
                .await?
                .ok_or(JobError::ProposalNotFound);
        }

        qb.push(", updated_at = ");
        qb.push_bind(Utc::now().to_rfc3339());
        qb.push(" WHERE id = ");
        qb.push_bind(proposal_id);

        qb.build().execute(&self.pool).await.map_err(db_err)?;

        self.find_by_id(proposal_id)
            .await?
            .ok_or(JobError::ProposalNotFound)
    }

    /// Delete a proposal
    pub async fn delete(&self, id: i64) -> JobResult<()> {
        let result = sqlx::query("DELETE FROM proposals WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(JobError::ProposalNotFound);
        }

        info!(proposal_id = id, "deleted proposal");
        Ok(())
    }

    /// List proposals submitted on a job, newest first
    pub async fn list_for_job(
        &self,
        job_id: i64,
        status: Option<ProposalStatus>,
        page: Page,
    ) -> JobResult<Vec<Proposal>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE job_id = "
        ));
        qb.push_bind(job_id);
        if let Some(status) = status {
            qb.push(" AND status = ");
            qb.push_bind(status.to_string());
        }
        qb.push(format!(" ORDER BY created_at {}", SortOrder::Desc.as_sql()));
        qb.push(" LIMIT ");
        qb.push_bind(page.limit);
        qb.push(" OFFSET ");
        qb.push_bind(page.offset);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;
        rows.into_iter().map(map_proposal).collect()
    }

    /// List a freelancer's proposals, newest first
    pub async fn list_by_freelancer(
        &self,
        freelancer_id: i64,
        status: Option<ProposalStatus>,
        page: Page,
    ) -> JobResult<Vec<Proposal>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE freelancer_id = "
        ));
        qb.push_bind(freelancer_id);
        if let Some(status) = status {
            qb.push(" AND status = ");
            qb.push_bind(status.to_string());
        }
        qb.push(format!(" ORDER BY created_at {}", SortOrder::Desc.as_sql()));
        qb.push(" LIMIT ");
        qb.push_bind(page.limit);
        qb.push(" OFFSET ");
        qb.push_bind(page.offset);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;
        rows.into_iter().map(map_proposal).collect()
    }

    /// Count a job's proposals grouped by status
    pub async fn count_by_status_for_job(
        &self,
        job_id: i64,
    ) -> JobResult<Vec<(ProposalStatus, i64)>> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) as count FROM proposals WHERE job_id = ? GROUP BY status",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut by_status = Vec::new();
        for row in rows {
            let status: String = row.try_get("status").map_err(db_err)?;
            let count: i64 = row.try_get("count").map_err(db_err)?;
            by_status.push((ProposalStatus::from(status.as_str()), count));
        }
        Ok(by_status)
    }

    /// Aggregate bid figures over a job's proposals
    pub async fn bid_stats_for_job(&self, job_id: i64) -> JobResult<BidStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) as proposal_count, MIN(bid_amount) as min_bid, \
             MAX(bid_amount) as max_bid, AVG(bid_amount) as avg_bid \
             FROM proposals WHERE job_id = ?",
        )
        .bind(job_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(BidStats {
            proposal_count: row.try_get("proposal_count").map_err(db_err)?,
            min_bid: row.try_get("min_bid").map_err(db_err)?,
            max_bid: row.try_get("max_bid").map_err(db_err)?,
            avg_bid: row.try_get("avg_bid").map_err(db_err)?,
        })
    }

    /// Batch update proposal status, returning the number of affected rows
    pub async fn batch_update_status(
        &self,
        proposal_ids: &[i64],
        status: ProposalStatus,
    ) -> JobResult<u64> {
        if proposal_ids.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().to_rfc3339();
        let placeholders = proposal_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let query_str = format!(
            "UPDATE proposals SET status = ?, updated_at = ? WHERE id IN ({placeholders})"
        );

        let mut query = sqlx::query(&query_str).bind(status.to_string()).bind(now);
        for &proposal_id in proposal_ids {
            query = query.bind(proposal_id);
        }

        let result = query.execute(&self.pool).await.map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

fn map_proposal(row: SqliteRow) -> JobResult<Proposal> {
    let status: String = row.try_get("status").map_err(db_err)?;

    Ok(Proposal {
        id: row.try_get("id").map_err(db_err)?,
        public_id: row.try_get("public_id").map_err(db_err)?,
        job_id: row.try_get("job_id").map_err(db_err)?,
        freelancer_id: row.try_get("freelancer_id").map_err(db_err)?,
        cover_letter: row.try_get("cover_letter").map_err(db_err)?,
        bid_amount: row.try_get("bid_amount").map_err(db_err)?,
        status: ProposalStatus::from(status.as_str()),
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn db_err(e: sqlx::Error) -> JobError {
    JobError::DatabaseError(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{CreateJobRequest, CreateUserRequest, UserRole};
    use crate::repos::{JobRepository, UserRepository};
    use tempfile::TempDir;

    async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_proposals.db");
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePool::connect(&db_url).await.unwrap();
        crate::migrations::MIGRATOR.run(&pool).await.unwrap();
        (pool, temp_dir)
    }

    async fn create_user(pool: &SqlitePool, email: &str, role: UserRole) -> i64 {
        UserRepository::new(pool.clone())
            .create(&CreateUserRequest {
                email: email.to_string(),
                username: None,
                display_name: None,
                role,
                avatar_url: None,
                bio: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn create_job(pool: &SqlitePool, client_id: i64) -> i64 {
        JobRepository::new(pool.clone())
            .create(&CreateJobRequest {
                client_id,
                title: "Test job".to_string(),
                description: "Do the thing".to_string(),
                category: None,
                budget_min: None,
                budget_max: Some(1000.0),
            })
            .await
            .unwrap()
            .id
    }

    fn proposal_request(job_id: i64, freelancer_id: i64, bid: f64) -> CreateProposalRequest {
        CreateProposalRequest {
            job_id,
            freelancer_id,
            cover_letter: "I can do this".to_string(),
            bid_amount: bid,
        }
    }

    #[tokio::test]
    async fn test_proposal_creation_and_lookup() {
        let (pool, _temp_dir) = create_test_pool().await;
        let client = create_user(&pool, "client@example.com", UserRole::Client).await;
        let freelancer = create_user(&pool, "dev@example.com", UserRole::Freelancer).await;
        let job = create_job(&pool, client).await;
        let repo = ProposalRepository::new(pool);

        let created = repo
            .create(&proposal_request(job, freelancer, 800.0))
            .await
            .unwrap();
        assert_eq!(created.status, ProposalStatus::Pending);

        let found = repo
            .find_by_job_and_freelancer(job, freelancer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn test_update_bid_and_status() {
        let (pool, _temp_dir) = create_test_pool().await;
        let client = create_user(&pool, "client@example.com", UserRole::Client).await;
        let freelancer = create_user(&pool, "dev@example.com", UserRole::Freelancer).await;
        let job = create_job(&pool, client).await;
        let repo = ProposalRepository::new(pool);

        let created = repo
            .create(&proposal_request(job, freelancer, 800.0))
            .await
            .unwrap();

        let updated = repo
            .update(
                created.id,
                &UpdateProposalRequest {
                    bid_amount: Some(700.0),
                    status: Some(ProposalStatus::Withdrawn),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.bid_amount, 700.0);
        assert_eq!(updated.status, ProposalStatus::Withdrawn);
    }

    #[tokio::test]
    async fn test_list_for_job_with_status_filter() {
        let (pool, _temp_dir) = create_test_pool().await;
        let client = create_user(&pool, "client@example.com", UserRole::Client).await;
        let first = create_user(&pool, "dev1@example.com", UserRole::Freelancer).await;
        let second = create_user(&pool, "dev2@example.com", UserRole::Freelancer).await;
        let job = create_job(&pool, client).await;
        let repo = ProposalRepository::new(pool);

        let kept = repo
            .create(&proposal_request(job, first, 500.0))
            .await
            .unwrap();
        let withdrawn = repo
            .create(&proposal_request(job, second, 600.0))
            .await
            .unwrap();
        repo.update(
            withdrawn.id,
            &UpdateProposalRequest {
                status: Some(ProposalStatus::Withdrawn),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let pending = repo
            .list_for_job(job, Some(ProposalStatus::Pending), Page::default())
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, kept.id);

        let all = repo.list_for_job(job, None, Page::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_list_by_freelancer() {
        let (pool, _temp_dir) = create_test_pool().await;
        let client = create_user(&pool, "client@example.com", UserRole::Client).await;
        let freelancer = create_user(&pool, "dev@example.com", UserRole::Freelancer).await;
        let other = create_user(&pool, "other@example.com", UserRole::Freelancer).await;
        let job = create_job(&pool, client).await;
        let repo = ProposalRepository::new(pool);

        repo.create(&proposal_request(job, freelancer, 500.0))
            .await
            .unwrap();
        repo.create(&proposal_request(job, other, 600.0))
            .await
            .unwrap();

        let mine = repo
            .list_by_freelancer(freelancer, None, Page::default())
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].freelancer_id, freelancer);
    }

    #[tokio::test]
    async fn test_bid_stats_and_status_counts() {
        let (pool, _temp_dir) = create_test_pool().await;
        let client = create_user(&pool, "client@example.com", UserRole::Client).await;
        let first = create_user(&pool, "dev1@example.com", UserRole::Freelancer).await;
        let second = create_user(&pool, "dev2@example.com", UserRole::Freelancer).await;
        let job = create_job(&pool, client).await;
        let repo = ProposalRepository::new(pool);

        repo.create(&proposal_request(job, first, 400.0))
            .await
            .unwrap();
        let rejected = repo
            .create(&proposal_request(job, second, 600.0))
            .await
            .unwrap();
        repo.update(
            rejected.id,
            &UpdateProposalRequest {
                status: Some(ProposalStatus::Rejected),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let stats = repo.bid_stats_for_job(job).await.unwrap();
        assert_eq!(stats.proposal_count, 2);
        assert_eq!(stats.min_bid, Some(400.0));
        assert_eq!(stats.max_bid, Some(600.0));
        assert_eq!(stats.avg_bid, Some(500.0));

        let mut by_status = repo.count_by_status_for_job(job).await.unwrap();
        by_status.sort_by_key(|(status, _)| status.as_str());
        assert_eq!(
            by_status,
            vec![(ProposalStatus::Pending, 1), (ProposalStatus::Rejected, 1)]
        );
    }

    #[tokio::test]
    async fn test_batch_update_status() {
        let (pool, _temp_dir) = create_test_pool().await;
        let client = create_user(&pool, "client@example.com", UserRole::Client).await;
        let first = create_user(&pool, "dev1@example.com", UserRole::Freelancer).await;
        let second = create_user(&pool, "dev2@example.com", UserRole::Freelancer).await;
        let job = create_job(&pool, client).await;
        let repo = ProposalRepository::new(pool);

        let a = repo
            .create(&proposal_request(job, first, 400.0))
            .await
            .unwrap();
        let b = repo
            .create(&proposal_request(job, second, 600.0))
            .await
            .unwrap();

        let affected = repo
            .batch_update_status(&[a.id, b.id], ProposalStatus::Rejected)
            .await
            .unwrap();
        assert_eq!(affected, 2);

        let rejected = repo
            .list_for_job(job, Some(ProposalStatus::Rejected), Page::default())
            .await
            .unwrap();
        assert_eq!(rejected.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_proposal() {
        let (pool, _temp_dir) = create_test_pool().await;
        let client = create_user(&pool, "client@example.com", UserRole::Client).await;
        let freelancer = create_user(&pool, "dev@example.com", UserRole::Freelancer).await;
        let job = create_job(&pool, client).await;
        let repo = ProposalRepository::new(pool);

        let created = repo
            .create(&proposal_request(job, freelancer, 500.0))
            .await
            .unwrap();
        repo.delete(created.id).await.unwrap();

        assert!(repo.find_by_id(created.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(created.id).await.unwrap_err(),
            JobError::ProposalNotFound
        ));
    }
}
