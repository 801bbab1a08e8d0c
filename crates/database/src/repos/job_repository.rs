//! Job repository for database operations.

use crate::entities::{CreateJobRequest, Job, JobStatus, UpdateJobRequest};
use crate::types::{JobError, JobResult, Page, SortOrder};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::info;

const JOB_COLUMNS: &str = "id, public_id, client_id, title, description, category, budget_min, \
     budget_max, status, created_at, updated_at";

/// Composable filter for job listings
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub client_id: Option<i64>,
    pub status: Option<JobStatus>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_budget: Option<f64>,
    pub max_budget: Option<f64>,
}

/// Sort key for job listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSortKey {
    CreatedAt,
    BudgetMax,
    Title,
}

impl JobSortKey {
    fn as_column(&self) -> &'static str {
        match self {
            JobSortKey::CreatedAt => "created_at",
            JobSortKey::BudgetMax => "budget_max",
            JobSortKey::Title => "title",
        }
    }
}

/// Aggregated budget figures across a filtered set of jobs
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetStats {
    pub job_count: i64,
    pub min_budget: Option<f64>,
    pub max_budget: Option<f64>,
    pub avg_budget: Option<f64>,
}

/// Repository for job database operations
#[derive(Clone)]
pub struct JobRepository {
    pool: SqlitePool,
}

impl JobRepository {
    /// Create a new job repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find job by ID
    pub async fn find_by_id(&self, id: i64) -> JobResult<Option<Job>> {
        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(map_job).transpose()
    }

    /// Find job by public ID
    pub async fn find_by_public_id(&self, public_id: &str) -> JobResult<Option<Job>> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(map_job).transpose()
    }

    /// Create a new job posting
    pub async fn create(&self, request: &CreateJobRequest) -> JobResult<Job> {
        let now = Utc::now().to_rfc3339();
        let public_id = cuid2::cuid();

        let result = sqlx::query(
            "INSERT INTO jobs (public_id, client_id, title, description, category, budget_min, \
             budget_max, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 'open', ?, ?)",
        )
        .bind(&public_id)
        .bind(request.client_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.category)
        .bind(request.budget_min)
        .bind(request.budget_max)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        let job_id = result.last_insert_rowid();
        info!(job_id, client_id = request.client_id, "created new job");

        self.find_by_id(job_id)
            .await?
            .ok_or_else(|| JobError::DatabaseError("failed to retrieve created job".to_string()))
    }

    /// Update a job
    pub async fn update(&self, job_id: i64, request: &UpdateJobRequest) -> JobResult<Job> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE jobs SET ");
        let mut touched = false;

        {
            let mut fields = qb.separated(", ");
            if let Some(title) = &request.title {
                fields.push("title = ");
                fields.push_bind_unseparated(title.clone());
                touched = true;
            }
            if let Some(description) = &request.description {
                fields.push("description = ");
                fields.push_bind_unseparated(description.clone());
                touched = true;
            }
            if let Some(category) = &request.category {
                fields.push("category = ");
                fields.push_bind_unseparated(category.clone());
                touched = true;
            }
            if let Some(min) = request.budget_min {
                fields.push("budget_min = ");
                fields.push_bind_unseparated(min);
                touched = true;
            }
            if let Some(max) = request.budget_max {
                fields.push("budget_max = ");
                fields.push_bind_unseparated(max);
                touched = true;
            }
            if let Some(status) = request.status {
                fields.push("status = ");
                fields.push_bind_unseparated(status.to_string());
                touched = true;
            }
        }

        if !touched {
            return self.find_by_id(job_id).await?.ok_or(JobError::JobNotFound);
        }

        qb.push(", updated_at = ");
        qb.push_bind(Utc::now().to_rfc3339());
        qb.push(" WHERE id = ");
        qb.push_bind(job_id);

        qb.build().execute(&self.pool).await.map_err(db_err)?;

        self.find_by_id(job_id).await?.ok_or(JobError::JobNotFound)
    }

    /// Delete a job
    pub async fn delete(&self, id: i64) -> JobResult<()> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(JobError::JobNotFound);
        }

        info!(job_id = id, "deleted job");
        Ok(())
    }

    /// List jobs matching a filter, sorted and paginated
    pub async fn list(
        &self,
        filter: &JobFilter,
        sort: JobSortKey,
        order: SortOrder,
        page: Page,
    ) -> JobResult<Vec<Job>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {JOB_COLUMNS} FROM jobs"));
        apply_filter(&mut qb, filter);
        qb.push(format!(" ORDER BY {} {}", sort.as_column(), order.as_sql()));
        qb.push(" LIMIT ");
        qb.push_bind(page.limit);
        qb.push(" OFFSET ");
        qb.push_bind(page.offset);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;
        rows.into_iter().map(map_job).collect()
    }

    /// List jobs posted by a client
    pub async fn list_by_client(&self, client_id: i64, page: Page) -> JobResult<Vec<Job>> {
        let filter = JobFilter {
            client_id: Some(client_id),
            ..Default::default()
        };
        self.list(&filter, JobSortKey::CreatedAt, SortOrder::Desc, page)
            .await
    }

    /// Count jobs matching a filter
    pub async fn count(&self, filter: &JobFilter) -> JobResult<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) as count FROM jobs");
        apply_filter(&mut qb, filter);

        let row = qb.build().fetch_one(&self.pool).await.map_err(db_err)?;
        row.try_get("count").map_err(db_err)
    }

    /// Count jobs grouped by status
    pub async fn count_by_status(&self) -> JobResult<Vec<(JobStatus, i64)>> {
        let rows = sqlx::query("SELECT status, COUNT(*) as count FROM jobs GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut by_status = Vec::new();
        for row in rows {
            let status: String = row.try_get("status").map_err(db_err)?;
            let count: i64 = row.try_get("count").map_err(db_err)?;
            by_status.push((JobStatus::from(status.as_str()), count));
        }
        Ok(by_status)
    }

    /// Aggregate budget figures over the jobs matching a filter
    pub async fn budget_stats(&self, filter: &JobFilter) -> JobResult<BudgetStats> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) as job_count, MIN(budget_max) as min_budget, \
             MAX(budget_max) as max_budget, AVG(budget_max) as avg_budget FROM jobs",
        );
        apply_filter(&mut qb, filter);

        let row = qb.build().fetch_one(&self.pool).await.map_err(db_err)?;
        Ok(BudgetStats {
            job_count: row.try_get("job_count").map_err(db_err)?,
            min_budget: row.try_get("min_budget").map_err(db_err)?,
            max_budget: row.try_get("max_budget").map_err(db_err)?,
            avg_budget: row.try_get("avg_budget").map_err(db_err)?,
        })
    }

    /// Batch update job status, returning the number of affected rows
    pub async fn batch_update_status(
        &self,
        job_ids: &[i64],
        status: JobStatus,
    ) -> JobResult<u64> {
        if job_ids.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().to_rfc3339();
        let placeholders = job_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let query_str = format!(
            "UPDATE jobs SET status = ?, updated_at = ? WHERE id IN ({placeholders})"
        );

        let mut query = sqlx::query(&query_str).bind(status.to_string()).bind(now);
        for &job_id in job_ids {
            query = query.bind(job_id);
        }

        let result = query.execute(&self.pool).await.map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

fn apply_filter(qb: &mut QueryBuilder<Sqlite>, filter: &JobFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(client_id) = filter.client_id {
        qb.push(" AND client_id = ");
        qb.push_bind(client_id);
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ");
        qb.push_bind(status.to_string());
    }
    if let Some(category) = &filter.category {
        qb.push(" AND category = ");
        qb.push_bind(category.clone());
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        qb.push(" AND (title LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR description LIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
    if let Some(min) = filter.min_budget {
        qb.push(" AND budget_max >= ");
        qb.push_bind(min);
    }
    if let Some(max) = filter.max_budget {
        qb.push(" AND budget_min <= ");
        qb.push_bind(max);
    }
}

fn map_job(row: SqliteRow) -> JobResult<Job> {
    let status: String = row.try_get("status").map_err(db_err)?;

    Ok(Job {
        id: row.try_get("id").map_err(db_err)?,
        public_id: row.try_get("public_id").map_err(db_err)?,
        client_id: row.try_get("client_id").map_err(db_err)?,
        title: row.try_get("title").map_err(db_err)?,
        description: row.try_get("description").map_err(db_err)?,
        category: row.try_get("category").map_err(db_err)?,
        budget_min: row.try_get("budget_min").map_err(db_err)?,
        budget_max: row.try_get("budget_max").map_err(db_err)?,
        status: JobStatus::from(status.as_str()),
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn db_err(e: sqlx::Error) -> JobError {
    JobError::DatabaseError(e.to_string())
}
