//! User repository for database operations.

use crate::entities::{CreateUserRequest, UpdateUserRequest, User, UserRole};
use crate::types::{Page, SortOrder, UserError, UserResult};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::info;

const USER_COLUMNS: &str = "id, public_id, email, username, display_name, avatar_url, bio, role, \
     professional_title, hourly_rate, skills, location, company_name, onboarding_completed, \
     created_at, updated_at";

/// Composable filter for user listings
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub search: Option<String>,
    pub location: Option<String>,
    pub skill: Option<String>,
    pub min_hourly_rate: Option<f64>,
    pub max_hourly_rate: Option<f64>,
    pub onboarding_completed: Option<bool>,
}

/// Sort key for user listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserSortKey {
    CreatedAt,
    DisplayName,
    HourlyRate,
}

impl UserSortKey {
    fn as_column(&self) -> &'static str {
        match self {
            UserSortKey::CreatedAt => "created_at",
            UserSortKey::DisplayName => "display_name",
            UserSortKey::HourlyRate => "hourly_rate",
        }
    }
}

/// Repository for user database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> UserResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(map_user).transpose()
    }

    /// Find user by public ID
    pub async fn find_by_public_id(&self, public_id: &str) -> UserResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(map_user).transpose()
    }

    /// Find user by email
    pub async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(map_user).transpose()
    }

    /// Create new user
    pub async fn create(&self, request: &CreateUserRequest) -> UserResult<User> {
        let now = Utc::now().to_rfc3339();
        let public_id = cuid2::cuid();

        let result = sqlx::query(
            "INSERT INTO users (public_id, email, username, display_name, avatar_url, bio, role, \
             onboarding_completed, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, false, ?, ?)",
        )
        .bind(&public_id)
        .bind(&request.email)
        .bind(&request.username)
        .bind(&request.display_name)
        .bind(&request.avatar_url)
        .bind(&request.bio)
        .bind(request.role.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(unique_err)?;

        let user_id = result.last_insert_rowid();
        info!(user_id, public_id = %public_id, "created new user");

        self.find_by_id(user_id)
            .await?
            .ok_or_else(|| UserError::DatabaseError("failed to retrieve created user".to_string()))
    }

    /// Create the user, or refresh profile basics if the email is already registered
    pub async fn upsert_by_email(&self, request: &CreateUserRequest) -> UserResult<User> {
        let now = Utc::now().to_rfc3339();
        let public_id = cuid2::cuid();

        sqlx::query(
            "INSERT INTO users (public_id, email, username, display_name, avatar_url, bio, role, \
             onboarding_completed, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, false, ?, ?) \
             ON CONFLICT(email) DO UPDATE SET \
             display_name = excluded.display_name, \
             avatar_url = excluded.avatar_url, \
             bio = excluded.bio, \
             updated_at = excluded.updated_at",
        )
        .bind(&public_id)
        .bind(&request.email)
        .bind(&request.username)
        .bind(&request.display_name)
        .bind(&request.avatar_url)
        .bind(&request.bio)
        .bind(request.role.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(unique_err)?;

        self.find_by_email(&request.email)
            .await?
            .ok_or_else(|| UserError::DatabaseError("failed to retrieve upserted user".to_string()))
    }

    /// Update user
    pub async fn update(&self, user_id: i64, request: &UpdateUserRequest) -> UserResult<User> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE users SET ");
        let mut touched = false;

        {
            let mut fields = qb.separated(", ");
            if let Some(display_name) = &request.display_name {
                fields.push("display_name = ");
                fields.push_bind_unseparated(display_name.clone());
                touched = true;
            }
            if let Some(avatar_url) = &request.avatar_url {
                fields.push("avatar_url = ");
                fields.push_bind_unseparated(avatar_url.clone());
                touched = true;
            }
            if let Some(bio) = &request.bio {
                fields.push("bio = ");
                fields.push_bind_unseparated(bio.clone());
                touched = true;
            }
            if let Some(title) = &request.professional_title {
                fields.push("professional_title = ");
                fields.push_bind_unseparated(title.clone());
                touched = true;
            }
            if let Some(rate) = request.hourly_rate {
                fields.push("hourly_rate = ");
                fields.push_bind_unseparated(rate);
                touched = true;
            }
            if let Some(skills) = &request.skills {
                let encoded = serde_json::to_string(skills)
                    .map_err(|e| UserError::SerializationError(e.to_string()))?;
                fields.push("skills = ");
                fields.push_bind_unseparated(encoded);
                touched = true;
            }
            if let Some(location) = &request.location {
                fields.push("location = ");
                fields.push_bind_unseparated(location.clone());
                touched = true;
            }
            if let Some(company_name) = &request.company_name {
                fields.push("company_name = ");
                fields.push_bind_unseparated(company_name.clone());
                touched = true;
            }
            if let Some(done) = request.onboarding_completed {
                fields.push("onboarding_completed = ");
                fields.push_bind_unseparated(done);
                touched = true;
            }
        }

        if !touched {
            return self.find_by_id(user_id).await?.ok_or(UserError::UserNotFound);
        }

        qb.push(", updated_at = ");
        qb.push_bind(Utc::now().to_rfc3339());
        qb.push(" WHERE id = ");
        qb.push_bind(user_id);

        qb.build().execute(&self.pool).await.map_err(unique_err)?;

        self.find_by_id(user_id).await?.ok_or(UserError::UserNotFound)
    }

    /// Delete user
    pub async fn delete(&self, id: i64) -> UserResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(UserError::UserNotFound);
        }

        info!(user_id = id, "deleted user");
        Ok(())
    }

    /// List users matching a filter, sorted and paginated
    pub async fn list(
        &self,
        filter: &UserFilter,
        sort: UserSortKey,
        order: SortOrder,
        page: Page,
    ) -> UserResult<Vec<User>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        apply_filter(&mut qb, filter);
        qb.push(format!(" ORDER BY {} {}", sort.as_column(), order.as_sql()));
        qb.push(" LIMIT ");
        qb.push_bind(page.limit);
        qb.push(" OFFSET ");
        qb.push_bind(page.offset);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;
        rows.into_iter().map(map_user).collect()
    }

    /// Count users matching a filter
    pub async fn count(&self, filter: &UserFilter) -> UserResult<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) as count FROM users");
        apply_filter(&mut qb, filter);

        let row = qb.build().fetch_one(&self.pool).await.map_err(db_err)?;
        row.try_get("count").map_err(db_err)
    }

    /// Count users grouped by role
    pub async fn count_by_role(&self) -> UserResult<Vec<(UserRole, i64)>> {
        let rows = sqlx::query("SELECT role, COUNT(*) as count FROM users GROUP BY role")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut by_role = Vec::new();
        for row in rows {
            let role: String = row.try_get("role").map_err(db_err)?;
            let count: i64 = row.try_get("count").map_err(db_err)?;
            by_role.push((UserRole::from(role.as_str()), count));
        }
        Ok(by_role)
    }
}

fn apply_filter(qb: &mut QueryBuilder<Sqlite>, filter: &UserFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(role) = filter.role {
        qb.push(" AND role = ");
        qb.push_bind(role.to_string());
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        qb.push(" AND (display_name LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR username LIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
    if let Some(location) = &filter.location {
        qb.push(" AND location = ");
        qb.push_bind(location.clone());
    }
    if let Some(skill) = &filter.skill {
        qb.push(" AND EXISTS (SELECT 1 FROM json_each(users.skills) WHERE json_each.value = ");
        qb.push_bind(skill.clone());
        qb.push(")");
    }
    if let Some(min) = filter.min_hourly_rate {
        qb.push(" AND hourly_rate >= ");
        qb.push_bind(min);
    }
    if let Some(max) = filter.max_hourly_rate {
        qb.push(" AND hourly_rate <= ");
        qb.push_bind(max);
    }
    if let Some(done) = filter.onboarding_completed {
        qb.push(" AND onboarding_completed = ");
        qb.push_bind(done);
    }
}

fn map_user(row: SqliteRow) -> UserResult<User> {
    let role: String = row.try_get("role").map_err(db_err)?;
    let skills_raw: Option<String> = row.try_get("skills").map_err(db_err)?;
    let skills = match skills_raw {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| UserError::SerializationError(e.to_string()))?,
        None => Vec::new(),
    };

    Ok(User {
        id: row.try_get("id").map_err(db_err)?,
        public_id: row.try_get("public_id").map_err(db_err)?,
        email: row.try_get("email").map_err(db_err)?,
        username: row.try_get("username").map_err(db_err)?,
        display_name: row.try_get("display_name").map_err(db_err)?,
        avatar_url: row.try_get("avatar_url").map_err(db_err)?,
        bio: row.try_get("bio").map_err(db_err)?,
        role: UserRole::from(role.as_str()),
        professional_title: row.try_get("professional_title").map_err(db_err)?,
        hourly_rate: row.try_get("hourly_rate").map_err(db_err)?,
        skills,
        location: row.try_get("location").map_err(db_err)?,
        company_name: row.try_get("company_name").map_err(db_err)?,
        onboarding_completed: row.try_get("onboarding_completed").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

fn db_err(e: sqlx::Error) -> UserError {
    UserError::DatabaseError(e.to_string())
}

fn unique_err(e: sqlx::Error) -> UserError {
    let text = e.to_string();
    if text.contains("UNIQUE constraint failed: users.email") {
        UserError::EmailAlreadyExists
    } else if text.contains("UNIQUE constraint failed: users.username") {
        UserError::UsernameAlreadyExists
    } else {
        UserError::DatabaseError(text)
    }
}
