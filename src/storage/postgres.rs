use crate::models::{
    NewUser, ProfileSummary, ProfileUpdate, RecordOutcome, User, ViewKey, VisitRecord,
};
use crate::storage::trait_def::unix_now;
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

const USER_COLUMNS: &str =
    "id, handle, name, email, password_hash, description, image, links, created_at";

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                handle TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                image TEXT NOT NULL DEFAULT '',
                links TEXT NOT NULL DEFAULT '[]',
                created_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profile_views (
                id BIGSERIAL PRIMARY KEY,
                profile_id BIGINT NOT NULL REFERENCES users(id),
                fingerprint TEXT NOT NULL,
                day TEXT NOT NULL,
                created_at BIGINT NOT NULL,
                UNIQUE (profile_id, fingerprint, day)
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn create_user(&self, user: &NewUser) -> StorageResult<User> {
        let created_at = unix_now()?;

        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (handle, name, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.handle)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(created_at)
        .fetch_optional(self.pool.as_ref())
        .await?;

        created.ok_or(StorageError::Conflict)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn find_user_by_handle(&self, handle: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE handle = $1"
        ))
        .bind(handle)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET handle = $1, description = $2, links = $3
            WHERE id = $4
            "#,
        )
        .bind(&update.handle)
        .bind(&update.description)
        .bind(&update.links)
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_image(&self, id: i64, image_url: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET image = $1 WHERE id = $2")
            .bind(image_url)
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_profiles(
        &self,
        limit: i64,
        before_id: Option<i64>,
    ) -> Result<Vec<ProfileSummary>> {
        let profiles = sqlx::query_as::<_, ProfileSummary>(
            r#"
            SELECT id, handle, name, description, image
            FROM users
            WHERE ($1::BIGINT IS NULL OR id < $1)
            ORDER BY id DESC
            LIMIT $2
            "#,
        )
        .bind(before_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(profiles)
    }

    async fn record_view_if_absent(&self, key: &ViewKey) -> StorageResult<RecordOutcome> {
        if let Some(field) = key.missing_field() {
            return Err(StorageError::InvalidKey(field));
        }
        let created_at = unix_now()?;

        let result = sqlx::query(
            r#"
            INSERT INTO profile_views (profile_id, fingerprint, day, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (profile_id, fingerprint, day) DO NOTHING
            "#,
        )
        .bind(key.profile_id)
        .bind(&key.fingerprint)
        .bind(&key.day)
        .bind(created_at)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        Ok(RecordOutcome::from_rows_affected(result.rows_affected()))
    }

    async fn count_views(&self, profile_id: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM profile_views WHERE profile_id = $1",
        )
        .bind(profile_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn list_views(&self, profile_id: i64, limit: i64) -> Result<Vec<VisitRecord>> {
        let views = sqlx::query_as::<_, VisitRecord>(
            r#"
            SELECT id, profile_id, fingerprint, day, created_at
            FROM profile_views
            WHERE profile_id = $1
            ORDER BY id DESC
            LIMIT $2
            "#,
        )
        .bind(profile_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(views)
    }
}
