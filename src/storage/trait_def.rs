use crate::models::{
    NewUser, ProfileSummary, ProfileUpdate, RecordOutcome, User, ViewKey, VisitRecord,
};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// A unique column (email or handle) is already taken
    #[error("record already exists")]
    Conflict,
    #[error("view key field '{0}' must not be empty")]
    InvalidKey(&'static str),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        let unique_violation = err
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if unique_violation {
            StorageError::Conflict
        } else {
            StorageError::Other(err.into())
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables and indexes)
    async fn init(&self) -> Result<()>;

    /// Insert a new account. Fails with `Conflict` when the email or handle
    /// is already taken, including when a concurrent registration wins the race.
    async fn create_user(&self, user: &NewUser) -> StorageResult<User>;

    async fn get_user(&self, id: i64) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_user_by_handle(&self, handle: &str) -> Result<Option<User>>;

    /// Update handle, description and links. Returns false if the user is gone.
    async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> StorageResult<bool>;

    async fn set_image(&self, id: i64, image_url: &str) -> Result<bool>;

    /// Public listing, newest first. `before_id` is the keyset cursor.
    async fn list_profiles(&self, limit: i64, before_id: Option<i64>)
        -> Result<Vec<ProfileSummary>>;

    /// Atomically record a view unless one already exists for the key.
    ///
    /// Concurrent calls with an identical key yield exactly one `Inserted`;
    /// a duplicate key is reported as `AlreadyPresent`, never as an error.
    async fn record_view_if_absent(&self, key: &ViewKey) -> StorageResult<RecordOutcome>;

    /// Lifetime number of recorded views for a profile
    async fn count_views(&self, profile_id: i64) -> Result<i64>;

    /// Most recent visit records for a profile
    async fn list_views(&self, profile_id: i64, limit: i64) -> Result<Vec<VisitRecord>>;
}

pub(crate) fn unix_now() -> Result<i64> {
    Ok(std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs() as i64)
}
