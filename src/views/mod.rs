//! Deduplicated profile-view counting
//!
//! A view counts at most once per visitor fingerprint, per profile, per UTC
//! day. Deduplication is entirely the store's job: the service derives the
//! key and issues a single insert-if-missing, so any number of service
//! instances can register views concurrently.

pub mod clock;
pub mod fingerprint;

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::models::{RecordOutcome, ViewKey};
use crate::storage::{Storage, StorageError};

pub use clock::{Clock, ManualClock, SystemClock};
pub use fingerprint::{day_key, fingerprint, VisitorMetadata};

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("handle must not be empty")]
    InvalidHandle,
    #[error("profile not found")]
    NotFound,
    #[error("view storage unavailable")]
    Unavailable(#[source] anyhow::Error),
}

impl From<anyhow::Error> for ViewError {
    fn from(err: anyhow::Error) -> Self {
        ViewError::Unavailable(err)
    }
}

impl From<StorageError> for ViewError {
    fn from(err: StorageError) -> Self {
        ViewError::Unavailable(err.into())
    }
}

/// What happened to a registered view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOutcome {
    /// A new record was stored
    Counted,
    /// This visitor was already counted for the profile today
    AlreadyCounted,
    /// The owner looked at their own profile; nothing was written
    SelfVisit,
}

impl ViewOutcome {
    pub fn counted(self) -> bool {
        matches!(self, ViewOutcome::Counted)
    }
}

pub struct ViewService {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl ViewService {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Register one view of `handle`.
    ///
    /// `requester` is the authenticated user id, if any.
    pub async fn register_view(
        &self,
        handle: &str,
        requester: Option<i64>,
        visitor: &VisitorMetadata,
    ) -> Result<ViewOutcome, ViewError> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Err(ViewError::InvalidHandle);
        }

        let profile = self
            .storage
            .find_user_by_handle(handle)
            .await?
            .ok_or(ViewError::NotFound)?;

        if requester == Some(profile.id) {
            debug!(profile_id = profile.id, "self visit ignored");
            return Ok(ViewOutcome::SelfVisit);
        }

        let key = ViewKey::new(profile.id, fingerprint(visitor), day_key(self.clock.now()));
        let outcome = match self.storage.record_view_if_absent(&key).await? {
            RecordOutcome::Inserted => ViewOutcome::Counted,
            RecordOutcome::AlreadyPresent => ViewOutcome::AlreadyCounted,
        };
        debug!(profile_id = profile.id, day = %key.day, ?outcome, "view registered");

        Ok(outcome)
    }

    /// Lifetime view count of the requester's own profile
    pub async fn view_count(&self, requester: i64) -> Result<i64, ViewError> {
        Ok(self.storage.count_views(requester).await?)
    }
}
