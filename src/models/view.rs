use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One counted profile view. Unique per (profile_id, fingerprint, day).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VisitRecord {
    pub id: i64,
    pub profile_id: i64,
    pub fingerprint: String,
    /// UTC calendar day, `YYYY-MM-DD`
    pub day: String,
    pub created_at: i64,
}

/// Dedup key of a visit record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    pub profile_id: i64,
    pub fingerprint: String,
    pub day: String,
}

impl ViewKey {
    pub fn new(profile_id: i64, fingerprint: impl Into<String>, day: impl Into<String>) -> Self {
        Self {
            profile_id,
            fingerprint: fingerprint.into(),
            day: day.into(),
        }
    }

    /// Name of the first empty key field, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.fingerprint.is_empty() {
            Some("fingerprint")
        } else if self.day.is_empty() {
            Some("day")
        } else {
            None
        }
    }
}

/// Result of an insert-if-missing on the visit store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Inserted,
    AlreadyPresent,
}

impl RecordOutcome {
    pub(crate) fn from_rows_affected(rows: u64) -> Self {
        if rows == 0 {
            RecordOutcome::AlreadyPresent
        } else {
            RecordOutcome::Inserted
        }
    }
}
