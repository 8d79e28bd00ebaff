//! Job rows and DTOs.

use mu2mi_core::job::JobKind;
use mu2mi_core::status::{JobStatus, StatusId};
use mu2mi_core::types::{DbId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub user_id: UserId,
    pub name: String,
    pub is_public: bool,
    pub kind: String,
    pub status_id: StatusId,
    pub prediction_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    /// Parsed kind. `None` only if the row violates the table's CHECK.
    pub fn job_kind(&self) -> Option<JobKind> {
        JobKind::from_name(&self.kind)
    }

    pub fn status(&self) -> Option<JobStatus> {
        JobStatus::from_id(self.status_id)
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Fixed projection returned by the per-user listing.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JobSummary {
    pub id: DbId,
    pub name: String,
    pub is_public: bool,
    pub status_id: StatusId,
    pub kind: String,
    pub created_at: Timestamp,
}

/// Insert DTO. New jobs always start in `processing`.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub user_id: UserId,
    pub name: String,
    pub is_public: bool,
    pub kind: JobKind,
}

/// Patch DTO for owner edits. Status is never writable here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateJob {
    pub name: Option<String>,
    pub is_public: Option<bool>,
}

impl UpdateJob {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.is_public.is_none()
    }
}
