//! Repository for the `jobs` table.
//!
//! The repository performs no ownership checks; callers authorize first.

use mu2mi_core::status::JobStatus;
use mu2mi_core::types::DbId;
use sqlx::PgPool;

use crate::models::job::{Job, JobSummary, NewJob, UpdateJob};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, user_id, name, is_public, kind, status_id, prediction_id, \
    created_at, updated_at";

/// Column list for the per-user listing projection.
const SUMMARY_COLUMNS: &str = "id, name, is_public, status_id, kind, created_at";

pub struct JobRepo;

impl JobRepo {
    /// Insert a job in `processing` and, when `asset_id` is given, bind that
    /// uploaded asset to it in the same transaction.
    ///
    /// The asset must belong to the job's user and must not already be bound.
    /// Returns `None` (with nothing persisted) when the binding matches no row.
    pub async fn create_with_asset(
        pool: &PgPool,
        input: &NewJob,
        asset_id: Option<DbId>,
    ) -> Result<Option<Job>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO jobs (user_id, name, is_public, kind, status_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(&input.user_id)
            .bind(&input.name)
            .bind(input.is_public)
            .bind(input.kind.as_str())
            .bind(JobStatus::Processing.id())
            .fetch_one(&mut *tx)
            .await?;

        if let Some(asset_id) = asset_id {
            let bound = sqlx::query(
                "UPDATE assets SET job_id = $1 \
                 WHERE id = $2 AND user_id = $3 AND job_id IS NULL",
            )
            .bind(job.id)
            .bind(asset_id)
            .bind(&input.user_id)
            .execute(&mut *tx)
            .await?;

            if bound.rows_affected() == 0 {
                tracing::debug!(asset_id, user_id = %input.user_id, "Asset not bindable, rolling back job insert");
                tx.rollback().await?;
                return Ok(None);
            }
        }

        tx.commit().await?;
        Ok(Some(job))
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// A user's jobs, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Vec<JobSummary>, sqlx::Error> {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM jobs \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, JobSummary>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Apply an owner patch. Returns `None` if the job does not exist.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateJob,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs SET \
                name = COALESCE($2, name), \
                is_public = COALESCE($3, is_public) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.is_public)
            .fetch_optional(pool)
            .await
    }

    /// Delete a job. Bound assets go with it via `ON DELETE CASCADE`.
    ///
    /// Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_prediction_id(
        pool: &PgPool,
        id: DbId,
        prediction_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE jobs SET prediction_id = $2 WHERE id = $1")
            .bind(id)
            .bind(prediction_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Move a job out of `processing` into `next`.
    ///
    /// The status check and write are one statement, so concurrent callers
    /// cannot both win. Returns `true` only for the caller that applied it.
    pub async fn transition_from_processing(
        pool: &PgPool,
        id: DbId,
        next: JobStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET status_id = $2 \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(id)
        .bind(next.id())
        .bind(JobStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
