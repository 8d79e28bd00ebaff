//! Repository for the `assets` table.

use mu2mi_core::types::DbId;
use sqlx::PgPool;

use crate::models::asset::{Asset, NewAsset};

/// Column list for `assets` queries.
const COLUMNS: &str = "\
    id, user_id, job_id, object_key, mime_type, role, created_at, updated_at";

pub struct AssetRepo;

impl AssetRepo {
    pub async fn create(pool: &PgPool, input: &NewAsset) -> Result<Asset, sqlx::Error> {
        let query = format!(
            "INSERT INTO assets (user_id, job_id, object_key, mime_type, role) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(&input.user_id)
            .bind(input.job_id)
            .bind(&input.object_key)
            .bind(&input.mime_type)
            .bind(input.role.as_str())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Asset>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM assets WHERE id = $1");
        sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_job(pool: &PgPool, job_id: DbId) -> Result<Vec<Asset>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM assets WHERE job_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, Asset>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }

    /// Delete the given assets. Returns the number of rows removed.
    pub async fn delete_many(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM assets WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
