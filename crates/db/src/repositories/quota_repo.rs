//! Repository for the `rate_limits` table.

use std::time::Duration;

use sqlx::PgPool;

use crate::models::quota::QuotaCounter;

pub struct QuotaRepo;

impl QuotaRepo {
    /// Consume one point under `key` as a single atomic statement.
    ///
    /// A missing or expired row starts a new window at one point; a live row
    /// is incremented and keeps its expiry.
    pub async fn consume(
        pool: &PgPool,
        key: &str,
        window: Duration,
    ) -> Result<QuotaCounter, sqlx::Error> {
        sqlx::query_as::<_, QuotaCounter>(
            "INSERT INTO rate_limits (key, points, expire) \
             VALUES ($1, 1, NOW() + make_interval(secs => $2)) \
             ON CONFLICT (key) DO UPDATE SET \
                points = CASE WHEN rate_limits.expire <= NOW() \
                              THEN 1 ELSE rate_limits.points + 1 END, \
                expire = CASE WHEN rate_limits.expire <= NOW() \
                              THEN EXCLUDED.expire ELSE rate_limits.expire END \
             RETURNING key, points, expire",
        )
        .bind(key)
        .bind(window.as_secs_f64())
        .fetch_one(pool)
        .await
    }

    /// Read the counter without touching it. Expired rows read as absent.
    pub async fn find_live(pool: &PgPool, key: &str) -> Result<Option<QuotaCounter>, sqlx::Error> {
        sqlx::query_as::<_, QuotaCounter>(
            "SELECT key, points, expire FROM rate_limits \
             WHERE key = $1 AND expire > NOW()",
        )
        .bind(key)
        .fetch_optional(pool)
        .await
    }
}
