use mu2mi_core::types::Timestamp;
use sqlx::FromRow;

/// A row from the `rate_limits` table.
#[derive(Debug, Clone, FromRow)]
pub struct QuotaCounter {
    pub key: String,
    pub points: i32,
    pub expire: Timestamp,
}

impl QuotaCounter {
    /// Milliseconds until the window resets, relative to `now`.
    pub fn ms_until_expiry(&self, now: Timestamp) -> i64 {
        (self.expire - now).num_milliseconds().max(0)
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expire <= now
    }
}
