/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// User identifiers are opaque strings issued by the auth provider.
pub type UserId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
