use mu2mi_core::asset::AssetRole;
use mu2mi_core::types::{DbId, Timestamp, UserId};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `assets` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Asset {
    pub id: DbId,
    pub user_id: UserId,
    pub job_id: Option<DbId>,
    pub object_key: String,
    pub mime_type: String,
    pub role: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Asset {
    pub fn asset_role(&self) -> Option<AssetRole> {
        AssetRole::from_name(&self.role)
    }
}

#[derive(Debug, Clone)]
pub struct NewAsset {
    pub user_id: UserId,
    pub job_id: Option<DbId>,
    pub object_key: String,
    pub mime_type: String,
    pub role: AssetRole,
}
