use crate::access::ShareRole;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod create_share;
pub mod get_shares;
pub mod revoke_shares;

pub const DEFAULT_MAX_SHARE_DAYS: u32 = 30;

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct Share {
    pub id: Uuid,
    pub list_id: Uuid,
    pub email: String,
    pub role: ShareRole,
    pub created_by: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Share {
    pub fn new(
        id: Uuid,
        list_id: Uuid,
        email: String,
        role: ShareRole,
        created_by: Uuid,
        expires_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            list_id,
            email,
            role,
            created_by,
            expires_at,
            created_at,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
