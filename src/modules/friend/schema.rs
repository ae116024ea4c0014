use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, PartialEq, Clone, Type, Serialize, Deserialize)]
#[sqlx(type_name = "friend_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FriendStatus {
    Pending,
    Accepted,
    Rejected,
}

/// One directional edge: what `owner_id` asserts about `friend_id`.
/// An accepted friendship is mirrored as two rows, one per direction.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FriendEdgeEntity {
    pub owner_id: Uuid,
    pub friend_id: Uuid,
    pub status: FriendStatus,
    pub since: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestEntity {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub status: FriendStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
