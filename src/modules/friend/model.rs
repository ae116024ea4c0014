use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FriendSummary {
    pub id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub since: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestView {
    pub id: Uuid,
    pub peer_id: Uuid,
    pub peer_display_name: String,
    pub peer_avatar_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestLists {
    pub incoming: Vec<FriendRequestView>,
    pub outgoing: Vec<FriendRequestView>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestBody {
    pub receiver_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestDecision {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendshipStatusResponse {
    pub status: ReciprocalStatus,
}

/// Outcome of the live two-direction edge check that gates messaging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReciprocalStatus {
    /// Both directions accepted; messaging allowed.
    Mutual,
    /// Exactly one direction accepted. Detected and reported, never
    /// auto-repaired; messaging is blocked while in this state.
    ReciprocalMissing,
    NotFriends,
}
