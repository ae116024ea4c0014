use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::user::model::UserProfileResponse;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub id: String,
    pub peer: UserProfileResponse,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Deep-link query: `GET /conversations/resolve?peerId=...`, consumed
/// once by the UI to pre-select a thread.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResolveConversationQuery {
    pub peer_id: Uuid,
}
