use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::message::schema::MessageEntity;

pub const MAX_MESSAGE_LENGTH: usize = 4000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: String,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub seen: bool,
    pub deleted: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<MessageEntity> for MessageResponse {
    fn from(message: MessageEntity) -> Self {
        MessageResponse {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content,
            seen: message.seen,
            deleted: message.deleted,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageBody {
    #[validate(length(min = 1, max = 4000))]
    pub content: String,
}

/// How many rows the batched seen-flip actually touched.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenResponse {
    pub updated: u64,
}

#[derive(Debug, Clone)]
pub struct InsertMessage {
    pub conversation_id: String,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
}
