use sqlx::prelude::FromRow;
use uuid::Uuid;

/// `created_at` is server-assigned and is the display order; soft
/// deletion clears `content` but keeps the row so ordering and the
/// seen history stay intact.
#[derive(Debug, Clone, FromRow)]
pub struct MessageEntity {
    pub id: Uuid,
    pub conversation_id: String,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub seen: bool,
    pub deleted: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
