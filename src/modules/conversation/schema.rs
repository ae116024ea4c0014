use sqlx::prelude::FromRow;
use uuid::Uuid;

/// A direct thread between exactly two users. The id is the sorted,
/// joined participant pair; `user_a < user_b` always holds.
#[derive(Debug, Clone, FromRow)]
pub struct ConversationEntity {
    pub id: String,
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ConversationEntity {
    pub fn is_participant(&self, user_id: &Uuid) -> bool {
        self.user_a == *user_id || self.user_b == *user_id
    }

    pub fn other_participant(&self, user_id: &Uuid) -> Option<Uuid> {
        if self.user_a == *user_id {
            Some(self.user_b)
        } else if self.user_b == *user_id {
            Some(self.user_a)
        } else {
            None
        }
    }
}
