use uuid::Uuid;

use crate::api::error;
use crate::modules::conversation::schema::ConversationEntity;

#[async_trait::async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find_by_id(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationEntity>, error::SystemError>;

    /// Idempotent create: inserts the thread if absent, never clobbers
    /// an existing row, and returns whatever is stored afterwards.
    async fn ensure_thread(
        &self,
        conversation_id: &str,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<ConversationEntity, error::SystemError>;
}
