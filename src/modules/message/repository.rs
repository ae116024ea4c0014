use uuid::Uuid;

use crate::api::error;
use crate::modules::message::model::InsertMessage;
use crate::modules::message::schema::MessageEntity;

#[async_trait::async_trait]
pub trait MessageRepository: Send + Sync {
    /// Inserts with a server-assigned timestamp and seen = false.
    async fn create(
        &self,
        message: &InsertMessage,
    ) -> Result<MessageEntity, error::SystemError>;

    async fn find_by_id(
        &self,
        message_id: &Uuid,
    ) -> Result<Option<MessageEntity>, error::SystemError>;

    /// Full thread history, server-timestamp ascending. The client never
    /// reorders; this is the display order.
    async fn list_ascending(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageEntity>, error::SystemError>;

    /// Flips every unseen message addressed to `receiver_id` in one
    /// batched write. Returns the number of rows touched; zero means the
    /// flip was already done and no broadcast is owed.
    async fn mark_seen_batch(
        &self,
        conversation_id: &str,
        receiver_id: &Uuid,
    ) -> Result<u64, error::SystemError>;

    /// Soft delete: clears content, sets the deleted flag, keeps the
    /// row. Only applies while the message is still undeleted and owned
    /// by `sender_id`; returns whether anything changed.
    async fn soft_delete(
        &self,
        message_id: &Uuid,
        sender_id: &Uuid,
    ) -> Result<bool, error::SystemError>;
}
