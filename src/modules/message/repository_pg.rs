use uuid::Uuid;

use crate::{
    api::error,
    modules::message::{
        model::InsertMessage, repository::MessageRepository, schema::MessageEntity,
    },
};

#[derive(Clone)]
pub struct MessageRepositoryPg {
    pool: sqlx::PgPool,
}

impl MessageRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MessageRepository for MessageRepositoryPg {
    async fn create(
        &self,
        message: &InsertMessage,
    ) -> Result<MessageEntity, error::SystemError> {
        let created = sqlx::query_as::<_, MessageEntity>(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, receiver_id, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&message.conversation_id)
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(&message.content)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_by_id(
        &self,
        message_id: &Uuid,
    ) -> Result<Option<MessageEntity>, error::SystemError> {
        let message = sqlx::query_as::<_, MessageEntity>("SELECT * FROM messages WHERE id = $1")
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(message)
    }

    async fn list_ascending(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<MessageEntity>, error::SystemError> {
        let messages = sqlx::query_as::<_, MessageEntity>(
            r#"
            SELECT *
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    async fn mark_seen_batch(
        &self,
        conversation_id: &str,
        receiver_id: &Uuid,
    ) -> Result<u64, error::SystemError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET seen = TRUE
            WHERE conversation_id = $1
              AND receiver_id = $2
              AND seen = FALSE
            "#,
        )
        .bind(conversation_id)
        .bind(receiver_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn soft_delete(
        &self,
        message_id: &Uuid,
        sender_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET content = '', deleted = TRUE
            WHERE id = $1
              AND sender_id = $2
              AND deleted = FALSE
            "#,
        )
        .bind(message_id)
        .bind(sender_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
