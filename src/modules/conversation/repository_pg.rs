use uuid::Uuid;

use crate::{
    api::error,
    modules::conversation::{repository::ConversationRepository, schema::ConversationEntity},
};

#[derive(Clone)]
pub struct ConversationRepositoryPg {
    pool: sqlx::PgPool,
}

impl ConversationRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConversationRepository for ConversationRepositoryPg {
    async fn find_by_id(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        let conversation =
            sqlx::query_as::<_, ConversationEntity>("SELECT * FROM conversations WHERE id = $1")
                .bind(conversation_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(conversation)
    }

    async fn ensure_thread(
        &self,
        conversation_id: &str,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<ConversationEntity, error::SystemError> {
        let (user_a, user_b) =
            if user_id_a <= user_id_b { (user_id_a, user_id_b) } else { (user_id_b, user_id_a) };

        // ON CONFLICT DO NOTHING keeps repeated opens merge-safe; the
        // follow-up SELECT returns the surviving row either way.
        sqlx::query(
            r#"
            INSERT INTO conversations (id, user_a, user_b)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(conversation_id)
        .bind(user_a)
        .bind(user_b)
        .execute(&self.pool)
        .await?;

        let conversation =
            sqlx::query_as::<_, ConversationEntity>("SELECT * FROM conversations WHERE id = $1")
                .bind(conversation_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(conversation)
    }
}
