use uuid::Uuid;

use crate::{
    api::error,
    modules::user::{model::UserProfileResponse, repository::UserRepository, schema::UserEntity},
};

#[derive(Clone)]
pub struct UserRepositoryPg {
    pool: sqlx::PgPool,
}

impl UserRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserRepository for UserRepositoryPg {
    async fn find_by_id(&self, user_id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
        let user = sqlx::query_as::<_, UserEntity>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn search_directory(
        &self,
        query: &str,
        department: Option<&str>,
        limit: i64,
    ) -> Result<Vec<UserProfileResponse>, error::SystemError> {
        let pattern = format!("%{}%", query);

        let users = sqlx::query_as::<_, UserProfileResponse>(
            r#"
            SELECT
                id,
                display_name,
                avatar_url,
                department,
                batch,
                program,
                profile_completed
            FROM users
            WHERE display_name ILIKE $1
              AND ($2::text IS NULL OR department = $2)
              AND profile_completed = TRUE
            ORDER BY display_name
            LIMIT $3
            "#,
        )
        .bind(&pattern)
        .bind(department)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
