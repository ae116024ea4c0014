use uuid::Uuid;

use crate::api::error;
use crate::modules::user::model::UserProfileResponse;
use crate::modules::user::schema::UserEntity;

#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, user_id: &Uuid) -> Result<Option<UserEntity>, error::SystemError>;

    async fn search_directory(
        &self,
        query: &str,
        department: Option<&str>,
        limit: i64,
    ) -> Result<Vec<UserProfileResponse>, error::SystemError>;
}
