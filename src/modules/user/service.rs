use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    modules::user::{model::UserProfileResponse, repository::UserRepository},
};

const DIRECTORY_SEARCH_LIMIT: i64 = 25;

#[derive(Clone)]
pub struct UserService<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
}

impl<U> UserService<U>
where
    U: UserRepository,
{
    pub fn with_dependencies(user_repo: Arc<U>) -> Self {
        UserService { user_repo }
    }

    pub async fn get_profile(
        &self,
        user_id: Uuid,
    ) -> Result<UserProfileResponse, error::SystemError> {
        let user = self
            .user_repo
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        Ok(UserProfileResponse::from(user))
    }

    pub async fn search_directory(
        &self,
        query: &str,
        department: Option<&str>,
    ) -> Result<Vec<UserProfileResponse>, error::SystemError> {
        self.user_repo.search_directory(query, department, DIRECTORY_SEARCH_LIMIT).await
    }
}
