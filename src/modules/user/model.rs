use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::modules::user::schema::UserEntity;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileResponse {
    pub id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub department: Option<String>,
    pub batch: Option<String>,
    pub program: Option<String>,
    pub profile_completed: bool,
}

impl From<UserEntity> for UserProfileResponse {
    fn from(user: UserEntity) -> Self {
        UserProfileResponse {
            id: user.id,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
            department: user.department,
            batch: user.batch,
            program: user.program,
            profile_completed: user.profile_completed,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DirectorySearchQuery {
    #[validate(length(min = 1, max = 100))]
    pub q: String,
    pub department: Option<String>,
}
