use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Profile rows are provisioned by the platform identity service at
/// signup. This service treats them as read-only.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub department: Option<String>,
    pub batch: Option<String>,
    pub program: Option<String>,
    pub profile_completed: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
