use actix_web::{HttpRequest, get, web};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::user::{
        model::{DirectorySearchQuery, UserProfileResponse},
        repository_pg::UserRepositoryPg,
        service::UserService,
    },
    utils::ValidatedQuery,
};

pub type UserSvc = UserService<UserRepositoryPg>;

#[get("/me")]
pub async fn get_own_profile(
    user_service: web::Data<UserSvc>,
    req: HttpRequest,
) -> Result<success::Success<UserProfileResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let profile = user_service.get_profile(user_id).await?;

    Ok(success::Success::ok(Some(profile)))
}

#[get("/{user_id}")]
pub async fn get_profile(
    user_service: web::Data<UserSvc>,
    user_id: web::Path<Uuid>,
) -> Result<success::Success<UserProfileResponse>, error::Error> {
    let profile = user_service.get_profile(*user_id).await?;

    Ok(success::Success::ok(Some(profile)))
}

#[get("/")]
pub async fn search_directory(
    user_service: web::Data<UserSvc>,
    query: ValidatedQuery<DirectorySearchQuery>,
) -> Result<success::Success<Vec<UserProfileResponse>>, error::Error> {
    let users =
        user_service.search_directory(&query.0.q, query.0.department.as_deref()).await?;

    Ok(success::Success::ok(Some(users)))
}
