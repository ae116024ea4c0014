use actix_web::{HttpRequest, delete, get, post, web};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        friend::{
            model::{
                FriendRequestBody, FriendRequestLists, FriendSummary, FriendshipStatusResponse,
                RequestDecision,
            },
            repository_pg::FriendRepositoryPg,
            schema::FriendRequestEntity,
            service::FriendService,
        },
        realtime::broker::ServerBroker,
        user::repository_pg::UserRepositoryPg,
    },
    utils::ValidatedJson,
};

pub type FriendSvc = FriendService<FriendRepositoryPg, UserRepositoryPg, ServerBroker>;

#[get("/")]
pub async fn get_friends(
    friend_service: web::Data<FriendSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<FriendSummary>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let friends = friend_service.get_friends(user_id).await?;

    Ok(success::Success::ok(Some(friends)))
}

#[get("/requests")]
pub async fn get_requests(
    friend_service: web::Data<FriendSvc>,
    req: HttpRequest,
) -> Result<success::Success<FriendRequestLists>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let requests = friend_service.get_requests(user_id).await?;

    Ok(success::Success::ok(Some(requests)))
}

#[post("/requests")]
pub async fn send_request(
    friend_service: web::Data<FriendSvc>,
    body: ValidatedJson<FriendRequestBody>,
    req: HttpRequest,
) -> Result<success::Success<FriendRequestEntity>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let request = friend_service.send_friend_request(user_id, body.0.receiver_id).await?;

    Ok(success::Success::created(Some(request)))
}

#[post("/requests/{request_id}/accept")]
pub async fn accept_request(
    friend_service: web::Data<FriendSvc>,
    request_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<FriendSummary>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let friend = friend_service
        .respond_to_request(user_id, *request_id, RequestDecision::Accepted)
        .await?
        .ok_or(error::Error::InternalServer)?;

    Ok(success::Success::ok(Some(friend)))
}

#[post("/requests/{request_id}/reject")]
pub async fn reject_request(
    friend_service: web::Data<FriendSvc>,
    request_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<FriendSummary>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    friend_service.respond_to_request(user_id, *request_id, RequestDecision::Rejected).await?;

    Ok(success::Success::no_content())
}

#[delete("/requests/{request_id}")]
pub async fn cancel_request(
    friend_service: web::Data<FriendSvc>,
    request_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    friend_service.cancel_request(user_id, *request_id).await?;

    Ok(success::Success::no_content())
}

#[get("/{friend_id}/status")]
pub async fn get_friendship_status(
    friend_service: web::Data<FriendSvc>,
    friend_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<FriendshipStatusResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let status = friend_service.reciprocal_status(user_id, *friend_id).await?;

    Ok(success::Success::ok(Some(FriendshipStatusResponse { status })))
}

#[delete("/{friend_id}")]
pub async fn remove_friend(
    friend_service: web::Data<FriendSvc>,
    friend_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    friend_service.remove_friend(user_id, *friend_id).await?;

    Ok(success::Success::no_content())
}
