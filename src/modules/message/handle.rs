use actix_web::{HttpRequest, delete, get, post, web};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        conversation::repository_pg::ConversationRepositoryPg,
        friend::repository_pg::FriendRepositoryPg,
        message::{
            model::{MessageResponse, SeenResponse, SendMessageBody},
            repository_pg::MessageRepositoryPg,
            service::MessageService,
        },
        realtime::broker::ServerBroker,
    },
    utils::ValidatedJson,
};

pub type MessageSvc =
    MessageService<MessageRepositoryPg, ConversationRepositoryPg, FriendRepositoryPg, ServerBroker>;

#[get("/{conversation_id}/messages")]
pub async fn get_messages(
    message_service: web::Data<MessageSvc>,
    conversation_id: web::Path<String>,
    req: HttpRequest,
) -> Result<success::Success<Vec<MessageResponse>>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let messages = message_service.get_history(user_id, &conversation_id).await?;

    Ok(success::Success::ok(Some(messages)))
}

#[post("/{conversation_id}/messages")]
pub async fn send_message(
    message_service: web::Data<MessageSvc>,
    conversation_id: web::Path<String>,
    body: ValidatedJson<SendMessageBody>,
    req: HttpRequest,
) -> Result<success::Success<MessageResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let message =
        message_service.send_message(user_id, &conversation_id, &body.0.content).await?;

    Ok(success::Success::created(Some(message)))
}

#[post("/{conversation_id}/seen")]
pub async fn mark_seen(
    message_service: web::Data<MessageSvc>,
    conversation_id: web::Path<String>,
    req: HttpRequest,
) -> Result<success::Success<SeenResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let flipped = message_service.mark_seen(user_id, &conversation_id).await?;

    Ok(success::Success::ok(Some(SeenResponse { updated: flipped })))
}

#[delete("/{conversation_id}/messages/{message_id}")]
pub async fn delete_message(
    message_service: web::Data<MessageSvc>,
    path: web::Path<(String, Uuid)>,
    req: HttpRequest,
) -> Result<success::Success<()>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let (_, message_id) = path.into_inner();
    message_service.delete_message(user_id, message_id).await?;

    Ok(success::Success::no_content())
}
