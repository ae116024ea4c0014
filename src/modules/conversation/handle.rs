use actix_web::{HttpRequest, get, web};

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::{
        conversation::{
            model::{ConversationResponse, ResolveConversationQuery},
            repository_pg::ConversationRepositoryPg,
            service::ConversationService,
        },
        friend::repository_pg::FriendRepositoryPg,
        user::repository_pg::UserRepositoryPg,
    },
    utils::ValidatedQuery,
};

pub type ConversationSvc =
    ConversationService<ConversationRepositoryPg, FriendRepositoryPg, UserRepositoryPg>;

#[get("/resolve")]
pub async fn resolve_conversation(
    conversation_service: web::Data<ConversationSvc>,
    query: ValidatedQuery<ResolveConversationQuery>,
    req: HttpRequest,
) -> Result<success::Success<ConversationResponse>, error::Error> {
    let user_id = get_claims(&req)?.sub;
    let conversation =
        conversation_service.open_conversation(user_id, query.0.peer_id).await?;

    Ok(success::Success::ok(Some(conversation)))
}
