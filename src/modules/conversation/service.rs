use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        conversation::{
            id::resolve_conversation_id, model::ConversationResponse,
            repository::ConversationRepository,
        },
        friend::{model::ReciprocalStatus, repository::FriendRepo, service::check_reciprocal},
        user::{model::UserProfileResponse, repository::UserRepository},
    },
};

#[derive(Clone)]
pub struct ConversationService<C, F, U>
where
    C: ConversationRepository,
    F: FriendRepo,
    U: UserRepository,
{
    conversation_repo: Arc<C>,
    friend_repo: Arc<F>,
    user_repo: Arc<U>,
}

impl<C, F, U> ConversationService<C, F, U>
where
    C: ConversationRepository,
    F: FriendRepo,
    U: UserRepository,
{
    pub fn with_dependencies(
        conversation_repo: Arc<C>,
        friend_repo: Arc<F>,
        user_repo: Arc<U>,
    ) -> Self {
        ConversationService { conversation_repo, friend_repo, user_repo }
    }

    /// Resolves (and lazily creates) the thread between the caller and a
    /// peer. Gated on the live reciprocal check, so a deep link to a
    /// non-friend or a half-removed friendship resolves to 403 rather
    /// than a thread.
    pub async fn open_conversation(
        &self,
        user_id: Uuid,
        peer_id: Uuid,
    ) -> Result<ConversationResponse, error::SystemError> {
        if user_id == peer_id {
            return Err(error::SystemError::bad_request(
                "Cannot open a conversation with yourself",
            ));
        }

        match check_reciprocal(self.friend_repo.as_ref(), &user_id, &peer_id).await? {
            ReciprocalStatus::Mutual => {}
            ReciprocalStatus::ReciprocalMissing | ReciprocalStatus::NotFriends => {
                return Err(error::SystemError::forbidden(
                    "You are not friends with this user",
                ));
            }
        }

        let peer = self
            .user_repo
            .find_by_id(&peer_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        let conversation_id = resolve_conversation_id(&user_id, &peer_id);
        let conversation =
            self.conversation_repo.ensure_thread(&conversation_id, &user_id, &peer_id).await?;

        Ok(ConversationResponse {
            id: conversation.id,
            peer: UserProfileResponse::from(peer),
            created_at: conversation.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::friend::service::tests_support::{MemFriendRepo, MemUserRepo};
    use crate::modules::conversation::schema::ConversationEntity;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    struct MemConversationRepo {
        threads: Mutex<HashMap<String, ConversationEntity>>,
    }

    impl MemConversationRepo {
        fn new() -> Self {
            Self { threads: Mutex::new(HashMap::new()) }
        }
    }

    #[async_trait::async_trait]
    impl ConversationRepository for MemConversationRepo {
        async fn find_by_id(
            &self,
            conversation_id: &str,
        ) -> Result<Option<ConversationEntity>, error::SystemError> {
            Ok(self.threads.lock().await.get(conversation_id).cloned())
        }

        async fn ensure_thread(
            &self,
            conversation_id: &str,
            user_id_a: &Uuid,
            user_id_b: &Uuid,
        ) -> Result<ConversationEntity, error::SystemError> {
            let mut threads = self.threads.lock().await;
            let (user_a, user_b) = if user_id_a <= user_id_b {
                (*user_id_a, *user_id_b)
            } else {
                (*user_id_b, *user_id_a)
            };
            let entry = threads.entry(conversation_id.to_string()).or_insert(
                ConversationEntity {
                    id: conversation_id.to_string(),
                    user_a,
                    user_b,
                    created_at: chrono::Utc::now(),
                },
            );
            Ok(entry.clone())
        }
    }

    fn service(
        friends: Arc<MemFriendRepo>,
        users: Arc<MemUserRepo>,
    ) -> ConversationService<MemConversationRepo, MemFriendRepo, MemUserRepo> {
        ConversationService::with_dependencies(Arc::new(MemConversationRepo::new()), friends, users)
    }

    #[tokio::test]
    async fn open_requires_mutual_friendship() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let users = Arc::new(MemUserRepo::with_users(&[a, b]));
        let friends = Arc::new(MemFriendRepo::new());

        let svc = service(friends.clone(), users);

        let err = svc.open_conversation(a, b).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));

        friends.insert_accepted_pair(a, b).await;
        let conv = svc.open_conversation(a, b).await.unwrap();
        assert_eq!(conv.id, resolve_conversation_id(&a, &b));
    }

    #[tokio::test]
    async fn open_is_idempotent_and_commutative() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let users = Arc::new(MemUserRepo::with_users(&[a, b]));
        let friends = Arc::new(MemFriendRepo::new());
        friends.insert_accepted_pair(a, b).await;

        let svc = service(friends, users);

        let first = svc.open_conversation(a, b).await.unwrap();
        let second = svc.open_conversation(b, a).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);
    }

    #[tokio::test]
    async fn half_removed_friendship_blocks_open() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let users = Arc::new(MemUserRepo::with_users(&[a, b]));
        let friends = Arc::new(MemFriendRepo::new());
        friends.insert_accepted_pair(a, b).await;
        friends.remove_edge(a, b).await; // a's side gone, b's remains

        let svc = service(friends, users);

        let err = svc.open_conversation(b, a).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));
    }
}
