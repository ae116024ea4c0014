use std::sync::Arc;

use uuid::Uuid;

use crate::api::error;
use crate::modules::conversation::repository::ConversationRepository;
use crate::modules::friend::model::ReciprocalStatus;
use crate::modules::friend::repository::FriendRepo;
use crate::modules::friend::service::check_reciprocal;
use crate::modules::message::model::{InsertMessage, MAX_MESSAGE_LENGTH, MessageResponse};
use crate::modules::message::repository::MessageRepository;
use crate::modules::realtime::broker::RealtimeBroker;
use crate::modules::realtime::message::ServerMessage;

#[derive(Clone)]
pub struct MessageService<M, C, F, B>
where
    M: MessageRepository,
    C: ConversationRepository,
    F: FriendRepo,
    B: RealtimeBroker,
{
    message_repo: Arc<M>,
    conversation_repo: Arc<C>,
    friend_repo: Arc<F>,
    broker: Arc<B>,
}

impl<M, C, F, B> MessageService<M, C, F, B>
where
    M: MessageRepository,
    C: ConversationRepository,
    F: FriendRepo,
    B: RealtimeBroker,
{
    pub fn with_dependencies(
        message_repo: Arc<M>,
        conversation_repo: Arc<C>,
        friend_repo: Arc<F>,
        broker: Arc<B>,
    ) -> Self {
        MessageService { message_repo, conversation_repo, friend_repo, broker }
    }

    /// Sends a message into a thread. Validation happens before any
    /// I/O; the reciprocal friend gate is re-checked on every single
    /// send, not just at thread-open time, so a mid-session unfriend
    /// blocks the very next attempt.
    pub async fn send_message(
        &self,
        sender_id: Uuid,
        conversation_id: &str,
        content: &str,
    ) -> Result<MessageResponse, error::SystemError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(error::SystemError::bad_request("Message text must not be empty"));
        }
        if content.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(error::SystemError::bad_request("Message text is too long"));
        }

        let conversation = self
            .conversation_repo
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;

        let receiver_id = conversation
            .other_participant(&sender_id)
            .ok_or_else(|| {
                error::SystemError::forbidden("You are not a participant of this conversation")
            })?;

        match check_reciprocal(self.friend_repo.as_ref(), &sender_id, &receiver_id).await? {
            ReciprocalStatus::Mutual => {}
            ReciprocalStatus::ReciprocalMissing | ReciprocalStatus::NotFriends => {
                return Err(error::SystemError::forbidden(
                    "You are no longer friends with this user",
                ));
            }
        }

        let message = self
            .message_repo
            .create(&InsertMessage {
                conversation_id: conversation_id.to_string(),
                sender_id,
                receiver_id,
                content: content.to_string(),
            })
            .await?;

        let response = MessageResponse::from(message);

        // The sender's own stream carries the message back to them, so
        // nobody is skipped here.
        self.broker.notify_conversation(
            conversation_id,
            ServerMessage::NewMessage {
                conversation_id: conversation_id.to_string(),
                message: response.clone(),
            },
            None,
        );

        // A sent message supersedes any pending "typing..." state.
        self.broker.clear_typing(conversation_id, sender_id);

        Ok(response)
    }

    /// Ordered history replay for a (re)subscribing client.
    pub async fn get_history(
        &self,
        user_id: Uuid,
        conversation_id: &str,
    ) -> Result<Vec<MessageResponse>, error::SystemError> {
        let conversation = self
            .conversation_repo
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))?;

        if !conversation.is_participant(&user_id) {
            return Err(error::SystemError::forbidden(
                "You are not a participant of this conversation",
            ));
        }

        let messages = self.message_repo.list_ascending(conversation_id).await?;

        Ok(messages.into_iter().map(MessageResponse::from).collect())
    }

    /// Batched seen-flip for everything addressed to `user_id` in this
    /// thread. Idempotent: when nothing was unseen, no write lands and
    /// no broadcast goes out.
    pub async fn mark_seen(
        &self,
        user_id: Uuid,
        conversation_id: &str,
    ) -> Result<u64, error::SystemError> {
        let flipped = self.message_repo.mark_seen_batch(conversation_id, &user_id).await?;

        if flipped > 0 {
            self.broker.notify_conversation(
                conversation_id,
                ServerMessage::MessagesSeen {
                    conversation_id: conversation_id.to_string(),
                    seen_by: user_id,
                },
                None,
            );
        }

        Ok(flipped)
    }

    /// Sender-only soft delete; the row keeps its position, timestamp
    /// and seen history.
    pub async fn delete_message(
        &self,
        user_id: Uuid,
        message_id: Uuid,
    ) -> Result<(), error::SystemError> {
        let message = self
            .message_repo
            .find_by_id(&message_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Message not found"))?;

        if message.sender_id != user_id {
            return Err(error::SystemError::forbidden(
                "You can only delete your own messages",
            ));
        }

        let deleted = self.message_repo.soft_delete(&message_id, &user_id).await?;
        if !deleted {
            return Err(error::SystemError::not_found("Message not found or already deleted"));
        }

        self.broker.notify_conversation(
            &message.conversation_id,
            ServerMessage::MessageDeleted {
                conversation_id: message.conversation_id.clone(),
                message_id,
            },
            None,
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::conversation::id::resolve_conversation_id;
    use crate::modules::conversation::schema::ConversationEntity;
    use crate::modules::friend::service::tests_support::{MemFriendRepo, RecordingBroker};
    use crate::modules::message::schema::MessageEntity;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    struct MemMessageRepo {
        messages: Mutex<Vec<MessageEntity>>,
    }

    impl MemMessageRepo {
        fn new() -> Self {
            Self { messages: Mutex::new(Vec::new()) }
        }

        async fn count(&self) -> usize {
            self.messages.lock().await.len()
        }
    }

    #[async_trait::async_trait]
    impl MessageRepository for MemMessageRepo {
        async fn create(
            &self,
            message: &InsertMessage,
        ) -> Result<MessageEntity, error::SystemError> {
            let entity = MessageEntity {
                id: Uuid::now_v7(),
                conversation_id: message.conversation_id.clone(),
                sender_id: message.sender_id,
                receiver_id: message.receiver_id,
                content: message.content.clone(),
                seen: false,
                deleted: false,
                created_at: chrono::Utc::now(),
            };
            self.messages.lock().await.push(entity.clone());
            Ok(entity)
        }

        async fn find_by_id(
            &self,
            message_id: &Uuid,
        ) -> Result<Option<MessageEntity>, error::SystemError> {
            Ok(self.messages.lock().await.iter().find(|m| m.id == *message_id).cloned())
        }

        async fn list_ascending(
            &self,
            conversation_id: &str,
        ) -> Result<Vec<MessageEntity>, error::SystemError> {
            let mut messages: Vec<_> = self
                .messages
                .lock()
                .await
                .iter()
                .filter(|m| m.conversation_id == conversation_id)
                .cloned()
                .collect();
            messages.sort_by_key(|m| (m.created_at, m.id));
            Ok(messages)
        }

        async fn mark_seen_batch(
            &self,
            conversation_id: &str,
            receiver_id: &Uuid,
        ) -> Result<u64, error::SystemError> {
            let mut flipped = 0;
            for m in self.messages.lock().await.iter_mut() {
                if m.conversation_id == conversation_id
                    && m.receiver_id == *receiver_id
                    && !m.seen
                {
                    m.seen = true;
                    flipped += 1;
                }
            }
            Ok(flipped)
        }

        async fn soft_delete(
            &self,
            message_id: &Uuid,
            sender_id: &Uuid,
        ) -> Result<bool, error::SystemError> {
            for m in self.messages.lock().await.iter_mut() {
                if m.id == *message_id && m.sender_id == *sender_id && !m.deleted {
                    m.content.clear();
                    m.deleted = true;
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }

    struct MemConversationRepo {
        threads: Mutex<HashMap<String, ConversationEntity>>,
    }

    impl MemConversationRepo {
        fn with_thread(a: Uuid, b: Uuid) -> (Self, String) {
            let id = resolve_conversation_id(&a, &b);
            let (user_a, user_b) = if a <= b { (a, b) } else { (b, a) };
            let mut threads = HashMap::new();
            threads.insert(
                id.clone(),
                ConversationEntity { id: id.clone(), user_a, user_b, created_at: chrono::Utc::now() },
            );
            (Self { threads: Mutex::new(threads) }, id)
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
            let (user_a, user_b) = if user_id_a <= user_id_b {
                (*user_id_a, *user_id_b)
            } else {
                (*user_id_b, *user_id_a)
            };
            let mut threads = self.threads.lock().await;
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

    struct Fixture {
        svc: MessageService<MemMessageRepo, MemConversationRepo, MemFriendRepo, RecordingBroker>,
        messages: Arc<MemMessageRepo>,
        friends: Arc<MemFriendRepo>,
        broker: Arc<RecordingBroker>,
        conversation_id: String,
        a: Uuid,
        b: Uuid,
    }

    async fn fixture() -> Fixture {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let friends = Arc::new(MemFriendRepo::new());
        friends.insert_accepted_pair(a, b).await;

        let messages = Arc::new(MemMessageRepo::new());
        let (conversations, conversation_id) = MemConversationRepo::with_thread(a, b);
        let broker = Arc::new(RecordingBroker::new());

        let svc = MessageService::with_dependencies(
            messages.clone(),
            Arc::new(conversations),
            friends.clone(),
            broker.clone(),
        );

        Fixture { svc, messages, friends, broker, conversation_id, a, b }
    }

    #[tokio::test]
    async fn send_requires_mutual_friendship_and_creates_no_row() {
        let f = fixture().await;
        f.friends.remove_edge(f.b, f.a).await; // reciprocal edge gone

        let err = f.svc.send_message(f.a, &f.conversation_id, "hi").await.unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));
        assert_eq!(f.messages.count().await, 0);
    }

    #[tokio::test]
    async fn blank_text_is_rejected_before_any_io() {
        let f = fixture().await;

        let err = f.svc.send_message(f.a, &f.conversation_id, "   ").await.unwrap_err();
        assert!(matches!(err, error::SystemError::BadRequest(_)));
        assert_eq!(f.messages.count().await, 0);
        assert!(f.broker.events().await.is_empty());
    }

    #[tokio::test]
    async fn send_broadcasts_and_force_clears_typing() {
        let f = fixture().await;

        let sent = f.svc.send_message(f.a, &f.conversation_id, "  hello  ").await.unwrap();
        assert_eq!(sent.content, "hello");
        assert_eq!(sent.receiver_id, f.b);
        assert!(!sent.seen);

        let cleared = f.broker.typing_clears().await;
        assert_eq!(cleared, vec![(f.conversation_id.clone(), f.a)]);
    }

    #[tokio::test]
    async fn history_is_server_timestamp_ascending() {
        let f = fixture().await;
        f.svc.send_message(f.a, &f.conversation_id, "hi").await.unwrap();
        f.svc.send_message(f.b, &f.conversation_id, "hello").await.unwrap();

        let history = f.svc.get_history(f.a, &f.conversation_id).await.unwrap();
        assert_eq!(
            history.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
            vec!["hi", "hello"]
        );
        assert!(history[0].created_at <= history[1].created_at);
    }

    #[tokio::test]
    async fn mark_seen_is_idempotent_and_broadcasts_once() {
        let f = fixture().await;
        f.svc.send_message(f.a, &f.conversation_id, "hi").await.unwrap();

        let first = f.svc.mark_seen(f.b, &f.conversation_id).await.unwrap();
        assert_eq!(first, 1);

        let events_after_first = f.broker.events().await.len();

        let second = f.svc.mark_seen(f.b, &f.conversation_id).await.unwrap();
        assert_eq!(second, 0);
        // Re-running the flip on an already-seen thread owes no writes
        // and no broadcast.
        assert_eq!(f.broker.events().await.len(), events_after_first);
    }

    #[tokio::test]
    async fn soft_delete_keeps_position_and_timestamp() {
        let f = fixture().await;
        let first = f.svc.send_message(f.a, &f.conversation_id, "hi").await.unwrap();
        f.svc.send_message(f.b, &f.conversation_id, "hello").await.unwrap();

        f.svc.delete_message(f.a, first.id).await.unwrap();

        let history = f.svc.get_history(f.a, &f.conversation_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, first.id);
        assert_eq!(history[0].created_at, first.created_at);
        assert!(history[0].deleted);
        assert!(history[0].content.is_empty());
    }

    #[tokio::test]
    async fn only_the_sender_may_delete() {
        let f = fixture().await;
        let sent = f.svc.send_message(f.a, &f.conversation_id, "hi").await.unwrap();

        let err = f.svc.delete_message(f.b, sent.id).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));

        let history = f.svc.get_history(f.b, &f.conversation_id).await.unwrap();
        assert!(!history[0].deleted);
    }

    #[tokio::test]
    async fn deleting_twice_fails_without_side_effects() {
        let f = fixture().await;
        let sent = f.svc.send_message(f.a, &f.conversation_id, "hi").await.unwrap();

        f.svc.delete_message(f.a, sent.id).await.unwrap();
        let err = f.svc.delete_message(f.a, sent.id).await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }
}
