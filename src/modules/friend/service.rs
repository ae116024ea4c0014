use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        friend::{
            model::{FriendRequestLists, FriendSummary, ReciprocalStatus, RequestDecision},
            repository::FriendRepo,
            schema::{FriendRequestEntity, FriendStatus},
        },
        realtime::{broker::RealtimeBroker, message::ServerMessage},
        user::repository::UserRepository,
    },
};

/// Live verification that BOTH directions of a friend edge agree. This
/// is the messaging gate: callers re-run it on every send, not once at
/// thread-open time. Asymmetry is reported and logged, never repaired.
pub async fn check_reciprocal<R>(
    friend_repo: &R,
    user_id: &Uuid,
    peer_id: &Uuid,
) -> Result<ReciprocalStatus, error::SystemError>
where
    R: FriendRepo + ?Sized,
{
    let (forward, reverse) = tokio::try_join!(
        friend_repo.find_edge(user_id, peer_id),
        friend_repo.find_edge(peer_id, user_id),
    )?;

    let forward_accepted =
        forward.map(|e| e.status == FriendStatus::Accepted).unwrap_or(false);
    let reverse_accepted =
        reverse.map(|e| e.status == FriendStatus::Accepted).unwrap_or(false);

    match (forward_accepted, reverse_accepted) {
        (true, true) => Ok(ReciprocalStatus::Mutual),
        (false, false) => Ok(ReciprocalStatus::NotFriends),
        _ => {
            log::warn!(
                "Reciprocal friend edge missing between {} and {} (detected, not repaired)",
                user_id,
                peer_id
            );
            Ok(ReciprocalStatus::ReciprocalMissing)
        }
    }
}

#[derive(Clone)]
pub struct FriendService<R, U, B>
where
    R: FriendRepo,
    U: UserRepository,
    B: RealtimeBroker,
{
    friend_repo: Arc<R>,
    user_repo: Arc<U>,
    broker: Arc<B>,
}

impl<R, U, B> FriendService<R, U, B>
where
    R: FriendRepo,
    U: UserRepository,
    B: RealtimeBroker,
{
    pub fn with_dependencies(friend_repo: Arc<R>, user_repo: Arc<U>, broker: Arc<B>) -> Self {
        FriendService { friend_repo, user_repo, broker }
    }

    pub async fn get_friends(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FriendSummary>, error::SystemError> {
        self.friend_repo.find_accepted_friends(&user_id).await
    }

    pub async fn get_requests(
        &self,
        user_id: Uuid,
    ) -> Result<FriendRequestLists, error::SystemError> {
        let (incoming, outgoing) = tokio::try_join!(
            self.friend_repo.find_incoming_pending(&user_id),
            self.friend_repo.find_outgoing_pending(&user_id),
        )?;

        Ok(FriendRequestLists { incoming, outgoing })
    }

    pub async fn reciprocal_status(
        &self,
        user_id: Uuid,
        peer_id: Uuid,
    ) -> Result<ReciprocalStatus, error::SystemError> {
        check_reciprocal(self.friend_repo.as_ref(), &user_id, &peer_id).await
    }

    /// Creates a pending request. The pre-checks cover the friendly
    /// error paths; the partial unique index on the pending pair covers
    /// the race two simultaneous senders can still win past them.
    pub async fn send_friend_request(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        if receiver_id == sender_id {
            return Err(error::SystemError::bad_request(
                "Cannot send friend request to yourself",
            ));
        }

        if self.user_repo.find_by_id(&receiver_id).await?.is_none() {
            return Err(error::SystemError::not_found("Receiver user not found"));
        }

        let (edge, pending) = tokio::try_join!(
            self.friend_repo.find_edge(&sender_id, &receiver_id),
            self.friend_repo.find_pending_between(&sender_id, &receiver_id),
        )?;

        if edge.map(|e| e.status == FriendStatus::Accepted).unwrap_or(false) {
            return Err(error::SystemError::bad_request("Users are already friends"));
        }

        if pending.is_some() {
            return Err(error::SystemError::bad_request("Friend request already exists"));
        }

        let request = self.friend_repo.create_request(&sender_id, &receiver_id).await?;

        self.broker.notify_user(
            receiver_id,
            ServerMessage::FriendRequestReceived { request_id: request.id, sender_id },
        );

        Ok(request)
    }

    /// Receiver-side accept/reject. Accepting materializes both
    /// directional edges in one transaction; either way the request is
    /// terminal afterwards.
    pub async fn respond_to_request(
        &self,
        user_id: Uuid,
        request_id: Uuid,
        decision: RequestDecision,
    ) -> Result<Option<FriendSummary>, error::SystemError> {
        let request = self
            .friend_repo
            .find_request_by_id(&request_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Friend request not found"))?;

        if request.receiver_id != user_id {
            return Err(error::SystemError::forbidden(
                "You are not allowed to respond to this friend request",
            ));
        }

        if request.status != FriendStatus::Pending {
            return Err(error::SystemError::bad_request(
                "Friend request has already been resolved",
            ));
        }

        match decision {
            RequestDecision::Accepted => {
                let request = self.friend_repo.accept_request_atomic(&request_id).await?;

                let edge =
                    self.friend_repo.find_edge(&request.receiver_id, &request.sender_id).await?;
                let since = edge.and_then(|e| e.since);

                self.broker.notify_user(
                    request.sender_id,
                    ServerMessage::FriendRequestAccepted { peer_id: user_id, since },
                );

                let sender = self
                    .user_repo
                    .find_by_id(&request.sender_id)
                    .await?
                    .ok_or_else(|| error::SystemError::not_found("User not found"))?;

                Ok(Some(FriendSummary {
                    id: sender.id,
                    display_name: sender.display_name,
                    avatar_url: sender.avatar_url,
                    since,
                }))
            }
            RequestDecision::Rejected => {
                self.friend_repo.mark_request_rejected(&request_id).await?;
                Ok(None)
            }
        }
    }

    /// Sender-side cancel: pending requests only, removed outright.
    pub async fn cancel_request(
        &self,
        user_id: Uuid,
        request_id: Uuid,
    ) -> Result<(), error::SystemError> {
        let request = self
            .friend_repo
            .find_request_by_id(&request_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Friend request not found"))?;

        if request.sender_id != user_id {
            return Err(error::SystemError::forbidden(
                "Only the sender may cancel a friend request",
            ));
        }

        if request.status != FriendStatus::Pending {
            return Err(error::SystemError::bad_request(
                "Only pending friend requests can be cancelled",
            ));
        }

        self.friend_repo.delete_request(&request_id).await
    }

    /// Removes both directions of the friendship and tells both parties
    /// immediately, so an open composer re-gates without waiting for a
    /// failed send.
    pub async fn remove_friend(
        &self,
        user_id: Uuid,
        peer_id: Uuid,
    ) -> Result<(), error::SystemError> {
        let (forward, reverse) = tokio::try_join!(
            self.friend_repo.find_edge(&user_id, &peer_id),
            self.friend_repo.find_edge(&peer_id, &user_id),
        )?;

        if forward.is_none() && reverse.is_none() {
            return Err(error::SystemError::not_found("Friendship not found"));
        }

        self.friend_repo.delete_edge_pair(&user_id, &peer_id).await?;

        self.broker.notify_user(user_id, ServerMessage::FriendshipRevoked { peer_id });
        self.broker.notify_user(peer_id, ServerMessage::FriendshipRevoked { peer_id: user_id });

        Ok(())
    }
}

#[cfg(test)]
pub mod tests_support {
    use super::*;
    use crate::modules::friend::model::FriendRequestView;
    use crate::modules::friend::repository::{FriendEdgeRepository, FriendRequestRepository};
    use crate::modules::friend::schema::FriendEdgeEntity;
    use crate::modules::user::model::UserProfileResponse;
    use crate::modules::user::schema::UserEntity;
    use std::collections::{HashMap, HashSet};
    use tokio::sync::Mutex;

    #[derive(Default)]
    pub struct MemFriendRepo {
        pub edges: Mutex<HashMap<(Uuid, Uuid), FriendEdgeEntity>>,
        pub requests: Mutex<HashMap<Uuid, FriendRequestEntity>>,
    }

    impl MemFriendRepo {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn insert_accepted_pair(&self, a: Uuid, b: Uuid) {
            let since = chrono::Utc::now();
            let mut edges = self.edges.lock().await;
            for (owner, friend) in [(a, b), (b, a)] {
                edges.insert(
                    (owner, friend),
                    FriendEdgeEntity {
                        owner_id: owner,
                        friend_id: friend,
                        status: FriendStatus::Accepted,
                        since: Some(since),
                        created_at: since,
                    },
                );
            }
        }

        pub async fn remove_edge(&self, owner: Uuid, friend: Uuid) {
            self.edges.lock().await.remove(&(owner, friend));
        }
    }

    #[async_trait::async_trait]
    impl FriendEdgeRepository for MemFriendRepo {
        async fn find_edge(
            &self,
            owner_id: &Uuid,
            friend_id: &Uuid,
        ) -> Result<Option<FriendEdgeEntity>, error::SystemError> {
            Ok(self.edges.lock().await.get(&(*owner_id, *friend_id)).cloned())
        }

        async fn find_accepted_friends(
            &self,
            owner_id: &Uuid,
        ) -> Result<Vec<FriendSummary>, error::SystemError> {
            Ok(self
                .edges
                .lock()
                .await
                .values()
                .filter(|e| e.owner_id == *owner_id && e.status == FriendStatus::Accepted)
                .map(|e| FriendSummary {
                    id: e.friend_id,
                    display_name: e.friend_id.to_string(),
                    avatar_url: None,
                    since: e.since,
                })
                .collect())
        }

        async fn delete_edge_pair(
            &self,
            user_id_a: &Uuid,
            user_id_b: &Uuid,
        ) -> Result<(), error::SystemError> {
            let mut edges = self.edges.lock().await;
            edges.remove(&(*user_id_a, *user_id_b));
            edges.remove(&(*user_id_b, *user_id_a));
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl FriendRequestRepository for MemFriendRepo {
        async fn find_pending_between(
            &self,
            user_id_a: &Uuid,
            user_id_b: &Uuid,
        ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
            Ok(self
                .requests
                .lock()
                .await
                .values()
                .find(|r| {
                    r.status == FriendStatus::Pending
                        && ((r.sender_id == *user_id_a && r.receiver_id == *user_id_b)
                            || (r.sender_id == *user_id_b && r.receiver_id == *user_id_a))
                })
                .cloned())
        }

        async fn find_request_by_id(
            &self,
            request_id: &Uuid,
        ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
            Ok(self.requests.lock().await.get(request_id).cloned())
        }

        async fn find_incoming_pending(
            &self,
            user_id: &Uuid,
        ) -> Result<Vec<FriendRequestView>, error::SystemError> {
            Ok(self
                .requests
                .lock()
                .await
                .values()
                .filter(|r| r.receiver_id == *user_id && r.status == FriendStatus::Pending)
                .map(|r| FriendRequestView {
                    id: r.id,
                    peer_id: r.sender_id,
                    peer_display_name: r.sender_id.to_string(),
                    peer_avatar_url: None,
                    created_at: r.created_at,
                })
                .collect())
        }

        async fn find_outgoing_pending(
            &self,
            user_id: &Uuid,
        ) -> Result<Vec<FriendRequestView>, error::SystemError> {
            Ok(self
                .requests
                .lock()
                .await
                .values()
                .filter(|r| r.sender_id == *user_id && r.status == FriendStatus::Pending)
                .map(|r| FriendRequestView {
                    id: r.id,
                    peer_id: r.receiver_id,
                    peer_display_name: r.receiver_id.to_string(),
                    peer_avatar_url: None,
                    created_at: r.created_at,
                })
                .collect())
        }

        async fn create_request(
            &self,
            sender_id: &Uuid,
            receiver_id: &Uuid,
        ) -> Result<FriendRequestEntity, error::SystemError> {
            let request = FriendRequestEntity {
                id: Uuid::now_v7(),
                sender_id: *sender_id,
                receiver_id: *receiver_id,
                status: FriendStatus::Pending,
                created_at: chrono::Utc::now(),
            };
            self.requests.lock().await.insert(request.id, request.clone());
            Ok(request)
        }

        async fn delete_request(&self, request_id: &Uuid) -> Result<(), error::SystemError> {
            self.requests.lock().await.remove(request_id);
            Ok(())
        }

        async fn mark_request_rejected(
            &self,
            request_id: &Uuid,
        ) -> Result<(), error::SystemError> {
            if let Some(r) = self.requests.lock().await.get_mut(request_id) {
                if r.status == FriendStatus::Pending {
                    r.status = FriendStatus::Rejected;
                }
            }
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl FriendRepo for MemFriendRepo {
        async fn accept_request_atomic(
            &self,
            request_id: &Uuid,
        ) -> Result<FriendRequestEntity, error::SystemError> {
            let mut requests = self.requests.lock().await;
            let request = requests
                .get_mut(request_id)
                .filter(|r| r.status == FriendStatus::Pending)
                .ok_or_else(|| error::SystemError::not_found("Friend request not found"))?;
            request.status = FriendStatus::Accepted;
            let request = request.clone();
            drop(requests);

            self.insert_accepted_pair(request.sender_id, request.receiver_id).await;
            Ok(request)
        }
    }

    pub struct MemUserRepo {
        known: HashSet<Uuid>,
    }

    impl MemUserRepo {
        pub fn with_users(ids: &[Uuid]) -> Self {
            Self { known: ids.iter().copied().collect() }
        }
    }

    #[async_trait::async_trait]
    impl UserRepository for MemUserRepo {
        async fn find_by_id(
            &self,
            user_id: &Uuid,
        ) -> Result<Option<UserEntity>, error::SystemError> {
            if !self.known.contains(user_id) {
                return Ok(None);
            }
            Ok(Some(UserEntity {
                id: *user_id,
                email: format!("{user_id}@example.edu"),
                display_name: user_id.to_string(),
                avatar_url: None,
                department: None,
                batch: None,
                program: None,
                profile_completed: true,
                created_at: chrono::Utc::now(),
            }))
        }

        async fn search_directory(
            &self,
            _query: &str,
            _department: Option<&str>,
            _limit: i64,
        ) -> Result<Vec<UserProfileResponse>, error::SystemError> {
            Ok(Vec::new())
        }
    }

    /// Records everything a service tries to broadcast. Uses std
    /// mutexes because the broker trait methods are synchronous.
    #[derive(Default)]
    pub struct RecordingBroker {
        sent: std::sync::Mutex<Vec<(Option<Uuid>, ServerMessage)>>,
        cleared: std::sync::Mutex<Vec<(String, Uuid)>>,
    }

    impl RecordingBroker {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn events(&self) -> Vec<(Option<Uuid>, ServerMessage)> {
            self.sent.lock().unwrap().clone()
        }

        pub async fn typing_clears(&self) -> Vec<(String, Uuid)> {
            self.cleared.lock().unwrap().clone()
        }
    }

    impl RealtimeBroker for RecordingBroker {
        fn notify_user(&self, user_id: Uuid, event: ServerMessage) {
            self.sent.lock().unwrap().push((Some(user_id), event));
        }

        fn notify_conversation(
            &self,
            _conversation_id: &str,
            event: ServerMessage,
            _skip_user_id: Option<Uuid>,
        ) {
            self.sent.lock().unwrap().push((None, event));
        }

        fn clear_typing(&self, conversation_id: &str, user_id: Uuid) {
            self.cleared.lock().unwrap().push((conversation_id.to_string(), user_id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::tests_support::{MemFriendRepo, MemUserRepo, RecordingBroker};
    use super::*;

    fn service(
        friends: Arc<MemFriendRepo>,
        users: Arc<MemUserRepo>,
        broker: Arc<RecordingBroker>,
    ) -> FriendService<MemFriendRepo, MemUserRepo, RecordingBroker> {
        FriendService::with_dependencies(friends, users, broker)
    }

    struct Fixture {
        svc: FriendService<MemFriendRepo, MemUserRepo, RecordingBroker>,
        friends: Arc<MemFriendRepo>,
        broker: Arc<RecordingBroker>,
        a: Uuid,
        b: Uuid,
    }

    fn fixture() -> Fixture {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let friends = Arc::new(MemFriendRepo::new());
        let users = Arc::new(MemUserRepo::with_users(&[a, b]));
        let broker = Arc::new(RecordingBroker::new());
        let svc = service(friends.clone(), users, broker.clone());
        Fixture { svc, friends, broker, a, b }
    }

    #[tokio::test]
    async fn cannot_friend_yourself() {
        let f = fixture();
        let err = f.svc.send_friend_request(f.a, f.a).await.unwrap_err();
        assert!(matches!(err, error::SystemError::BadRequest(_)));
    }

    #[tokio::test]
    async fn duplicate_pending_request_is_rejected_in_either_direction() {
        let f = fixture();
        f.svc.send_friend_request(f.a, f.b).await.unwrap();

        let same_direction = f.svc.send_friend_request(f.a, f.b).await.unwrap_err();
        assert!(matches!(same_direction, error::SystemError::BadRequest(_)));

        let reverse_direction = f.svc.send_friend_request(f.b, f.a).await.unwrap_err();
        assert!(matches!(reverse_direction, error::SystemError::BadRequest(_)));
    }

    #[tokio::test]
    async fn cannot_request_an_existing_friend() {
        let f = fixture();
        f.friends.insert_accepted_pair(f.a, f.b).await;

        let err = f.svc.send_friend_request(f.a, f.b).await.unwrap_err();
        assert!(matches!(err, error::SystemError::BadRequest(_)));
    }

    #[tokio::test]
    async fn accept_creates_mirrored_edges_with_matching_since() {
        let f = fixture();
        let request = f.svc.send_friend_request(f.a, f.b).await.unwrap();

        let summary = f
            .svc
            .respond_to_request(f.b, request.id, RequestDecision::Accepted)
            .await
            .unwrap()
            .expect("accept returns the new friend");
        assert_eq!(summary.id, f.a);

        let edges = f.friends.edges.lock().await;
        let forward = edges.get(&(f.a, f.b)).expect("a -> b edge");
        let reverse = edges.get(&(f.b, f.a)).expect("b -> a edge");
        assert_eq!(forward.status, FriendStatus::Accepted);
        assert_eq!(reverse.status, FriendStatus::Accepted);
        assert_eq!(forward.since, reverse.since);
    }

    #[tokio::test]
    async fn only_the_receiver_may_respond() {
        let f = fixture();
        let request = f.svc.send_friend_request(f.a, f.b).await.unwrap();

        let err = f
            .svc
            .respond_to_request(f.a, request.id, RequestDecision::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));
        assert!(f.friends.edges.lock().await.is_empty());
    }

    #[tokio::test]
    async fn resolved_requests_are_terminal() {
        let f = fixture();
        let request = f.svc.send_friend_request(f.a, f.b).await.unwrap();
        f.svc.respond_to_request(f.b, request.id, RequestDecision::Rejected).await.unwrap();

        let err = f
            .svc
            .respond_to_request(f.b, request.id, RequestDecision::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, error::SystemError::BadRequest(_)));
        assert!(f.friends.edges.lock().await.is_empty());
    }

    #[tokio::test]
    async fn cancel_is_sender_only_and_pending_only() {
        let f = fixture();
        let request = f.svc.send_friend_request(f.a, f.b).await.unwrap();

        let not_sender = f.svc.cancel_request(f.b, request.id).await.unwrap_err();
        assert!(matches!(not_sender, error::SystemError::Forbidden(_)));

        f.svc.cancel_request(f.a, request.id).await.unwrap();
        assert!(f.friends.requests.lock().await.is_empty());

        // Cancelling a resolved request fails without side effects.
        let request = f.svc.send_friend_request(f.a, f.b).await.unwrap();
        f.svc.respond_to_request(f.b, request.id, RequestDecision::Rejected).await.unwrap();
        let resolved = f.svc.cancel_request(f.a, request.id).await.unwrap_err();
        assert!(matches!(resolved, error::SystemError::BadRequest(_)));
        assert!(f.friends.requests.lock().await.contains_key(&request.id));
    }

    #[tokio::test]
    async fn remove_friend_deletes_both_edges_and_notifies_both_parties() {
        let f = fixture();
        f.friends.insert_accepted_pair(f.a, f.b).await;

        f.svc.remove_friend(f.a, f.b).await.unwrap();

        assert!(f.friends.edges.lock().await.is_empty());

        let events = f.broker.events().await;
        let revoked: Vec<_> = events
            .iter()
            .filter_map(|(target, e)| match e {
                ServerMessage::FriendshipRevoked { peer_id } => Some((*target, *peer_id)),
                _ => None,
            })
            .collect();
        assert!(revoked.contains(&(Some(f.a), f.b)));
        assert!(revoked.contains(&(Some(f.b), f.a)));
    }

    #[tokio::test]
    async fn reciprocal_status_reports_all_three_states() {
        let f = fixture();

        assert_eq!(
            f.svc.reciprocal_status(f.a, f.b).await.unwrap(),
            ReciprocalStatus::NotFriends
        );

        f.friends.insert_accepted_pair(f.a, f.b).await;
        assert_eq!(f.svc.reciprocal_status(f.a, f.b).await.unwrap(), ReciprocalStatus::Mutual);

        // One side removed, simulating a partial unfriend: flagged, not
        // healed, and the gate fails closed.
        f.friends.remove_edge(f.a, f.b).await;
        assert_eq!(
            f.svc.reciprocal_status(f.b, f.a).await.unwrap(),
            ReciprocalStatus::ReciprocalMissing
        );
    }
}
