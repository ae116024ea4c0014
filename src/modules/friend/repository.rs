use uuid::Uuid;

use crate::api::error;
use crate::modules::friend::model::{FriendRequestView, FriendSummary};
use crate::modules::friend::schema::{FriendEdgeEntity, FriendRequestEntity};

#[async_trait::async_trait]
pub trait FriendEdgeRepository {
    /// Looks up the directional edge `owner -> friend`.
    async fn find_edge(
        &self,
        owner_id: &Uuid,
        friend_id: &Uuid,
    ) -> Result<Option<FriendEdgeEntity>, error::SystemError>;

    async fn find_accepted_friends(
        &self,
        owner_id: &Uuid,
    ) -> Result<Vec<FriendSummary>, error::SystemError>;

    /// Removes both directions of the edge pair in one transaction.
    async fn delete_edge_pair(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<(), error::SystemError>;
}

#[async_trait::async_trait]
pub trait FriendRequestRepository {
    /// Finds a pending request between the pair in either direction.
    async fn find_pending_between(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;

    async fn find_request_by_id(
        &self,
        request_id: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError>;

    async fn find_incoming_pending(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestView>, error::SystemError>;

    async fn find_outgoing_pending(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestView>, error::SystemError>;

    async fn create_request(
        &self,
        sender_id: &Uuid,
        receiver_id: &Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError>;

    async fn delete_request(&self, request_id: &Uuid) -> Result<(), error::SystemError>;

    async fn mark_request_rejected(&self, request_id: &Uuid)
    -> Result<(), error::SystemError>;
}

#[async_trait::async_trait]
pub trait FriendRepo: FriendEdgeRepository + FriendRequestRepository + Send + Sync {
    /// Flips the request to accepted and materializes both directional
    /// edges with a shared `since` timestamp, all in one transaction.
    /// There is no window where only one side sees the friendship.
    async fn accept_request_atomic(
        &self,
        request_id: &Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError>;
}
