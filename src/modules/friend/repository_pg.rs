use uuid::Uuid;

use crate::{
    api::error,
    modules::friend::{
        model::{FriendRequestView, FriendSummary},
        repository::{FriendEdgeRepository, FriendRepo, FriendRequestRepository},
        schema::{FriendEdgeEntity, FriendRequestEntity},
    },
};

#[derive(Clone)]
pub struct FriendRepositoryPg {
    pool: sqlx::PgPool,
}

impl FriendRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FriendEdgeRepository for FriendRepositoryPg {
    async fn find_edge(
        &self,
        owner_id: &Uuid,
        friend_id: &Uuid,
    ) -> Result<Option<FriendEdgeEntity>, error::SystemError> {
        let edge = sqlx::query_as::<_, FriendEdgeEntity>(
            "SELECT * FROM friend_edges WHERE owner_id = $1 AND friend_id = $2",
        )
        .bind(owner_id)
        .bind(friend_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(edge)
    }

    async fn find_accepted_friends(
        &self,
        owner_id: &Uuid,
    ) -> Result<Vec<FriendSummary>, error::SystemError> {
        let friends = sqlx::query_as::<_, FriendSummary>(
            r#"
            SELECT
                u.id,
                u.display_name,
                u.avatar_url,
                fe.since
            FROM friend_edges fe
            JOIN users u
                ON u.id = fe.friend_id
            WHERE fe.owner_id = $1
              AND fe.status = 'accepted'
            ORDER BY u.display_name
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(friends)
    }

    async fn delete_edge_pair(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<(), error::SystemError> {
        sqlx::query(
            r#"
            DELETE FROM friend_edges
            WHERE (owner_id = $1 AND friend_id = $2)
               OR (owner_id = $2 AND friend_id = $1)
            "#,
        )
        .bind(user_id_a)
        .bind(user_id_b)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl FriendRequestRepository for FriendRepositoryPg {
    async fn find_pending_between(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let request = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            SELECT *
            FROM friend_requests
            WHERE status = 'pending'
              AND (
                    (sender_id = $1 AND receiver_id = $2)
                 OR (sender_id = $2 AND receiver_id = $1)
              )
            "#,
        )
        .bind(user_id_a)
        .bind(user_id_b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn find_request_by_id(
        &self,
        request_id: &Uuid,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let request =
            sqlx::query_as::<_, FriendRequestEntity>("SELECT * FROM friend_requests WHERE id = $1")
                .bind(request_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(request)
    }

    async fn find_incoming_pending(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestView>, error::SystemError> {
        let rows = sqlx::query_as::<_, FriendRequestView>(
            r#"
            SELECT
                fr.id,
                u.id AS peer_id,
                u.display_name AS peer_display_name,
                u.avatar_url AS peer_avatar_url,
                fr.created_at
            FROM friend_requests fr
            JOIN users u
                ON fr.sender_id = u.id
            WHERE fr.receiver_id = $1
              AND fr.status = 'pending'
            ORDER BY fr.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_outgoing_pending(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestView>, error::SystemError> {
        let rows = sqlx::query_as::<_, FriendRequestView>(
            r#"
            SELECT
                fr.id,
                u.id AS peer_id,
                u.display_name AS peer_display_name,
                u.avatar_url AS peer_avatar_url,
                fr.created_at
            FROM friend_requests fr
            JOIN users u
                ON fr.receiver_id = u.id
            WHERE fr.sender_id = $1
              AND fr.status = 'pending'
            ORDER BY fr.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn create_request(
        &self,
        sender_id: &Uuid,
        receiver_id: &Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        // The partial unique index on the pending pair is the backstop
        // for two clients racing past each other's pre-checks; the loser
        // gets 23505 which maps to a 409.
        let request = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            INSERT INTO friend_requests (id, sender_id, receiver_id, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(request)
    }

    async fn delete_request(&self, request_id: &Uuid) -> Result<(), error::SystemError> {
        sqlx::query("DELETE FROM friend_requests WHERE id = $1")
            .bind(request_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn mark_request_rejected(
        &self,
        request_id: &Uuid,
    ) -> Result<(), error::SystemError> {
        sqlx::query(
            "UPDATE friend_requests SET status = 'rejected' WHERE id = $1 AND status = 'pending'",
        )
        .bind(request_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl FriendRepo for FriendRepositoryPg {
    async fn accept_request_atomic(
        &self,
        request_id: &Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, FriendRequestEntity>(
            "SELECT * FROM friend_requests WHERE id = $1 AND status = 'pending' FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| error::SystemError::not_found("Friend request not found"))?;

        // Both directions in one statement: now() is transaction-stable
        // so the two `since` values always match.
        sqlx::query(
            r#"
            INSERT INTO friend_edges (owner_id, friend_id, status, since)
            VALUES ($1, $2, 'accepted', now()),
                   ($2, $1, 'accepted', now())
            ON CONFLICT (owner_id, friend_id) DO NOTHING
            "#,
        )
        .bind(request.sender_id)
        .bind(request.receiver_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE friend_requests SET status = 'accepted' WHERE id = $1")
            .bind(request_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(request)
    }
}
