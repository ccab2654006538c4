//! Membership repository for join requests

use async_trait::async_trait;
use common::error::DatabaseResult;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::ledger::lock_group;
use crate::models::{MemberView, Membership, PendingRequest};

/// Persistence of join requests and confirmed memberships
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Insert an unconfirmed membership. A second row for the same
    /// (group, participant) is a conflict.
    async fn create_request(&self, group_id: Uuid, participant_id: Uuid)
    -> DatabaseResult<Membership>;
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Membership>>;
    async fn find(&self, group_id: Uuid, participant_id: Uuid)
    -> DatabaseResult<Option<Membership>>;
    /// Unconfirmed memberships of every group owned by `owner_id`
    async fn list_pending_for_owner(&self, owner_id: Uuid) -> DatabaseResult<Vec<PendingRequest>>;
    async fn list_confirmed(&self, group_id: Uuid) -> DatabaseResult<Vec<MemberView>>;
    /// Confirm a pending membership and bump the member count.
    /// `None` when the row is missing or already confirmed.
    async fn confirm(&self, id: Uuid) -> DatabaseResult<Option<Membership>>;
    /// Delete a membership, decrementing the member count when it was confirmed
    async fn remove(&self, id: Uuid) -> DatabaseResult<Option<Membership>>;
}

/// PostgreSQL membership repository
#[derive(Clone)]
pub struct PgMembershipRepository {
    pool: PgPool,
}

impl PgMembershipRepository {
    /// Create a new membership repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for PgMembershipRepository {
    async fn create_request(
        &self,
        group_id: Uuid,
        participant_id: Uuid,
    ) -> DatabaseResult<Membership> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO daret_memberships (group_id, participant_id)
            VALUES ($1, $2)
            RETURNING id, group_id, participant_id, is_confirmed, created_at
            "#,
        )
        .bind(group_id)
        .bind(participant_id)
        .fetch_one(&self.pool)
        .await?;

        info!("User {} requested to join daret {}", participant_id, group_id);
        Ok(membership)
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Membership>> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, group_id, participant_id, is_confirmed, created_at
            FROM daret_memberships
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    async fn find(
        &self,
        group_id: Uuid,
        participant_id: Uuid,
    ) -> DatabaseResult<Option<Membership>> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT id, group_id, participant_id, is_confirmed, created_at
            FROM daret_memberships
            WHERE group_id = $1 AND participant_id = $2
            "#,
        )
        .bind(group_id)
        .bind(participant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(membership)
    }

    async fn list_pending_for_owner(&self, owner_id: Uuid) -> DatabaseResult<Vec<PendingRequest>> {
        let requests = sqlx::query_as::<_, PendingRequest>(
            r#"
            SELECT m.id AS membership_id,
                   m.group_id,
                   m.participant_id,
                   d.name AS group_name,
                   u.username AS participant,
                   user_display_name(u.first_name, u.last_name, u.username) AS participant_full_name,
                   m.created_at AS requested_at
            FROM daret_memberships m
            JOIN darets d ON d.id = m.group_id
            JOIN users u ON u.id = m.participant_id
            WHERE d.owner_id = $1 AND NOT m.is_confirmed
            ORDER BY m.created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    async fn list_confirmed(&self, group_id: Uuid) -> DatabaseResult<Vec<MemberView>> {
        let members = sqlx::query_as::<_, MemberView>(
            r#"
            SELECT m.id AS membership_id,
                   u.id AS user_id,
                   u.username,
                   user_display_name(u.first_name, u.last_name, u.username) AS full_name,
                   m.created_at AS joined_at
            FROM daret_memberships m
            JOIN users u ON u.id = m.participant_id
            WHERE m.group_id = $1 AND m.is_confirmed
            ORDER BY m.created_at
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    async fn confirm(&self, id: Uuid) -> DatabaseResult<Option<Membership>> {
        let mut tx = self.pool.begin().await?;

        let group_id: Option<Uuid> =
            sqlx::query_scalar("SELECT group_id FROM daret_memberships WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(group_id) = group_id else {
            return Ok(None);
        };

        lock_group(&mut tx, group_id).await?;

        let membership = sqlx::query_as::<_, Membership>(
            r#"
            UPDATE daret_memberships
            SET is_confirmed = TRUE
            WHERE id = $1 AND NOT is_confirmed
            RETURNING id, group_id, participant_id, is_confirmed, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if membership.is_some() {
            sqlx::query("UPDATE darets SET member_count = member_count + 1 WHERE id = $1")
                .bind(group_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        if let Some(membership) = &membership {
            info!(
                "Confirmed user {} in daret {}",
                membership.participant_id, membership.group_id
            );
        }
        Ok(membership)
    }

    async fn remove(&self, id: Uuid) -> DatabaseResult<Option<Membership>> {
        let mut tx = self.pool.begin().await?;

        let group_id: Option<Uuid> =
            sqlx::query_scalar("SELECT group_id FROM daret_memberships WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(group_id) = group_id else {
            return Ok(None);
        };

        lock_group(&mut tx, group_id).await?;

        let membership = sqlx::query_as::<_, Membership>(
            r#"
            DELETE FROM daret_memberships
            WHERE id = $1
            RETURNING id, group_id, participant_id, is_confirmed, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if membership.as_ref().is_some_and(|m| m.is_confirmed) {
            sqlx::query(
                "UPDATE darets SET member_count = GREATEST(member_count - 1, 0) WHERE id = $1",
            )
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        if let Some(membership) = &membership {
            info!(
                "Removed membership of user {} from daret {}",
                membership.participant_id, membership.group_id
            );
        }
        Ok(membership)
    }
}
