//! Daret repository for database operations

use async_trait::async_trait;
use chrono::NaiveDate;
use common::error::DatabaseResult;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::ledger::{lock_group, recompute_group_done};
use crate::models::{Group, GroupChanges, NewGroup};

/// Persistence of savings groups
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Insert a group. When the owner takes part, their confirmed membership
    /// and a rank "1" slot dated `payout_date` are created with it.
    async fn create(&self, group: &NewGroup, payout_date: NaiveDate) -> DatabaseResult<Group>;
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Group>>;
    async fn find_by_join_code(&self, code: &str) -> DatabaseResult<Option<Group>>;
    async fn join_code_exists(&self, code: &str) -> DatabaseResult<bool>;
    /// Whether the owner already has a group with the same name, start date,
    /// amount and participation flag
    async fn signature_exists(&self, group: &NewGroup) -> DatabaseResult<bool>;
    /// Groups the user owns or is a confirmed member of
    async fn list_visible_to(&self, user_id: Uuid) -> DatabaseResult<Vec<Group>>;
    async fn update(&self, id: Uuid, changes: &GroupChanges) -> DatabaseResult<Option<Group>>;
    /// Add or remove the owner from the rotation, adjusting the member count
    async fn set_owner_participation(
        &self,
        id: Uuid,
        participates: bool,
        payout_date: NaiveDate,
    ) -> DatabaseResult<Option<Group>>;
    async fn delete(&self, id: Uuid) -> DatabaseResult<bool>;
    /// Re-derive the done flag from the group's slots
    async fn recompute_done(&self, id: Uuid) -> DatabaseResult<Option<bool>>;
}

/// PostgreSQL daret repository
#[derive(Clone)]
pub struct PgGroupRepository {
    pool: PgPool,
}

impl PgGroupRepository {
    /// Create a new daret repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn create(&self, group: &NewGroup, payout_date: NaiveDate) -> DatabaseResult<Group> {
        info!("Creating daret '{}' for owner {}", group.name, group.owner_id);

        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO darets (owner_id, name, date_start, monthly_amount, is_part, member_count, join_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, owner_id, name, date_start, monthly_amount, is_part, member_count,
                      is_done, join_code, created_at
            "#,
        )
        .bind(group.owner_id)
        .bind(&group.name)
        .bind(group.date_start)
        .bind(group.monthly_amount)
        .bind(group.is_part)
        .bind(if group.is_part { 1 } else { 0 })
        .bind(&group.join_code)
        .fetch_one(&mut *tx)
        .await?;

        if group.is_part {
            sqlx::query(
                r#"
                INSERT INTO daret_memberships (group_id, participant_id, is_confirmed)
                VALUES ($1, $2, TRUE)
                "#,
            )
            .bind(created.id)
            .bind(group.owner_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO payout_slots (group_id, user_id, payout_date, rank)
                VALUES ($1, $2, $3, '1')
                "#,
            )
            .bind(created.id)
            .bind(group.owner_id)
            .bind(payout_date)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            r#"
            SELECT id, owner_id, name, date_start, monthly_amount, is_part, member_count,
                   is_done, join_code, created_at
            FROM darets
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn find_by_join_code(&self, code: &str) -> DatabaseResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            r#"
            SELECT id, owner_id, name, date_start, monthly_amount, is_part, member_count,
                   is_done, join_code, created_at
            FROM darets
            WHERE join_code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn join_code_exists(&self, code: &str) -> DatabaseResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM darets WHERE join_code = $1)")
                .bind(code)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn signature_exists(&self, group: &NewGroup) -> DatabaseResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM darets
                WHERE owner_id = $1 AND name = $2 AND date_start = $3
                  AND monthly_amount = $4 AND is_part = $5
            )
            "#,
        )
        .bind(group.owner_id)
        .bind(&group.name)
        .bind(group.date_start)
        .bind(group.monthly_amount)
        .bind(group.is_part)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list_visible_to(&self, user_id: Uuid) -> DatabaseResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            r#"
            SELECT d.id, d.owner_id, d.name, d.date_start, d.monthly_amount, d.is_part,
                   d.member_count, d.is_done, d.join_code, d.created_at
            FROM darets d
            LEFT JOIN daret_memberships m
                   ON m.group_id = d.id AND m.participant_id = $1 AND m.is_confirmed
            WHERE d.owner_id = $1 OR m.id IS NOT NULL
            ORDER BY d.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    async fn update(&self, id: Uuid, changes: &GroupChanges) -> DatabaseResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            r#"
            UPDATE darets
            SET name = COALESCE($2, name),
                date_start = COALESCE($3, date_start),
                monthly_amount = COALESCE($4, monthly_amount)
            WHERE id = $1
            RETURNING id, owner_id, name, date_start, monthly_amount, is_part, member_count,
                      is_done, join_code, created_at
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(changes.date_start)
        .bind(changes.monthly_amount)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn set_owner_participation(
        &self,
        id: Uuid,
        participates: bool,
        payout_date: NaiveDate,
    ) -> DatabaseResult<Option<Group>> {
        let mut tx = self.pool.begin().await?;

        if !lock_group(&mut tx, id).await? {
            return Ok(None);
        }

        let owner_id: Uuid = sqlx::query_scalar("SELECT owner_id FROM darets WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        let was_confirmed: Option<bool> = sqlx::query_scalar(
            "SELECT is_confirmed FROM daret_memberships WHERE group_id = $1 AND participant_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await?;
        let was_confirmed = was_confirmed.unwrap_or(false);

        if participates {
            sqlx::query(
                r#"
                INSERT INTO daret_memberships (group_id, participant_id, is_confirmed)
                VALUES ($1, $2, TRUE)
                ON CONFLICT (group_id, participant_id) DO UPDATE SET is_confirmed = TRUE
                "#,
            )
            .bind(id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO payout_slots (group_id, user_id, payout_date, rank)
                VALUES ($1, $2, $3, '1')
                ON CONFLICT (group_id, user_id) DO NOTHING
                "#,
            )
            .bind(id)
            .bind(owner_id)
            .bind(payout_date)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query("DELETE FROM payout_slots WHERE group_id = $1 AND user_id = $2")
                .bind(id)
                .bind(owner_id)
                .execute(&mut *tx)
                .await?;

            sqlx::query("DELETE FROM daret_memberships WHERE group_id = $1 AND participant_id = $2")
                .bind(id)
                .bind(owner_id)
                .execute(&mut *tx)
                .await?;
        }

        let delta = match (was_confirmed, participates) {
            (false, true) => 1,
            (true, false) => -1,
            _ => 0,
        };

        sqlx::query(
            r#"
            UPDATE darets
            SET is_part = $2, member_count = GREATEST(member_count + $3, 0)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(participates)
        .bind(delta)
        .execute(&mut *tx)
        .await?;

        recompute_group_done(&mut tx, id).await?;

        let group = sqlx::query_as::<_, Group>(
            r#"
            SELECT id, owner_id, name, date_start, monthly_amount, is_part, member_count,
                   is_done, join_code, created_at
            FROM darets
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            "Owner participation in daret {} set to {} (member count {})",
            id, participates, group.member_count
        );
        Ok(Some(group))
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM darets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn recompute_done(&self, id: Uuid) -> DatabaseResult<Option<bool>> {
        let mut tx = self.pool.begin().await?;

        if !lock_group(&mut tx, id).await? {
            return Ok(None);
        }

        let done = recompute_group_done(&mut tx, id).await?;
        tx.commit().await?;

        Ok(Some(done))
    }
}
