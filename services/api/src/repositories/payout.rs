//! Payout slot repository

use std::collections::BTreeMap;

use async_trait::async_trait;
use common::error::DatabaseResult;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::ledger::{
    lock_group, lock_slot, recompute_group_done, recompute_slot_received, slot_group,
};
use crate::models::{PayoutSlot, PayoutSlotDetails, SlotAssignment, SlotChanges};

const SLOT_DETAILS: &str = r#"
    SELECT s.id,
           s.group_id,
           d.name AS group_name,
           o.username AS owner,
           s.rank,
           s.user_id,
           u.username,
           user_display_name(u.first_name, u.last_name, u.username) AS full_name,
           s.payout_date,
           u.bank_account,
           d.monthly_amount::BIGINT * d.member_count AS total,
           d.member_count AS elements,
           s.is_received
    FROM payout_slots s
    JOIN darets d ON d.id = s.group_id
    JOIN users u ON u.id = s.user_id
    JOIN users o ON o.id = d.owner_id
"#;

/// Persistence of the payout schedule
#[async_trait]
pub trait PayoutSlotRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<PayoutSlot>>;
    async fn find_details(&self, id: Uuid) -> DatabaseResult<Option<PayoutSlotDetails>>;
    /// Slots of a group in payout order
    async fn list_for_group(&self, group_id: Uuid) -> DatabaseResult<Vec<PayoutSlotDetails>>;
    /// Create or update the slot of each (group, user) pair, then reset each
    /// touched group's member count to its number of assignments
    async fn upsert_many(&self, assignments: &[SlotAssignment]) -> DatabaseResult<Vec<PayoutSlot>>;
    /// Partial update. A received flag set on a slot that has confirmations
    /// is re-derived from them.
    async fn update(&self, id: Uuid, changes: &SlotChanges) -> DatabaseResult<Option<PayoutSlot>>;
    async fn delete(&self, id: Uuid) -> DatabaseResult<Option<PayoutSlot>>;
    /// Re-derive the received flag from the slot's confirmations, then the
    /// group's done flag
    async fn recompute_received(&self, id: Uuid) -> DatabaseResult<Option<bool>>;
}

/// PostgreSQL payout slot repository
#[derive(Clone)]
pub struct PgPayoutSlotRepository {
    pool: PgPool,
}

impl PgPayoutSlotRepository {
    /// Create a new payout slot repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PayoutSlotRepository for PgPayoutSlotRepository {
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<PayoutSlot>> {
        let slot = sqlx::query_as::<_, PayoutSlot>(
            r#"
            SELECT id, group_id, user_id, payout_date, rank, is_received
            FROM payout_slots
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(slot)
    }

    async fn find_details(&self, id: Uuid) -> DatabaseResult<Option<PayoutSlotDetails>> {
        let query = format!("{SLOT_DETAILS} WHERE s.id = $1");
        let slot = sqlx::query_as::<_, PayoutSlotDetails>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(slot)
    }

    async fn list_for_group(&self, group_id: Uuid) -> DatabaseResult<Vec<PayoutSlotDetails>> {
        let query = format!(
            "{SLOT_DETAILS} WHERE s.group_id = $1 ORDER BY LENGTH(s.rank), s.rank, s.payout_date"
        );
        let slots = sqlx::query_as::<_, PayoutSlotDetails>(&query)
            .bind(group_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(slots)
    }

    async fn upsert_many(&self, assignments: &[SlotAssignment]) -> DatabaseResult<Vec<PayoutSlot>> {
        let mut per_group: BTreeMap<Uuid, i32> = BTreeMap::new();
        for assignment in assignments {
            *per_group.entry(assignment.group_id).or_default() += 1;
        }

        let mut tx = self.pool.begin().await?;

        // Groups are locked in id order
        for group_id in per_group.keys() {
            lock_group(&mut tx, *group_id).await?;
        }

        let mut slots = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let slot = sqlx::query_as::<_, PayoutSlot>(
                r#"
                INSERT INTO payout_slots (group_id, user_id, payout_date, rank)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (group_id, user_id)
                DO UPDATE SET payout_date = EXCLUDED.payout_date, rank = EXCLUDED.rank
                RETURNING id, group_id, user_id, payout_date, rank, is_received
                "#,
            )
            .bind(assignment.group_id)
            .bind(assignment.user_id)
            .bind(assignment.payout_date)
            .bind(&assignment.rank)
            .fetch_one(&mut *tx)
            .await?;
            slots.push(slot);
        }

        for (group_id, count) in &per_group {
            sqlx::query("UPDATE darets SET member_count = $2 WHERE id = $1")
                .bind(*group_id)
                .bind(*count)
                .execute(&mut *tx)
                .await?;
            recompute_group_done(&mut tx, *group_id).await?;
        }

        tx.commit().await?;

        info!(
            "Assigned {} payout slots across {} darets",
            slots.len(),
            per_group.len()
        );
        Ok(slots)
    }

    async fn update(&self, id: Uuid, changes: &SlotChanges) -> DatabaseResult<Option<PayoutSlot>> {
        let mut tx = self.pool.begin().await?;

        let Some(group_id) = slot_group(&mut tx, id).await? else {
            return Ok(None);
        };
        lock_group(&mut tx, group_id).await?;
        lock_slot(&mut tx, id).await?;

        let slot = sqlx::query_as::<_, PayoutSlot>(
            r#"
            UPDATE payout_slots
            SET payout_date = COALESCE($2, payout_date),
                rank = COALESCE($3, rank),
                is_received = COALESCE($4, is_received)
            WHERE id = $1
            RETURNING id, group_id, user_id, payout_date, rank, is_received
            "#,
        )
        .bind(id)
        .bind(changes.payout_date)
        .bind(&changes.rank)
        .bind(changes.is_received)
        .fetch_optional(&mut *tx)
        .await?;

        let slot = match slot {
            Some(mut slot) if changes.is_received.is_some() => {
                // A slot with confirmations only follows their sent flags
                slot.is_received = recompute_slot_received(&mut tx, id).await?;
                recompute_group_done(&mut tx, group_id).await?;
                Some(slot)
            }
            slot => slot,
        };

        tx.commit().await?;

        Ok(slot)
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<Option<PayoutSlot>> {
        let mut tx = self.pool.begin().await?;

        let Some(group_id) = slot_group(&mut tx, id).await? else {
            return Ok(None);
        };
        lock_group(&mut tx, group_id).await?;

        let slot = sqlx::query_as::<_, PayoutSlot>(
            r#"
            DELETE FROM payout_slots
            WHERE id = $1
            RETURNING id, group_id, user_id, payout_date, rank, is_received
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if slot.is_some() {
            recompute_group_done(&mut tx, group_id).await?;
        }

        tx.commit().await?;

        if slot.is_some() {
            info!("Deleted payout slot {} of daret {}", id, group_id);
        }
        Ok(slot)
    }

    async fn recompute_received(&self, id: Uuid) -> DatabaseResult<Option<bool>> {
        let mut tx = self.pool.begin().await?;

        let Some(group_id) = slot_group(&mut tx, id).await? else {
            return Ok(None);
        };
        lock_group(&mut tx, group_id).await?;
        if !lock_slot(&mut tx, id).await? {
            return Ok(None);
        }

        let received = recompute_slot_received(&mut tx, id).await?;
        recompute_group_done(&mut tx, group_id).await?;

        tx.commit().await?;

        Ok(Some(received))
    }
}
