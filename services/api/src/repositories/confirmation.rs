//! Transfer confirmation repository

use async_trait::async_trait;
use common::error::DatabaseResult;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::ledger::{
    lock_group, lock_slot, recompute_group_done, recompute_slot_received, slot_group,
};
use crate::models::{ConfirmationDetails, MarkSentOutcome, TransferConfirmation};

const CONFIRMATION_DETAILS: &str = r#"
    SELECT c.id,
           d.name AS group_name,
           c.slot_id,
           c.beneficiary_id,
           b.username AS beneficiary_username,
           user_display_name(b.first_name, b.last_name, b.username) AS beneficiary_full_name,
           c.payer_id,
           p.username AS payer_username,
           user_display_name(p.first_name, p.last_name, p.username) AS payer_full_name,
           c.is_sent,
           c.created_at
    FROM transfer_confirmations c
    JOIN payout_slots s ON s.id = c.slot_id
    JOIN darets d ON d.id = s.group_id
    JOIN users b ON b.id = c.beneficiary_id
    JOIN users p ON p.id = c.payer_id
"#;

/// Persistence of the two-party transfer handshake
#[async_trait]
pub trait ConfirmationRepository: Send + Sync {
    async fn exists(&self, slot_id: Uuid, beneficiary_id: Uuid, payer_id: Uuid)
    -> DatabaseResult<bool>;
    /// Record an unsent confirmation and recompute the slot and its group.
    /// `None` when the slot does not exist.
    async fn create(
        &self,
        slot_id: Uuid,
        beneficiary_id: Uuid,
        payer_id: Uuid,
    ) -> DatabaseResult<Option<TransferConfirmation>>;
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<TransferConfirmation>>;
    async fn find_details(&self, id: Uuid) -> DatabaseResult<Option<ConfirmationDetails>>;
    /// Unsent confirmations where the user is the beneficiary
    async fn list_pending_for_beneficiary(
        &self,
        beneficiary_id: Uuid,
    ) -> DatabaseResult<Vec<ConfirmationDetails>>;
    /// Set the sent flag and cascade to the slot and group
    async fn mark_sent(&self, id: Uuid) -> DatabaseResult<Option<MarkSentOutcome>>;
    async fn delete(&self, id: Uuid) -> DatabaseResult<Option<TransferConfirmation>>;
}

/// PostgreSQL transfer confirmation repository
#[derive(Clone)]
pub struct PgConfirmationRepository {
    pool: PgPool,
}

impl PgConfirmationRepository {
    /// Create a new confirmation repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConfirmationRepository for PgConfirmationRepository {
    async fn exists(
        &self,
        slot_id: Uuid,
        beneficiary_id: Uuid,
        payer_id: Uuid,
    ) -> DatabaseResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM transfer_confirmations
                WHERE slot_id = $1 AND beneficiary_id = $2 AND payer_id = $3
            )
            "#,
        )
        .bind(slot_id)
        .bind(beneficiary_id)
        .bind(payer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create(
        &self,
        slot_id: Uuid,
        beneficiary_id: Uuid,
        payer_id: Uuid,
    ) -> DatabaseResult<Option<TransferConfirmation>> {
        let mut tx = self.pool.begin().await?;

        let Some(group_id) = slot_group(&mut tx, slot_id).await? else {
            return Ok(None);
        };
        lock_group(&mut tx, group_id).await?;
        if !lock_slot(&mut tx, slot_id).await? {
            return Ok(None);
        }

        let confirmation = sqlx::query_as::<_, TransferConfirmation>(
            r#"
            INSERT INTO transfer_confirmations (slot_id, beneficiary_id, payer_id)
            VALUES ($1, $2, $3)
            RETURNING id, slot_id, beneficiary_id, payer_id, is_sent, created_at, updated_at
            "#,
        )
        .bind(slot_id)
        .bind(beneficiary_id)
        .bind(payer_id)
        .fetch_one(&mut *tx)
        .await?;

        recompute_slot_received(&mut tx, slot_id).await?;
        recompute_group_done(&mut tx, group_id).await?;

        tx.commit().await?;

        info!(
            "Recorded transfer from {} to {} for slot {}",
            payer_id, beneficiary_id, slot_id
        );
        Ok(Some(confirmation))
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<TransferConfirmation>> {
        let confirmation = sqlx::query_as::<_, TransferConfirmation>(
            r#"
            SELECT id, slot_id, beneficiary_id, payer_id, is_sent, created_at, updated_at
            FROM transfer_confirmations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(confirmation)
    }

    async fn find_details(&self, id: Uuid) -> DatabaseResult<Option<ConfirmationDetails>> {
        let query = format!("{CONFIRMATION_DETAILS} WHERE c.id = $1");
        let confirmation = sqlx::query_as::<_, ConfirmationDetails>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(confirmation)
    }

    async fn list_pending_for_beneficiary(
        &self,
        beneficiary_id: Uuid,
    ) -> DatabaseResult<Vec<ConfirmationDetails>> {
        let query = format!(
            "{CONFIRMATION_DETAILS} WHERE c.beneficiary_id = $1 AND NOT c.is_sent ORDER BY c.created_at DESC"
        );
        let confirmations = sqlx::query_as::<_, ConfirmationDetails>(&query)
            .bind(beneficiary_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(confirmations)
    }

    async fn mark_sent(&self, id: Uuid) -> DatabaseResult<Option<MarkSentOutcome>> {
        let mut tx = self.pool.begin().await?;

        let slot_id: Option<Uuid> =
            sqlx::query_scalar("SELECT slot_id FROM transfer_confirmations WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(slot_id) = slot_id else {
            return Ok(None);
        };
        let Some(group_id) = slot_group(&mut tx, slot_id).await? else {
            return Ok(None);
        };
        lock_group(&mut tx, group_id).await?;
        lock_slot(&mut tx, slot_id).await?;

        let newly_sent = sqlx::query(
            r#"
            UPDATE transfer_confirmations
            SET is_sent = TRUE, updated_at = NOW()
            WHERE id = $1 AND NOT is_sent
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        let confirmation = sqlx::query_as::<_, TransferConfirmation>(
            r#"
            SELECT id, slot_id, beneficiary_id, payer_id, is_sent, created_at, updated_at
            FROM transfer_confirmations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(confirmation) = confirmation else {
            return Ok(None);
        };

        let slot_received = recompute_slot_received(&mut tx, slot_id).await?;
        let group_done = recompute_group_done(&mut tx, group_id).await?;

        tx.commit().await?;

        if newly_sent {
            info!("Transfer confirmation {} marked as sent", id);
        }
        Ok(Some(MarkSentOutcome {
            confirmation,
            newly_sent,
            slot_received,
            group_done,
        }))
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<Option<TransferConfirmation>> {
        let mut tx = self.pool.begin().await?;

        let slot_id: Option<Uuid> =
            sqlx::query_scalar("SELECT slot_id FROM transfer_confirmations WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(slot_id) = slot_id else {
            return Ok(None);
        };
        let Some(group_id) = slot_group(&mut tx, slot_id).await? else {
            return Ok(None);
        };
        lock_group(&mut tx, group_id).await?;
        lock_slot(&mut tx, slot_id).await?;

        let confirmation = sqlx::query_as::<_, TransferConfirmation>(
            r#"
            DELETE FROM transfer_confirmations
            WHERE id = $1
            RETURNING id, slot_id, beneficiary_id, payer_id, is_sent, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        if confirmation.is_some() {
            recompute_slot_received(&mut tx, slot_id).await?;
            recompute_group_done(&mut tx, group_id).await?;
        }

        tx.commit().await?;

        Ok(confirmation)
    }
}
