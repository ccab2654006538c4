//! Row locks and completion recomputes shared by the repositories
//!
//! Every function runs on a connection that is inside a transaction. Callers
//! lock the group row before the slot row.

use common::error::DatabaseResult;
use sqlx::{PgConnection, Row};
use tracing::info;
use uuid::Uuid;

use crate::ledger::{self, Tally};

/// Lock a group row, returning false when it does not exist
pub(crate) async fn lock_group(conn: &mut PgConnection, group_id: Uuid) -> DatabaseResult<bool> {
    let row = sqlx::query("SELECT id FROM darets WHERE id = $1 FOR UPDATE")
        .bind(group_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.is_some())
}

/// Lock a slot row, returning false when it does not exist
pub(crate) async fn lock_slot(conn: &mut PgConnection, slot_id: Uuid) -> DatabaseResult<bool> {
    let row = sqlx::query("SELECT id FROM payout_slots WHERE id = $1 FOR UPDATE")
        .bind(slot_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.is_some())
}

/// Group owning a slot
pub(crate) async fn slot_group(conn: &mut PgConnection, slot_id: Uuid) -> DatabaseResult<Option<Uuid>> {
    let group_id = sqlx::query_scalar("SELECT group_id FROM payout_slots WHERE id = $1")
        .bind(slot_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(group_id)
}

/// Re-derive a slot's received flag from its confirmations
pub(crate) async fn recompute_slot_received(
    conn: &mut PgConnection,
    slot_id: Uuid,
) -> DatabaseResult<bool> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS total,
               COUNT(*) FILTER (WHERE NOT is_sent) AS outstanding
        FROM transfer_confirmations
        WHERE slot_id = $1
        "#,
    )
    .bind(slot_id)
    .fetch_one(&mut *conn)
    .await?;

    let tally = Tally {
        total: row.get("total"),
        outstanding: row.get("outstanding"),
    };

    let current: bool = sqlx::query_scalar("SELECT is_received FROM payout_slots WHERE id = $1")
        .bind(slot_id)
        .fetch_one(&mut *conn)
        .await?;

    let received = ledger::slot_received(tally, current);
    if received != current {
        sqlx::query("UPDATE payout_slots SET is_received = $2 WHERE id = $1")
            .bind(slot_id)
            .bind(received)
            .execute(&mut *conn)
            .await?;
        info!("Slot {} received flag set to {}", slot_id, received);
    }

    Ok(received)
}

/// Re-derive a group's done flag from its slots
pub(crate) async fn recompute_group_done(
    conn: &mut PgConnection,
    group_id: Uuid,
) -> DatabaseResult<bool> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS total,
               COUNT(*) FILTER (WHERE NOT is_received) AS outstanding
        FROM payout_slots
        WHERE group_id = $1
        "#,
    )
    .bind(group_id)
    .fetch_one(&mut *conn)
    .await?;

    let done = ledger::group_done(Tally {
        total: row.get("total"),
        outstanding: row.get("outstanding"),
    });

    let result = sqlx::query("UPDATE darets SET is_done = $2 WHERE id = $1 AND is_done <> $2")
        .bind(group_id)
        .bind(done)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() > 0 {
        info!("Daret {} done flag set to {}", group_id, done);
    }

    Ok(done)
}
