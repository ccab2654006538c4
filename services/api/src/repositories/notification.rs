//! Notification repository

use async_trait::async_trait;
use common::error::DatabaseResult;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Notification, NotificationDetails};

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(
        &self,
        source_id: Uuid,
        destination_id: Uuid,
        message: &str,
    ) -> DatabaseResult<Notification>;
    /// Notifications addressed to the user, newest first
    async fn list_for_destination(&self, destination_id: Uuid)
    -> DatabaseResult<Vec<NotificationDetails>>;
    async fn count_unread(&self, destination_id: Uuid) -> DatabaseResult<i64>;
    /// Mark read; `None` unless the notification is addressed to `destination_id`
    async fn mark_read(&self, id: Uuid, destination_id: Uuid)
    -> DatabaseResult<Option<Notification>>;
    async fn delete(&self, id: Uuid, destination_id: Uuid) -> DatabaseResult<bool>;
    async fn delete_all(&self, destination_id: Uuid) -> DatabaseResult<u64>;
}

/// PostgreSQL notification repository
#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    /// Create a new notification repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(
        &self,
        source_id: Uuid,
        destination_id: Uuid,
        message: &str,
    ) -> DatabaseResult<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (source_id, destination_id, message)
            VALUES ($1, $2, $3)
            RETURNING id, source_id, destination_id, message, created_at, is_read
            "#,
        )
        .bind(source_id)
        .bind(destination_id)
        .bind(message)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }

    async fn list_for_destination(
        &self,
        destination_id: Uuid,
    ) -> DatabaseResult<Vec<NotificationDetails>> {
        let notifications = sqlx::query_as::<_, NotificationDetails>(
            r#"
            SELECT n.id,
                   n.source_id,
                   s.username AS source_username,
                   n.destination_id,
                   d.username AS destination_username,
                   n.message,
                   n.created_at,
                   n.is_read
            FROM notifications n
            JOIN users s ON s.id = n.source_id
            JOIN users d ON d.id = n.destination_id
            WHERE n.destination_id = $1
            ORDER BY n.created_at DESC
            "#,
        )
        .bind(destination_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    async fn count_unread(&self, destination_id: Uuid) -> DatabaseResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE destination_id = $1 AND NOT is_read",
        )
        .bind(destination_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn mark_read(
        &self,
        id: Uuid,
        destination_id: Uuid,
    ) -> DatabaseResult<Option<Notification>> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications
            SET is_read = TRUE
            WHERE id = $1 AND destination_id = $2
            RETURNING id, source_id, destination_id, message, created_at, is_read
            "#,
        )
        .bind(id)
        .bind(destination_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notification)
    }

    async fn delete(&self, id: Uuid, destination_id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND destination_id = $2")
            .bind(id)
            .bind(destination_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, destination_id: Uuid) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE destination_id = $1")
            .bind(destination_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
