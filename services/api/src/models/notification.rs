//! Notification models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Notification entity
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub source_id: Uuid,
    pub destination_id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

/// Notification with both usernames resolved
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NotificationDetails {
    pub id: Uuid,
    pub source_id: Uuid,
    pub source_username: String,
    pub destination_id: Uuid,
    pub destination_username: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}

/// Notification creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNotificationRequest {
    pub user_destination: Option<String>,
    pub message: Option<String>,
}
