//! Membership (join request) models

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A user's pending or confirmed participation in a group
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Membership {
    pub id: Uuid,
    pub group_id: Uuid,
    pub participant_id: Uuid,
    pub is_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

/// Pending join request, as listed to the group owner
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PendingRequest {
    pub membership_id: Uuid,
    pub group_id: Uuid,
    pub participant_id: Uuid,
    pub group_name: String,
    pub participant: String,
    pub participant_full_name: String,
    pub requested_at: DateTime<Utc>,
}

/// Confirmed member of a group
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MemberView {
    pub membership_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub joined_at: DateTime<Utc>,
}
