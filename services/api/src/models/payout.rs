//! Payout schedule (tour) models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One member's payout turn within a group
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PayoutSlot {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub payout_date: NaiveDate,
    #[serde(rename = "order")]
    pub rank: String,
    pub is_received: bool,
}

/// Slot joined with its group and beneficiary
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PayoutSlotDetails {
    pub id: Uuid,
    pub group_id: Uuid,
    pub group_name: String,
    /// Username of the group owner
    pub owner: String,
    #[serde(rename = "order")]
    pub rank: String,
    pub user_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub payout_date: NaiveDate,
    pub bank_account: Option<String>,
    /// Pooled amount for the turn: monthly amount times member count
    pub total: i64,
    pub elements: i32,
    pub is_received: bool,
}

/// One entry of a bulk assignment
#[derive(Debug, Clone, Deserialize)]
pub struct SlotAssignmentRequest {
    #[serde(alias = "daret")]
    pub group_id: Option<Uuid>,
    #[serde(alias = "user")]
    pub user_id: Option<Uuid>,
    #[serde(alias = "date_obtenu")]
    pub payout_date: Option<NaiveDate>,
    pub order: Option<String>,
}

/// Bulk assignment payload
#[derive(Debug, Clone, Deserialize)]
pub struct AssignSlotsRequest {
    #[serde(default, alias = "participants")]
    pub assignments: Vec<SlotAssignmentRequest>,
}

/// Validated assignment
#[derive(Debug, Clone, PartialEq)]
pub struct SlotAssignment {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub payout_date: NaiveDate,
    pub rank: String,
}

/// Partial slot update payload
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateSlotRequest {
    #[serde(alias = "date_obtenu")]
    pub payout_date: Option<NaiveDate>,
    pub order: Option<String>,
    #[serde(alias = "is_recu")]
    pub is_received: Option<bool>,
}

/// Validated slot changes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotChanges {
    pub payout_date: Option<NaiveDate>,
    pub rank: Option<String>,
    pub is_received: Option<bool>,
}
