//! Transfer confirmation models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Acknowledgement that a payer sent money to a slot's beneficiary
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TransferConfirmation {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub beneficiary_id: Uuid,
    pub payer_id: Uuid,
    pub is_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Confirmation joined with the names of both parties
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ConfirmationDetails {
    pub id: Uuid,
    pub group_name: String,
    pub slot_id: Uuid,
    pub beneficiary_id: Uuid,
    pub beneficiary_username: String,
    pub beneficiary_full_name: String,
    pub payer_id: Uuid,
    pub payer_username: String,
    pub payer_full_name: String,
    pub is_sent: bool,
    pub created_at: DateTime<Utc>,
}

/// Confirmation creation payload; parties are given by username
#[derive(Debug, Clone, Deserialize)]
pub struct CreateConfirmationRequest {
    #[serde(alias = "tour")]
    pub slot_id: Option<Uuid>,
    #[serde(alias = "partie_beneficiaire")]
    pub beneficiary: Option<String>,
    #[serde(alias = "partie_donnenant")]
    pub payer: Option<String>,
}

/// Result of marking a confirmation as sent
#[derive(Debug, Clone, Serialize)]
pub struct MarkSentOutcome {
    #[serde(flatten)]
    pub confirmation: TransferConfirmation,
    /// False when the confirmation was already sent
    pub newly_sent: bool,
    pub slot_received: bool,
    pub group_done: bool,
}
