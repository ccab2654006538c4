//! Daret (savings group) models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::user::User;

/// Savings group entity
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub date_start: NaiveDate,
    /// Monthly contribution per member
    #[serde(rename = "mensuel")]
    pub monthly_amount: i32,
    /// Whether the owner takes part in the rotation
    pub is_part: bool,
    /// Number of confirmed members
    #[serde(rename = "nbre_elements")]
    pub member_count: i32,
    pub is_done: bool,
    #[serde(rename = "codeGroup")]
    pub join_code: String,
    pub created_at: DateTime<Utc>,
}

/// Group as returned to clients, with the owner's names resolved
#[derive(Debug, Clone, Serialize)]
pub struct GroupView {
    #[serde(flatten)]
    pub group: Group,
    pub owner: String,
    pub full_name: String,
}

impl GroupView {
    pub fn new(group: Group, owner: &User) -> Self {
        Self {
            group,
            owner: owner.username.clone(),
            full_name: owner.full_name(),
        }
    }
}

/// Group creation payload
///
/// `mensuel` and `is_part` are kept loosely typed: clients send numbers or
/// numeric strings, booleans or `"true"`/`"false"`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGroupRequest {
    pub name: Option<String>,
    pub date_start: Option<String>,
    pub mensuel: Option<Value>,
    pub is_part: Option<Value>,
}

/// Partial group update payload
///
/// A field sent as `null` is kept as `Some(Value::Null)` so that it can be
/// told apart from an absent one.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateGroupRequest {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub date_start: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub mensuel: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub is_part: Option<Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Validated group ready to be persisted
#[derive(Debug, Clone)]
pub struct NewGroup {
    pub owner_id: Uuid,
    pub name: String,
    pub date_start: NaiveDate,
    pub monthly_amount: i32,
    pub is_part: bool,
    pub join_code: String,
}

/// Validated column changes for an update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupChanges {
    pub name: Option<String>,
    pub date_start: Option<NaiveDate>,
    pub monthly_amount: Option<i32>,
}

impl GroupChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.date_start.is_none() && self.monthly_amount.is_none()
    }
}
