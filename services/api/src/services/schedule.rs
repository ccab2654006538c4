//! Payout schedule (tours)

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::GroupService;
use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{AssignSlotsRequest, PayoutSlot, PayoutSlotDetails, UpdateSlotRequest},
    repositories::{PayoutSlotRepository, UserRepository},
    settings::AccessPolicy,
    validation,
};

const NOT_OWNER: &str = "You are not authorized to manage the tours of this Daret.";

#[derive(Clone)]
pub struct ScheduleService {
    slots: Arc<dyn PayoutSlotRepository>,
    users: Arc<dyn UserRepository>,
    groups: GroupService,
    access: AccessPolicy,
}

impl ScheduleService {
    pub fn new(
        slots: Arc<dyn PayoutSlotRepository>,
        users: Arc<dyn UserRepository>,
        groups: GroupService,
        access: AccessPolicy,
    ) -> Self {
        Self {
            slots,
            users,
            groups,
            access,
        }
    }

    async fn find(&self, id: Uuid) -> ApiResult<PayoutSlot> {
        self.slots
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Tour not found"))
    }

    /// Create or move the slots of several members at once
    pub async fn assign(
        &self,
        caller: &AuthUser,
        request: &AssignSlotsRequest,
    ) -> ApiResult<Vec<PayoutSlot>> {
        let assignments = validation::validate_assignments(request)?;

        let group_ids: BTreeSet<Uuid> = assignments.iter().map(|a| a.group_id).collect();
        for group_id in &group_ids {
            self.groups.find_owned(caller, *group_id, NOT_OWNER).await?;
        }

        let user_ids: Vec<Uuid> = assignments
            .iter()
            .map(|a| a.user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let found = self.users.find_by_ids(&user_ids).await?;
        if found.len() != user_ids.len() {
            return Err(ApiError::not_found("User not found."));
        }

        let slots = self.slots.upsert_many(&assignments).await?;
        info!(
            "User {} assigned {} tours across {} darets",
            caller.username,
            slots.len(),
            group_ids.len()
        );
        Ok(slots)
    }

    /// Slots of a group the caller can see, in payout order
    pub async fn list_for_group(
        &self,
        caller: &AuthUser,
        group_id: Uuid,
    ) -> ApiResult<Vec<PayoutSlotDetails>> {
        let group = self.groups.find_visible(caller, group_id).await?;
        Ok(self.slots.list_for_group(group.id).await?)
    }

    pub async fn get(&self, caller: &AuthUser, id: Uuid) -> ApiResult<PayoutSlotDetails> {
        let slot = self.find(id).await?;
        if self.access.strict_ownership {
            self.groups.find_visible(caller, slot.group_id).await?;
        }

        self.slots
            .find_details(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Tour not found"))
    }

    pub async fn update(
        &self,
        caller: &AuthUser,
        id: Uuid,
        request: &UpdateSlotRequest,
    ) -> ApiResult<PayoutSlot> {
        let slot = self.find(id).await?;
        if self.access.strict_ownership {
            self.groups.find_owned(caller, slot.group_id, NOT_OWNER).await?;
        } else if let Some(received) = request.is_received {
            warn!(
                "User {} set received={} on tour {} without an ownership check",
                caller.username, received, id
            );
        }

        let changes = validation::validate_slot_changes(request)?;
        self.slots
            .update(id, &changes)
            .await?
            .ok_or_else(|| ApiError::not_found("Tour not found"))
    }

    pub async fn delete(&self, caller: &AuthUser, id: Uuid) -> ApiResult<()> {
        let slot = self.find(id).await?;
        if self.access.strict_ownership {
            self.groups.find_owned(caller, slot.group_id, NOT_OWNER).await?;
        }

        self.slots
            .delete(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Tour not found"))?;

        info!("User {} deleted tour {}", caller.username, id);
        Ok(())
    }
}
