//! Group ledger: darets and their join requests

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use super::NotificationService;
use crate::{
    error::{ApiError, ApiResult},
    join_code,
    middleware::AuthUser,
    models::{
        CreateGroupRequest, Group, GroupView, MemberView, Membership, PendingRequest,
        UpdateGroupRequest,
    },
    repositories::{GroupRepository, MembershipRepository, PayoutSlotRepository, UserRepository},
    settings::JoinCodeConfig,
    validation,
};

/// Where the caller stands in a group they asked about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipStatus {
    Confirmed,
    Pending,
}

#[derive(Clone)]
pub struct GroupService {
    groups: Arc<dyn GroupRepository>,
    memberships: Arc<dyn MembershipRepository>,
    slots: Arc<dyn PayoutSlotRepository>,
    users: Arc<dyn UserRepository>,
    notifications: NotificationService,
    join_code: JoinCodeConfig,
}

impl GroupService {
    pub fn new(
        groups: Arc<dyn GroupRepository>,
        memberships: Arc<dyn MembershipRepository>,
        slots: Arc<dyn PayoutSlotRepository>,
        users: Arc<dyn UserRepository>,
        notifications: NotificationService,
        join_code: JoinCodeConfig,
    ) -> Self {
        Self {
            groups,
            memberships,
            slots,
            users,
            notifications,
            join_code,
        }
    }

    async fn find(&self, id: Uuid) -> ApiResult<Group> {
        self.groups
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Daret not found."))
    }

    /// Load a group the caller owns or is a confirmed member of
    pub async fn find_visible(&self, caller: &AuthUser, id: Uuid) -> ApiResult<Group> {
        let group = self.find(id).await?;
        if group.owner_id == caller.id || self.is_confirmed_member(&group, caller.id).await? {
            Ok(group)
        } else {
            Err(ApiError::forbidden("You do not have access to this Daret."))
        }
    }

    /// Load a group the caller owns, failing with `denied` otherwise
    pub async fn find_owned(&self, caller: &AuthUser, id: Uuid, denied: &str) -> ApiResult<Group> {
        let group = self.find(id).await?;
        if group.owner_id == caller.id {
            Ok(group)
        } else {
            Err(ApiError::forbidden(denied))
        }
    }

    async fn is_confirmed_member(&self, group: &Group, user_id: Uuid) -> ApiResult<bool> {
        Ok(self
            .memberships
            .find(group.id, user_id)
            .await?
            .is_some_and(|m| m.is_confirmed))
    }

    async fn view(&self, group: Group) -> ApiResult<GroupView> {
        let owner = self.users.find_by_id(group.owner_id).await?.ok_or_else(|| {
            error!("Owner {} of daret {} is missing", group.owner_id, group.id);
            ApiError::InternalServerError
        })?;
        Ok(GroupView::new(group, &owner))
    }

    async fn unused_join_code(&self) -> ApiResult<String> {
        for _ in 0..self.join_code.max_attempts {
            let code = join_code::generate(self.join_code.length);
            if !self.groups.join_code_exists(&code).await? {
                return Ok(code);
            }
        }

        error!(
            "No unused join code after {} attempts",
            self.join_code.max_attempts
        );
        Err(ApiError::InternalServerError)
    }

    pub async fn create(
        &self,
        caller: &AuthUser,
        request: &CreateGroupRequest,
    ) -> ApiResult<GroupView> {
        let mut group = validation::validate_new_group(caller.id, request)?;

        if self.groups.signature_exists(&group).await? {
            return Err(ApiError::bad_request(
                "Daret with the same information already exists",
            ));
        }

        group.join_code = self.unused_join_code().await?;
        let created = self
            .groups
            .create(&group, Utc::now().date_naive())
            .await?;

        info!(
            "User {} created daret {} ({})",
            caller.username, created.name, created.id
        );
        self.view(created).await
    }

    /// Groups the caller owns or is a confirmed member of
    pub async fn list(&self, caller: &AuthUser) -> ApiResult<Vec<GroupView>> {
        let groups = self.groups.list_visible_to(caller.id).await?;

        let mut owner_ids: Vec<Uuid> = groups.iter().map(|g| g.owner_id).collect();
        owner_ids.sort();
        owner_ids.dedup();
        let owners: HashMap<Uuid, _> = self
            .users
            .find_by_ids(&owner_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(groups
            .into_iter()
            .filter_map(|group| {
                let owner = owners.get(&group.owner_id)?;
                Some(GroupView::new(group, owner))
            })
            .collect())
    }

    pub async fn get(&self, caller: &AuthUser, id: Uuid) -> ApiResult<GroupView> {
        let group = self.find_visible(caller, id).await?;
        self.view(group).await
    }

    pub async fn update(
        &self,
        caller: &AuthUser,
        id: Uuid,
        request: &UpdateGroupRequest,
    ) -> ApiResult<GroupView> {
        let group = self
            .find_owned(caller, id, "You are not authorized to update this Daret.")
            .await?;
        let update = validation::validate_group_update(request)?;

        let mut updated = if update.changes.is_empty() {
            group.clone()
        } else {
            self.groups
                .update(id, &update.changes)
                .await?
                .ok_or_else(|| ApiError::not_found("Daret not found."))?
        };

        if let Some(is_part) = update.is_part.filter(|flag| *flag != group.is_part) {
            updated = self
                .groups
                .set_owner_participation(id, is_part, Utc::now().date_naive())
                .await?
                .ok_or_else(|| ApiError::not_found("Daret not found."))?;
        }

        let message = format!(
            "The Daret {} has been updated by {}.",
            updated.name, caller.username
        );
        for member in self.memberships.list_confirmed(id).await? {
            if member.user_id != caller.id {
                self.notifications
                    .notify(caller.id, member.user_id, &message)
                    .await;
            }
        }

        info!("User {} updated daret {}", caller.username, id);
        self.view(updated).await
    }

    pub async fn delete(&self, caller: &AuthUser, id: Uuid) -> ApiResult<()> {
        self.find_owned(caller, id, "You are not authorized to delete this Daret.")
            .await?;
        if !self.groups.delete(id).await? {
            return Err(ApiError::not_found("Daret not found."));
        }

        info!("User {} deleted daret {}", caller.username, id);
        Ok(())
    }

    /// Confirmed members of a visible group
    pub async fn members(&self, caller: &AuthUser, id: Uuid) -> ApiResult<Vec<MemberView>> {
        let group = self.find_visible(caller, id).await?;
        Ok(self.memberships.list_confirmed(group.id).await?)
    }

    /// Re-derive every slot's received flag, then the group's done flag
    pub async fn refresh_completion(&self, caller: &AuthUser, id: Uuid) -> ApiResult<GroupView> {
        self.find_owned(caller, id, "You are not authorized to update this Daret.")
            .await?;

        for slot in self.slots.list_for_group(id).await? {
            self.slots.recompute_received(slot.id).await?;
        }
        self.groups.recompute_done(id).await?;

        let group = self.find(id).await?;
        self.view(group).await
    }

    pub async fn membership_status(
        &self,
        caller: &AuthUser,
        id: Uuid,
    ) -> ApiResult<MembershipStatus> {
        let group = self.find(id).await?;
        match self.memberships.find(group.id, caller.id).await? {
            Some(m) if m.is_confirmed => Ok(MembershipStatus::Confirmed),
            Some(_) => Ok(MembershipStatus::Pending),
            None => Err(ApiError::not_found(
                "You are not a participant in this Daret.",
            )),
        }
    }

    /// Ask to join the group behind a join code
    pub async fn request_join(&self, caller: &AuthUser, code: &str) -> ApiResult<Membership> {
        validation::validate_join_code(code)
            .map_err(|_| ApiError::not_found("Daret not found."))?;

        let group = self
            .groups
            .find_by_join_code(code)
            .await?
            .ok_or_else(|| ApiError::not_found("Daret not found."))?;

        if group.owner_id == caller.id {
            return Err(ApiError::bad_request(
                "You can not join your own Daret by code.",
            ));
        }

        match self.memberships.find(group.id, caller.id).await? {
            Some(m) if m.is_confirmed => {
                return Err(ApiError::bad_request(
                    "You are already a participant in this Daret",
                ));
            }
            Some(_) => {
                return Err(ApiError::bad_request(
                    "Your request is pending confirmation from the owner.",
                ));
            }
            None => {}
        }

        let membership = self.memberships.create_request(group.id, caller.id).await?;

        self.notifications
            .notify(
                caller.id,
                group.owner_id,
                &format!(
                    "{} has requested to join your Daret {}.",
                    caller.username, group.name
                ),
            )
            .await;

        Ok(membership)
    }

    /// Unconfirmed requests across every group the caller owns
    pub async fn pending_requests(&self, caller: &AuthUser) -> ApiResult<Vec<PendingRequest>> {
        Ok(self.memberships.list_pending_for_owner(caller.id).await?)
    }

    async fn find_request(&self, id: Uuid) -> ApiResult<Membership> {
        self.memberships
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Join request not found."))
    }

    pub async fn confirm_request(&self, caller: &AuthUser, id: Uuid) -> ApiResult<Membership> {
        let request = self.find_request(id).await?;
        let group = self
            .find_owned(
                caller,
                request.group_id,
                "You are not authorized to confirm participants in this Daret.",
            )
            .await?;

        if request.is_confirmed {
            return Err(ApiError::bad_request("Participant is already confirmed."));
        }

        let membership = self
            .memberships
            .confirm(id)
            .await?
            .ok_or_else(|| ApiError::bad_request("Participant is already confirmed."))?;

        self.notifications
            .notify(
                caller.id,
                membership.participant_id,
                &format!(
                    "Your request to join the Daret {} has been confirmed.",
                    group.name
                ),
            )
            .await;

        Ok(membership)
    }

    pub async fn reject_request(&self, caller: &AuthUser, id: Uuid) -> ApiResult<Membership> {
        let request = self.find_request(id).await?;
        let group = self
            .find_owned(
                caller,
                request.group_id,
                "You are not authorized to remove participants from this Daret.",
            )
            .await?;

        // The owner's own membership is tied to is_part and their rank-1 slot
        if request.participant_id == group.owner_id {
            return Err(ApiError::bad_request(
                "The owner leaves the rotation by updating is_part on the Daret.",
            ));
        }

        let membership = self
            .memberships
            .remove(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Join request not found."))?;

        self.notifications
            .notify(
                caller.id,
                membership.participant_id,
                &format!("Your request was rejected to join the Daret {}.", group.name),
            )
            .await;

        Ok(membership)
    }
}
