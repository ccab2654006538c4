//! In-memory repositories for service and router tests
//!
//! Mirrors the PostgreSQL behaviour that the services rely on: unique
//! constraints surface as [`DatabaseError::Conflict`] with the same constraint
//! names, deletes cascade and the completion flags are recomputed on the same
//! writes.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use common::error::{DatabaseError, DatabaseResult};
use uuid::Uuid;

use super::{
    ConfirmationRepository, GroupRepository, MembershipRepository, NotificationRepository,
    PayoutSlotRepository, Repositories, UserRepository,
};
use crate::ledger::{self, Tally};
use crate::models::{
    ConfirmationDetails, Group, GroupChanges, MarkSentOutcome, MemberView, Membership, NewGroup,
    Notification, NotificationDetails, PayoutSlot, PayoutSlotDetails, PendingRequest,
    ProfileUpdate, SlotAssignment, SlotChanges, TransferConfirmation, User,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    groups: Vec<Group>,
    memberships: Vec<Membership>,
    slots: Vec<PayoutSlot>,
    confirmations: Vec<TransferConfirmation>,
    notifications: Vec<Notification>,
}

impl Tables {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn full_name(&self, id: Uuid) -> (String, String) {
        self.user(id)
            .map(|u| (u.username.clone(), u.full_name()))
            .unwrap_or_default()
    }

    fn slot_group(&self, slot_id: Uuid) -> Option<Uuid> {
        self.slots.iter().find(|s| s.id == slot_id).map(|s| s.group_id)
    }

    fn recompute_slot(&mut self, slot_id: Uuid) -> bool {
        let tally = Tally::from_flags(
            self.confirmations
                .iter()
                .filter(|c| c.slot_id == slot_id)
                .map(|c| c.is_sent),
        );
        match self.slots.iter_mut().find(|s| s.id == slot_id) {
            Some(slot) => {
                slot.is_received = ledger::slot_received(tally, slot.is_received);
                slot.is_received
            }
            None => false,
        }
    }

    fn recompute_group(&mut self, group_id: Uuid) -> bool {
        let tally = Tally::from_flags(
            self.slots
                .iter()
                .filter(|s| s.group_id == group_id)
                .map(|s| s.is_received),
        );
        let done = ledger::group_done(tally);
        if let Some(group) = self.groups.iter_mut().find(|g| g.id == group_id) {
            group.is_done = done;
        }
        done
    }

    fn slot_details(&self, slot: &PayoutSlot) -> Option<PayoutSlotDetails> {
        let group = self.groups.iter().find(|g| g.id == slot.group_id)?;
        let owner = self.user(group.owner_id)?;
        let user = self.user(slot.user_id)?;
        Some(PayoutSlotDetails {
            id: slot.id,
            group_id: group.id,
            group_name: group.name.clone(),
            owner: owner.username.clone(),
            rank: slot.rank.clone(),
            user_id: user.id,
            username: user.username.clone(),
            full_name: user.full_name(),
            payout_date: slot.payout_date,
            bank_account: user.bank_account.clone(),
            total: i64::from(group.monthly_amount) * i64::from(group.member_count),
            elements: group.member_count,
            is_received: slot.is_received,
        })
    }

    fn confirmation_details(&self, c: &TransferConfirmation) -> Option<ConfirmationDetails> {
        let group_id = self.slot_group(c.slot_id)?;
        let group = self.groups.iter().find(|g| g.id == group_id)?;
        let (beneficiary_username, beneficiary_full_name) = self.full_name(c.beneficiary_id);
        let (payer_username, payer_full_name) = self.full_name(c.payer_id);
        Some(ConfirmationDetails {
            id: c.id,
            group_name: group.name.clone(),
            slot_id: c.slot_id,
            beneficiary_id: c.beneficiary_id,
            beneficiary_username,
            beneficiary_full_name,
            payer_id: c.payer_id,
            payer_username,
            payer_full_name,
            is_sent: c.is_sent,
            created_at: c.created_at,
        })
    }

    fn delete_slot_rows(&mut self, slot_ids: &[Uuid]) {
        self.confirmations.retain(|c| !slot_ids.contains(&c.slot_id));
        self.slots.retain(|s| !slot_ids.contains(&s.id));
    }
}

/// Shared in-memory backing for every repository trait
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store poisoned")
    }

    /// Insert an active user with no names set
    pub fn add_user(&self, username: &str) -> User {
        self.add_named_user(username, None, None)
    }

    pub fn add_named_user(
        &self,
        username: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            cnie: Uuid::new_v4().simple().to_string()[..10].to_uppercase(),
            password_hash: String::new(),
            first_name: first_name.map(str::to_string),
            last_name: last_name.map(str::to_string),
            birthday: None,
            phone: None,
            bank_account: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.insert_user(user.clone());
        user
    }

    pub fn insert_user(&self, user: User) {
        self.tables().users.push(user);
    }

    pub fn deactivate_user(&self, id: Uuid) {
        if let Some(user) = self.tables().users.iter_mut().find(|u| u.id == id) {
            user.is_active = false;
        }
    }

    pub fn group(&self, id: Uuid) -> Option<Group> {
        self.tables().groups.iter().find(|g| g.id == id).cloned()
    }

    pub fn memberships(&self) -> Vec<Membership> {
        self.tables().memberships.clone()
    }

    pub fn slots(&self) -> Vec<PayoutSlot> {
        self.tables().slots.clone()
    }

    pub fn confirmations(&self) -> Vec<TransferConfirmation> {
        self.tables().confirmations.clone()
    }

    /// Notifications addressed to a user, oldest first
    pub fn notifications_for(&self, destination_id: Uuid) -> Vec<Notification> {
        self.tables()
            .notifications
            .iter()
            .filter(|n| n.destination_id == destination_id)
            .cloned()
            .collect()
    }
}

impl Repositories {
    /// Every repository backed by the same in-memory store
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            groups: store.clone(),
            memberships: store.clone(),
            slots: store.clone(),
            confirmations: store.clone(),
            notifications: store,
        }
    }
}

fn conflict(constraint: &str) -> DatabaseError {
    DatabaseError::Conflict(constraint.to_string())
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        Ok(self.tables().user(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> DatabaseResult<Vec<User>> {
        Ok(self
            .tables()
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        update: &ProfileUpdate,
    ) -> DatabaseResult<Option<User>> {
        let mut tables = self.tables();

        let others = tables.users.iter().filter(|u| u.id != id);
        for other in others {
            if update.cnie.as_deref() == Some(other.cnie.as_str()) {
                return Err(conflict("users_cnie_key"));
            }
            if update.bank_account.is_some() && update.bank_account == other.bank_account {
                return Err(conflict("users_bank_account_key"));
            }
        }

        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(first_name) = &update.first_name {
            user.first_name = Some(first_name.clone());
        }
        if let Some(last_name) = &update.last_name {
            user.last_name = Some(last_name.clone());
        }
        if let Some(birthday) = update.birthday {
            user.birthday = Some(birthday);
        }
        if let Some(phone) = &update.phone {
            user.phone = Some(phone.clone());
        }
        if let Some(bank_account) = &update.bank_account {
            user.bank_account = Some(bank_account.clone());
        }
        if let Some(cnie) = &update.cnie {
            user.cnie = cnie.clone();
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> DatabaseResult<bool> {
        let mut tables = self.tables();
        match tables.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl GroupRepository for MemoryStore {
    async fn create(&self, group: &NewGroup, payout_date: NaiveDate) -> DatabaseResult<Group> {
        let mut tables = self.tables();

        if tables.groups.iter().any(|g| g.join_code == group.join_code) {
            return Err(conflict("darets_join_code_key"));
        }

        let created = Group {
            id: Uuid::new_v4(),
            owner_id: group.owner_id,
            name: group.name.clone(),
            date_start: group.date_start,
            monthly_amount: group.monthly_amount,
            is_part: group.is_part,
            member_count: if group.is_part { 1 } else { 0 },
            is_done: false,
            join_code: group.join_code.clone(),
            created_at: Utc::now(),
        };
        tables.groups.push(created.clone());

        if group.is_part {
            tables.memberships.push(Membership {
                id: Uuid::new_v4(),
                group_id: created.id,
                participant_id: group.owner_id,
                is_confirmed: true,
                created_at: Utc::now(),
            });
            tables.slots.push(PayoutSlot {
                id: Uuid::new_v4(),
                group_id: created.id,
                user_id: group.owner_id,
                payout_date,
                rank: "1".to_string(),
                is_received: false,
            });
        }

        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Group>> {
        Ok(self.group(id))
    }

    async fn find_by_join_code(&self, code: &str) -> DatabaseResult<Option<Group>> {
        Ok(self
            .tables()
            .groups
            .iter()
            .find(|g| g.join_code == code)
            .cloned())
    }

    async fn join_code_exists(&self, code: &str) -> DatabaseResult<bool> {
        Ok(self.tables().groups.iter().any(|g| g.join_code == code))
    }

    async fn signature_exists(&self, group: &NewGroup) -> DatabaseResult<bool> {
        Ok(self.tables().groups.iter().any(|g| {
            g.owner_id == group.owner_id
                && g.name == group.name
                && g.date_start == group.date_start
                && g.monthly_amount == group.monthly_amount
                && g.is_part == group.is_part
        }))
    }

    async fn list_visible_to(&self, user_id: Uuid) -> DatabaseResult<Vec<Group>> {
        let tables = self.tables();
        Ok(tables
            .groups
            .iter()
            .rev()
            .filter(|g| {
                g.owner_id == user_id
                    || tables.memberships.iter().any(|m| {
                        m.group_id == g.id && m.participant_id == user_id && m.is_confirmed
                    })
            })
            .cloned()
            .collect())
    }

    async fn update(&self, id: Uuid, changes: &GroupChanges) -> DatabaseResult<Option<Group>> {
        let mut tables = self.tables();
        let Some(group) = tables.groups.iter_mut().find(|g| g.id == id) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            group.name = name.clone();
        }
        if let Some(date_start) = changes.date_start {
            group.date_start = date_start;
        }
        if let Some(monthly_amount) = changes.monthly_amount {
            group.monthly_amount = monthly_amount;
        }
        Ok(Some(group.clone()))
    }

    async fn set_owner_participation(
        &self,
        id: Uuid,
        participates: bool,
        payout_date: NaiveDate,
    ) -> DatabaseResult<Option<Group>> {
        let mut tables = self.tables();
        let Some(owner_id) = tables.groups.iter().find(|g| g.id == id).map(|g| g.owner_id) else {
            return Ok(None);
        };

        let was_confirmed = tables
            .memberships
            .iter()
            .any(|m| m.group_id == id && m.participant_id == owner_id && m.is_confirmed);

        if participates {
            let existing = tables
                .memberships
                .iter()
                .position(|m| m.group_id == id && m.participant_id == owner_id);
            match existing {
                Some(position) => tables.memberships[position].is_confirmed = true,
                None => tables.memberships.push(Membership {
                    id: Uuid::new_v4(),
                    group_id: id,
                    participant_id: owner_id,
                    is_confirmed: true,
                    created_at: Utc::now(),
                }),
            }
            if !tables
                .slots
                .iter()
                .any(|s| s.group_id == id && s.user_id == owner_id)
            {
                tables.slots.push(PayoutSlot {
                    id: Uuid::new_v4(),
                    group_id: id,
                    user_id: owner_id,
                    payout_date,
                    rank: "1".to_string(),
                    is_received: false,
                });
            }
        } else {
            let slot_ids: Vec<Uuid> = tables
                .slots
                .iter()
                .filter(|s| s.group_id == id && s.user_id == owner_id)
                .map(|s| s.id)
                .collect();
            tables.delete_slot_rows(&slot_ids);
            tables
                .memberships
                .retain(|m| !(m.group_id == id && m.participant_id == owner_id));
        }

        let delta = match (was_confirmed, participates) {
            (false, true) => 1,
            (true, false) => -1,
            _ => 0,
        };
        if let Some(group) = tables.groups.iter_mut().find(|g| g.id == id) {
            group.is_part = participates;
            group.member_count = (group.member_count + delta).max(0);
        }
        tables.recompute_group(id);

        Ok(tables.groups.iter().find(|g| g.id == id).cloned())
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<bool> {
        let mut tables = self.tables();
        let before = tables.groups.len();
        tables.groups.retain(|g| g.id != id);
        if tables.groups.len() == before {
            return Ok(false);
        }

        let slot_ids: Vec<Uuid> = tables
            .slots
            .iter()
            .filter(|s| s.group_id == id)
            .map(|s| s.id)
            .collect();
        tables.delete_slot_rows(&slot_ids);
        tables.memberships.retain(|m| m.group_id != id);

        Ok(true)
    }

    async fn recompute_done(&self, id: Uuid) -> DatabaseResult<Option<bool>> {
        let mut tables = self.tables();
        if !tables.groups.iter().any(|g| g.id == id) {
            return Ok(None);
        }
        Ok(Some(tables.recompute_group(id)))
    }
}

#[async_trait]
impl MembershipRepository for MemoryStore {
    async fn create_request(
        &self,
        group_id: Uuid,
        participant_id: Uuid,
    ) -> DatabaseResult<Membership> {
        let mut tables = self.tables();
        if tables
            .memberships
            .iter()
            .any(|m| m.group_id == group_id && m.participant_id == participant_id)
        {
            return Err(conflict("daret_memberships_group_participant_key"));
        }

        let membership = Membership {
            id: Uuid::new_v4(),
            group_id,
            participant_id,
            is_confirmed: false,
            created_at: Utc::now(),
        };
        tables.memberships.push(membership.clone());
        Ok(membership)
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Membership>> {
        Ok(self
            .tables()
            .memberships
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn find(
        &self,
        group_id: Uuid,
        participant_id: Uuid,
    ) -> DatabaseResult<Option<Membership>> {
        Ok(self
            .tables()
            .memberships
            .iter()
            .find(|m| m.group_id == group_id && m.participant_id == participant_id)
            .cloned())
    }

    async fn list_pending_for_owner(&self, owner_id: Uuid) -> DatabaseResult<Vec<PendingRequest>> {
        let tables = self.tables();
        Ok(tables
            .memberships
            .iter()
            .rev()
            .filter(|m| !m.is_confirmed)
            .filter_map(|m| {
                let group = tables
                    .groups
                    .iter()
                    .find(|g| g.id == m.group_id && g.owner_id == owner_id)?;
                let (participant, participant_full_name) = tables.full_name(m.participant_id);
                Some(PendingRequest {
                    membership_id: m.id,
                    group_id: group.id,
                    participant_id: m.participant_id,
                    group_name: group.name.clone(),
                    participant,
                    participant_full_name,
                    requested_at: m.created_at,
                })
            })
            .collect())
    }

    async fn list_confirmed(&self, group_id: Uuid) -> DatabaseResult<Vec<MemberView>> {
        let tables = self.tables();
        Ok(tables
            .memberships
            .iter()
            .filter(|m| m.group_id == group_id && m.is_confirmed)
            .map(|m| {
                let (username, full_name) = tables.full_name(m.participant_id);
                MemberView {
                    membership_id: m.id,
                    user_id: m.participant_id,
                    username,
                    full_name,
                    joined_at: m.created_at,
                }
            })
            .collect())
    }

    async fn confirm(&self, id: Uuid) -> DatabaseResult<Option<Membership>> {
        let mut tables = self.tables();
        let Some(membership) = tables
            .memberships
            .iter_mut()
            .find(|m| m.id == id && !m.is_confirmed)
        else {
            return Ok(None);
        };
        membership.is_confirmed = true;
        let membership = membership.clone();

        if let Some(group) = tables.groups.iter_mut().find(|g| g.id == membership.group_id) {
            group.member_count += 1;
        }
        Ok(Some(membership))
    }

    async fn remove(&self, id: Uuid) -> DatabaseResult<Option<Membership>> {
        let mut tables = self.tables();
        let Some(position) = tables.memberships.iter().position(|m| m.id == id) else {
            return Ok(None);
        };
        let membership = tables.memberships.remove(position);

        if membership.is_confirmed {
            if let Some(group) = tables.groups.iter_mut().find(|g| g.id == membership.group_id) {
                group.member_count = (group.member_count - 1).max(0);
            }
        }
        Ok(Some(membership))
    }
}

#[async_trait]
impl PayoutSlotRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<PayoutSlot>> {
        Ok(self.tables().slots.iter().find(|s| s.id == id).cloned())
    }

    async fn find_details(&self, id: Uuid) -> DatabaseResult<Option<PayoutSlotDetails>> {
        let tables = self.tables();
        Ok(tables
            .slots
            .iter()
            .find(|s| s.id == id)
            .and_then(|s| tables.slot_details(s)))
    }

    async fn list_for_group(&self, group_id: Uuid) -> DatabaseResult<Vec<PayoutSlotDetails>> {
        let tables = self.tables();
        let mut slots: Vec<&PayoutSlot> = tables
            .slots
            .iter()
            .filter(|s| s.group_id == group_id)
            .collect();
        slots.sort_by(|a, b| {
            (a.rank.len(), &a.rank, a.payout_date).cmp(&(b.rank.len(), &b.rank, b.payout_date))
        });
        Ok(slots
            .into_iter()
            .filter_map(|s| tables.slot_details(s))
            .collect())
    }

    async fn upsert_many(&self, assignments: &[SlotAssignment]) -> DatabaseResult<Vec<PayoutSlot>> {
        let mut tables = self.tables();
        let mut slots = Vec::with_capacity(assignments.len());

        for assignment in assignments {
            let existing = tables
                .slots
                .iter_mut()
                .find(|s| s.group_id == assignment.group_id && s.user_id == assignment.user_id);
            let slot = match existing {
                Some(slot) => {
                    slot.payout_date = assignment.payout_date;
                    slot.rank = assignment.rank.clone();
                    slot.clone()
                }
                None => {
                    let slot = PayoutSlot {
                        id: Uuid::new_v4(),
                        group_id: assignment.group_id,
                        user_id: assignment.user_id,
                        payout_date: assignment.payout_date,
                        rank: assignment.rank.clone(),
                        is_received: false,
                    };
                    tables.slots.push(slot.clone());
                    slot
                }
            };
            slots.push(slot);
        }

        let mut group_ids: Vec<Uuid> = assignments.iter().map(|a| a.group_id).collect();
        group_ids.sort();
        group_ids.dedup();
        for group_id in group_ids {
            let count = assignments.iter().filter(|a| a.group_id == group_id).count() as i32;
            if let Some(group) = tables.groups.iter_mut().find(|g| g.id == group_id) {
                group.member_count = count;
            }
            tables.recompute_group(group_id);
        }

        Ok(slots)
    }

    async fn update(&self, id: Uuid, changes: &SlotChanges) -> DatabaseResult<Option<PayoutSlot>> {
        let mut tables = self.tables();
        let Some(slot) = tables.slots.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        if let Some(payout_date) = changes.payout_date {
            slot.payout_date = payout_date;
        }
        if let Some(rank) = &changes.rank {
            slot.rank = rank.clone();
        }
        if let Some(is_received) = changes.is_received {
            slot.is_received = is_received;
        }
        let mut slot = slot.clone();

        if changes.is_received.is_some() {
            slot.is_received = tables.recompute_slot(id);
            tables.recompute_group(slot.group_id);
        }
        Ok(Some(slot))
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<Option<PayoutSlot>> {
        let mut tables = self.tables();
        let Some(slot) = tables.slots.iter().find(|s| s.id == id).cloned() else {
            return Ok(None);
        };
        tables.delete_slot_rows(&[id]);
        tables.recompute_group(slot.group_id);
        Ok(Some(slot))
    }

    async fn recompute_received(&self, id: Uuid) -> DatabaseResult<Option<bool>> {
        let mut tables = self.tables();
        let Some(group_id) = tables.slot_group(id) else {
            return Ok(None);
        };
        let received = tables.recompute_slot(id);
        tables.recompute_group(group_id);
        Ok(Some(received))
    }
}

#[async_trait]
impl ConfirmationRepository for MemoryStore {
    async fn exists(
        &self,
        slot_id: Uuid,
        beneficiary_id: Uuid,
        payer_id: Uuid,
    ) -> DatabaseResult<bool> {
        Ok(self.tables().confirmations.iter().any(|c| {
            c.slot_id == slot_id && c.beneficiary_id == beneficiary_id && c.payer_id == payer_id
        }))
    }

    async fn create(
        &self,
        slot_id: Uuid,
        beneficiary_id: Uuid,
        payer_id: Uuid,
    ) -> DatabaseResult<Option<TransferConfirmation>> {
        let mut tables = self.tables();
        let Some(group_id) = tables.slot_group(slot_id) else {
            return Ok(None);
        };
        if tables.confirmations.iter().any(|c| {
            c.slot_id == slot_id && c.beneficiary_id == beneficiary_id && c.payer_id == payer_id
        }) {
            return Err(conflict("transfer_confirmations_triple_key"));
        }

        let now = Utc::now();
        let confirmation = TransferConfirmation {
            id: Uuid::new_v4(),
            slot_id,
            beneficiary_id,
            payer_id,
            is_sent: false,
            created_at: now,
            updated_at: now,
        };
        tables.confirmations.push(confirmation.clone());
        tables.recompute_slot(slot_id);
        tables.recompute_group(group_id);

        Ok(Some(confirmation))
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<TransferConfirmation>> {
        Ok(self
            .tables()
            .confirmations
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn find_details(&self, id: Uuid) -> DatabaseResult<Option<ConfirmationDetails>> {
        let tables = self.tables();
        Ok(tables
            .confirmations
            .iter()
            .find(|c| c.id == id)
            .and_then(|c| tables.confirmation_details(c)))
    }

    async fn list_pending_for_beneficiary(
        &self,
        beneficiary_id: Uuid,
    ) -> DatabaseResult<Vec<ConfirmationDetails>> {
        let tables = self.tables();
        Ok(tables
            .confirmations
            .iter()
            .rev()
            .filter(|c| c.beneficiary_id == beneficiary_id && !c.is_sent)
            .filter_map(|c| tables.confirmation_details(c))
            .collect())
    }

    async fn mark_sent(&self, id: Uuid) -> DatabaseResult<Option<MarkSentOutcome>> {
        let mut tables = self.tables();
        let Some(confirmation) = tables.confirmations.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        let newly_sent = !confirmation.is_sent;
        if newly_sent {
            confirmation.is_sent = true;
            confirmation.updated_at = Utc::now();
        }
        let confirmation = confirmation.clone();

        let Some(group_id) = tables.slot_group(confirmation.slot_id) else {
            return Ok(None);
        };
        let slot_received = tables.recompute_slot(confirmation.slot_id);
        let group_done = tables.recompute_group(group_id);

        Ok(Some(MarkSentOutcome {
            confirmation,
            newly_sent,
            slot_received,
            group_done,
        }))
    }

    async fn delete(&self, id: Uuid) -> DatabaseResult<Option<TransferConfirmation>> {
        let mut tables = self.tables();
        let Some(position) = tables.confirmations.iter().position(|c| c.id == id) else {
            return Ok(None);
        };
        let confirmation = tables.confirmations.remove(position);

        if let Some(group_id) = tables.slot_group(confirmation.slot_id) {
            tables.recompute_slot(confirmation.slot_id);
            tables.recompute_group(group_id);
        }
        Ok(Some(confirmation))
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn create(
        &self,
        source_id: Uuid,
        destination_id: Uuid,
        message: &str,
    ) -> DatabaseResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            source_id,
            destination_id,
            message: message.to_string(),
            created_at: Utc::now(),
            is_read: false,
        };
        self.tables().notifications.push(notification.clone());
        Ok(notification)
    }

    async fn list_for_destination(
        &self,
        destination_id: Uuid,
    ) -> DatabaseResult<Vec<NotificationDetails>> {
        let tables = self.tables();
        Ok(tables
            .notifications
            .iter()
            .rev()
            .filter(|n| n.destination_id == destination_id)
            .map(|n| NotificationDetails {
                id: n.id,
                source_id: n.source_id,
                source_username: tables.full_name(n.source_id).0,
                destination_id: n.destination_id,
                destination_username: tables.full_name(n.destination_id).0,
                message: n.message.clone(),
                created_at: n.created_at,
                is_read: n.is_read,
            })
            .collect())
    }

    async fn count_unread(&self, destination_id: Uuid) -> DatabaseResult<i64> {
        Ok(self
            .tables()
            .notifications
            .iter()
            .filter(|n| n.destination_id == destination_id && !n.is_read)
            .count() as i64)
    }

    async fn mark_read(
        &self,
        id: Uuid,
        destination_id: Uuid,
    ) -> DatabaseResult<Option<Notification>> {
        let mut tables = self.tables();
        Ok(tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.destination_id == destination_id)
            .map(|n| {
                n.is_read = true;
                n.clone()
            }))
    }

    async fn delete(&self, id: Uuid, destination_id: Uuid) -> DatabaseResult<bool> {
        let mut tables = self.tables();
        let before = tables.notifications.len();
        tables
            .notifications
            .retain(|n| !(n.id == id && n.destination_id == destination_id));
        Ok(tables.notifications.len() < before)
    }

    async fn delete_all(&self, destination_id: Uuid) -> DatabaseResult<u64> {
        let mut tables = self.tables();
        let before = tables.notifications.len();
        tables
            .notifications
            .retain(|n| n.destination_id != destination_id);
        Ok((before - tables.notifications.len()) as u64)
    }
}
