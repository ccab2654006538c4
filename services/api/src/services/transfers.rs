//! Two-party transfer confirmations

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::{NotificationService, UserService};
use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{
        ConfirmationDetails, CreateConfirmationRequest, MarkSentOutcome, TransferConfirmation,
    },
    repositories::{ConfirmationRepository, PayoutSlotRepository},
    settings::AccessPolicy,
    validation::FieldError,
};

const NOT_A_PARTY: &str = "You are not a party to this transfer.";

#[derive(Clone)]
pub struct TransferService {
    confirmations: Arc<dyn ConfirmationRepository>,
    slots: Arc<dyn PayoutSlotRepository>,
    users: UserService,
    notifications: NotificationService,
    access: AccessPolicy,
}

impl TransferService {
    pub fn new(
        confirmations: Arc<dyn ConfirmationRepository>,
        slots: Arc<dyn PayoutSlotRepository>,
        users: UserService,
        notifications: NotificationService,
        access: AccessPolicy,
    ) -> Self {
        Self {
            confirmations,
            slots,
            users,
            notifications,
            access,
        }
    }

    async fn find(&self, id: Uuid) -> ApiResult<TransferConfirmation> {
        self.confirmations
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Confirm Virement not found"))
    }

    fn ensure_party(&self, caller: &AuthUser, confirmation: &TransferConfirmation) -> ApiResult<()> {
        if !self.access.strict_ownership
            || caller.id == confirmation.beneficiary_id
            || caller.id == confirmation.payer_id
        {
            Ok(())
        } else {
            Err(ApiError::forbidden(NOT_A_PARTY))
        }
    }

    /// Record that `payer` sent money to `beneficiary` for a slot
    pub async fn create(
        &self,
        caller: &AuthUser,
        request: &CreateConfirmationRequest,
    ) -> ApiResult<TransferConfirmation> {
        let (Some(slot_id), Some(beneficiary), Some(payer)) = (
            request.slot_id,
            request.beneficiary.as_deref(),
            request.payer.as_deref(),
        ) else {
            return Err(FieldError::new(
                "tour",
                "tour, partie_beneficiaire and partie_donnenant are required.",
            )
            .into());
        };

        self.slots
            .find_by_id(slot_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Tour not found"))?;
        let beneficiary = self.users.find_by_username(beneficiary.trim()).await?;
        let payer = self.users.find_by_username(payer.trim()).await?;

        if self.access.strict_ownership && caller.id != beneficiary.id && caller.id != payer.id {
            return Err(ApiError::forbidden(NOT_A_PARTY));
        }

        if self
            .confirmations
            .exists(slot_id, beneficiary.id, payer.id)
            .await?
        {
            return Err(ApiError::bad_request("You already sent money."));
        }

        let confirmation = self
            .confirmations
            .create(slot_id, beneficiary.id, payer.id)
            .await?
            .ok_or_else(|| ApiError::not_found("Tour not found"))?;

        info!(
            "User {} recorded a transfer from {} to {} on tour {}",
            caller.username, payer.username, beneficiary.username, slot_id
        );
        Ok(confirmation)
    }

    /// Unsent confirmations awaiting the caller as beneficiary
    pub async fn pending(&self, caller: &AuthUser) -> ApiResult<Vec<ConfirmationDetails>> {
        Ok(self
            .confirmations
            .list_pending_for_beneficiary(caller.id)
            .await?)
    }

    pub async fn get(&self, caller: &AuthUser, id: Uuid) -> ApiResult<ConfirmationDetails> {
        let confirmation = self.find(id).await?;
        self.ensure_party(caller, &confirmation)?;

        self.confirmations
            .find_details(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Confirm Virement not found"))
    }

    /// Beneficiary acknowledges receipt; cascades to the slot and group
    pub async fn mark_sent(&self, caller: &AuthUser, id: Uuid) -> ApiResult<MarkSentOutcome> {
        let confirmation = self.find(id).await?;
        if self.access.strict_ownership && caller.id != confirmation.beneficiary_id {
            return Err(ApiError::forbidden(
                "Only the beneficiary can confirm receiving the money.",
            ));
        }

        let outcome = self
            .confirmations
            .mark_sent(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Confirm Virement not found"))?;

        if outcome.newly_sent {
            let beneficiary = self
                .confirmations
                .find_details(id)
                .await?
                .map(|details| details.beneficiary_full_name)
                .unwrap_or_else(|| caller.full_name.clone());

            self.notifications
                .notify(
                    outcome.confirmation.beneficiary_id,
                    outcome.confirmation.payer_id,
                    &format!("{beneficiary} confirmed that they received the money."),
                )
                .await;
        }

        Ok(outcome)
    }

    pub async fn delete(&self, caller: &AuthUser, id: Uuid) -> ApiResult<()> {
        let confirmation = self.find(id).await?;
        self.ensure_party(caller, &confirmation)?;

        self.confirmations
            .delete(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Confirm Virement not found"))?;

        info!("User {} deleted transfer confirmation {}", caller.username, id);
        Ok(())
    }
}
