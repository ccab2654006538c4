//! Notification sink

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{CreateNotificationRequest, Notification, NotificationDetails},
    repositories::{NotificationRepository, UserRepository},
    validation,
};

#[derive(Clone)]
pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
    users: Arc<dyn UserRepository>,
}

impl NotificationService {
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            notifications,
            users,
        }
    }

    /// Write a notification as the side effect of another action.
    ///
    /// The action has already been committed, so a failure is only logged.
    pub async fn notify(&self, source_id: Uuid, destination_id: Uuid, message: &str) {
        if let Err(e) = self
            .notifications
            .create(source_id, destination_id, message)
            .await
        {
            warn!(
                "Failed to notify user {} ({}): {}",
                destination_id, message, e
            );
        }
    }

    /// Send a message from the caller to a user given by username
    pub async fn send(
        &self,
        caller: &AuthUser,
        request: &CreateNotificationRequest,
    ) -> ApiResult<Notification> {
        let (destination, message) = validation::validate_notification(request)?;

        let destination = self
            .users
            .find_by_username(&destination)
            .await?
            .ok_or_else(|| ApiError::not_found("User destination does not exist."))?;

        Ok(self
            .notifications
            .create(caller.id, destination.id, &message)
            .await?)
    }

    /// The caller's notifications, newest first, with the unread count
    pub async fn inbox(&self, caller: &AuthUser) -> ApiResult<(Vec<NotificationDetails>, i64)> {
        let notifications = self.notifications.list_for_destination(caller.id).await?;
        let unread = self.notifications.count_unread(caller.id).await?;
        Ok((notifications, unread))
    }

    pub async fn mark_read(&self, caller: &AuthUser, id: Uuid) -> ApiResult<Notification> {
        self.notifications
            .mark_read(id, caller.id)
            .await?
            .ok_or_else(|| ApiError::not_found("Notification not found."))
    }

    pub async fn delete(&self, caller: &AuthUser, id: Uuid) -> ApiResult<()> {
        if self.notifications.delete(id, caller.id).await? {
            Ok(())
        } else {
            Err(ApiError::not_found("Notification not found."))
        }
    }

    /// Delete every notification addressed to the caller, returning how many
    pub async fn delete_all(&self, caller: &AuthUser) -> ApiResult<u64> {
        Ok(self.notifications.delete_all(caller.id).await?)
    }
}
