//! Caller-scoped user directory

use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    models::{ChangePasswordRequest, ProfileUpdate, User, UserProfile},
    repositories::UserRepository,
    validation,
};

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Resolve a token subject to an active user
    pub async fn authenticate(&self, id: Uuid) -> ApiResult<AuthUser> {
        match self.users.find_by_id(id).await? {
            Some(user) if user.is_active => Ok(AuthUser {
                id: user.id,
                full_name: user.full_name(),
                username: user.username,
            }),
            Some(_) => {
                warn!("Inactive user {} attempted to authenticate", id);
                Err(ApiError::Unauthorized)
            }
            None => {
                warn!("Token subject {} does not exist", id);
                Err(ApiError::Unauthorized)
            }
        }
    }

    pub async fn find_by_username(&self, username: &str) -> ApiResult<User> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("User {username} not found.")))
    }

    pub async fn me(&self, caller: &AuthUser) -> ApiResult<UserProfile> {
        let user = self
            .users
            .find_by_id(caller.id)
            .await?
            .ok_or(ApiError::Unauthorized)?;
        Ok(UserProfile::from(&user))
    }

    pub async fn update_profile(
        &self,
        caller: &AuthUser,
        update: &ProfileUpdate,
    ) -> ApiResult<UserProfile> {
        let update = validation::validate_profile_update(update)?;

        let user = self
            .users
            .update_profile(caller.id, &update)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        info!("User {} updated their profile", caller.username);
        Ok(UserProfile::from(&user))
    }

    pub async fn change_password(
        &self,
        caller: &AuthUser,
        request: &ChangePasswordRequest,
    ) -> ApiResult<()> {
        let change = validation::validate_password_change(request)?;

        let user = self
            .users
            .find_by_id(caller.id)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        if !verify_password(&user.password_hash, &change.current_password) {
            return Err(ApiError::bad_request("Current password is incorrect"));
        }

        let password_hash = hash_password(&change.new_password)?;
        self.users.set_password_hash(user.id, &password_hash).await?;

        info!("User {} changed their password", caller.username);
        Ok(())
    }
}

/// Argon2 hash of a password, in PHC string format
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {}", e);
            ApiError::InternalServerError
        })
}

fn verify_password(password_hash: &str, password: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash could not be parsed: {}", e);
            false
        }
    }
}
