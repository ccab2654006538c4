//! Repositories for database operations
//!
//! Each entity has a repository trait and a PostgreSQL implementation.
//! Services only see the traits, through [`Repositories`].

use std::sync::Arc;

use sqlx::PgPool;

pub mod confirmation;
pub mod group;
pub mod ledger;
pub mod membership;
pub mod notification;
pub mod payout;
pub mod user;

#[cfg(test)]
pub mod memory;

pub use confirmation::{ConfirmationRepository, PgConfirmationRepository};
pub use group::{GroupRepository, PgGroupRepository};
pub use membership::{MembershipRepository, PgMembershipRepository};
pub use notification::{NotificationRepository, PgNotificationRepository};
pub use payout::{PayoutSlotRepository, PgPayoutSlotRepository};
pub use user::{PgUserRepository, UserRepository};

/// The full set of repositories used by the services
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub memberships: Arc<dyn MembershipRepository>,
    pub slots: Arc<dyn PayoutSlotRepository>,
    pub confirmations: Arc<dyn ConfirmationRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Repositories {
    /// PostgreSQL-backed repositories sharing one pool
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            groups: Arc::new(PgGroupRepository::new(pool.clone())),
            memberships: Arc::new(PgMembershipRepository::new(pool.clone())),
            slots: Arc::new(PgPayoutSlotRepository::new(pool.clone())),
            confirmations: Arc::new(PgConfirmationRepository::new(pool.clone())),
            notifications: Arc::new(PgNotificationRepository::new(pool)),
        }
    }
}
