//! Business operations behind the HTTP handlers
//!
//! Services own authorization and validation; persistence and the
//! completion cascade live in the repositories.

pub mod groups;
pub mod notifications;
pub mod schedule;
pub mod transfers;
pub mod users;

pub use groups::{GroupService, MembershipStatus};
pub use notifications::NotificationService;
pub use schedule::ScheduleService;
pub use transfers::TransferService;
pub use users::UserService;

use crate::{repositories::Repositories, settings::AppConfig};

#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub notifications: NotificationService,
    pub groups: GroupService,
    pub schedule: ScheduleService,
    pub transfers: TransferService,
}

impl Services {
    pub fn new(repos: Repositories, settings: &AppConfig) -> Self {
        let users = UserService::new(repos.users.clone());
        let notifications =
            NotificationService::new(repos.notifications.clone(), repos.users.clone());
        let groups = GroupService::new(
            repos.groups.clone(),
            repos.memberships.clone(),
            repos.slots.clone(),
            repos.users.clone(),
            notifications.clone(),
            settings.join_code.clone(),
        );
        let schedule = ScheduleService::new(
            repos.slots.clone(),
            repos.users.clone(),
            groups.clone(),
            settings.access,
        );
        let transfers = TransferService::new(
            repos.confirmations,
            repos.slots,
            users.clone(),
            notifications.clone(),
            settings.access,
        );

        Self {
            users,
            notifications,
            groups,
            schedule,
            transfers,
        }
    }
}
