//! API models for request and response payloads

pub mod confirmation;
pub mod group;
pub mod membership;
pub mod notification;
pub mod payout;
pub mod user;

pub use confirmation::{
    ConfirmationDetails, CreateConfirmationRequest, MarkSentOutcome, TransferConfirmation,
};
pub use group::{CreateGroupRequest, Group, GroupChanges, GroupView, NewGroup, UpdateGroupRequest};
pub use membership::{MemberView, Membership, PendingRequest};
pub use notification::{CreateNotificationRequest, Notification, NotificationDetails};
pub use payout::{
    AssignSlotsRequest, PayoutSlot, PayoutSlotDetails, SlotAssignment, SlotAssignmentRequest,
    SlotChanges, UpdateSlotRequest,
};
pub use user::{ChangePasswordRequest, ProfileUpdate, User, UserProfile};
