//! API service routes

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::ApiError,
    extract::{JsonBody, PathParam},
    middleware::{AuthUser, auth_middleware},
    models::{
        AssignSlotsRequest, ChangePasswordRequest, CreateConfirmationRequest, CreateGroupRequest,
        CreateNotificationRequest, ProfileUpdate, UpdateGroupRequest, UpdateSlotRequest,
    },
    response::ApiResponse,
    services::MembershipStatus,
    state::AppState,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/darets", get(list_groups).post(create_group))
        .route(
            "/darets/:id",
            get(get_group).put(update_group).delete(delete_group),
        )
        .route("/darets/:id/members", get(list_members))
        .route("/darets/:id/slots", get(list_group_slots))
        .route("/darets/:id/membership", get(membership_status))
        .route("/darets/:id/recompute", post(recompute_group))
        .route("/join/:code", post(join_group))
        .route("/requests", get(pending_requests))
        .route(
            "/requests/:id",
            put(confirm_request).delete(reject_request),
        )
        .route("/tours", post(assign_slots))
        .route(
            "/tours/:id",
            get(get_slot).put(update_slot).delete(delete_slot),
        )
        .route(
            "/confirmations",
            get(pending_confirmations).post(create_confirmation),
        )
        .route(
            "/confirmations/:id",
            get(get_confirmation)
                .put(mark_confirmation_sent)
                .delete(delete_confirmation),
        )
        .route(
            "/notifications",
            get(list_notifications)
                .post(create_notification)
                .delete(delete_all_notifications),
        )
        .route(
            "/notifications/:id",
            put(mark_notification_read).delete(delete_notification),
        )
        .route("/me", get(get_profile).put(update_profile))
        .route("/me/password", post(change_password))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "daret-api"
    }))
}

async fn list_groups(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let groups = state.services.groups.list(&caller).await?;
    Ok(ApiResponse::data(groups))
}

async fn create_group(
    State(state): State<AppState>,
    caller: AuthUser,
    JsonBody(payload): JsonBody<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let group = state.services.groups.create(&caller, &payload).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::data(group).with_message("Daret created successfully"),
    ))
}

async fn get_group(
    State(state): State<AppState>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let group = state.services.groups.get(&caller, id).await?;
    Ok(ApiResponse::data(group))
}

async fn update_group(
    State(state): State<AppState>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<UpdateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let group = state.services.groups.update(&caller, id, &payload).await?;
    Ok(ApiResponse::data(group).with_message("Daret updated successfully"))
}

async fn delete_group(
    State(state): State<AppState>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.groups.delete(&caller, id).await?;
    Ok(ApiResponse::message("Daret deleted successfully"))
}

async fn list_members(
    State(state): State<AppState>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let members = state.services.groups.members(&caller, id).await?;
    Ok(ApiResponse::data(members))
}

async fn list_group_slots(
    State(state): State<AppState>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let slots = state.services.schedule.list_for_group(&caller, id).await?;
    Ok(ApiResponse::data(slots))
}

async fn membership_status(
    State(state): State<AppState>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    match state.services.groups.membership_status(&caller, id).await? {
        MembershipStatus::Confirmed => Ok(ApiResponse::message(
            "You are a confirmed participant in this Daret.",
        )),
        MembershipStatus::Pending => Err(ApiError::bad_request(
            "Your participation is pending confirmation.",
        )),
    }
}

async fn recompute_group(
    State(state): State<AppState>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let group = state.services.groups.refresh_completion(&caller, id).await?;
    Ok(ApiResponse::data(group))
}

async fn join_group(
    State(state): State<AppState>,
    caller: AuthUser,
    PathParam(code): PathParam<String>,
) -> Result<impl IntoResponse, ApiError> {
    let membership = state.services.groups.request_join(&caller, &code).await?;
    Ok(ApiResponse::data(membership)
        .with_message("Join request sent, awaiting owner confirmation."))
}

async fn pending_requests(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let requests = state.services.groups.pending_requests(&caller).await?;
    let count = requests.len() as i64;
    Ok(ApiResponse::data(requests).with_unread_count(count))
}

async fn confirm_request(
    State(state): State<AppState>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let membership = state.services.groups.confirm_request(&caller, id).await?;
    Ok(ApiResponse::data(membership).with_message("Participant confirmed successfully"))
}

async fn reject_request(
    State(state): State<AppState>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.groups.reject_request(&caller, id).await?;
    Ok(ApiResponse::message("Participant removed successfully"))
}

async fn assign_slots(
    State(state): State<AppState>,
    caller: AuthUser,
    JsonBody(payload): JsonBody<AssignSlotsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let slots = state.services.schedule.assign(&caller, &payload).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::data(slots).with_message("Tours updated/created successfully"),
    ))
}

async fn get_slot(
    State(state): State<AppState>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let slot = state.services.schedule.get(&caller, id).await?;
    Ok(ApiResponse::data(slot))
}

async fn update_slot(
    State(state): State<AppState>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<UpdateSlotRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let slot = state.services.schedule.update(&caller, id, &payload).await?;
    Ok(ApiResponse::data(slot).with_message("Tour updated successfully"))
}

async fn delete_slot(
    State(state): State<AppState>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.schedule.delete(&caller, id).await?;
    Ok(ApiResponse::message("Tour deleted successfully"))
}

async fn pending_confirmations(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let pending = state.services.transfers.pending(&caller).await?;
    let count = pending.len() as i64;
    Ok(ApiResponse::data(pending).with_unread_count(count))
}

async fn create_confirmation(
    State(state): State<AppState>,
    caller: AuthUser,
    JsonBody(payload): JsonBody<CreateConfirmationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let confirmation = state.services.transfers.create(&caller, &payload).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::data(confirmation).with_message("Confirm Virement created successfully"),
    ))
}

async fn get_confirmation(
    State(state): State<AppState>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let confirmation = state.services.transfers.get(&caller, id).await?;
    Ok(ApiResponse::data(confirmation))
}

async fn mark_confirmation_sent(
    State(state): State<AppState>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.services.transfers.mark_sent(&caller, id).await?;
    Ok(ApiResponse::data(outcome).with_message("Confirm Virement updated successfully"))
}

async fn delete_confirmation(
    State(state): State<AppState>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.transfers.delete(&caller, id).await?;
    Ok(ApiResponse::message("Confirm Virement deleted successfully"))
}

async fn list_notifications(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let (notifications, unread) = state.services.notifications.inbox(&caller).await?;
    Ok(ApiResponse::data(notifications).with_unread_count(unread))
}

async fn create_notification(
    State(state): State<AppState>,
    caller: AuthUser,
    JsonBody(payload): JsonBody<CreateNotificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = state.services.notifications.send(&caller, &payload).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::data(notification).with_message("Notification created successfully."),
    ))
}

async fn mark_notification_read(
    State(state): State<AppState>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let notification = state.services.notifications.mark_read(&caller, id).await?;
    Ok(ApiResponse::data(notification).with_message("Notification marked as read."))
}

async fn delete_notification(
    State(state): State<AppState>,
    caller: AuthUser,
    PathParam(id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.notifications.delete(&caller, id).await?;
    Ok(ApiResponse::message("Notification deleted successfully."))
}

async fn delete_all_notifications(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state.services.notifications.delete_all(&caller).await?;
    info!("User {} cleared {} notifications", caller.username, deleted);
    Ok(ApiResponse::message(format!(
        "All {deleted} notifications deleted successfully."
    )))
}

async fn get_profile(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.services.users.me(&caller).await?;
    Ok(ApiResponse::data(profile))
}

async fn update_profile(
    State(state): State<AppState>,
    caller: AuthUser,
    JsonBody(payload): JsonBody<ProfileUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.services.users.update_profile(&caller, &payload).await?;
    Ok(ApiResponse::data(profile).with_message("Profile updated successfully"))
}

async fn change_password(
    State(state): State<AppState>,
    caller: AuthUser,
    JsonBody(payload): JsonBody<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.services.users.change_password(&caller, &payload).await?;
    Ok(ApiResponse::message("Password changed successfully"))
}
