use uuid::Uuid;

use crate::{
    dto::notifications::{NotificationList, UnreadCount},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Notification,
    notify::Subscription,
    response::{ApiResponse, Meta, paginate},
    routes::params::Pagination,
    state::AppState,
};

async fn feed(state: &AppState, user: &AuthUser) -> Vec<Notification> {
    state
        .store
        .list_notifications(user.user_id)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, read = "list_notifications", "read failed, showing empty list");
            Vec::new()
        })
}

pub async fn list_notifications(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<NotificationList>> {
    let (page, limit, offset) = pagination.normalize();
    let (items, meta) = paginate(feed(state, user).await, page, limit, offset);
    Ok(ApiResponse::success("OK", NotificationList { items }, Some(meta)))
}

pub async fn unread_count(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UnreadCount>> {
    let unread = feed(state, user).await.iter().filter(|n| !n.read).count() as i64;
    Ok(ApiResponse::success("OK", UnreadCount { unread }, None))
}

pub async fn mark_read(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if !state.store.mark_notification_read(user.user_id, id).await? {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::success(
        "Marked as read",
        serde_json::json!({ "id": id }),
        Some(Meta::empty()),
    ))
}

/// Opens a live feed for the caller. Dropping the subscription unsubscribes.
pub fn subscribe(state: &AppState, user: &AuthUser) -> Subscription {
    state.hub.subscribe(user.user_id)
}
