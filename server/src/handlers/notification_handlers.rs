// Notification inbox handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use crewspace_core::ids::NotificationId;

use crate::{
    auth::authenticate_rest_request,
    error::AppError,
    state::AppState,
    types::{
        MarkAllReadResponse, NotificationListResponse, NotificationResponse, PaginationQuery,
    },
};

pub(crate) async fn list_notifications_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<NotificationListResponse>, AppError> {
    let user = authenticate_rest_request(&state, &headers).await?;

    let notifications = state
        .notification_inbox
        .list(&user.id, query.limit, query.offset)
        .await?;
    let unread_count = state.notification_inbox.count_unread(&user.id).await?;

    Ok(Json(NotificationListResponse {
        unread_count,
        notifications: notifications
            .into_iter()
            .map(NotificationResponse::from)
            .collect(),
    }))
}

pub(crate) async fn mark_notification_read_handler(
    Path(notification_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let user = authenticate_rest_request(&state, &headers).await?;

    state
        .notification_inbox
        .mark_read(&user.id, &NotificationId::from(notification_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn mark_all_notifications_read_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MarkAllReadResponse>, AppError> {
    let user = authenticate_rest_request(&state, &headers).await?;

    let updated = state.notification_inbox.mark_all_read(&user.id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}
