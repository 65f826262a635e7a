//! Notification inbox handlers.

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};

use crate::api::auth::CurrentUser;
use crate::api::dto::{MarkAllReadResponse, NotificationListResponse};
use crate::app_state::AppState;
use crate::domain::{Notification, NotificationId};
use crate::error::{CareError, ErrorResponse};

/// `GET /notifications`: The caller's inbox.
///
/// # Errors
///
/// Returns [`CareError`] on datastore failure.
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    tag = "Notifications",
    summary = "List my notifications",
    params(("X-User-Id" = i64, Header, description = "Authenticated account id")),
    responses(
        (status = 200, description = "Notifications, newest first", body = NotificationListResponse),
        (status = 401, description = "Missing or unknown caller", body = ErrorResponse),
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, CareError> {
    let notifications = state.inbox.notifications(user.id).await?;
    Ok(Json(NotificationListResponse::from(notifications)))
}

/// `PATCH /notifications/read-all`: Mark the whole inbox read.
///
/// # Errors
///
/// Returns [`CareError`] on datastore failure.
#[utoipa::path(
    patch,
    path = "/api/v1/notifications/read-all",
    tag = "Notifications",
    summary = "Mark all notifications read",
    params(("X-User-Id" = i64, Header, description = "Authenticated account id")),
    responses(
        (status = 200, description = "Number of notifications changed", body = MarkAllReadResponse),
        (status = 401, description = "Missing or unknown caller", body = ErrorResponse),
    )
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, CareError> {
    let updated = state.inbox.mark_all_read(user.id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

/// `PATCH /notifications/{id}/read`: Mark one notification read.
///
/// # Errors
///
/// Returns [`CareError::NotificationNotFound`] if the notification is
/// unknown or not the caller's.
#[utoipa::path(
    patch,
    path = "/api/v1/notifications/{id}/read",
    tag = "Notifications",
    summary = "Mark a notification read",
    params(
        ("id" = i64, Path, description = "Notification id"),
        ("X-User-Id" = i64, Header, description = "Authenticated account id"),
    ),
    responses(
        (status = 200, description = "Updated notification", body = Notification),
        (status = 404, description = "Notification not found", body = ErrorResponse),
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, CareError> {
    let Path(id) = id?;
    let notification = state
        .inbox
        .mark_read(user.id, NotificationId::new(id))
        .await?;
    Ok(Json(notification))
}

/// Notification routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/read-all", patch(mark_all_read))
        .route("/notifications/{id}/read", patch(mark_read))
}
