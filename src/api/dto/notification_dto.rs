//! Notification inbox DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::Notification;

/// Response for `GET /notifications`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotificationListResponse {
    /// Notifications, newest first.
    pub notifications: Vec<Notification>,
    /// Number of unread notifications in the list.
    pub unread: usize,
}

impl From<Vec<Notification>> for NotificationListResponse {
    fn from(notifications: Vec<Notification>) -> Self {
        let unread = notifications.iter().filter(|n| !n.is_read).count();
        Self {
            notifications,
            unread,
        }
    }
}

/// Response for `PATCH /notifications/read-all`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MarkAllReadResponse {
    /// Number of notifications that changed to read.
    pub updated: u64,
}
