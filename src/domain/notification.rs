//! Stored in-app notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::{NotificationId, UserId};

/// Stored notification addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Notification {
    /// Notification identifier.
    pub id: NotificationId,
    /// Addressee.
    pub recipient_id: UserId,
    /// Kind tag, e.g. `"appointment"`.
    pub kind: String,
    /// Display text.
    pub message: String,
    /// Whether the recipient has read it.
    pub is_read: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    /// Addressee.
    pub recipient_id: UserId,
    /// Kind tag.
    pub kind: String,
    /// Display text.
    pub message: String,
}

impl NewNotification {
    /// Kind tag used for booking notifications.
    pub const APPOINTMENT: &'static str = "appointment";

    /// Builds the doctor-facing notice for a new booking request.
    #[must_use]
    pub fn appointment_request(doctor_id: UserId, student_name: &str) -> Self {
        Self {
            recipient_id: doctor_id,
            kind: Self::APPOINTMENT.to_string(),
            message: format!("You have a new appointment request from {student_name}!"),
        }
    }
}
