//! Domain events emitted after committed state changes.
//!
//! Every event is addressed to exactly one user. Events are broadcast
//! through the [`super::EventBus`] to the post-commit subscribers and to
//! the recipient's WebSocket connections.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Appointment, Notification, UserId};

/// Event emitted after a committed mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum CareEvent {
    /// A reservation committed; addressed to the doctor.
    AppointmentBooked {
        /// The committed appointment.
        appointment: Appointment,
        /// Display name of the booking student.
        student_name: String,
        /// Display name of the booked doctor.
        doctor_name: String,
        /// Doctor's mail address, used by the mail subscriber only.
        #[serde(skip_serializing)]
        doctor_email: String,
        /// Commit timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A notification was stored; addressed to its recipient.
    NotificationCreated {
        /// The stored notification.
        notification: Notification,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl CareEvent {
    /// Every value [`event_type_str`](Self::event_type_str) can return.
    pub const EVENT_TYPES: [&'static str; 2] = ["appointment_booked", "notification_created"];

    /// Returns the user this event is addressed to.
    #[must_use]
    pub fn recipient(&self) -> UserId {
        match self {
            Self::AppointmentBooked { appointment, .. } => appointment.doctor_id,
            Self::NotificationCreated { notification, .. } => notification.recipient_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::AppointmentBooked { .. } => "appointment_booked",
            Self::NotificationCreated { .. } => "notification_created",
        }
    }
}
