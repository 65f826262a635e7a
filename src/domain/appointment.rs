//! Appointments created by the reservation transaction.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{AppointmentId, SlotId, UserId};

/// Lifecycle state of an appointment.
///
/// Reservations always create `Pending`; the other transitions belong to
/// the appointment-management side of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Requested by the student, awaiting the doctor.
    Pending,
    /// Accepted by the doctor.
    Confirmed,
    /// Cancelled; the slot is released.
    Cancelled,
    /// Postponed by the doctor.
    Delayed,
}

impl AppointmentStatus {
    /// Returns the lowercase name stored in `appointments.status`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Delayed => "delayed",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "delayed" => Ok(Self::Delayed),
            other => Err(format!("unknown appointment status: {other}")),
        }
    }
}

/// A committed appointment.
///
/// Holds the reserved slot's id so that "one appointment per slot" is a
/// uniqueness constraint rather than a convention, plus a copy of the
/// slot's instant for the per-student duplicate check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Appointment {
    /// Appointment identifier.
    pub id: AppointmentId,
    /// Booking student.
    pub student_id: UserId,
    /// Booked doctor.
    pub doctor_id: UserId,
    /// Reserved slot.
    pub slot_id: SlotId,
    /// Start instant of the reserved slot.
    pub slot_time: DateTime<Utc>,
    /// Current status.
    pub status: AppointmentStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAppointment {
    /// Booking student.
    pub student_id: UserId,
    /// Booked doctor.
    pub doctor_id: UserId,
    /// Reserved slot.
    pub slot_id: SlotId,
    /// Start instant of the reserved slot.
    pub slot_time: DateTime<Utc>,
}
