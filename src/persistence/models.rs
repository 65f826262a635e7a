//! Row types read from PostgreSQL and their conversion to domain types.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::domain::{
    Appointment, AppointmentId, Notification, NotificationId, Slot, SlotId, User, UserId,
};
use crate::error::CareError;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    /// Primary key.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Role name (`student`, `doctor`, `admin`).
    pub role: String,
}

/// A row from the `slots` table.
#[derive(Debug, Clone, FromRow)]
pub struct SlotRow {
    /// Primary key.
    pub id: i64,
    /// Publishing doctor.
    pub doctor_id: i64,
    /// UTC start instant.
    pub starts_at: DateTime<Utc>,
    /// Booking flag.
    pub is_booked: bool,
}

/// A row from the `appointments` table.
#[derive(Debug, Clone, FromRow)]
pub struct AppointmentRow {
    /// Primary key.
    pub id: i64,
    /// Booking student.
    pub student_id: i64,
    /// Booked doctor.
    pub doctor_id: i64,
    /// Reserved slot.
    pub slot_id: i64,
    /// Copy of the slot instant.
    pub slot_time: DateTime<Utc>,
    /// Status name.
    pub status: String,
    /// Insert timestamp.
    pub created_at: DateTime<Utc>,
}

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    /// Primary key.
    pub id: i64,
    /// Addressee.
    pub recipient_id: i64,
    /// Kind tag.
    pub kind: String,
    /// Display text.
    pub message: String,
    /// Read flag.
    pub is_read: bool,
    /// Insert timestamp.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = CareError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::new(row.id),
            name: row.name,
            email: row.email,
            role: row.role.parse().map_err(CareError::Persistence)?,
        })
    }
}

impl From<SlotRow> for Slot {
    fn from(row: SlotRow) -> Self {
        Self {
            id: SlotId::new(row.id),
            doctor_id: UserId::new(row.doctor_id),
            starts_at: row.starts_at,
            is_booked: row.is_booked,
        }
    }
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = CareError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AppointmentId::new(row.id),
            student_id: UserId::new(row.student_id),
            doctor_id: UserId::new(row.doctor_id),
            slot_id: SlotId::new(row.slot_id),
            slot_time: row.slot_time,
            status: row.status.parse().map_err(CareError::Persistence)?,
            created_at: row.created_at,
        })
    }
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: NotificationId::new(row.id),
            recipient_id: UserId::new(row.recipient_id),
            kind: row.kind,
            message: row.message,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

/// Converts a batch of fallible rows, failing on the first bad row.
///
/// # Errors
///
/// Returns the first conversion error.
pub fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, CareError>
where
    T: TryFrom<R, Error = CareError>,
{
    rows.into_iter().map(T::try_from).collect()
}
