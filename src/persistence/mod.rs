//! Persistence layer: the datastore seam and its implementations.
//!
//! [`SlotStore`] is everything the services need from the relational
//! store. Reservations go through [`SlotTransaction`], a single-connection
//! transaction that exposes row locking on slots. Two implementations
//! exist: [`postgres::PostgresStore`] on `sqlx::PgPool`, and
//! [`memory::MemoryStore`] which models the same locking contract in
//! process.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Appointment, AppointmentStatus, NewAppointment, NewNotification, Notification,
    NotificationId, Slot, SlotId, User, UserId,
};
use crate::error::CareError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// One open datastore transaction pinned to a single connection.
///
/// Dropping a transaction without calling [`commit`](Self::commit)
/// discards its writes, but callers must still call
/// [`rollback`](Self::rollback) explicitly on every error path.
#[async_trait]
pub trait SlotTransaction: Send + fmt::Debug {
    /// Locks the unbooked slot row `(doctor_id, at)` for the rest of the
    /// transaction.
    ///
    /// Returns `Ok(None)` when no unbooked row matches.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::SlotUnavailable`] if the lock wait times out,
    /// or [`CareError::Persistence`] on datastore failure.
    async fn lock_free_slot(
        &mut self,
        doctor_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<Slot>, CareError>;

    /// Returns `true` if the student holds a non-cancelled appointment at
    /// `at` with any doctor.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] on datastore failure.
    async fn student_has_appointment_at(
        &mut self,
        student_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, CareError>;

    /// Marks a slot locked by this transaction as booked.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] on datastore failure.
    async fn mark_booked(&mut self, slot_id: SlotId) -> Result<(), CareError>;

    /// Inserts the appointment row.
    ///
    /// # Errors
    ///
    /// Returns a conflict error if a uniqueness constraint rejects the
    /// row, or [`CareError::Persistence`] on datastore failure.
    async fn insert_appointment(
        &mut self,
        appointment: &NewAppointment,
    ) -> Result<Appointment, CareError>;

    /// Commits every write made through this transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit is rejected; nothing is persisted.
    async fn commit(self: Box<Self>) -> Result<(), CareError>;

    /// Discards every write made through this transaction and releases
    /// its locks.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] if the datastore reports a
    /// failure while rolling back.
    async fn rollback(self: Box<Self>) -> Result<(), CareError>;
}

/// Datastore operations used by the services.
#[async_trait]
pub trait SlotStore: Send + Sync + fmt::Debug {
    /// Looks up a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] on datastore failure.
    async fn find_user(&self, id: UserId) -> Result<Option<User>, CareError>;

    /// Lists every user with the doctor role, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] on datastore failure.
    async fn list_doctors(&self) -> Result<Vec<User>, CareError>;

    /// Opens a reservation transaction.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] if no connection is available.
    async fn begin(&self) -> Result<Box<dyn SlotTransaction>, CareError>;

    /// Inserts unbooked slots for a doctor in one transaction, skipping
    /// instants that already exist. Returns the number of new rows.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] on datastore failure; no slot
    /// from the batch is stored in that case.
    async fn insert_slots(
        &self,
        doctor_id: UserId,
        instants: &[DateTime<Utc>],
    ) -> Result<u64, CareError>;

    /// Returns a doctor's unbooked slots in `[from, until)`, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] on datastore failure.
    async fn free_slots_between(
        &self,
        doctor_id: UserId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Slot>, CareError>;

    /// Returns a student's appointments, latest slot first.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] on datastore failure.
    async fn appointments_for_student(
        &self,
        student_id: UserId,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, CareError>;

    /// Returns a doctor's appointments, latest slot first.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] on datastore failure.
    async fn appointments_for_doctor(
        &self,
        doctor_id: UserId,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, CareError>;

    /// Stores a notification.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] on datastore failure.
    async fn insert_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, CareError>;

    /// Returns a user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] on datastore failure.
    async fn notifications_for(&self, recipient_id: UserId)
    -> Result<Vec<Notification>, CareError>;

    /// Marks every unread notification of a user as read. Returns the
    /// number of rows changed.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] on datastore failure.
    async fn mark_all_read(&self, recipient_id: UserId) -> Result<u64, CareError>;

    /// Marks one notification as read if it belongs to `recipient_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] on datastore failure.
    async fn mark_read(
        &self,
        recipient_id: UserId,
        id: NotificationId,
    ) -> Result<Option<Notification>, CareError>;
}
