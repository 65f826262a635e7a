//! Reservation service: turns a booking request into a committed
//! appointment.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::ExclusiveSlot;
use crate::domain::slot_time;
use crate::domain::{Appointment, CareEvent, EventBus, NewAppointment, Slot, User, UserId};
use crate::error::CareError;
use crate::persistence::{SlotStore, SlotTransaction};

/// Books doctor slots for students.
///
/// Each call to [`reserve`](Self::reserve) validates the request, runs
/// the reservation in one datastore transaction through
/// [`ExclusiveSlot`], and after commit publishes
/// [`CareEvent::AppointmentBooked`] for the post-commit subscribers.
#[derive(Debug, Clone)]
pub struct ReservationService {
    store: Arc<dyn SlotStore>,
    event_bus: EventBus,
}

impl ReservationService {
    /// Creates a new `ReservationService`.
    #[must_use]
    pub fn new(store: Arc<dyn SlotStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Reserves the slot `(doctor_id, at)` for `student`.
    ///
    /// `at` must already be normalized to UTC whole seconds; `now` is the
    /// caller's clock.
    ///
    /// # Errors
    ///
    /// - [`CareError::InvalidDoctor`] if `doctor_id` is not a doctor.
    /// - [`CareError::PastSlotRequested`] if `at` is before `now`.
    /// - [`CareError::SlotUnavailable`] if the slot does not exist, is
    ///   already booked, or is locked past the lock timeout.
    /// - [`CareError::DuplicateStudentBooking`] if the student already
    ///   has an appointment at `at`.
    /// - [`CareError::Persistence`] on datastore failure.
    ///
    /// No state changes when an error is returned.
    pub async fn reserve(
        &self,
        student: &User,
        doctor_id: UserId,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Appointment, CareError> {
        let doctor = match self.store.find_user(doctor_id).await? {
            Some(user) if user.is_doctor() => user,
            _ => return Err(CareError::InvalidDoctor(doctor_id)),
        };
        slot_time::ensure_not_past(at, now)?;

        let mut hold = ExclusiveSlot::acquire(self.store.as_ref(), doctor.id, at).await?;
        let slot = hold.slot().clone();
        let appointment = match book_locked(hold.tx(), &slot, student.id).await {
            Ok(appointment) => appointment,
            Err(e) => return Err(hold.abort(e).await),
        };
        hold.commit().await?;

        tracing::info!(
            appointment_id = %appointment.id,
            student_id = %student.id,
            doctor_id = %doctor.id,
            slot_time = %appointment.slot_time,
            "appointment booked"
        );

        let receivers = self.event_bus.publish(CareEvent::AppointmentBooked {
            appointment: appointment.clone(),
            student_name: student.name.clone(),
            doctor_name: doctor.name,
            doctor_email: doctor.email,
            timestamp: Utc::now(),
        });
        tracing::debug!(receivers, "booking event published");

        Ok(appointment)
    }
}

/// Steps run while the slot row is locked.
async fn book_locked(
    tx: &mut dyn SlotTransaction,
    slot: &Slot,
    student_id: UserId,
) -> Result<Appointment, CareError> {
    if tx.student_has_appointment_at(student_id, slot.starts_at).await? {
        return Err(CareError::DuplicateStudentBooking);
    }
    tx.mark_booked(slot.id).await?;
    tx.insert_appointment(&NewAppointment {
        student_id,
        doctor_id: slot.doctor_id,
        slot_id: slot.id,
        slot_time: slot.starts_at,
    })
    .await
}
