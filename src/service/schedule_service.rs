//! Schedule service: slot publishing, browsing and appointment listings.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::slot_time;
use crate::domain::{Appointment, AppointmentStatus, Slot, User, UserId};
use crate::error::CareError;
use crate::persistence::SlotStore;

/// Result of one slot publishing batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishedSlots {
    /// Distinct instants in the batch.
    pub requested: usize,
    /// Slots newly created; the rest were already published.
    pub created: u64,
}

/// Read and publish operations on doctor schedules.
#[derive(Debug, Clone)]
pub struct ScheduleService {
    store: Arc<dyn SlotStore>,
}

impl ScheduleService {
    /// Creates a new `ScheduleService`.
    #[must_use]
    pub fn new(store: Arc<dyn SlotStore>) -> Self {
        Self { store }
    }

    /// Publishes bookable slots for `doctor`.
    ///
    /// `instants` must already be normalized. Duplicates within the batch
    /// and instants already published are skipped.
    ///
    /// # Errors
    ///
    /// - [`CareError::Forbidden`] if `doctor` does not have the doctor role.
    /// - [`CareError::PastSlotRequested`] if any instant is before `now`;
    ///   nothing is stored in that case.
    /// - [`CareError::Persistence`] on datastore failure.
    pub async fn publish_slots(
        &self,
        doctor: &User,
        mut instants: Vec<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<PublishedSlots, CareError> {
        if !doctor.is_doctor() {
            return Err(CareError::Forbidden(
                "only doctors can publish slots".to_string(),
            ));
        }
        for &at in &instants {
            slot_time::ensure_not_past(at, now)?;
        }
        instants.sort_unstable();
        instants.dedup();

        let requested = instants.len();
        let created = self.store.insert_slots(doctor.id, &instants).await?;
        tracing::info!(doctor_id = %doctor.id, requested, created, "slots published");
        Ok(PublishedSlots { requested, created })
    }

    /// Returns the unbooked slots of `doctor_id` starting on `date` (UTC),
    /// in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::DoctorNotFound`] if `doctor_id` is not a
    /// doctor, or [`CareError::Persistence`] on datastore failure.
    pub async fn available_slots(
        &self,
        doctor_id: UserId,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, CareError> {
        self.require_doctor(doctor_id).await?;
        let (from, until) = slot_time::day_bounds(date)?;
        self.store.free_slots_between(doctor_id, from, until).await
    }

    /// Lists every doctor.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] on datastore failure.
    pub async fn list_doctors(&self) -> Result<Vec<User>, CareError> {
        self.store.list_doctors().await
    }

    /// Returns the appointments `student` booked, latest slot first.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] on datastore failure.
    pub async fn student_appointments(
        &self,
        student: &User,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, CareError> {
        self.store.appointments_for_student(student.id, status).await
    }

    /// Returns the appointments booked with `doctor`, latest slot first.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Forbidden`] if `doctor` does not have the
    /// doctor role, or [`CareError::Persistence`] on datastore failure.
    pub async fn doctor_appointments(
        &self,
        doctor: &User,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, CareError> {
        if !doctor.is_doctor() {
            return Err(CareError::Forbidden(
                "only doctors have a doctor schedule".to_string(),
            ));
        }
        self.store.appointments_for_doctor(doctor.id, status).await
    }

    async fn require_doctor(&self, id: UserId) -> Result<User, CareError> {
        match self.store.find_user(id).await? {
            Some(user) if user.is_doctor() => Ok(user),
            _ => Err(CareError::DoctorNotFound(id)),
        }
    }
}
