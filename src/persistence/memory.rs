//! In-process implementation of the persistence layer.
//!
//! [`MemoryStore`] keeps every table behind one [`RwLock`] and models
//! PostgreSQL's row locks with one [`tokio::sync::Mutex`] per slot.
//! A [`MemoryTransaction`] stages its writes and applies them in a single
//! critical section on commit, so readers never observe a half-applied
//! reservation. Used by the test suites and by runs with persistence
//! disabled.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::{SlotStore, SlotTransaction};
use crate::domain::{
    Appointment, AppointmentId, AppointmentStatus, NewAppointment, NewNotification, Notification,
    NotificationId, Role, Slot, SlotId, User, UserId,
};
use crate::error::CareError;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    slots: BTreeMap<SlotId, Slot>,
    appointments: Vec<Appointment>,
    notifications: Vec<Notification>,
}

impl Tables {
    fn slot_id_at(&self, doctor_id: UserId, at: DateTime<Utc>) -> Option<SlotId> {
        self.slots
            .values()
            .find(|s| s.doctor_id == doctor_id && s.starts_at == at)
            .map(|s| s.id)
    }

    fn live_appointments(&self) -> impl Iterator<Item = &Appointment> {
        self.appointments
            .iter()
            .filter(|a| a.status != AppointmentStatus::Cancelled)
    }
}

#[derive(Debug)]
struct Shared {
    tables: RwLock<Tables>,
    row_locks: Mutex<HashMap<SlotId, Arc<Mutex<()>>>>,
    sequence: AtomicI64,
    lock_timeout: Duration,
    fail_appointment_inserts: AtomicBool,
    transactions_started: AtomicU64,
    transactions_committed: AtomicU64,
    transactions_rolled_back: AtomicU64,
}

impl Shared {
    fn next_id(&self) -> i64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    async fn row_lock(&self, slot_id: SlotId) -> Arc<Mutex<()>> {
        let mut locks = self.row_locks.lock().await;
        Arc::clone(locks.entry(slot_id).or_default())
    }
}

/// In-memory store with per-slot row locks.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// Creates an empty store whose row-lock waits give up after
    /// `lock_timeout`.
    #[must_use]
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: RwLock::new(Tables::default()),
                row_locks: Mutex::new(HashMap::new()),
                sequence: AtomicI64::new(0),
                lock_timeout,
                fail_appointment_inserts: AtomicBool::new(false),
                transactions_started: AtomicU64::new(0),
                transactions_committed: AtomicU64::new(0),
                transactions_rolled_back: AtomicU64::new(0),
            }),
        }
    }

    /// Adds an account. Accounts are provisioned outside the booking
    /// core, so this exists for seeding only.
    pub async fn insert_user(&self, name: &str, email: &str, role: Role) -> User {
        let user = User {
            id: UserId::new(self.shared.next_id()),
            name: name.to_string(),
            email: email.to_string(),
            role,
        };
        self.shared
            .tables
            .write()
            .await
            .users
            .insert(user.id, user.clone());
        user
    }

    /// Seeds the accounts used by local runs without a database.
    pub async fn seed_demo(&self) -> Vec<User> {
        let accounts = [
            ("Dr. Meera Rao", "meera.rao@campus.test", Role::Doctor),
            ("Dr. Tomas Lind", "tomas.lind@campus.test", Role::Doctor),
            ("Asha Patel", "asha.patel@campus.test", Role::Student),
            ("Ben Okafor", "ben.okafor@campus.test", Role::Student),
            ("Clinic Admin", "admin@campus.test", Role::Admin),
        ];
        let mut users = Vec::with_capacity(accounts.len());
        for (name, email, role) in accounts {
            users.push(self.insert_user(name, email, role).await);
        }
        users
    }

    /// Makes every subsequent appointment insert fail with a persistence
    /// error until switched off again.
    pub fn fail_appointment_inserts(&self, fail: bool) {
        self.shared
            .fail_appointment_inserts
            .store(fail, Ordering::SeqCst);
    }

    /// Number of reservation transactions opened so far.
    #[must_use]
    pub fn transactions_started(&self) -> u64 {
        self.shared.transactions_started.load(Ordering::SeqCst)
    }

    /// Number of reservation transactions committed so far.
    #[must_use]
    pub fn transactions_committed(&self) -> u64 {
        self.shared.transactions_committed.load(Ordering::SeqCst)
    }

    /// Number of reservation transactions explicitly rolled back so far.
    /// Transactions dropped without a rollback call are not counted.
    #[must_use]
    pub fn transactions_rolled_back(&self) -> u64 {
        self.shared.transactions_rolled_back.load(Ordering::SeqCst)
    }

    /// Returns the committed slot `(doctor_id, at)`, booked or not.
    pub async fn slot_at(&self, doctor_id: UserId, at: DateTime<Utc>) -> Option<Slot> {
        let tables = self.shared.tables.read().await;
        tables
            .slot_id_at(doctor_id, at)
            .and_then(|id| tables.slots.get(&id).cloned())
    }

    /// Returns every committed appointment in insertion order.
    pub async fn all_appointments(&self) -> Vec<Appointment> {
        self.shared.tables.read().await.appointments.clone()
    }
}

/// Reservation transaction over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryTransaction {
    shared: Arc<Shared>,
    held: Option<(SlotId, OwnedMutexGuard<()>)>,
    staged_booking: Option<SlotId>,
    staged_appointment: Option<Appointment>,
}

impl MemoryTransaction {
    fn holds(&self, slot_id: SlotId) -> bool {
        matches!(&self.held, Some((held, _)) if *held == slot_id)
    }
}

#[async_trait]
impl SlotTransaction for MemoryTransaction {
    async fn lock_free_slot(
        &mut self,
        doctor_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<Slot>, CareError> {
        if self.held.is_some() {
            return Err(CareError::Internal(
                "transaction already holds a slot lock".to_string(),
            ));
        }

        let Some(slot_id) = self.shared.tables.read().await.slot_id_at(doctor_id, at) else {
            return Ok(None);
        };

        let row = self.shared.row_lock(slot_id).await;
        let guard = tokio::time::timeout(self.shared.lock_timeout, row.lock_owned())
            .await
            .map_err(|_| {
                tracing::debug!(%slot_id, "slot lock wait timed out");
                CareError::SlotUnavailable
            })?;

        // Re-read under the lock: a previous holder may have booked it.
        let tables = self.shared.tables.read().await;
        match tables.slots.get(&slot_id) {
            Some(slot) if !slot.is_booked => {
                let slot = slot.clone();
                drop(tables);
                self.held = Some((slot_id, guard));
                Ok(Some(slot))
            }
            _ => Ok(None),
        }
    }

    async fn student_has_appointment_at(
        &mut self,
        student_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, CareError> {
        let staged = self
            .staged_appointment
            .as_ref()
            .is_some_and(|a| a.student_id == student_id && a.slot_time == at);
        let tables = self.shared.tables.read().await;
        let committed = tables
            .live_appointments()
            .any(|a| a.student_id == student_id && a.slot_time == at);
        Ok(staged || committed)
    }

    async fn mark_booked(&mut self, slot_id: SlotId) -> Result<(), CareError> {
        if !self.holds(slot_id) {
            return Err(CareError::Internal(format!(
                "slot {slot_id} is not locked by this transaction"
            )));
        }
        self.staged_booking = Some(slot_id);
        Ok(())
    }

    async fn insert_appointment(
        &mut self,
        appointment: &NewAppointment,
    ) -> Result<Appointment, CareError> {
        if self.shared.fail_appointment_inserts.load(Ordering::SeqCst) {
            return Err(CareError::Persistence(
                "appointment insert rejected by fault injection".to_string(),
            ));
        }
        let created = Appointment {
            id: AppointmentId::new(self.shared.next_id()),
            student_id: appointment.student_id,
            doctor_id: appointment.doctor_id,
            slot_id: appointment.slot_id,
            slot_time: appointment.slot_time,
            status: AppointmentStatus::Pending,
            created_at: Utc::now(),
        };
        self.staged_appointment = Some(created.clone());
        Ok(created)
    }

    async fn commit(self: Box<Self>) -> Result<(), CareError> {
        let Self {
            shared,
            held,
            staged_booking,
            staged_appointment,
        } = *self;

        let mut tables = shared.tables.write().await;

        // Same checks as the partial unique indexes in the SQL schema.
        if let Some(new) = &staged_appointment {
            if tables.live_appointments().any(|a| a.slot_id == new.slot_id) {
                return Err(CareError::SlotUnavailable);
            }
            if tables
                .live_appointments()
                .any(|a| a.student_id == new.student_id && a.slot_time == new.slot_time)
            {
                return Err(CareError::DuplicateStudentBooking);
            }
        }
        if let Some(slot_id) = staged_booking
            && !tables.slots.contains_key(&slot_id)
        {
            return Err(CareError::Internal(format!("slot {slot_id} vanished under lock")));
        }

        if let Some(slot_id) = staged_booking
            && let Some(slot) = tables.slots.get_mut(&slot_id)
        {
            slot.is_booked = true;
        }
        if let Some(new) = staged_appointment {
            tables.appointments.push(new);
        }
        drop(tables);
        drop(held);
        shared.transactions_committed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), CareError> {
        self.shared
            .transactions_rolled_back
            .fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl SlotStore for MemoryStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, CareError> {
        Ok(self.shared.tables.read().await.users.get(&id).cloned())
    }

    async fn list_doctors(&self) -> Result<Vec<User>, CareError> {
        let tables = self.shared.tables.read().await;
        let mut doctors: Vec<User> = tables
            .users
            .values()
            .filter(|u| u.is_doctor())
            .cloned()
            .collect();
        doctors.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(doctors)
    }

    async fn begin(&self) -> Result<Box<dyn SlotTransaction>, CareError> {
        self.shared
            .transactions_started
            .fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.shared),
            held: None,
            staged_booking: None,
            staged_appointment: None,
        }))
    }

    async fn insert_slots(
        &self,
        doctor_id: UserId,
        instants: &[DateTime<Utc>],
    ) -> Result<u64, CareError> {
        let mut tables = self.shared.tables.write().await;
        let mut created = 0;
        for &at in instants {
            if tables.slot_id_at(doctor_id, at).is_some() {
                continue;
            }
            let id = SlotId::new(self.shared.next_id());
            tables.slots.insert(
                id,
                Slot {
                    id,
                    doctor_id,
                    starts_at: at,
                    is_booked: false,
                },
            );
            created += 1;
        }
        Ok(created)
    }

    async fn free_slots_between(
        &self,
        doctor_id: UserId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Slot>, CareError> {
        let tables = self.shared.tables.read().await;
        let mut slots: Vec<Slot> = tables
            .slots
            .values()
            .filter(|s| {
                s.doctor_id == doctor_id && !s.is_booked && s.starts_at >= from && s.starts_at < until
            })
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.starts_at);
        Ok(slots)
    }

    async fn appointments_for_student(
        &self,
        student_id: UserId,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, CareError> {
        let tables = self.shared.tables.read().await;
        Ok(latest_first(
            tables
                .appointments
                .iter()
                .filter(|a| a.student_id == student_id && status.is_none_or(|s| a.status == s)),
        ))
    }

    async fn appointments_for_doctor(
        &self,
        doctor_id: UserId,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, CareError> {
        let tables = self.shared.tables.read().await;
        Ok(latest_first(
            tables
                .appointments
                .iter()
                .filter(|a| a.doctor_id == doctor_id && status.is_none_or(|s| a.status == s)),
        ))
    }

    async fn insert_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, CareError> {
        let stored = Notification {
            id: NotificationId::new(self.shared.next_id()),
            recipient_id: notification.recipient_id,
            kind: notification.kind.clone(),
            message: notification.message.clone(),
            is_read: false,
            created_at: Utc::now(),
        };
        self.shared
            .tables
            .write()
            .await
            .notifications
            .push(stored.clone());
        Ok(stored)
    }

    async fn notifications_for(
        &self,
        recipient_id: UserId,
    ) -> Result<Vec<Notification>, CareError> {
        let tables = self.shared.tables.read().await;
        let mut found: Vec<Notification> = tables
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }

    async fn mark_all_read(&self, recipient_id: UserId) -> Result<u64, CareError> {
        let mut tables = self.shared.tables.write().await;
        let mut changed = 0;
        for n in tables
            .notifications
            .iter_mut()
            .filter(|n| n.recipient_id == recipient_id && !n.is_read)
        {
            n.is_read = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn mark_read(
        &self,
        recipient_id: UserId,
        id: NotificationId,
    ) -> Result<Option<Notification>, CareError> {
        let mut tables = self.shared.tables.write().await;
        Ok(tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.recipient_id == recipient_id)
            .map(|n| {
                n.is_read = true;
                n.clone()
            }))
    }
}

fn latest_first<'a>(appointments: impl Iterator<Item = &'a Appointment>) -> Vec<Appointment> {
    let mut found: Vec<Appointment> = appointments.cloned().collect();
    found.sort_by(|a, b| b.slot_time.cmp(&a.slot_time).then(b.id.cmp(&a.id)));
    found
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, SubsecRound};

    async fn seeded() -> (MemoryStore, User, DateTime<Utc>) {
        let store = MemoryStore::new(Duration::from_millis(50));
        let doctor = store
            .insert_user("Dr. Rao", "rao@campus.test", Role::Doctor)
            .await;
        let at = (Utc::now() + ChronoDuration::days(2)).trunc_subsecs(0);
        let Ok(1) = store.insert_slots(doctor.id, &[at]).await else {
            panic!("slot insert failed");
        };
        (store, doctor, at)
    }

    #[tokio::test]
    async fn second_locker_times_out_while_first_holds() {
        let (store, doctor, at) = seeded().await;
        let Ok(mut first) = store.begin().await else {
            panic!("begin failed");
        };
        let Ok(Some(_)) = first.lock_free_slot(doctor.id, at).await else {
            panic!("first lock failed");
        };

        let Ok(mut second) = store.begin().await else {
            panic!("begin failed");
        };
        let result = second.lock_free_slot(doctor.id, at).await;
        assert!(matches!(result, Err(CareError::SlotUnavailable)));
    }

    #[tokio::test]
    async fn rollback_releases_lock_and_discards_writes() {
        let (store, doctor, at) = seeded().await;
        let Ok(mut tx) = store.begin().await else {
            panic!("begin failed");
        };
        let Ok(Some(slot)) = tx.lock_free_slot(doctor.id, at).await else {
            panic!("lock failed");
        };
        assert!(tx.mark_booked(slot.id).await.is_ok());
        assert!(tx.rollback().await.is_ok());

        let Some(slot) = store.slot_at(doctor.id, at).await else {
            panic!("slot missing");
        };
        assert!(!slot.is_booked);

        let Ok(mut again) = store.begin().await else {
            panic!("begin failed");
        };
        assert!(matches!(again.lock_free_slot(doctor.id, at).await, Ok(Some(_))));
    }

    #[tokio::test]
    async fn waiter_sees_booked_row_after_holder_commits() {
        let (store, doctor, at) = seeded().await;
        let Ok(mut tx) = store.begin().await else {
            panic!("begin failed");
        };
        let Ok(Some(slot)) = tx.lock_free_slot(doctor.id, at).await else {
            panic!("lock failed");
        };
        assert!(tx.mark_booked(slot.id).await.is_ok());
        assert!(tx.commit().await.is_ok());

        let Ok(mut late) = store.begin().await else {
            panic!("begin failed");
        };
        assert!(matches!(late.lock_free_slot(doctor.id, at).await, Ok(None)));
    }

    #[tokio::test]
    async fn mark_booked_requires_the_lock() {
        let (store, _, _) = seeded().await;
        let Ok(mut tx) = store.begin().await else {
            panic!("begin failed");
        };
        let result = tx.mark_booked(SlotId::new(999)).await;
        assert!(matches!(result, Err(CareError::Internal(_))));
    }

    #[tokio::test]
    async fn insert_slots_skips_existing_instants() {
        let (store, doctor, at) = seeded().await;
        let later = at + ChronoDuration::hours(1);
        let Ok(created) = store.insert_slots(doctor.id, &[at, later, later]).await else {
            panic!("insert failed");
        };
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn mark_read_checks_ownership() {
        let store = MemoryStore::new(Duration::from_millis(50));
        let Ok(stored) = store
            .insert_notification(&NewNotification::appointment_request(UserId::new(1), "Asha"))
            .await
        else {
            panic!("insert failed");
        };

        let Ok(None) = store.mark_read(UserId::new(2), stored.id).await else {
            panic!("foreign notification must not be marked");
        };
        let Ok(Some(marked)) = store.mark_read(UserId::new(1), stored.id).await else {
            panic!("own notification must be marked");
        };
        assert!(marked.is_read);
        assert_eq!(store.mark_all_read(UserId::new(1)).await.ok(), Some(0));
    }
}
