//! PostgreSQL implementation of the persistence layer.
//!
//! Reservation transactions lock slot rows with `SELECT ... FOR UPDATE`
//! under a transaction-scoped `lock_timeout`. A timed-out lock wait
//! (SQLSTATE `55P03`) surfaces as [`CareError::SlotUnavailable`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};

use super::models::{AppointmentRow, NotificationRow, SlotRow, UserRow, convert_all};
use super::{SlotStore, SlotTransaction};
use crate::config::CareConfig;
use crate::domain::{
    Appointment, AppointmentStatus, NewAppointment, NewNotification, Notification,
    NotificationId, Slot, SlotId, User, UserId,
};
use crate::error::CareError;

/// SQLSTATE raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";
/// SQLSTATE raised on a unique constraint violation.
const UNIQUE_VIOLATION: &str = "23505";

/// Partial unique index: one live appointment per slot.
const ACTIVE_SLOT_INDEX: &str = "appointments_active_slot_key";
/// Partial unique index: one live appointment per student and instant.
const ACTIVE_STUDENT_TIME_INDEX: &str = "appointments_active_student_time_key";

const APPOINTMENT_COLUMNS: &str =
    "id, student_id, doctor_id, slot_id, slot_time, status, created_at";
const NOTIFICATION_COLUMNS: &str = "id, recipient_id, kind, message, is_read, created_at";

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresStore {
    /// Creates a store over an existing pool.
    #[must_use]
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    /// Connects a pool sized from the configuration and applies the
    /// embedded migrations.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Persistence`] if the connection or a migration
    /// fails.
    pub async fn connect(config: &CareConfig) -> Result<Self, CareError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| CareError::Persistence(format!("migration failed: {e}")))?;

        tracing::info!(
            max_connections = config.database_max_connections,
            "connected to postgres"
        );
        Ok(Self::new(pool, config.lock_timeout()))
    }
}

/// Maps a datastore error raised while waiting for a row lock.
fn map_lock_error(err: sqlx::Error) -> CareError {
    if let sqlx::Error::Database(db) = &err
        && db.code().as_deref() == Some(LOCK_NOT_AVAILABLE)
    {
        tracing::debug!("slot lock wait timed out");
        return CareError::SlotUnavailable;
    }
    CareError::from(err)
}

/// Maps a unique violation on `appointments` to the matching conflict.
fn map_appointment_insert_error(err: sqlx::Error) -> CareError {
    if let sqlx::Error::Database(db) = &err
        && db.code().as_deref() == Some(UNIQUE_VIOLATION)
    {
        return match db.constraint() {
            Some(ACTIVE_STUDENT_TIME_INDEX) => CareError::DuplicateStudentBooking,
            Some(ACTIVE_SLOT_INDEX) => CareError::SlotUnavailable,
            _ => CareError::from(err),
        };
    }
    CareError::from(err)
}

/// An open reservation transaction on one pooled connection.
pub struct PgSlotTransaction {
    tx: Transaction<'static, Postgres>,
}

impl fmt::Debug for PgSlotTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgSlotTransaction").finish_non_exhaustive()
    }
}

#[async_trait]
impl SlotTransaction for PgSlotTransaction {
    async fn lock_free_slot(
        &mut self,
        doctor_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<Slot>, CareError> {
        let row = sqlx::query_as::<_, SlotRow>(
            "SELECT id, doctor_id, starts_at, is_booked FROM slots \
             WHERE doctor_id = $1 AND starts_at = $2 AND is_booked = FALSE \
             FOR UPDATE",
        )
        .bind(doctor_id)
        .bind(at)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_lock_error)?;

        Ok(row.map(Slot::from))
    }

    async fn student_has_appointment_at(
        &mut self,
        student_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<bool, CareError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM appointments \
             WHERE student_id = $1 AND slot_time = $2 AND status <> 'cancelled')",
        )
        .bind(student_id)
        .bind(at)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(exists)
    }

    async fn mark_booked(&mut self, slot_id: SlotId) -> Result<(), CareError> {
        let result = sqlx::query("UPDATE slots SET is_booked = TRUE WHERE id = $1")
            .bind(slot_id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() != 1 {
            return Err(CareError::Internal(format!("slot {slot_id} vanished under lock")));
        }
        Ok(())
    }

    async fn insert_appointment(
        &mut self,
        appointment: &NewAppointment,
    ) -> Result<Appointment, CareError> {
        let row = sqlx::query_as::<_, AppointmentRow>(&format!(
            "INSERT INTO appointments (student_id, doctor_id, slot_id, slot_time, status) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {APPOINTMENT_COLUMNS}"
        ))
        .bind(appointment.student_id)
        .bind(appointment.doctor_id)
        .bind(appointment.slot_id)
        .bind(appointment.slot_time)
        .bind(AppointmentStatus::Pending.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_appointment_insert_error)?;

        Appointment::try_from(row)
    }

    async fn commit(self: Box<Self>) -> Result<(), CareError> {
        let Self { tx } = *self;
        tx.commit().await.map_err(map_appointment_insert_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), CareError> {
        let Self { tx } = *self;
        tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl SlotStore for PostgresStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, CareError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, role FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn list_doctors(&self) -> Result<Vec<User>, CareError> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, role FROM users WHERE role = 'doctor' ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn begin(&self) -> Result<Box<dyn SlotTransaction>, CareError> {
        let mut tx = self.pool.begin().await?;

        // set_config(.., true) is transaction-local, like SET LOCAL.
        let applied = sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await;
        if let Err(e) = applied {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "rollback after lock_timeout failure failed");
            }
            return Err(e.into());
        }

        Ok(Box::new(PgSlotTransaction { tx }))
    }

    async fn insert_slots(
        &self,
        doctor_id: UserId,
        instants: &[DateTime<Utc>],
    ) -> Result<u64, CareError> {
        let mut tx = self.pool.begin().await?;
        let mut created = 0;

        for at in instants {
            let result = sqlx::query(
                "INSERT INTO slots (doctor_id, starts_at, is_booked) VALUES ($1, $2, FALSE) \
                 ON CONFLICT (doctor_id, starts_at) DO NOTHING",
            )
            .bind(doctor_id)
            .bind(at)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(done) => created += done.rows_affected(),
                Err(e) => {
                    tx.rollback().await?;
                    return Err(e.into());
                }
            }
        }

        tx.commit().await?;
        Ok(created)
    }

    async fn free_slots_between(
        &self,
        doctor_id: UserId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Slot>, CareError> {
        let rows = sqlx::query_as::<_, SlotRow>(
            "SELECT id, doctor_id, starts_at, is_booked FROM slots \
             WHERE doctor_id = $1 AND is_booked = FALSE AND starts_at >= $2 AND starts_at < $3 \
             ORDER BY starts_at ASC",
        )
        .bind(doctor_id)
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Slot::from).collect())
    }

    async fn appointments_for_student(
        &self,
        student_id: UserId,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, CareError> {
        let rows = sqlx::query_as::<_, AppointmentRow>(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
             WHERE student_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY slot_time DESC, id DESC"
        ))
        .bind(student_id)
        .bind(status.map(AppointmentStatus::as_str))
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn appointments_for_doctor(
        &self,
        doctor_id: UserId,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<Appointment>, CareError> {
        let rows = sqlx::query_as::<_, AppointmentRow>(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
             WHERE doctor_id = $1 AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY slot_time DESC, id DESC"
        ))
        .bind(doctor_id)
        .bind(status.map(AppointmentStatus::as_str))
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn insert_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, CareError> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "INSERT INTO notifications (recipient_id, kind, message) \
             VALUES ($1, $2, $3) RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(notification.recipient_id)
        .bind(&notification.kind)
        .bind(&notification.message)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn notifications_for(
        &self,
        recipient_id: UserId,
    ) -> Result<Vec<Notification>, CareError> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE recipient_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn mark_all_read(&self, recipient_id: UserId) -> Result<u64, CareError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE recipient_id = $1 AND is_read = FALSE",
        )
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn mark_read(
        &self,
        recipient_id: UserId,
        id: NotificationId,
    ) -> Result<Option<Notification>, CareError> {
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "UPDATE notifications SET is_read = TRUE \
             WHERE id = $1 AND recipient_id = $2 RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(id)
        .bind(recipient_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Notification::from))
    }
}
