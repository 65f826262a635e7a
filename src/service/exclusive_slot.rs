//! Exclusive hold on one slot row for the lifetime of a transaction.

use chrono::{DateTime, Utc};

use crate::domain::{Slot, UserId};
use crate::error::CareError;
use crate::persistence::{SlotStore, SlotTransaction};

/// An open transaction that holds the row lock on one unbooked slot.
///
/// Obtained through [`ExclusiveSlot::acquire`] and released only through
/// [`commit`](Self::commit) or [`abort`](Self::abort). `abort` always
/// issues an explicit rollback before handing the error back, so callers
/// never leave a transaction to be cleaned up by `Drop`.
#[derive(Debug)]
pub struct ExclusiveSlot {
    tx: Box<dyn SlotTransaction>,
    slot: Slot,
}

impl ExclusiveSlot {
    /// Begins a transaction and locks the unbooked slot
    /// `(doctor_id, at)`.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::SlotUnavailable`] if no unbooked slot matches
    /// or the lock wait times out, or the datastore error that prevented
    /// the transaction from starting. The transaction is rolled back
    /// before any error is returned.
    pub async fn acquire(
        store: &dyn SlotStore,
        doctor_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Self, CareError> {
        let mut tx = store.begin().await?;
        match tx.lock_free_slot(doctor_id, at).await {
            Ok(Some(slot)) => Ok(Self { tx, slot }),
            Ok(None) => Err(rollback(tx, CareError::SlotUnavailable).await),
            Err(e) => Err(rollback(tx, e).await),
        }
    }

    /// The locked slot as read under the lock.
    #[must_use]
    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    /// The transaction holding the lock.
    pub fn tx(&mut self) -> &mut dyn SlotTransaction {
        &mut *self.tx
    }

    /// Commits the transaction and releases the lock.
    ///
    /// # Errors
    ///
    /// Returns the datastore error if the commit is rejected.
    pub async fn commit(self) -> Result<Slot, CareError> {
        let Self { tx, slot } = self;
        tx.commit().await?;
        Ok(slot)
    }

    /// Rolls the transaction back and returns `cause` to propagate.
    pub async fn abort(self, cause: CareError) -> CareError {
        rollback(self.tx, cause).await
    }
}

async fn rollback(tx: Box<dyn SlotTransaction>, cause: CareError) -> CareError {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = %e, cause = %cause, "rollback failed");
    }
    cause
}
