//! Doctor-published bookable slots.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::{SlotId, UserId};

/// One offered appointment time for a doctor.
///
/// `(doctor_id, starts_at)` is unique. `is_booked` flips to `true` only
/// through a committed reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Slot {
    /// Slot identifier.
    pub id: SlotId,
    /// Publishing doctor.
    pub doctor_id: UserId,
    /// UTC start instant, whole seconds.
    pub starts_at: DateTime<Utc>,
    /// Whether an appointment holds this slot.
    pub is_booked: bool,
}
