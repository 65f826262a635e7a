//! Service layer: business logic orchestration.
//!
//! [`ReservationService`] runs the slot reservation transaction and emits
//! post-commit events through the [`super::domain::EventBus`].
//! [`ScheduleService`] and [`InboxService`] cover the surrounding read and
//! publish operations.

pub mod exclusive_slot;
pub mod inbox_service;
pub mod reservation_service;
pub mod schedule_service;

pub use exclusive_slot::ExclusiveSlot;
pub use inbox_service::InboxService;
pub use reservation_service::ReservationService;
pub use schedule_service::{PublishedSlots, ScheduleService};
