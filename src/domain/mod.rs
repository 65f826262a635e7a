//! Domain layer: identifiers, entities, instants and the event system.
//!
//! This module contains the server-side model of users, slots,
//! appointments and notifications, the boundary normalization of slot
//! instants, and the event bus that carries post-commit events.

pub mod appointment;
pub mod care_event;
pub mod event_bus;
pub mod ids;
pub mod notification;
pub mod slot;
pub mod slot_time;
pub mod user;

pub use appointment::{Appointment, AppointmentStatus, NewAppointment};
pub use care_event::CareEvent;
pub use event_bus::EventBus;
pub use ids::{AppointmentId, NotificationId, SlotId, UserId};
pub use notification::{NewNotification, Notification};
pub use slot::Slot;
pub use user::{Role, User};
