//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` pushes every event addressed to the
//! authenticated caller: `appointment_booked` to the doctor of a new
//! booking and `notification_created` to the recipient of a stored
//! notification.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
