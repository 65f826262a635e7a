//! Data Transfer Objects for REST request/response serialization.
//!
//! Instants travel as ISO-8601 strings and are normalized to UTC whole
//! seconds in the handlers before reaching a service.

pub mod appointment_dto;
pub mod notification_dto;
pub mod slot_dto;

pub use appointment_dto::*;
pub use notification_dto::*;
pub use slot_dto::*;
