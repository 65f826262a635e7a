//! # campus-care
//!
//! Student healthcare backend: doctors publish time slots, students book
//! them, doctors are notified in real time and by mail.
//!
//! The core is the slot reservation transaction in
//! [`service::ReservationService`]: lock the slot row, rule out double
//! booking, insert the appointment, commit, and only then hand the
//! booking to the post-commit subscribers in [`notify`].
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── ReservationService / ScheduleService / InboxService (service/)
//!     ├── EventBus (domain/) ──► NotificationRecorder, EmailNotifier (notify/)
//!     │
//!     └── SlotStore (persistence/)
//!           ├── PostgresStore (sqlx)
//!           └── MemoryStore
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod notify;
pub mod persistence;
pub mod service;
pub mod ws;
