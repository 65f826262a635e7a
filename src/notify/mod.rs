//! Post-commit side effects.
//!
//! Every subscriber runs in its own task with its own
//! [`broadcast::Receiver`](tokio::sync::broadcast::Receiver). A failing
//! subscriber logs the error and keeps consuming; it can neither block
//! nor fail the reservation that produced the event.

pub mod email;
pub mod mailer;
pub mod recorder;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::domain::{CareEvent, EventBus};
use crate::error::CareError;

pub use email::EmailNotifier;
pub use mailer::{LogMailer, Mailer, OutgoingMail};
pub use recorder::NotificationRecorder;

/// A consumer of [`CareEvent`]s.
#[async_trait]
pub trait BookingSubscriber: Send + Sync + fmt::Debug {
    /// Short name used in log fields.
    fn name(&self) -> &'static str;

    /// Handles one event. Events the subscriber does not care about are
    /// ignored with `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns the error of the side effect; the caller only logs it.
    async fn handle(&self, event: &CareEvent) -> Result<(), CareError>;
}

/// Subscribes `subscriber` to `bus` and drives it on a new task until the
/// bus closes.
///
/// The receiver is created before this function returns, so no event
/// published afterwards is missed.
pub fn spawn_subscriber(bus: &EventBus, subscriber: Arc<dyn BookingSubscriber>) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = subscriber.handle(&event).await {
                        tracing::warn!(
                            subscriber = subscriber.name(),
                            event_type = event.event_type_str(),
                            recipient = %event.recipient(),
                            error = %e,
                            "post-commit side effect failed"
                        );
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(subscriber = subscriber.name(), skipped, "subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!(subscriber = subscriber.name(), "subscriber stopped");
    })
}
