//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::domain::EventBus;
use crate::notify::{self, BookingSubscriber, EmailNotifier, Mailer, NotificationRecorder};
use crate::persistence::SlotStore;
use crate::service::{InboxService, ReservationService, ScheduleService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Datastore, used directly for caller lookup.
    pub store: Arc<dyn SlotStore>,
    /// Slot reservation transaction.
    pub reservations: ReservationService,
    /// Slot publishing, availability and appointment listings.
    pub schedule: ScheduleService,
    /// Notification inbox.
    pub inbox: InboxService,
    /// Event bus for post-commit subscribers and WebSocket connections.
    pub event_bus: EventBus,
}

impl AppState {
    /// Wires every service onto `store` and `event_bus`.
    #[must_use]
    pub fn new(store: Arc<dyn SlotStore>, event_bus: EventBus) -> Self {
        Self {
            reservations: ReservationService::new(Arc::clone(&store), event_bus.clone()),
            schedule: ScheduleService::new(Arc::clone(&store)),
            inbox: InboxService::new(Arc::clone(&store)),
            store,
            event_bus,
        }
    }

    /// Starts the post-commit subscribers: the notification recorder and
    /// the email notifier backed by `mailer`.
    pub fn spawn_subscribers(&self, mailer: Arc<dyn Mailer>) -> Vec<JoinHandle<()>> {
        let subscribers: [Arc<dyn BookingSubscriber>; 2] = [
            Arc::new(NotificationRecorder::new(
                Arc::clone(&self.store),
                self.event_bus.clone(),
            )),
            Arc::new(EmailNotifier::new(mailer)),
        ];
        subscribers
            .into_iter()
            .map(|subscriber| notify::spawn_subscriber(&self.event_bus, subscriber))
            .collect()
    }
}
