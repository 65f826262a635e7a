//! Stores the doctor's in-app notification for each booking.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::BookingSubscriber;
use crate::domain::{CareEvent, EventBus, NewNotification};
use crate::error::CareError;
use crate::persistence::SlotStore;

/// Persists a notification per booking and announces it on the bus as
/// [`CareEvent::NotificationCreated`].
#[derive(Debug, Clone)]
pub struct NotificationRecorder {
    store: Arc<dyn SlotStore>,
    event_bus: EventBus,
}

impl NotificationRecorder {
    /// Creates a new `NotificationRecorder`.
    #[must_use]
    pub fn new(store: Arc<dyn SlotStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }
}

#[async_trait]
impl BookingSubscriber for NotificationRecorder {
    fn name(&self) -> &'static str {
        "notification_recorder"
    }

    async fn handle(&self, event: &CareEvent) -> Result<(), CareError> {
        let CareEvent::AppointmentBooked {
            appointment,
            student_name,
            ..
        } = event
        else {
            return Ok(());
        };

        let notification = self
            .store
            .insert_notification(&NewNotification::appointment_request(
                appointment.doctor_id,
                student_name,
            ))
            .await?;
        tracing::debug!(
            notification_id = %notification.id,
            recipient = %notification.recipient_id,
            "notification stored"
        );

        self.event_bus.publish(CareEvent::NotificationCreated {
            notification,
            timestamp: Utc::now(),
        });
        Ok(())
    }
}
