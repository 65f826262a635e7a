//! Emails the doctor about each booking.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{BookingSubscriber, Mailer, OutgoingMail};
use crate::domain::CareEvent;
use crate::error::CareError;

/// Renders a booking-request mail and hands it to a [`Mailer`].
#[derive(Debug, Clone)]
pub struct EmailNotifier {
    mailer: Arc<dyn Mailer>,
}

impl EmailNotifier {
    /// Creates a new `EmailNotifier`.
    #[must_use]
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }
}

/// Renders the doctor-facing mail for a new booking.
#[must_use]
pub fn booking_request_mail(
    doctor_email: &str,
    student_name: &str,
    slot_time: DateTime<Utc>,
) -> OutgoingMail {
    let when = slot_time.format("%Y-%m-%d %H:%M UTC");
    OutgoingMail {
        to: doctor_email.to_string(),
        subject: "New Appointment Request".to_string(),
        text: format!("You have a new appointment request from {student_name} on {when}."),
        html: format!(
            "<h3>New Appointment Request</h3>\n\
             <p><strong>Student:</strong> {student_name}</p>\n\
             <p><strong>Date &amp; Time:</strong> {when}</p>\n\
             <p>Please log in to your dashboard to confirm or cancel this appointment.</p>"
        ),
    }
}

#[async_trait]
impl BookingSubscriber for EmailNotifier {
    fn name(&self) -> &'static str {
        "email_notifier"
    }

    async fn handle(&self, event: &CareEvent) -> Result<(), CareError> {
        let CareEvent::AppointmentBooked {
            appointment,
            student_name,
            doctor_email,
            ..
        } = event
        else {
            return Ok(());
        };
        let mail = booking_request_mail(doctor_email, student_name, appointment.slot_time);
        self.mailer.send(&mail).await
    }
}
