//! Outbound mail seam.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::CareError;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub text: String,
    /// HTML body.
    pub html: String,
}

/// Delivers rendered mail.
#[async_trait]
pub trait Mailer: Send + Sync + fmt::Debug {
    /// Sends one message.
    ///
    /// # Errors
    ///
    /// Returns [`CareError::Internal`] if the message could not be handed
    /// to the transport.
    async fn send(&self, mail: &OutgoingMail) -> Result<(), CareError>;
}

/// Mailer that writes each message to the log instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), CareError> {
        tracing::info!(to = %mail.to, subject = %mail.subject, body = %mail.text, "mail");
        Ok(())
    }
}
