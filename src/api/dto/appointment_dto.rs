//! Appointment DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Appointment, AppointmentStatus, UserId};

/// Request body for `POST /appointments`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BookAppointmentRequest {
    /// Doctor to book with.
    #[schema(value_type = i64)]
    pub doctor_id: UserId,
    /// Requested slot start, ISO-8601 with an explicit offset.
    #[schema(example = "2030-05-01T09:00:00Z")]
    pub slot_date_time: String,
}

/// Response for a successful booking.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookAppointmentResponse {
    /// Confirmation text.
    pub message: String,
    /// The committed appointment.
    pub appointment: Appointment,
}

/// Optional status filter for appointment listings.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusFilter {
    /// Only return appointments in this status.
    pub status: Option<AppointmentStatus>,
}

/// Response for appointment listings.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AppointmentListResponse {
    /// Appointments, latest slot first.
    pub appointments: Vec<Appointment>,
}
