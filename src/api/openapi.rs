//! OpenAPI document assembled from the handler annotations.

use utoipa::OpenApi;

use crate::api::dto::{
    AppointmentListResponse, AvailableSlotsResponse, BookAppointmentRequest,
    BookAppointmentResponse, DoctorDto, DoctorListResponse, MarkAllReadResponse,
    NotificationListResponse, PublishSlotsRequest, PublishSlotsResponse,
};
use crate::api::handlers::{appointment, notification, schedule, system};
use crate::domain::{Appointment, AppointmentStatus, Notification, Slot};
use crate::error::{ErrorBody, ErrorResponse};

/// The service's OpenAPI document.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "campus-care",
        description = "Student healthcare backend: doctor slots, appointment booking and notifications."
    ),
    paths(
        system::health_handler,
        schedule::list_doctors,
        schedule::available_slots,
        schedule::publish_slots,
        appointment::book_appointment,
        appointment::my_appointments,
        appointment::doctor_appointments,
        notification::list_notifications,
        notification::mark_all_read,
        notification::mark_read,
    ),
    components(schemas(
        Appointment,
        AppointmentStatus,
        Slot,
        Notification,
        BookAppointmentRequest,
        BookAppointmentResponse,
        AppointmentListResponse,
        PublishSlotsRequest,
        PublishSlotsResponse,
        AvailableSlotsResponse,
        DoctorDto,
        DoctorListResponse,
        NotificationListResponse,
        MarkAllReadResponse,
        ErrorResponse,
        ErrorBody,
        system::HealthResponse,
    )),
    tags(
        (name = "System", description = "Liveness"),
        (name = "Schedule", description = "Doctors and their slots"),
        (name = "Appointments", description = "Slot reservation and listings"),
        (name = "Notifications", description = "In-app inbox"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_booking_route() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/appointments"));
        assert!(doc.paths.paths.contains_key("/api/v1/doctors/{id}/slots"));
    }
}
