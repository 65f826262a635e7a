//! Appointment handlers: book, list as student, list as doctor.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;

use crate::api::auth::CurrentUser;
use crate::api::dto::{
    AppointmentListResponse, BookAppointmentRequest, BookAppointmentResponse, StatusFilter,
};
use crate::app_state::AppState;
use crate::domain::slot_time;
use crate::error::{CareError, ErrorResponse};

/// `POST /appointments`: Reserve a slot.
///
/// # Errors
///
/// Returns [`CareError`] when validation fails, the slot is taken, the
/// caller already has an appointment at that time, or the datastore
/// fails.
#[utoipa::path(
    post,
    path = "/api/v1/appointments",
    tag = "Appointments",
    summary = "Book an appointment",
    description = "Atomically reserves the doctor's slot at `slot_date_time` for the calling student. The instant is normalized to UTC whole seconds.",
    request_body = BookAppointmentRequest,
    params(("X-User-Id" = i64, Header, description = "Authenticated account id")),
    responses(
        (status = 201, description = "Appointment booked", body = BookAppointmentResponse),
        (status = 400, description = "Invalid doctor, past slot, unavailable slot or duplicate booking", body = ErrorResponse),
        (status = 401, description = "Missing or unknown caller", body = ErrorResponse),
    )
)]
pub async fn book_appointment(
    State(state): State<AppState>,
    CurrentUser(student): CurrentUser,
    payload: Result<Json<BookAppointmentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, CareError> {
    let Json(req) = payload?;
    let at = slot_time::parse(&req.slot_date_time)?;

    let appointment = state
        .reservations
        .reserve(&student, req.doctor_id, at, Utc::now())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BookAppointmentResponse {
            message: "Appointment booked successfully.".to_string(),
            appointment,
        }),
    ))
}

/// `GET /appointments`: The caller's bookings as a student.
///
/// # Errors
///
/// Returns [`CareError`] on a bad filter or datastore failure.
#[utoipa::path(
    get,
    path = "/api/v1/appointments",
    tag = "Appointments",
    summary = "List my appointments",
    params(StatusFilter, ("X-User-Id" = i64, Header, description = "Authenticated account id")),
    responses(
        (status = 200, description = "Appointments, latest slot first", body = AppointmentListResponse),
        (status = 401, description = "Missing or unknown caller", body = ErrorResponse),
    )
)]
pub async fn my_appointments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    filter: Result<Query<StatusFilter>, QueryRejection>,
) -> Result<impl IntoResponse, CareError> {
    let Query(filter) = filter?;
    let appointments = state
        .schedule
        .student_appointments(&user, filter.status)
        .await?;
    Ok(Json(AppointmentListResponse { appointments }))
}

/// `GET /doctor/appointments`: The caller's bookings as a doctor.
///
/// # Errors
///
/// Returns [`CareError::Forbidden`] for non-doctors, or another
/// [`CareError`] on a bad filter or datastore failure.
#[utoipa::path(
    get,
    path = "/api/v1/doctor/appointments",
    tag = "Appointments",
    summary = "List appointments booked with me",
    params(StatusFilter, ("X-User-Id" = i64, Header, description = "Authenticated account id")),
    responses(
        (status = 200, description = "Appointments, latest slot first", body = AppointmentListResponse),
        (status = 401, description = "Missing or unknown caller", body = ErrorResponse),
        (status = 403, description = "Caller is not a doctor", body = ErrorResponse),
    )
)]
pub async fn doctor_appointments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    filter: Result<Query<StatusFilter>, QueryRejection>,
) -> Result<impl IntoResponse, CareError> {
    let Query(filter) = filter?;
    let appointments = state
        .schedule
        .doctor_appointments(&user, filter.status)
        .await?;
    Ok(Json(AppointmentListResponse { appointments }))
}

/// Appointment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/appointments", post(book_appointment).get(my_appointments))
        .route("/doctor/appointments", get(doctor_appointments))
}
