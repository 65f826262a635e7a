//! Schedule handlers: doctor directory, availability, slot publishing.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::Utc;

use crate::api::auth::CurrentUser;
use crate::api::dto::{
    AvailabilityQuery, AvailableSlotsResponse, DoctorDto, DoctorListResponse,
    PublishSlotsRequest, PublishSlotsResponse,
};
use crate::app_state::AppState;
use crate::domain::{UserId, slot_time};
use crate::error::{CareError, ErrorResponse};

/// `GET /doctors`: List doctors.
///
/// # Errors
///
/// Returns [`CareError`] on datastore failure.
#[utoipa::path(
    get,
    path = "/api/v1/doctors",
    tag = "Schedule",
    summary = "List doctors",
    responses(
        (status = 200, description = "Doctors ordered by name", body = DoctorListResponse),
    )
)]
pub async fn list_doctors(State(state): State<AppState>) -> Result<impl IntoResponse, CareError> {
    let doctors = state.schedule.list_doctors().await?;
    Ok(Json(DoctorListResponse {
        doctors: doctors.into_iter().map(DoctorDto::from).collect(),
    }))
}

/// `GET /doctors/{id}/slots?date=`: Free slots of a doctor on one day.
///
/// # Errors
///
/// Returns [`CareError::DoctorNotFound`] for unknown doctors, or another
/// [`CareError`] on bad input or datastore failure.
#[utoipa::path(
    get,
    path = "/api/v1/doctors/{id}/slots",
    tag = "Schedule",
    summary = "Available slots",
    description = "Returns the doctor's unbooked slots whose start falls on the given UTC date, ascending.",
    params(("id" = i64, Path, description = "Doctor id"), AvailabilityQuery),
    responses(
        (status = 200, description = "Free slots", body = AvailableSlotsResponse),
        (status = 400, description = "Malformed date", body = ErrorResponse),
        (status = 404, description = "Doctor not found", body = ErrorResponse),
    )
)]
pub async fn available_slots(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<impl IntoResponse, CareError> {
    let Path(id) = id?;
    let Query(query) = query?;
    let doctor_id = UserId::new(id);

    let slots = state.schedule.available_slots(doctor_id, query.date).await?;
    Ok(Json(AvailableSlotsResponse {
        doctor_id,
        date: query.date,
        slots,
    }))
}

/// `PUT /slots`: Publish the caller's bookable slots.
///
/// # Errors
///
/// Returns [`CareError::Forbidden`] for non-doctors, or another
/// [`CareError`] on malformed or past instants or datastore failure.
#[utoipa::path(
    put,
    path = "/api/v1/slots",
    tag = "Schedule",
    summary = "Publish slots",
    description = "Adds bookable slots for the calling doctor. Instants already published are skipped.",
    request_body = PublishSlotsRequest,
    params(("X-User-Id" = i64, Header, description = "Authenticated account id")),
    responses(
        (status = 200, description = "Slots published", body = PublishSlotsResponse),
        (status = 400, description = "Malformed or past instant", body = ErrorResponse),
        (status = 403, description = "Caller is not a doctor", body = ErrorResponse),
    )
)]
pub async fn publish_slots(
    State(state): State<AppState>,
    CurrentUser(doctor): CurrentUser,
    payload: Result<Json<PublishSlotsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, CareError> {
    let Json(req) = payload?;
    let instants = req
        .slots
        .iter()
        .map(|s| slot_time::parse(s))
        .collect::<Result<Vec<_>, _>>()?;

    let published = state
        .schedule
        .publish_slots(&doctor, instants, Utc::now())
        .await?;
    Ok(Json(PublishSlotsResponse::from(published)))
}

/// Schedule routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/doctors", get(list_doctors))
        .route("/doctors/{id}/slots", get(available_slots))
        .route("/slots", put(publish_slots))
}
