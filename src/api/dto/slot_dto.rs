//! Slot and doctor-directory DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Slot, User, UserId};
use crate::service::PublishedSlots;

/// Request body for `PUT /slots`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PublishSlotsRequest {
    /// Slot starts, ISO-8601 with an explicit offset.
    pub slots: Vec<String>,
}

/// Response for slot publishing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PublishSlotsResponse {
    /// Number of distinct instants in the request.
    pub requested: usize,
    /// Number of slots newly created.
    pub created: u64,
}

impl From<PublishedSlots> for PublishSlotsResponse {
    fn from(published: PublishedSlots) -> Self {
        Self {
            requested: published.requested,
            created: published.created,
        }
    }
}

/// Query for `GET /doctors/{id}/slots`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    /// UTC calendar date, `YYYY-MM-DD`.
    #[param(value_type = String, example = "2030-05-01")]
    pub date: NaiveDate,
}

/// Response for `GET /doctors/{id}/slots`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AvailableSlotsResponse {
    /// Doctor the slots belong to.
    #[schema(value_type = i64)]
    pub doctor_id: UserId,
    /// Requested date.
    #[schema(value_type = String)]
    pub date: NaiveDate,
    /// Free slots on that date, ascending.
    pub slots: Vec<Slot>,
}

/// Public view of a doctor account.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DoctorDto {
    /// Account id.
    #[schema(value_type = i64)]
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
}

impl From<User> for DoctorDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

/// Response for `GET /doctors`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DoctorListResponse {
    /// Doctors ordered by name.
    pub doctors: Vec<DoctorDto>,
}
