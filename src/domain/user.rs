//! Users and their roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::UserId;

/// Role attached to every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Books appointments.
    Student,
    /// Publishes slots and receives bookings.
    Doctor,
    /// Administrative account.
    Admin,
}

impl Role {
    /// Returns the lowercase name stored in the `users.role` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Doctor => "doctor",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "doctor" => Ok(Self::Doctor),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// An account as seen by the booking core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct User {
    /// Account identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Contact email, used for booking mail.
    pub email: String,
    /// Account role.
    pub role: Role,
}

impl User {
    /// Returns `true` if this account may receive bookings.
    #[must_use]
    pub fn is_doctor(&self) -> bool {
        self.role == Role::Doctor
    }
}
