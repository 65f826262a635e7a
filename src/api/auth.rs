//! Caller identity.
//!
//! Sessions are issued upstream; the fronting gateway forwards the
//! authenticated account id in the `X-User-Id` header. The extractor
//! resolves it to a stored [`User`].

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::domain::{User, UserId};
use crate::error::CareError;

/// Header carrying the authenticated account id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = CareError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_user_id)
            .ok_or(CareError::Unauthenticated)?;

        let user = state
            .store
            .find_user(id)
            .await?
            .ok_or(CareError::Unauthenticated)?;
        Ok(Self(user))
    }
}

fn parse_user_id(raw: &str) -> Option<UserId> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .map(UserId::new)
}
