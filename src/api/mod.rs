//! REST API layer: route handlers, DTOs, caller identity and router
//! composition.
//!
//! All resource endpoints are mounted under `/api/v1`.

pub mod auth;
pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;
use axum::routing::get;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}

/// Builds the application: REST endpoints, the `/ws` endpoint and, with
/// the `swagger-ui` feature, the OpenAPI UI at `/swagger-ui`.
pub fn build_app(state: AppState) -> Router {
    let router = build_router().route("/ws", get(ws_handler));
    with_docs(router).with_state(state)
}

#[cfg(feature = "swagger-ui")]
fn with_docs(router: Router<AppState>) -> Router<AppState> {
    use utoipa::OpenApi;
    use utoipa_swagger_ui::SwaggerUi;

    router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

#[cfg(not(feature = "swagger-ui"))]
fn with_docs(router: Router<AppState>) -> Router<AppState> {
    router
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::domain::{EventBus, Role};
    use crate::persistence::MemoryStore;

    async fn app() -> (Router, MemoryStore) {
        let store = MemoryStore::new(Duration::from_millis(50));
        store
            .insert_user("Asha", "asha@campus.test", Role::Student)
            .await;
        let state = AppState::new(Arc::new(store.clone()), EventBus::new(8));
        (build_app(state), store)
    }

    async fn status_of(app: Router, request: Request<Body>) -> StatusCode {
        let Ok(response) = app.oneshot(request).await;
        response.status()
    }

    #[tokio::test]
    async fn health_needs_no_caller() {
        let (app, _) = app().await;
        let Ok(request) = Request::get("/health").body(Body::empty()) else {
            panic!("bad request");
        };
        assert_eq!(status_of(app, request).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn inbox_without_caller_is_unauthorized() {
        let (app, _) = app().await;
        let Ok(request) = Request::get("/api/v1/notifications").body(Body::empty()) else {
            panic!("bad request");
        };
        assert_eq!(status_of(app, request).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_booking_body_is_bad_request() {
        let (app, store) = app().await;
        let Ok(request) = Request::post("/api/v1/appointments")
            .header("x-user-id", "1")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"doctor_id":"#))
        else {
            panic!("bad request");
        };
        assert_eq!(status_of(app, request).await, StatusCode::BAD_REQUEST);
        assert_eq!(store.transactions_started(), 0);
    }
}
