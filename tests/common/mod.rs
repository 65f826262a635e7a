//! Shared harness: the full router on an ephemeral port over the
//! in-memory store.

#![allow(dead_code, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use campus_care::api;
use campus_care::app_state::AppState;
use campus_care::domain::{EventBus, Role, User};
use campus_care::notify::LogMailer;
use campus_care::persistence::MemoryStore;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

pub struct TestServer {
    pub addr: SocketAddr,
    pub base: String,
    pub client: reqwest::Client,
    pub store: MemoryStore,
    pub doctor: User,
    pub other_doctor: User,
    pub student: User,
    pub other_student: User,
}

impl TestServer {
    pub async fn start() -> Self {
        let store = MemoryStore::new(Duration::from_millis(500));
        let doctor = store
            .insert_user("Dr. Meera Rao", "meera@campus.test", Role::Doctor)
            .await;
        let other_doctor = store
            .insert_user("Dr. Tomas Lind", "tomas@campus.test", Role::Doctor)
            .await;
        let student = store
            .insert_user("Asha Patel", "asha@campus.test", Role::Student)
            .await;
        let other_student = store
            .insert_user("Ben Okafor", "ben@campus.test", Role::Student)
            .await;

        let state = AppState::new(Arc::new(store.clone()), EventBus::new(256));
        state.spawn_subscribers(Arc::new(LogMailer));
        let app = api::build_app(state);

        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            store,
            doctor,
            other_doctor,
            student,
            other_student,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub fn get(&self, user: &User, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .header("x-user-id", user.id.to_string())
    }

    pub fn send_json(
        &self,
        method: reqwest::Method,
        user: &User,
        path: &str,
        body: &serde_json::Value,
    ) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header("x-user-id", user.id.to_string())
            .json(body)
    }

    /// Publishes `instants` for `doctor` and asserts success.
    pub async fn publish(&self, doctor: &User, instants: &[DateTime<Utc>]) {
        let slots: Vec<String> = instants.iter().map(|t| iso(*t)).collect();
        let Ok(resp) = self
            .send_json(
                reqwest::Method::PUT,
                doctor,
                "/api/v1/slots",
                &serde_json::json!({ "slots": slots }),
            )
            .send()
            .await
        else {
            panic!("publish request failed");
        };
        assert_eq!(resp.status(), 200);
    }

    pub async fn book(
        &self,
        student: &User,
        doctor: &User,
        at: &str,
    ) -> (reqwest::StatusCode, serde_json::Value) {
        let Ok(resp) = self
            .send_json(
                reqwest::Method::POST,
                student,
                "/api/v1/appointments",
                &serde_json::json!({ "doctor_id": doctor.id, "slot_date_time": at }),
            )
            .send()
            .await
        else {
            panic!("booking request failed");
        };
        let status = resp.status();
        let Ok(body) = resp.json::<serde_json::Value>().await else {
            panic!("booking response is not JSON");
        };
        (status, body)
    }
}

/// A whole-second instant `days` from now.
pub fn future(days: i64) -> DateTime<Utc> {
    (Utc::now() + chrono::Duration::days(days)).trunc_subsecs(0)
}

pub fn iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Polls `check` until it returns `Some` or roughly two seconds pass.
pub async fn eventually<T, F, Fut>(mut check: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Option<T>>,
{
    for _ in 0..100 {
        if let Some(value) = check().await {
            return Some(value);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    None
}
