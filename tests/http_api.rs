//! End-to-end tests of the REST surface.

#![allow(clippy::panic, clippy::indexing_slicing)]

mod common;

use chrono::Duration;
use common::{TestServer, eventually, future, iso};
use reqwest::{Method, StatusCode};

#[tokio::test]
async fn health_is_public() {
    let server = TestServer::start().await;
    let Ok(resp) = server.client.get(server.url("/health")).send().await else {
        panic!("request failed");
    };
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn booking_flow_and_conflicts() {
    let server = TestServer::start().await;
    let at = future(2);
    server.publish(&server.doctor, &[at]).await;
    server.publish(&server.other_doctor, &[at]).await;

    // Offset form of the same instant books the same slot.
    let offset_form = (at + Duration::hours(5) + Duration::minutes(30))
        .naive_utc()
        .format("%Y-%m-%dT%H:%M:%S+05:30")
        .to_string();
    let (status, body) = server.book(&server.student, &server.doctor, &offset_form).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["appointment"]["status"], "pending");

    let (status, body) = server
        .book(&server.other_student, &server.doctor, &iso(at))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 2001);

    let (status, body) = server
        .book(&server.student, &server.other_doctor, &iso(at))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 2002);

    let Ok(resp) = server.get(&server.student, "/api/v1/appointments").send().await else {
        panic!("request failed");
    };
    let Ok(mine) = resp.json::<serde_json::Value>().await else {
        panic!("not JSON");
    };
    assert_eq!(mine["appointments"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn validation_errors_map_to_400() {
    let server = TestServer::start().await;
    let past = iso(future(-1));
    let (status, body) = server.book(&server.student, &server.doctor, &past).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1003);

    let (status, body) = server
        .book(&server.student, &server.other_student, &iso(future(1)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1002);

    let (status, body) = server
        .book(&server.student, &server.doctor, "next tuesday")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], 1001);
    assert_eq!(server.store.transactions_started(), 0);
}

#[tokio::test]
async fn missing_or_unknown_caller_is_401() {
    let server = TestServer::start().await;
    let Ok(resp) = server
        .client
        .get(server.url("/api/v1/appointments"))
        .send()
        .await
    else {
        panic!("request failed");
    };
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let Ok(resp) = server
        .client
        .get(server.url("/api/v1/notifications"))
        .header("x-user-id", "999999")
        .send()
        .await
    else {
        panic!("request failed");
    };
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn schedule_endpoints() {
    let server = TestServer::start().await;
    let at = future(3);
    server
        .publish(&server.doctor, &[at, at + Duration::hours(1), at])
        .await;

    let Ok(resp) = server
        .send_json(
            Method::PUT,
            &server.student,
            "/api/v1/slots",
            &serde_json::json!({ "slots": [iso(at)] }),
        )
        .send()
        .await
    else {
        panic!("request failed");
    };
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let Ok(resp) = server.client.get(server.url("/api/v1/doctors")).send().await else {
        panic!("request failed");
    };
    let Ok(doctors) = resp.json::<serde_json::Value>().await else {
        panic!("not JSON");
    };
    assert_eq!(doctors["doctors"].as_array().map(Vec::len), Some(2));

    let path = format!(
        "/api/v1/doctors/{}/slots?date={}",
        server.doctor.id,
        at.date_naive()
    );
    let Ok(resp) = server.client.get(server.url(&path)).send().await else {
        panic!("request failed");
    };
    assert_eq!(resp.status(), StatusCode::OK);
    let Ok(listing) = resp.json::<serde_json::Value>().await else {
        panic!("not JSON");
    };
    let same_day = if (at + Duration::hours(1)).date_naive() == at.date_naive() {
        2
    } else {
        1
    };
    assert_eq!(listing["slots"].as_array().map(Vec::len), Some(same_day));

    let missing = format!(
        "/api/v1/doctors/{}/slots?date={}",
        server.student.id,
        at.date_naive()
    );
    let Ok(resp) = server.client.get(server.url(&missing)).send().await else {
        panic!("request failed");
    };
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn publishing_reports_distinct_and_created_counts() {
    let server = TestServer::start().await;
    let at = future(4);
    server.publish(&server.doctor, &[at]).await;

    let batch = [iso(at), iso(at + Duration::hours(2)), iso(at + Duration::hours(2))];
    let Ok(resp) = server
        .send_json(
            Method::PUT,
            &server.doctor,
            "/api/v1/slots",
            &serde_json::json!({ "slots": batch }),
        )
        .send()
        .await
    else {
        panic!("request failed");
    };
    assert_eq!(resp.status(), StatusCode::OK);
    let Ok(body) = resp.json::<serde_json::Value>().await else {
        panic!("not JSON");
    };
    assert_eq!(body["requested"], 2);
    assert_eq!(body["created"], 1);
}

#[tokio::test]
async fn doctor_inbox_receives_booking_notification() {
    let server = TestServer::start().await;
    let at = future(2);
    server.publish(&server.doctor, &[at]).await;
    let (status, _) = server.book(&server.student, &server.doctor, &iso(at)).await;
    assert_eq!(status, StatusCode::CREATED);

    let server = &server;
    let inbox = eventually(|| async move {
        let resp = server
            .get(&server.doctor, "/api/v1/notifications")
            .send()
            .await
            .ok()?;
        let body = resp.json::<serde_json::Value>().await.ok()?;
        (body["unread"] == 1).then_some(body)
    })
    .await;
    let Some(inbox) = inbox else {
        panic!("notification never arrived");
    };
    assert_eq!(
        inbox["notifications"][0]["message"],
        "You have a new appointment request from Asha Patel!"
    );
    let Some(id) = inbox["notifications"][0]["id"].as_i64() else {
        panic!("notification id missing");
    };

    let path = format!("/api/v1/notifications/{id}/read");
    let Ok(resp) = server
        .send_json(Method::PATCH, &server.student, &path, &serde_json::json!({}))
        .send()
        .await
    else {
        panic!("request failed");
    };
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let Ok(resp) = server
        .send_json(
            Method::PATCH,
            &server.doctor,
            "/api/v1/notifications/read-all",
            &serde_json::json!({}),
        )
        .send()
        .await
    else {
        panic!("request failed");
    };
    let Ok(body) = resp.json::<serde_json::Value>().await else {
        panic!("not JSON");
    };
    assert_eq!(body["updated"], 1);

    let Ok(resp) = server
        .get(&server.doctor, "/api/v1/doctor/appointments?status=pending")
        .send()
        .await
    else {
        panic!("request failed");
    };
    let Ok(body) = resp.json::<serde_json::Value>().await else {
        panic!("not JSON");
    };
    assert_eq!(body["appointments"].as_array().map(Vec::len), Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_over_http_have_one_winner() {
    let server = TestServer::start().await;
    let at = future(4);
    server.publish(&server.doctor, &[at]).await;

    let mut students = Vec::new();
    for i in 0..10 {
        students.push(
            server
                .store
                .insert_user(
                    &format!("Student {i}"),
                    "s@campus.test",
                    campus_care::domain::Role::Student,
                )
                .await,
        );
    }

    let slot = iso(at);
    let results =
        futures_util::future::join_all(students.iter().map(|s| server.book(s, &server.doctor, &slot)))
            .await;
    let created = results
        .iter()
        .filter(|(status, _)| *status == StatusCode::CREATED)
        .count();
    assert_eq!(created, 1);
    assert!(
        results
            .iter()
            .filter(|(status, _)| *status != StatusCode::CREATED)
            .all(|(_, body)| body["error"]["code"] == 2001)
    );
    assert_eq!(server.store.all_appointments().await.len(), 1);
}
