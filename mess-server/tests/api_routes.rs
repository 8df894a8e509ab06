//! HTTP 路由测试 (tower oneshot)

mod common;

use axum::Router;
use axum::body::Body;
use common::*;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use mess_server::api::build_app;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app() -> Router {
    build_app(fixture().await.state)
}

fn request(method: Method, uri: &str, actor: Option<(&str, &str, &str)>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role, hostels)) = actor {
        builder = builder
            .header("x-actor-id", id)
            .header("x-actor-role", role)
            .header("x-actor-hostels", hostels);
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

const ASHA_HEADERS: (&str, &str, &str) = ("7", "student", "");
const WARDEN_HEADERS: (&str, &str, &str) = ("100", "warden", "1");

#[tokio::test]
async fn test_health_is_public() {
    let app = app().await;
    let (status, body) = send(&app, request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["status"], "ok");
}

#[tokio::test]
async fn test_identity_headers_required() {
    let app = app().await;

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/hostels/1/meal-timing", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1001);

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            "/api/hostels/1/meal-timing",
            Some(("abc", "student", "")),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1002);

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/hostels/1/meal-timing", Some(ASHA_HEADERS), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["lunch"]["start"], "12:30");
}

#[tokio::test]
async fn test_staff_scope_enforced() {
    let app = app().await;
    let cutoff = serde_json::to_value(cutoff()).unwrap();

    let (status, body) = send(
        &app,
        request(
            Method::PUT,
            "/api/hostels/1/meal-cutoff",
            Some(("101", "warden", "2")),
            Some(cutoff.clone()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2004);

    let (status, _) = send(
        &app,
        request(
            Method::PUT,
            "/api/hostels/1/meal-cutoff",
            Some(ASHA_HEADERS),
            Some(cutoff.clone()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        request(
            Method::PUT,
            "/api/hostels/1/meal-cutoff",
            Some(WARDEN_HEADERS),
            Some(cutoff),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["breakfast"]["day_offset"], -1);
}

#[tokio::test]
async fn test_booking_routes_are_rate_limited() {
    let app = app().await;
    let payload = json!({ "days": [{ "date": date(11), "slots": ["lunch"] }] });

    for _ in 0..3 {
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/hostels/1/bookings",
                Some(ASHA_HEADERS),
                Some(payload.clone()),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["date"], date(11));
    }

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/hostels/1/bookings",
            Some(ASHA_HEADERS),
            Some(payload),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], 9);

    // reads are not counted
    let (status, _) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/hostels/1/students/7/calendar?date={}", date(11)),
            Some(ASHA_HEADERS),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_staff_counter_routes_are_not_rate_limited() {
    let app = app().await;

    for (i, student_id) in [7, 8, 7, 8, 7].into_iter().enumerate() {
        let payload = json!({ "student_id": student_id, "date": date(11 + i as u32), "slots": ["lunch"] });
        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/hostels/1/bookings/manual",
                Some(WARDEN_HEADERS),
                Some(payload),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "manual booking {i}: {body}");
    }

    for _ in 0..4 {
        let payload = json!({ "student_id": 7, "date": date(11), "slots": ["lunch"] });
        let (status, _) = send(
            &app,
            request(
                Method::POST,
                "/api/hostels/1/bookings/consume",
                Some(WARDEN_HEADERS),
                Some(payload),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_cutoff_rejection_maps_to_422() {
    let app = app().await;
    let payload = json!({ "days": [{ "date": date(10), "slots": ["breakfast"] }] });

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/hostels/1/bookings",
            Some(ASHA_HEADERS),
            Some(payload),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 4002);
    assert_eq!(body["details"]["slot"], "breakfast");
}

#[tokio::test]
async fn test_reporting_lists_carry_count() {
    let app = app().await;
    let payload = json!({ "days": [{ "date": date(11), "is_full_day": true }] });
    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/hostels/1/bookings",
            Some(ASHA_HEADERS),
            Some(payload),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            "/api/hostels/1/bookings?state=CONFIRMED&limit=2",
            Some(WARDEN_HEADERS),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 4);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/hostels/1/menus?from={}&to={}", date(9), date(11)),
            Some(ASHA_HEADERS),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}
