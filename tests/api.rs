use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use fuelpay_admin::repositories::MemoryStore;
use fuelpay_admin::services::{http, start_services};
use fuelpay_admin::settings::{Admin, Settings};

async fn app() -> Router {
    let mut settings = Settings::in_memory();
    settings.store.seed_demo_data = true;
    settings.admin = Some(Admin {
        email: "admin@fuelpay.com".to_string(),
        password: "admin123".to_string(),
        display_name: "Administrator".to_string(),
    });

    let channels = start_services(Arc::new(MemoryStore::new()), &settings)
        .await
        .unwrap();

    http::router(channels)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    (status, bytes.to_vec())
}

async fn send_json(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, token, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

async fn login(app: &Router) -> String {
    let (status, body) = send_json(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "admin@fuelpay.com", "password": "admin123" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn api_requires_a_session() {
    let app = app().await;

    let (status, body) = send_json(&app, Method::GET, "/api/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = send_json(&app, Method::GET, "/api/users", Some("made-up"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_json(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "admin@fuelpay.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = app().await;
    let token = login(&app).await;

    let (status, me) = send_json(&app, Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "admin@fuelpay.com");

    let (status, _) = send(&app, Method::POST, "/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::GET, "/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn users_search_and_toggle() {
    let app = app().await;
    let token = login(&app).await;

    let (status, page) =
        send_json(&app, Method::GET, "/api/users?q=JANE", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["email"], "jane@example.com");

    let (_, page) = send_json(
        &app,
        Method::GET,
        "/api/users?status=suspended",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(page["total"], 1);
    let mike = page["items"][0]["id"].as_str().unwrap().to_string();

    let (status, user) = send_json(
        &app,
        Method::POST,
        &format!("/api/users/{}/toggle-status", mike),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["status"], "active");

    let (status, _) = send_json(
        &app,
        Method::POST,
        "/api/users",
        Some(&token),
        Some(json!({ "name": "Ada", "email": "not-an-email", "phone": "+234" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn approving_a_deposit_credits_once() {
    let app = app().await;
    let token = login(&app).await;

    let (_, page) = send_json(
        &app,
        Method::GET,
        "/api/deposits?status=pending",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(page["total"], 1);
    let deposit = &page["items"][0];
    assert_eq!(deposit["userEmail"], "john@example.com");
    let id = deposit["id"].as_str().unwrap().to_string();

    let (status, settlement) = send_json(
        &app,
        Method::POST,
        &format!("/api/deposits/{}/approve", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settlement["deposit"]["status"], "approved");
    assert_eq!(settlement["user"]["balance"], 25_000);
    assert_eq!(settlement["transaction"]["type"], "deposit");

    let (status, _) = send_json(
        &app,
        Method::POST,
        &format!("/api/deposits/{}/reject", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, page) = send_json(&app, Method::GET, "/api/users?q=john@", Some(&token), None).await;
    assert_eq!(page["items"][0]["balance"], 25_000);
}

#[tokio::test]
async fn qr_codes_preview_create_and_render() {
    let app = app().await;
    let token = login(&app).await;

    let (status, station) = send_json(
        &app,
        Method::POST,
        "/api/stations",
        Some(&token),
        Some(json!({
            "name": "Harbour Station",
            "location": "1 Marina Road",
            "city": "Port Harcourt",
            "petrolPrice": 190,
            "dieselPrice": 170,
            "premiumPrice": 210
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let station_id = station["id"].as_str().unwrap().to_string();

    let input = json!({ "stationId": station_id, "pumpId": "PUMP-07", "fuelType": "diesel" });

    let (status, preview) = send_json(
        &app,
        Method::POST,
        "/api/qr-codes/preview",
        Some(&token),
        Some(input.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["payload"]["pricePerLiter"], 170);
    assert!(preview["svg"].as_str().unwrap().contains("<svg"));

    let (status, code) = send_json(
        &app,
        Method::POST,
        "/api/qr-codes",
        Some(&token),
        Some(input.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let code_id = code["id"].as_str().unwrap().to_string();

    let (status, _) =
        send_json(&app, Method::POST, "/api/qr-codes", Some(&token), Some(input)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, svg) = send(
        &app,
        Method::GET,
        &format!("/api/qr-codes/{}/svg", code_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(svg).unwrap().contains("<svg"));

    let (status, png) = send(
        &app,
        Method::GET,
        &format!("/api/qr-codes/{}/png", code_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&png[..4], b"\x89PNG");

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/stations/{}", station_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/api/qr-codes/{}/payload", code_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn purchase_is_refused_without_funds() {
    let app = app().await;
    let token = login(&app).await;

    let (_, page) = send_json(&app, Method::GET, "/api/users?q=jane", Some(&token), None).await;
    let jane = page["items"][0]["id"].as_str().unwrap().to_string();

    let (_, stations) = send_json(
        &app,
        Method::GET,
        "/api/stations?q=lagos",
        Some(&token),
        None,
    )
    .await;
    let lagos = stations[0]["id"].as_str().unwrap().to_string();

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/api/transactions/purchase",
        Some(&token),
        Some(json!({
            "userId": jane,
            "stationId": lagos,
            "fuelType": "petrol",
            "liters": 500.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("Insufficient funds"));

    let (status, purchase) = send_json(
        &app,
        Method::POST,
        "/api/transactions/purchase",
        Some(&token),
        Some(json!({
            "userId": jane,
            "stationId": lagos,
            "fuelType": "petrol",
            "liters": 10.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(purchase["user"]["balance"], 23_200);
    assert_eq!(purchase["transaction"]["amount"], 1_800);
}

#[tokio::test]
async fn dashboard_reflects_seed_data() {
    let app = app().await;
    let token = login(&app).await;

    let (status, snapshot) =
        send_json(&app, Method::GET, "/api/dashboard", Some(&token), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["stats"]["totalUsers"], 3);
    assert_eq!(snapshot["stats"]["activeUsers"], 2);
    assert_eq!(snapshot["stats"]["totalRevenue"], 4_500);
    assert_eq!(snapshot["stats"]["pendingDeposits"], 1);
    assert_eq!(snapshot["display"]["fuelVolume"], "25L");
}
