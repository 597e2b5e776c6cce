use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use ticketing_server::auth::StaticIdentityProvider;
use ticketing_server::config::Config;
use ticketing_server::db::{MemoryStore, Store};
use ticketing_server::models::{TicketType, User};
use ticketing_server::payments::{GatewayOutage, MockGateway};
use ticketing_server::routes::create_routes;
use ticketing_server::state::AppState;

const ORGANIZER_TOKEN: &str = "organizer-token";
const OTHER_TOKEN: &str = "other-token";

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    gateway: Arc<MockGateway>,
    organizer: Uuid,
    other: Uuid,
}

fn user(id: Uuid, email: &str) -> User {
    let now = Utc::now();
    User {
        id,
        email: email.to_string(),
        first_name: None,
        last_name: None,
        phone: None,
        avatar_url: None,
        wallet_balance: Decimal::ZERO,
        is_verified: true,
        is_admin: false,
        created_at: now,
        updated_at: now,
    }
}

async fn spawn_app() -> TestApp {
    let organizer = Uuid::new_v4();
    let other = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    store.insert_user(user(organizer, "organizer@example.com")).await;
    store.insert_user(user(other, "other@example.com")).await;
    let gateway = Arc::new(MockGateway::new());
    let identity = StaticIdentityProvider::new()
        .with_session(ORGANIZER_TOKEN, organizer)
        .with_session(OTHER_TOKEN, other);

    let state = AppState::new(
        store.clone(),
        gateway.clone(),
        Arc::new(identity),
        Config::default(),
    );
    TestApp {
        router: create_routes(state),
        store,
        gateway,
        organizer,
        other,
    }
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).unwrap()
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create_event(app: &TestApp, body: Value) -> Value {
    let (status, body) = send(
        &app.router,
        request("POST", "/api/events", Some(ORGANIZER_TOKEN), Some(body)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

async fn published_event(app: &TestApp, extra: Value) -> Value {
    let mut body = json!({
        "title": "Lagos Jazz Evening",
        "eventType": "free",
        "startDate": "2030-06-01",
        "startTime": "19:00:00",
        "isPublished": true
    });
    if let (Some(base), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        base.extend(extra.clone());
    }
    create_event(app, body).await
}

async fn create_ticket_type(app: &TestApp, event_id: &str, price: u32, quantity: i32) -> Value {
    let (status, body) = send(
        &app.router,
        request(
            "POST",
            "/api/tickets/types",
            Some(ORGANIZER_TOKEN),
            Some(json!({
                "eventId": event_id,
                "name": "Regular",
                "price": price,
                "quantityAvailable": quantity
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

fn attendee() -> Value {
    json!({ "name": "Chidi Okafor", "email": "chidi@example.com" })
}

fn register_free(event_id: &str) -> Request<Body> {
    request(
        "POST",
        "/api/tickets/create",
        None,
        Some(json!({ "eventId": event_id, "attendeeInfo": attendee(), "ticketType": "free" })),
    )
}

#[tokio::test]
async fn health_reports_ok() {
    let app = spawn_app().await;
    let (status, body) = send(&app.router, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn created_event_reads_back_with_the_same_fields() {
    let app = spawn_app().await;
    let created = create_event(
        &app,
        json!({
            "title": "Abuja Design Week",
            "description": "Three days of talks",
            "eventType": "paid",
            "startDate": "2030-09-10",
            "endDate": "2030-09-12",
            "startTime": "09:00:00",
            "venueName": "Transcorp Hall",
            "city": "Abuja",
            "maxCapacity": 400,
            "slug": "abuja-design-week",
            "customFields": [
                { "id": "company", "label": "Company", "type": "text", "required": true }
            ]
        }),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, body) = send(
        &app.router,
        request("GET", &format!("/api/events/{id}"), Some(ORGANIZER_TOKEN), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let fetched = &body["data"];
    assert_eq!(fetched["title"], "Abuja Design Week");
    assert_eq!(fetched["description"], "Three days of talks");
    assert_eq!(fetched["event_type"], "paid");
    assert_eq!(fetched["start_date"], "2030-09-10");
    assert_eq!(fetched["end_date"], "2030-09-12");
    assert_eq!(fetched["venue_name"], "Transcorp Hall");
    assert_eq!(fetched["max_capacity"], 400);
    assert_eq!(fetched["slug"], "abuja-design-week");
    assert_eq!(fetched["user_id"], app.organizer.to_string());
    assert_eq!(fetched["custom_fields"][0]["required"], true);
}

#[tokio::test]
async fn writes_require_a_session() {
    let app = spawn_app().await;
    let (status, body) = send(
        &app.router,
        request("POST", "/api/events", None, Some(json!({ "title": "x" }))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");
}

#[tokio::test]
async fn user_scoped_reads_reject_someone_elses_user_id() {
    let app = spawn_app().await;
    let uri = format!("/api/events?userId={}", app.organizer);
    let (status, _) = send(&app.router, request("GET", &uri, Some(OTHER_TOKEN), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let uri = format!("/api/analytics/dashboard?userId={}", app.organizer);
    let (status, _) = send(&app.router, request("GET", &uri, Some(OTHER_TOKEN), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_owner_update_is_rejected_and_event_unchanged() {
    let app = spawn_app().await;
    let event = published_event(&app, json!({})).await;
    let id = event["id"].as_str().unwrap();

    let (status, body) = send(
        &app.router,
        request(
            "PUT",
            &format!("/api/events/{id}"),
            Some(OTHER_TOKEN),
            Some(json!({ "title": "Hijacked" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let stored = app
        .store
        .get_event(Uuid::parse_str(id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.title, "Lagos Jazz Evening");
}

#[tokio::test]
async fn owner_update_applies_only_given_fields() {
    let app = spawn_app().await;
    let event = published_event(&app, json!({ "city": "Lagos" })).await;
    let id = event["id"].as_str().unwrap();

    let (status, body) = send(
        &app.router,
        request(
            "PUT",
            &format!("/api/events/{id}"),
            Some(ORGANIZER_TOKEN),
            Some(json!({ "title": "Lagos Jazz Night" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Lagos Jazz Night");
    assert_eq!(body["data"]["city"], "Lagos");
}

#[tokio::test]
async fn duplicate_slug_is_a_conflict() {
    let app = spawn_app().await;
    published_event(&app, json!({ "slug": "jazz" })).await;
    let (status, body) = send(
        &app.router,
        request(
            "POST",
            "/api/events",
            Some(ORGANIZER_TOKEN),
            Some(json!({ "title": "Another", "slug": "jazz" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn slug_lookup_only_finds_published_events() {
    let app = spawn_app().await;
    published_event(&app, json!({ "slug": "open-night" })).await;
    create_event(&app, json!({ "title": "Draft", "slug": "draft-night" })).await;

    let (status, body) = send(&app.router, request("GET", "/api/events/slug/open-night", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["slug"], "open-night");
    assert!(body["data"]["ticketTypes"].is_array());

    let (status, _) = send(&app.router, request("GET", "/api/events/slug/draft-night", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn free_registration_creates_one_ticket_and_one_purchase() {
    let app = spawn_app().await;
    let event = published_event(&app, json!({})).await;
    let id = event["id"].as_str().unwrap();

    let (status, body) = send(&app.router, register_free(id)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["ticket"]["event_id"], id);
    assert!(body["data"]["paymentReference"]
        .as_str()
        .unwrap()
        .starts_with("FREE_"));

    assert_eq!(app.store.ticket_count().await, 1);
    assert_eq!(app.store.purchase_count().await, 1);
}

#[tokio::test]
async fn ticket_codes_are_unique_within_an_event() {
    let app = spawn_app().await;
    let event = published_event(&app, json!({})).await;
    let id = event["id"].as_str().unwrap();

    let mut codes = Vec::new();
    for _ in 0..5 {
        let (status, body) = send(&app.router, register_free(id)).await;
        assert_eq!(status, StatusCode::CREATED);
        codes.push(body["data"]["ticket"]["ticket_code"].as_str().unwrap().to_string());
    }
    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), 5);
}

#[tokio::test]
async fn zero_capacity_accepts_any_number_of_registrations() {
    let app = spawn_app().await;
    let event = published_event(&app, json!({ "maxCapacity": 0 })).await;
    let id = event["id"].as_str().unwrap();

    for _ in 0..10 {
        let (status, _) = send(&app.router, register_free(id)).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    assert_eq!(app.store.ticket_count().await, 10);
}

#[tokio::test]
async fn full_event_refuses_further_free_registrations() {
    let app = spawn_app().await;
    let event = published_event(&app, json!({ "maxCapacity": 1 })).await;
    let id = event["id"].as_str().unwrap();

    let (status, _) = send(&app.router, register_free(id)).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(&app.router, register_free(id)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

/// Known limitation: the capacity check and the ticket write are separate
/// store calls, so two simultaneous registrations for the last seat can both
/// be accepted.
#[tokio::test]
async fn concurrent_registrations_for_last_seat_both_succeed() {
    let app = spawn_app().await;
    let event = published_event(&app, json!({ "maxCapacity": 1 })).await;
    let id = event["id"].as_str().unwrap();

    let (a, b) = tokio::join!(
        app.router.clone().oneshot(register_free(id)),
        app.router.clone().oneshot(register_free(id)),
    );
    assert_eq!(a.unwrap().status(), StatusCode::CREATED);
    assert_eq!(b.unwrap().status(), StatusCode::CREATED);
    assert_eq!(app.store.ticket_count().await, 2);
}

#[tokio::test]
async fn ticket_type_with_sales_cannot_be_deleted() {
    let app = spawn_app().await;
    let event = published_event(&app, json!({})).await;
    let event_id = event["id"].as_str().unwrap();
    let tt = create_ticket_type(&app, event_id, 0, 50).await;
    let tt_id = tt["id"].as_str().unwrap();

    let (status, _) = send(
        &app.router,
        request(
            "POST",
            "/api/tickets/create",
            None,
            Some(json!({ "eventId": event_id, "attendeeInfo": attendee(), "ticketType": tt_id })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app.router,
        request("DELETE", &format!("/api/tickets/types/{tt_id}"), Some(ORGANIZER_TOKEN), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let stored: TicketType = app
        .store
        .get_ticket_type(Uuid::parse_str(tt_id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.quantity_sold, 1);
}

#[tokio::test]
async fn unsold_ticket_type_can_be_deleted_by_owner_only() {
    let app = spawn_app().await;
    let event = published_event(&app, json!({})).await;
    let tt = create_ticket_type(&app, event["id"].as_str().unwrap(), 2500, 10).await;
    let uri = format!("/api/tickets/types/{}", tt["id"].as_str().unwrap());

    let (status, _) = send(&app.router, request("DELETE", &uri, Some(OTHER_TOKEN), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app.router, request("DELETE", &uri, Some(ORGANIZER_TOKEN), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unpaid_reference_verifies_as_not_successful() {
    let app = spawn_app().await;
    let event = published_event(&app, json!({ "eventType": "paid" })).await;
    let event_id = event["id"].as_str().unwrap();
    let tt = create_ticket_type(&app, event_id, 5000, 100).await;

    let (status, body) = send(
        &app.router,
        request(
            "POST",
            "/api/payments/initialize",
            None,
            Some(json!({
                "eventId": event_id,
                "ticketTypeId": tt["id"],
                "attendeeInfo": attendee(),
                "amount": 500000,
                "email": "a@b.com"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["data"]["authorization_url"].as_str().unwrap().starts_with("https://"));

    let reference = body["data"]["reference"].as_str().unwrap().to_string();
    let parts: Vec<&str> = reference.split('_').collect();
    assert_eq!(parts[0], "TKT");
    assert!(!parts[1].is_empty() && parts[1].chars().all(|c| c.is_ascii_digit()));
    assert_eq!(parts[2].len(), 6);
    assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()));

    let (status, body) = send(
        &app.router,
        request("POST", "/api/payments/verify", None, Some(json!({ "reference": reference }))),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["success"], false);
    assert_eq!(app.store.ticket_count().await, 0);
    assert_eq!(app.store.purchase_count().await, 0);
}

#[tokio::test]
async fn verify_is_idempotent_over_http() {
    let app = spawn_app().await;
    let event = published_event(&app, json!({ "eventType": "paid" })).await;
    let event_id = event["id"].as_str().unwrap();
    let tt = create_ticket_type(&app, event_id, 5000, 100).await;

    let (_, body) = send(
        &app.router,
        request(
            "POST",
            "/api/payments/initialize",
            None,
            Some(json!({
                "eventId": event_id,
                "ticketTypeId": tt["id"],
                "attendeeInfo": attendee(),
                "amount": 500000,
                "email": "a@b.com"
            })),
        ),
    )
    .await;
    let reference = body["data"]["reference"].as_str().unwrap().to_string();
    app.gateway.complete(&reference);

    let verify = || request("POST", "/api/payments/verify", None, Some(json!({ "reference": reference })));
    let (status, first) = send(&app.router, verify()).await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["data"]["alreadyProcessed"], false);

    let (status, second) = send(&app.router, verify()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["alreadyProcessed"], true);
    assert_eq!(second["data"]["ticket"]["id"], first["data"]["ticket"]["id"]);

    assert_eq!(app.store.ticket_count().await, 1);
    assert_eq!(app.store.purchase_count().await, 1);

    let uri = format!("/api/wallet/balance?userId={}", app.organizer);
    let (status, wallet) = send(&app.router, request("GET", &uri, Some(ORGANIZER_TOKEN), None)).await;
    assert_eq!(status, StatusCode::OK);
    let balance: Decimal = serde_json::from_value(wallet["data"]["balance"].clone()).unwrap();
    assert_eq!(balance, Decimal::from(5000));
}

async fn start_checkout(app: &TestApp, event_id: &str, ticket_type_id: &Value) -> String {
    let (status, body) = send(
        &app.router,
        request(
            "POST",
            "/api/payments/initialize",
            None,
            Some(json!({
                "eventId": event_id,
                "ticketTypeId": ticket_type_id,
                "attendeeInfo": attendee(),
                "amount": 500000,
                "email": "a@b.com"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]["reference"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn verify_retry_after_partial_write_records_the_purchase() {
    let app = spawn_app().await;
    let event = published_event(&app, json!({ "eventType": "paid" })).await;
    let event_id = event["id"].as_str().unwrap();
    let tt = create_ticket_type(&app, event_id, 5000, 100).await;
    let reference = start_checkout(&app, event_id, &tt["id"]).await;
    app.gateway.complete(&reference);

    let verify = || request("POST", "/api/payments/verify", None, Some(json!({ "reference": reference })));
    app.store.fail_next_purchase_insert();
    let (status, first) = send(&app.router, verify()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(first["error"]["code"], "PARTIAL_WRITE");

    let (status, second) = send(&app.router, verify()).await;
    assert_eq!(status, StatusCode::OK, "{second}");
    assert!(second["data"]["ticket"].is_object());
    assert!(second["data"]["purchase"].is_object());

    assert_eq!(app.store.ticket_count().await, 1);
    assert_eq!(app.store.purchase_count().await, 1);
    let uri = format!("/api/wallet/balance?userId={}", app.organizer);
    let (_, wallet) = send(&app.router, request("GET", &uri, Some(ORGANIZER_TOKEN), None)).await;
    let balance: Decimal = serde_json::from_value(wallet["data"]["balance"].clone()).unwrap();
    assert_eq!(balance, Decimal::from(5000));
}

#[tokio::test]
async fn free_references_are_not_verifiable() {
    let app = spawn_app().await;
    let event = published_event(&app, json!({})).await;
    let (_, body) = send(&app.router, register_free(event["id"].as_str().unwrap())).await;
    let reference = body["data"]["paymentReference"].clone();

    let (status, body) = send(
        &app.router,
        request("POST", "/api/payments/verify", None, Some(json!({ "reference": reference }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn initialize_rejects_malformed_attendee_email() {
    let app = spawn_app().await;
    let event = published_event(&app, json!({ "eventType": "paid" })).await;
    let event_id = event["id"].as_str().unwrap();
    let tt = create_ticket_type(&app, event_id, 5000, 100).await;

    for email in ["a@b..c", "<x>@b.c", "a,b@c.d"] {
        let (status, body) = send(
            &app.router,
            request(
                "POST",
                "/api/payments/initialize",
                None,
                Some(json!({
                    "eventId": event_id,
                    "ticketTypeId": tt["id"],
                    "attendeeInfo": { "name": "Chidi Okafor", "email": email },
                    "amount": 500000,
                    "email": "a@b.com"
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{email}: {body}");
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn draft_event_ticket_types_are_visible_only_to_the_owner() {
    let app = spawn_app().await;
    let draft = create_event(&app, json!({ "title": "Draft", "slug": "draft-gig" })).await;
    let draft_id = draft["id"].as_str().unwrap();
    create_ticket_type(&app, draft_id, 5000, 100).await;
    let uri = format!("/api/tickets/types?eventId={draft_id}");

    let (status, _) = send(&app.router, request("GET", &uri, None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app.router, request("GET", &uri, Some(OTHER_TOKEN), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app.router, request("GET", &uri, Some(ORGANIZER_TOKEN), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn gateway_outage_surfaces_as_upstream_error() {
    let app = spawn_app().await;
    let event = published_event(&app, json!({ "eventType": "paid" })).await;
    let event_id = event["id"].as_str().unwrap();
    let tt = create_ticket_type(&app, event_id, 5000, 100).await;
    app.gateway.set_outage(Some(GatewayOutage::Unavailable));

    let (status, body) = send(
        &app.router,
        request(
            "POST",
            "/api/payments/initialize",
            None,
            Some(json!({
                "eventId": event_id,
                "ticketTypeId": tt["id"],
                "attendeeInfo": attendee(),
                "amount": 500000,
                "email": "a@b.com"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "EXTERNAL_SERVICE_ERROR");
    assert_eq!(app.store.purchase_count().await, 0);
}

#[tokio::test]
async fn malformed_body_uses_the_error_envelope() {
    let app = spawn_app().await;
    let req = Request::builder()
        .method("POST")
        .uri("/api/tickets/create")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app.router, req).await;
    assert!(status.is_client_error());
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn attendees_and_dashboard_aggregate_owned_events() {
    let app = spawn_app().await;
    let event = published_event(&app, json!({})).await;
    let id = event["id"].as_str().unwrap();
    for _ in 0..3 {
        send(&app.router, register_free(id)).await;
    }
    published_event(&app, json!({ "title": "Second" })).await;

    let uri = format!("/api/attendees?userId={}&eventId={id}", app.organizer);
    let (status, body) = send(&app.router, request("GET", &uri, Some(ORGANIZER_TOKEN), None)).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["eventTitle"], "Lagos Jazz Evening");

    let uri = format!("/api/attendees/stats?userId={}", app.organizer);
    let (status, body) = send(&app.router, request("GET", &uri, Some(ORGANIZER_TOKEN), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalAttendees"], 3);

    let uri = format!("/api/analytics/dashboard?userId={}", app.organizer);
    let (status, body) = send(&app.router, request("GET", &uri, Some(ORGANIZER_TOKEN), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalEvents"], 2);
    assert_eq!(body["data"]["totalAttendees"], 3);

    let uri = format!("/api/analytics/dashboard?userId={}", app.other);
    let (_, body) = send(&app.router, request("GET", &uri, Some(OTHER_TOKEN), None)).await;
    assert_eq!(body["data"]["totalEvents"], 0);
}

#[tokio::test]
async fn qr_endpoint_redirects_to_renderer() {
    let app = spawn_app().await;
    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/api/qr/ABC123-1700000000000XYZ987", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.contains("data=ABC123-1700000000000XYZ987"));
}

#[tokio::test]
async fn wizard_steps_follow_the_form_answers() {
    let app = spawn_app().await;
    let (status, body) = send(
        &app.router,
        request(
            "POST",
            "/api/wizard/steps",
            None,
            Some(json!({ "eventType": "donation", "wantsCustomFields": true })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let steps: Vec<String> = serde_json::from_value(body["data"].clone()).unwrap();
    assert!(steps.contains(&"donation".to_string()));
    assert!(steps.contains(&"customFields".to_string()));
    assert_eq!(steps.last().map(String::as_str), Some("review"));
}
