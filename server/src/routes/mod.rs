use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{
    analytics, attendees, events, health_check, payments, qr, ticket_types, tickets, wallet,
    wizard,
};
use crate::state::AppState;

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/slug/:slug", get(events::get_event_by_slug))
        .route("/tickets/create", post(tickets::create_ticket))
        .route(
            "/tickets/types",
            get(ticket_types::list_ticket_types).post(ticket_types::create_ticket_type),
        )
        .route(
            "/tickets/types/:id",
            put(ticket_types::update_ticket_type).delete(ticket_types::delete_ticket_type),
        )
        .route("/payments/initialize", post(payments::initialize_payment))
        .route("/payments/verify", post(payments::verify_payment))
        .route("/qr/:reference", get(qr::qr_code))
        .route("/attendees", get(attendees::list_attendees))
        .route("/attendees/stats", get(attendees::attendee_statistics))
        .route("/analytics/dashboard", get(analytics::dashboard_stats))
        .route("/wallet/balance", get(wallet::get_balance))
        .route("/wallet/transactions", get(wallet::list_transactions))
        .route("/wizard/steps", post(wizard::wizard_steps))
}

pub fn create_routes(state: AppState) -> Router {
    let security = create_security_headers_layer(state.config.production);
    let cors = create_cors_layer(&state.config.cors_allowed_origins);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(security)
        .layer(cors)
}
