use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use ticketing_server::auth::JwtIdentityProvider;
use ticketing_server::config::Config;
use ticketing_server::db::PgStore;
use ticketing_server::payments::PaystackGateway;
use ticketing_server::routes::create_routes;
use ticketing_server::state::AppState;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ticketing_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().expect("Invalid configuration");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    let gateway = PaystackGateway::new(
        config.paystack_secret_key.clone(),
        config.paystack_base_url.clone(),
        config.payment_timeout,
    )
    .expect("Failed to build payment gateway client");
    let identity = JwtIdentityProvider::new(
        &config.auth_jwt_secret,
        config.auth_jwt_audience.as_deref(),
    );

    let addr = config.bind_address();
    let state = AppState::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(gateway),
        Arc::new(identity),
        config,
    );
    let app = create_routes(state);

    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind address");
    tracing::info!("🚀 Server running at http://{}", addr);

    axum::serve(listener, app).await.expect("Server failed");
}
