use std::sync::{Arc, Mutex};

use axum::routing::{delete, get, patch, post};
use axum::Router;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use courtbook::config::AppConfig;
use courtbook::db;
use courtbook::handlers;
use courtbook::services::payments::gateway::HttpPaymentGateway;
use courtbook::services::qr::remote::RemoteQrEncoder;
use courtbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let payments = HttpPaymentGateway::new(config.payment_gateway_url.clone());
    let qr = RemoteQrEncoder::new(config.qr_service_url.clone());

    let (changes_tx, _) = broadcast::channel(256);

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        payments: Box::new(payments),
        qr: Box::new(qr),
        changes_tx,
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/courts", get(handlers::courts::list_courts))
        .route("/api/courts", post(handlers::courts::create_court))
        .route("/api/courts/:id", get(handlers::courts::get_court))
        .route("/api/courts/:id", patch(handlers::courts::update_court))
        .route("/api/courts/:id", delete(handlers::courts::delete_court))
        .route(
            "/api/courts/:id/availability",
            get(handlers::availability::get_availability),
        )
        .route(
            "/api/courts/:id/availability/stream",
            get(handlers::availability::availability_stream),
        )
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route("/api/bookings", get(handlers::bookings::list_bookings))
        .route(
            "/api/bookings/code/:code",
            get(handlers::bookings::lookup_by_code),
        )
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/bookings/:id",
            patch(handlers::bookings::update_booking),
        )
        .route(
            "/api/bookings/:id",
            delete(handlers::bookings::delete_booking),
        )
        .route(
            "/api/bookings/:id/cancel",
            post(handlers::bookings::cancel_booking),
        )
        .route(
            "/api/bookings/:id/void",
            post(handlers::bookings::void_booking),
        )
        .route(
            "/api/bookings/:id/validate",
            post(handlers::bookings::validate_booking),
        )
        .route(
            "/api/users/:id/bookings",
            get(handlers::bookings::get_user_bookings),
        )
        .route(
            "/api/users/:id/notifications",
            get(handlers::notifications::get_user_notifications),
        )
        .route("/api/revenue", get(handlers::revenue::get_revenue))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
