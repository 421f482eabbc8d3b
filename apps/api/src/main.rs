use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use auth_cell::services::OtpService;
use shared_config::AppConfig;

const OTP_SWEEP_INTERVAL_SECS: u64 = 60;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CF registry API server");

    // Load configuration
    let config = AppConfig::from_env();
    if !config.is_sms_configured() && !config.sms_dev_mode {
        warn!("SMS gateway not configured; OTP delivery will fail");
    }
    let state = Arc::new(config);

    // Expired OTP rows are already unusable on read; the sweep keeps the
    // table from accumulating them.
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let otp = OtpService::new(&sweep_state);
        let mut ticker = tokio::time::interval(Duration::from_secs(OTP_SWEEP_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            if let Err(e) = otp.purge_expired().await {
                warn!("OTP sweep failed: {}", e);
            }
        }
    });

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
