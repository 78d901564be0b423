use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod email;
mod error;
mod otp;
mod routes;

use config::ServiceConfig;
use email::{DeliveryGateway, SmtpMailer};
use otp::{spawn_sweeper, OtpStore};
use routes::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env();

    let mailer: Arc<dyn DeliveryGateway> = match SmtpMailer::from_env(&config) {
        Ok(mailer) => Arc::new(mailer),
        Err(e) => {
            tracing::error!("SMTP configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Create shared state
    let store = OtpStore::new();
    let state = Arc::new(AppState::new(store.clone(), mailer, config.clone()));

    // Periodically reclaim expired records; reads do their own expiry check.
    spawn_sweeper(store, config.sweep_interval);

    let app = routes::otp::router(state);

    // Start HTTP server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap();

    tracing::info!("OTP service running on http://{}", config.bind_addr);

    axum::serve(listener, app).await.unwrap();
}
