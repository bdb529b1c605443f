//! API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use api::config::Config;
use api::gateway::StripeGateway;
use api::mailer::SmtpMailer;
use api::AppState;
use store::PgStore;
use tokio::signal;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    // 1. Load .env (ignored if absent) and initialize tracing
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Load configuration and connect to the database (runs migrations)
    let config = Config::from_env();
    let store = PgStore::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    // 4. Wire up the payment gateway and mailer
    let gateway = StripeGateway::new(config.stripe_secret_key.clone());
    let mailer = SmtpMailer::new(
        &config.smtp_host,
        config.smtp_port,
        &config.smtp_user,
        &config.smtp_pass,
        config.contact_email.clone(),
    )
    .expect("failed to build SMTP mailer");

    // 5. Build the application with per-peer rate limiting
    let addr = config.addr();
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .period(config.rate_limit_window / config.rate_limit_max)
            .burst_size(config.rate_limit_max)
            .finish()
            .expect("invalid rate limit configuration"),
    );

    let state = Arc::new(AppState {
        store: Arc::new(store),
        gateway: Arc::new(gateway),
        mailer: Arc::new(mailer),
        config,
    });
    let app = api::create_app(state, metrics_handle).layer(GovernorLayer::new(governor_config));

    // 6. Start server
    tracing::info!(%addr, "starting API server");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("server error");

    tracing::info!("server shut down gracefully");
}
