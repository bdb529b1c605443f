//! HTTP API server for the training-course storefront.
//!
//! Provides REST endpoints for the course catalogue, orders, payments,
//! authentication, and contact forms, with structured logging (tracing)
//! and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod mailer;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{delete, get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use config::Config;
use gateway::PaymentGateway;
use mailer::Mailer;

/// Shared state behind every handler.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Config,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .frontend_url
                .parse::<HeaderValue>()
                .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:3000")),
        )
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    let body_limit = state.config.body_limit_bytes;
    let static_dir = state.config.static_dir.clone();

    let api = Router::new()
        .route("/api/health", get(routes::health::check))
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/me", get(routes::auth::me))
        .route("/api/courses", get(routes::courses::list))
        .route("/api/courses/{slug}", get(routes::courses::get_by_slug))
        .route(
            "/api/courses/category/{category}",
            get(routes::courses::by_category),
        )
        .route("/api/courses/search/{query}", get(routes::courses::search))
        .route("/api/courses/{id}/review", post(routes::courses::add_review))
        .route("/api/orders", get(routes::orders::list))
        .route("/api/orders", post(routes::orders::create))
        .route("/api/orders/{order_number}", get(routes::orders::get))
        .route(
            "/api/orders/{order_number}/status",
            put(routes::orders::update_status),
        )
        .route(
            "/api/orders/{order_number}/payment",
            put(routes::orders::update_payment),
        )
        .route("/api/orders/{order_number}", delete(routes::orders::cancel))
        .route(
            "/api/payments/create-payment-intent",
            post(routes::payments::create_payment_intent),
        )
        .route(
            "/api/payments/confirm-payment",
            post(routes::payments::confirm_payment),
        )
        .route(
            "/api/payments/paypal-create-order",
            post(routes::payments::paypal_create_order),
        )
        .route(
            "/api/payments/paypal-capture",
            post(routes::payments::paypal_capture),
        )
        .route(
            "/api/payments/webhook/stripe",
            post(routes::payments::stripe_webhook),
        )
        .route("/api/payments/methods", get(routes::payments::methods))
        .route("/api/contact", post(routes::contact::submit))
        .route("/api/contact/quote", post(routes::contact::quote))
        .with_state(state);

    let mut app = api.merge(metrics_router);

    // Serve the built frontend when a static directory is configured,
    // falling back to index.html for client-side routes.
    if let Some(dir) = static_dir {
        let index = std::path::Path::new(&dir).join("index.html");
        app = app.fallback_service(ServeDir::new(&dir).fallback(ServeFile::new(index)));
    }

    app.layer(cors)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
}
