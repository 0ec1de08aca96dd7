//! Airwallex checkout HTTP server
//!
//! Axum-based server exposing the JSON endpoints the checkout pages call.
//! The API key never leaves this process; browsers only receive intent ids
//! and client secrets.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{routing::{get, post}, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkout_payments::{missing_env_vars, AirwallexClient, CheckoutConfig, CheckoutService};

use crate::handlers::{
    create_payment_intent, create_subscription, health_check, method_not_allowed, payment_status,
};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState::new(init_checkout());

    let app = build_router(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("checkout-server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                     - Health check");
    tracing::info!("  POST /api/create-payment-intent  - One-off payment");
    tracing::info!("  POST /api/create-subscription    - Subscription checkout");
    tracing::info!("  GET  /api/payment-intents/{{id}}   - Payment status");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the checkout service, or `None` when Airwallex is not configured
fn init_checkout() -> Option<CheckoutService> {
    let missing = missing_env_vars(|key| std::env::var(key).ok());
    if !missing.is_empty() {
        tracing::warn!(missing = ?missing, "Airwallex not configured - payments disabled");
        tracing::warn!("  Set AIRWALLEX_API_KEY and AIRWALLEX_CLIENT_ID in .env");
        return None;
    }

    let config = match CheckoutConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid Airwallex configuration: {}", e);
            return None;
        }
    };

    let gateway = match AirwallexClient::from_config(&config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to build Airwallex client: {}", e);
            return None;
        }
    };

    tracing::info!(
        base_url = %config.base_url,
        timeout_secs = config.timeout.as_secs(),
        default_currency = %config.default_currency,
        "Airwallex configured"
    );

    Some(CheckoutService::new(Arc::new(gateway), &config))
}

/// Routes, CORS and request tracing
fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/create-payment-intent",
            post(create_payment_intent).fallback(method_not_allowed),
        )
        .route(
            "/api/create-subscription",
            post(create_subscription).fallback(method_not_allowed),
        )
        .route("/api/payment-intents/{id}", get(payment_status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
