//! HTTP Handlers

use axum::{
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use checkout_payments::{
    Amount, CheckoutService, Currency, CustomerInfo, IntentStatus, PaymentError,
    SubscriptionRequest,
};

use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub payments_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntentRequest {
    #[serde(default)]
    pub amount: serde_json::Value,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    pub id: String,
    pub client_secret: String,
    pub amount: Amount,
    pub currency: Currency,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionCheckoutRequest {
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub price: serde_json::Value,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer: Option<CustomerInfo>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub id: String,
    pub client_secret: String,
    pub amount: Amount,
    pub currency: Currency,
    pub customer_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub id: String,
    pub amount: Amount,
    pub currency: Currency,
    pub status: IntentStatus,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        payments_configured: state.checkout.is_some(),
    })
}

/// Create a one-off payment intent
pub async fn create_payment_intent(
    State(state): State<AppState>,
    payload: Result<Json<PaymentIntentRequest>, JsonRejection>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let checkout = checkout_service(&state)?;
    let Json(payload) = payload.map_err(bad_json)?;

    let amount = Amount::from_json(&payload.amount).map_err(payment_error)?;

    let intent = checkout
        .create_payment_intent(amount.value(), payload.currency.as_deref())
        .await
        .map_err(payment_error)?;

    Ok(Json(PaymentIntentResponse {
        id: intent.id,
        client_secret: intent.client_secret,
        amount: intent.amount,
        currency: intent.currency,
    }))
}

/// Create a subscription payment intent
pub async fn create_subscription(
    State(state): State<AppState>,
    payload: Result<Json<SubscriptionCheckoutRequest>, JsonRejection>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let checkout = checkout_service(&state)?;
    let Json(payload) = payload.map_err(bad_json)?;

    let price = Amount::from_json(&payload.price).map_err(|_| {
        payment_error(PaymentError::InvalidRequest(
            "Please provide a valid plan and price".into(),
        ))
    })?;

    let customer = payload.customer.ok_or_else(|| {
        payment_error(PaymentError::InvalidRequest(
            "Please provide valid customer information".into(),
        ))
    })?;

    let result = checkout
        .create_subscription(SubscriptionRequest {
            plan: payload.plan,
            price: price.value(),
            currency: payload.currency,
            customer,
        })
        .await
        .map_err(payment_error)?;

    let customer_id = result.customer_id().map(str::to_string);
    Ok(Json(SubscriptionResponse {
        id: result.intent.id,
        client_secret: result.intent.client_secret,
        amount: result.intent.amount,
        currency: result.intent.currency,
        customer_id,
    }))
}

/// Current status of a payment intent (success page)
pub async fn payment_status(
    State(state): State<AppState>,
    Path(intent_id): Path<String>,
) -> Result<Json<PaymentStatusResponse>, ApiError> {
    let checkout = checkout_service(&state)?;

    let intent = checkout
        .payment_status(&intent_id)
        .await
        .map_err(payment_error)?;

    Ok(Json(PaymentStatusResponse {
        id: intent.id,
        amount: intent.amount,
        currency: intent.currency,
        status: intent.status,
    }))
}

/// Any method other than POST on the checkout endpoints
pub async fn method_not_allowed() -> ApiError {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse {
            message: "Only POST requests are supported".into(),
        }),
    )
}

// ============================================================================
// Helpers
// ============================================================================

fn checkout_service(state: &AppState) -> Result<&CheckoutService, ApiError> {
    state.checkout.as_deref().ok_or_else(|| {
        tracing::error!("Airwallex credentials missing - rejecting payment request");
        payment_error(PaymentError::Config("Airwallex credentials missing".into()))
    })
}

fn bad_json(rejection: JsonRejection) -> ApiError {
    tracing::debug!("Rejected request body: {}", rejection);
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            message: "Invalid request body".into(),
        }),
    )
}

/// Map to a status code and a message that never leaks remote detail
fn payment_error(err: PaymentError) -> ApiError {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!("Checkout error: {}", err);
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(ErrorResponse {
            message: err.user_message(),
        }),
    )
}
