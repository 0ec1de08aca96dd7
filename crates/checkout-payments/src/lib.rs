//! # checkout-payments
//!
//! Airwallex payment intents, customers and subscription checkout.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────┐   login    ┌──────────────┐  find/create  ┌─────────────┐
//! │ Checkout │──────────▶│   Airwallex  │◀─────────────│  Customer   │
//! │ Service  │  intent    │   REST API   │   metadata    │  Resolver   │
//! └──────────┘──────────▶└──────────────┘               └─────────────┘
//! ```
//!
//! The browser never sees the API key: the server creates the intent and
//! hands back only its id and client secret, which the hosted payment
//! element uses to collect card details.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use checkout_payments::{AirwallexClient, CheckoutConfig, CheckoutService};
//!
//! let config = CheckoutConfig::from_env()?;
//! let gateway = Arc::new(AirwallexClient::from_config(&config)?);
//! let checkout = CheckoutService::new(gateway, &config);
//!
//! let intent = checkout.create_payment_intent(dec!(99), Some("CNY")).await?;
//! // Hand intent.id + intent.client_secret to the payment element
//! ```

mod checkout;
mod config;
mod error;
mod gateway;
mod idempotency;
mod model;

pub use checkout::{
    CheckoutService, CheckoutStage, CustomerResolution, IntentSummary, MetadataOutcome,
    SubscriptionCheckout, SubscriptionRequest,
};
pub use config::{
    missing_env_vars, CheckoutConfig, Credentials, API_KEY_VAR, CLIENT_ID_VAR, DEFAULT_BASE_URL,
    REQUIRED_VARS,
};
pub use error::{PaymentError, Result};
pub use gateway::{AirwallexClient, DemoGateway, Endpoint, GatewayCall, PaymentGateway};
pub use idempotency::{IdempotencyKeyGenerator, SequentialKeyGenerator, UuidKeyGenerator};
pub use model::{
    Amount, AuthToken, CreateCustomerRequest, CreatePaymentIntentRequest, Currency, Customer,
    CustomerInfo, CustomerList, IntentStatus, Order, PaymentIntent, Product,
    SubscriptionMetadata, SubscriptionPlan, UpdatePaymentIntentRequest,
};
