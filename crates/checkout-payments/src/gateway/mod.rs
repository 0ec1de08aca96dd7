//! Payment Gateway
//!
//! One method per Airwallex endpoint the checkout flow touches. The
//! orchestrator only ever talks to this trait, so the HTTP client and the
//! in-memory demo gateway are interchangeable.

mod airwallex;
mod demo;

pub use airwallex::AirwallexClient;
pub use demo::{DemoGateway, Endpoint, GatewayCall};

use async_trait::async_trait;

use crate::config::Credentials;
use crate::error::Result;
use crate::model::{
    AuthToken, CreateCustomerRequest, CreatePaymentIntentRequest, Customer, CustomerList,
    PaymentIntent, UpdatePaymentIntentRequest,
};

/// Payment provider client trait (Strategy pattern)
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// `POST /authentication/login`
    async fn login(&self, credentials: &Credentials) -> Result<AuthToken>;

    /// `GET /pa/customers/list?email=`
    async fn find_customers(&self, token: &AuthToken, email: &str) -> Result<CustomerList>;

    /// `POST /pa/customers/create`
    async fn create_customer(
        &self,
        token: &AuthToken,
        request: &CreateCustomerRequest,
    ) -> Result<Customer>;

    /// `POST /pa/payment_intents/create`
    async fn create_payment_intent(
        &self,
        token: &AuthToken,
        request: &CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent>;

    /// `POST /pa/payment_intents/{id}`. Success is the 2xx status alone;
    /// the response body is not part of the contract.
    async fn update_payment_intent(
        &self,
        token: &AuthToken,
        intent_id: &str,
        request: &UpdatePaymentIntentRequest,
    ) -> Result<()>;

    /// `GET /pa/payment_intents/{id}`
    async fn retrieve_payment_intent(
        &self,
        token: &AuthToken,
        intent_id: &str,
    ) -> Result<PaymentIntent>;

    /// Gateway name for logs
    fn name(&self) -> &str;
}
