//! Airwallex REST Client
//!
//! Thin reqwest wrapper over the Airwallex payment API. Every call carries
//! the configured timeout; non-2xx responses are returned as
//! [`PaymentError::Api`] with the raw remote body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use super::PaymentGateway;
use crate::config::{CheckoutConfig, Credentials};
use crate::error::{PaymentError, Result};
use crate::model::{
    AuthToken, CreateCustomerRequest, CreatePaymentIntentRequest, Customer, CustomerList,
    LoginResponse, PaymentIntent, UpdatePaymentIntentRequest,
};

const LOGIN: &str = "POST /authentication/login";
const LIST_CUSTOMERS: &str = "GET /pa/customers/list";
const CREATE_CUSTOMER: &str = "POST /pa/customers/create";
const CREATE_INTENT: &str = "POST /pa/payment_intents/create";
const UPDATE_INTENT: &str = "POST /pa/payment_intents/{id}";
const RETRIEVE_INTENT: &str = "GET /pa/payment_intents/{id}";

/// HTTP client for the Airwallex API
#[derive(Clone, Debug)]
pub struct AirwallexClient {
    http: Client,
    base_url: Url,
    timeout: Duration,
}

impl AirwallexClient {
    /// Create a client rooted at `base_url`
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    /// Create from configuration
    pub fn from_config(config: &CheckoutConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), config.timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder, token: &AuthToken) -> RequestBuilder {
        request
            .header(CONTENT_TYPE, "application/json")
            .bearer_auth(token.as_str())
            .timeout(self.timeout)
    }

    /// Send, check the status, decode the JSON body
    async fn send<R>(request: RequestBuilder, endpoint: &'static str) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let response = Self::checked(request, endpoint).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send and check the status; the body is ignored
    async fn send_unit(request: RequestBuilder, endpoint: &'static str) -> Result<()> {
        Self::checked(request, endpoint).await.map(drop)
    }

    async fn checked(request: RequestBuilder, endpoint: &'static str) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(endpoint, status = status.as_u16(), "Airwallex call failed");
            return Err(PaymentError::Api {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(endpoint, status = status.as_u16(), "Airwallex call succeeded");
        Ok(response)
    }
}

#[async_trait]
impl PaymentGateway for AirwallexClient {
    async fn login(&self, credentials: &Credentials) -> Result<AuthToken> {
        let request = self
            .http
            .post(self.url("authentication/login"))
            .header(CONTENT_TYPE, "application/json")
            .header("x-api-key", credentials.api_key())
            .header("x-client-id", credentials.client_id())
            .timeout(self.timeout);

        let login: LoginResponse = Self::send(request, LOGIN).await?;
        Ok(AuthToken::new(login.token))
    }

    async fn find_customers(&self, token: &AuthToken, email: &str) -> Result<CustomerList> {
        let request = self
            .authorized(self.http.get(self.url("pa/customers/list")), token)
            .query(&[("email", email)]);

        Self::send(request, LIST_CUSTOMERS).await
    }

    async fn create_customer(
        &self,
        token: &AuthToken,
        request: &CreateCustomerRequest,
    ) -> Result<Customer> {
        let request = self
            .authorized(self.http.post(self.url("pa/customers/create")), token)
            .json(request);

        Self::send(request, CREATE_CUSTOMER).await
    }

    async fn create_payment_intent(
        &self,
        token: &AuthToken,
        request: &CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent> {
        let request = self
            .authorized(self.http.post(self.url("pa/payment_intents/create")), token)
            .json(request);

        Self::send(request, CREATE_INTENT).await
    }

    async fn update_payment_intent(
        &self,
        token: &AuthToken,
        intent_id: &str,
        request: &UpdatePaymentIntentRequest,
    ) -> Result<()> {
        let url = self.url(&format!("pa/payment_intents/{intent_id}"));
        let request = self.authorized(self.http.post(url), token).json(request);

        Self::send_unit(request, UPDATE_INTENT).await
    }

    async fn retrieve_payment_intent(
        &self,
        token: &AuthToken,
        intent_id: &str,
    ) -> Result<PaymentIntent> {
        let url = self.url(&format!("pa/payment_intents/{intent_id}"));
        let request = self.authorized(self.http.get(url), token);

        Self::send(request, RETRIEVE_INTENT).await
    }

    fn name(&self) -> &str {
        "Airwallex"
    }
}
