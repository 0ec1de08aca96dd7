//! Demo Gateway
//!
//! In-memory stand-in for Airwallex. Fabricates customers and intents,
//! records every call, and can be told to fail individual endpoints.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::PaymentGateway;
use crate::config::Credentials;
use crate::error::{PaymentError, Result};
use crate::model::{
    AuthToken, CreateCustomerRequest, CreatePaymentIntentRequest, Customer, CustomerList,
    IntentStatus, PaymentIntent, UpdatePaymentIntentRequest,
};

/// Remote endpoints, used to inject failures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Login,
    FindCustomers,
    CreateCustomer,
    CreatePaymentIntent,
    UpdatePaymentIntent,
    RetrievePaymentIntent,
}

impl Endpoint {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "POST /authentication/login",
            Self::FindCustomers => "GET /pa/customers/list",
            Self::CreateCustomer => "POST /pa/customers/create",
            Self::CreatePaymentIntent => "POST /pa/payment_intents/create",
            Self::UpdatePaymentIntent => "POST /pa/payment_intents/{id}",
            Self::RetrievePaymentIntent => "GET /pa/payment_intents/{id}",
        }
    }
}

/// A call received by the demo gateway
#[derive(Clone, Debug, PartialEq)]
pub enum GatewayCall {
    Login,
    FindCustomers { email: String },
    CreateCustomer(CreateCustomerRequest),
    CreatePaymentIntent(CreatePaymentIntentRequest),
    UpdatePaymentIntent {
        intent_id: String,
        request: UpdatePaymentIntentRequest,
    },
    RetrievePaymentIntent { intent_id: String },
}

impl GatewayCall {
    pub const fn endpoint(&self) -> Endpoint {
        match self {
            Self::Login => Endpoint::Login,
            Self::FindCustomers { .. } => Endpoint::FindCustomers,
            Self::CreateCustomer(_) => Endpoint::CreateCustomer,
            Self::CreatePaymentIntent(_) => Endpoint::CreatePaymentIntent,
            Self::UpdatePaymentIntent { .. } => Endpoint::UpdatePaymentIntent,
            Self::RetrievePaymentIntent { .. } => Endpoint::RetrievePaymentIntent,
        }
    }
}

#[derive(Default)]
struct DemoState {
    customers: Vec<Customer>,
    intents: HashMap<String, PaymentIntent>,
    calls: Vec<GatewayCall>,
    failing: HashSet<Endpoint>,
    next_id: u64,
}

impl DemoState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory payment gateway
#[derive(Default)]
pub struct DemoGateway {
    state: Mutex<DemoState>,
}

impl DemoGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing customer
    pub fn with_customer(self, id: impl Into<String>, email: impl Into<String>) -> Self {
        self.lock().customers.push(Customer {
            id: id.into(),
            first_name: None,
            last_name: None,
            email: Some(email.into()),
            phone_number: None,
        });
        self
    }

    /// Make an endpoint answer with a 500
    pub fn failing(self, endpoint: Endpoint) -> Self {
        self.lock().failing.insert(endpoint);
        self
    }

    /// All calls received so far, in order
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.clone()
    }

    /// Number of calls made to one endpoint
    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.endpoint() == endpoint)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, DemoState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call and fail it if configured to
    fn record(&self, call: GatewayCall) -> Result<MutexGuard<'_, DemoState>> {
        let mut state = self.lock();
        let endpoint = call.endpoint();
        state.calls.push(call);

        if state.failing.contains(&endpoint) {
            return Err(PaymentError::Api {
                endpoint: endpoint.as_str(),
                status: 500,
                body: r#"{"code":"internal_error","message":"demo failure"}"#.into(),
            });
        }
        Ok(state)
    }
}

#[async_trait]
impl PaymentGateway for DemoGateway {
    async fn login(&self, _credentials: &Credentials) -> Result<AuthToken> {
        let mut state = self.record(GatewayCall::Login)?;
        let n = state.next_id();
        Ok(AuthToken::new(format!("demo_token_{n}")))
    }

    async fn find_customers(&self, _token: &AuthToken, email: &str) -> Result<CustomerList> {
        let state = self.record(GatewayCall::FindCustomers {
            email: email.to_string(),
        })?;

        let items = state
            .customers
            .iter()
            .filter(|c| c.email.as_deref() == Some(email))
            .cloned()
            .collect();

        Ok(CustomerList { items })
    }

    async fn create_customer(
        &self,
        _token: &AuthToken,
        request: &CreateCustomerRequest,
    ) -> Result<Customer> {
        let mut state = self.record(GatewayCall::CreateCustomer(request.clone()))?;
        let n = state.next_id();

        let customer = Customer {
            id: format!("cus_demo_{n}"),
            first_name: Some(request.first_name.clone()),
            last_name: Some(request.last_name.clone()),
            email: Some(request.email.clone()),
            phone_number: request.phone_number.clone(),
        };
        state.customers.push(customer.clone());

        Ok(customer)
    }

    async fn create_payment_intent(
        &self,
        _token: &AuthToken,
        request: &CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent> {
        let mut state = self.record(GatewayCall::CreatePaymentIntent(request.clone()))?;
        let n = state.next_id();
        let id = format!("int_demo_{n}");

        let intent = PaymentIntent {
            client_secret: format!("secret_{id}"),
            id: id.clone(),
            amount: request.amount,
            currency: request.currency.clone(),
            status: IntentStatus::RequiresPaymentMethod,
            customer_id: request.customer_id.clone(),
            merchant_order_id: Some(request.merchant_order_id.clone()),
            metadata: Default::default(),
            created_at: Some(chrono::Utc::now()),
        };
        state.intents.insert(id, intent.clone());

        Ok(intent)
    }

    async fn update_payment_intent(
        &self,
        _token: &AuthToken,
        intent_id: &str,
        request: &UpdatePaymentIntentRequest,
    ) -> Result<()> {
        let mut state = self.record(GatewayCall::UpdatePaymentIntent {
            intent_id: intent_id.to_string(),
            request: request.clone(),
        })?;

        let metadata = serde_json::to_value(&request.metadata)?;
        let intent = state.intents.get_mut(intent_id).ok_or_else(|| PaymentError::Api {
            endpoint: Endpoint::UpdatePaymentIntent.as_str(),
            status: 404,
            body: format!("payment intent {intent_id} not found"),
        })?;

        if let serde_json::Value::Object(fields) = metadata {
            intent.metadata.extend(fields);
        }

        Ok(())
    }

    async fn retrieve_payment_intent(
        &self,
        _token: &AuthToken,
        intent_id: &str,
    ) -> Result<PaymentIntent> {
        let state = self.record(GatewayCall::RetrievePaymentIntent {
            intent_id: intent_id.to_string(),
        })?;

        state.intents.get(intent_id).cloned().ok_or_else(|| PaymentError::Api {
            endpoint: Endpoint::RetrievePaymentIntent.as_str(),
            status: 404,
            body: format!("payment intent {intent_id} not found"),
        })
    }

    fn name(&self) -> &str {
        "Demo"
    }
}
