//! Checkout Orchestration
//!
//! Drives one checkout attempt against a [`PaymentGateway`]:
//!
//! ```text
//! Init ─▶ Authenticated ─▶ CustomerResolved ─┬─▶ IntentCreated ─┬─▶ MetadataAttached
//!                        └▶ CustomerSkipped ─┘                  └─▶ MetadataFailed
//! ```
//!
//! Every step awaits the previous one. Failures before `IntentCreated` abort
//! the attempt; customer and metadata failures degrade the result instead.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{CheckoutConfig, Credentials};
use crate::error::{PaymentError, Result};
use crate::gateway::PaymentGateway;
use crate::idempotency::{IdempotencyKeyGenerator, UuidKeyGenerator};
use crate::model::{
    Amount, AuthToken, CreateCustomerRequest, CreatePaymentIntentRequest, Currency, CustomerInfo,
    IntentStatus, Order, PaymentIntent, SubscriptionMetadata, SubscriptionPlan,
    UpdatePaymentIntentRequest,
};

/// Progress of a single checkout attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    Init,
    Authenticated,
    CustomerResolved,
    CustomerSkipped,
    IntentCreated,
    MetadataAttached,
    MetadataFailed,
}

/// Outcome of finding or creating the paying customer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CustomerResolution {
    /// Existing customer matched by email
    Found(String),
    /// New customer created for this checkout
    Created(String),
    /// No customer bound; the intent is created without one
    Skipped(String),
}

impl CustomerResolution {
    pub fn customer_id(&self) -> Option<&str> {
        match self {
            Self::Found(id) | Self::Created(id) => Some(id),
            Self::Skipped(_) => None,
        }
    }

    pub const fn stage(&self) -> CheckoutStage {
        match self {
            Self::Found(_) | Self::Created(_) => CheckoutStage::CustomerResolved,
            Self::Skipped(_) => CheckoutStage::CustomerSkipped,
        }
    }
}

/// Outcome of attaching subscription metadata
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MetadataOutcome {
    Attached,
    Failed(String),
}

impl MetadataOutcome {
    pub const fn stage(&self) -> CheckoutStage {
        match self {
            Self::Attached => CheckoutStage::MetadataAttached,
            Self::Failed(_) => CheckoutStage::MetadataFailed,
        }
    }
}

/// What the browser needs to mount the payment element
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentSummary {
    pub id: String,
    pub client_secret: String,
    pub amount: Amount,
    pub currency: Currency,
    pub status: IntentStatus,
}

impl From<PaymentIntent> for IntentSummary {
    fn from(intent: PaymentIntent) -> Self {
        Self {
            id: intent.id,
            client_secret: intent.client_secret,
            amount: intent.amount,
            currency: intent.currency,
            status: intent.status,
        }
    }
}

/// Request to start a subscription checkout
#[derive(Clone, Debug)]
pub struct SubscriptionRequest {
    pub plan: String,
    pub price: Decimal,
    pub currency: Option<String>,
    pub customer: CustomerInfo,
}

/// Result of a subscription checkout
#[derive(Clone, Debug)]
pub struct SubscriptionCheckout {
    pub intent: IntentSummary,
    pub plan: SubscriptionPlan,
    pub customer: CustomerResolution,
    pub metadata: MetadataOutcome,
}

impl SubscriptionCheckout {
    pub fn customer_id(&self) -> Option<&str> {
        self.customer.customer_id()
    }

    /// Terminal stage reached by this attempt
    pub const fn stage(&self) -> CheckoutStage {
        self.metadata.stage()
    }
}

/// Orchestrates Airwallex calls for payments and subscriptions
pub struct CheckoutService {
    gateway: Arc<dyn PaymentGateway>,
    keys: Arc<dyn IdempotencyKeyGenerator>,
    credentials: Credentials,
    default_currency: Currency,
}

impl CheckoutService {
    pub fn new(gateway: Arc<dyn PaymentGateway>, config: &CheckoutConfig) -> Self {
        Self {
            gateway,
            keys: Arc::new(UuidKeyGenerator),
            credentials: config.credentials.clone(),
            default_currency: config.default_currency.clone(),
        }
    }

    /// Replace the idempotency key generator
    pub fn with_key_generator(mut self, keys: Arc<dyn IdempotencyKeyGenerator>) -> Self {
        self.keys = keys;
        self
    }

    /// Exchange API key + client ID for a fresh bearer token.
    ///
    /// Transport failures stay [`PaymentError::Network`]; anything the remote
    /// side answered becomes [`PaymentError::Auth`].
    pub async fn authenticate(&self) -> Result<AuthToken> {
        let gateway = self.gateway.name();
        let token = self.gateway.login(&self.credentials).await.map_err(|e| {
            tracing::error!(gateway, error = %e, "Authentication failed");
            match e {
                PaymentError::Network(_) => e,
                other => PaymentError::Auth(other.to_string()),
            }
        })?;

        tracing::debug!(gateway, stage = ?CheckoutStage::Authenticated, "Checkout stage");
        Ok(token)
    }

    /// Find the customer by email, creating one if absent.
    ///
    /// Never fails: lookup errors count as "not found" and creation errors
    /// yield [`CustomerResolution::Skipped`].
    pub async fn resolve_customer(
        &self,
        token: &AuthToken,
        customer: &CustomerInfo,
    ) -> CustomerResolution {
        match self.gateway.find_customers(token, &customer.email).await {
            Ok(list) => {
                if let Some(existing) = list.items.into_iter().next() {
                    tracing::info!(customer_id = %existing.id, "Found existing customer");
                    return CustomerResolution::Found(existing.id);
                }
            }
            Err(e) => {
                let err = PaymentError::Lookup(e.to_string());
                tracing::warn!(error = %err, "Treating customer as not found");
            }
        }

        let (first_name, last_name) = customer.split_name();
        let request = CreateCustomerRequest {
            request_id: self.keys.generate("req_customer"),
            first_name,
            last_name,
            email: customer.email.clone(),
            phone_number: customer.phone_number().map(str::to_string),
        };

        match self.gateway.create_customer(token, &request).await {
            Ok(created) => {
                tracing::info!(customer_id = %created.id, "Created customer");
                CustomerResolution::Created(created.id)
            }
            Err(e) => {
                let err = PaymentError::CustomerCreation(e.to_string());
                tracing::error!(error = %err, "Continuing without customer");
                CustomerResolution::Skipped(err.to_string())
            }
        }
    }

    /// One-off payment: validate, authenticate, create the intent
    pub async fn create_payment_intent(
        &self,
        amount: Decimal,
        currency: Option<&str>,
    ) -> Result<IntentSummary> {
        let amount = Amount::new(amount)?;
        let currency = self.currency_or_default(currency)?;

        let token = self.authenticate().await?;

        let request = CreatePaymentIntentRequest {
            amount,
            currency,
            merchant_order_id: self.keys.generate("order"),
            request_id: self.keys.generate("req"),
            customer_id: None,
            order: None,
        };

        let intent = self
            .submit_intent(&token, &request, PaymentError::IntentCreation)
            .await?;
        Ok(intent.into())
    }

    /// Subscription checkout: customer binding, order line item, metadata
    pub async fn create_subscription(
        &self,
        request: SubscriptionRequest,
    ) -> Result<SubscriptionCheckout> {
        let plan = SubscriptionPlan::parse(&request.plan)?;
        let price = Amount::new(request.price).map_err(|_| {
            PaymentError::InvalidRequest("Please provide a valid plan and price".into())
        })?;
        let currency = self.currency_or_default(request.currency.as_deref())?;
        request.customer.validate()?;

        let token = self.authenticate().await?;

        let customer = self.resolve_customer(&token, &request.customer).await;
        tracing::debug!(stage = ?customer.stage(), "Checkout stage");

        let intent_request = CreatePaymentIntentRequest {
            amount: price,
            currency,
            merchant_order_id: self.keys.generate(&format!("subscription_{plan}")),
            request_id: self.keys.generate("req"),
            customer_id: customer.customer_id().map(str::to_string),
            order: Some(Order {
                products: vec![plan.product(price)],
            }),
        };

        let intent = self
            .submit_intent(&token, &intent_request, PaymentError::SubscriptionCreation)
            .await?;

        let metadata = self
            .attach_metadata(
                &token,
                &intent.id,
                SubscriptionMetadata::new(&plan, &request.customer),
            )
            .await;

        tracing::info!(
            intent_id = %intent.id,
            plan = %plan,
            customer_id = ?customer.customer_id(),
            stage = ?metadata.stage(),
            "Subscription checkout ready"
        );

        Ok(SubscriptionCheckout {
            intent: intent.into(),
            plan,
            customer,
            metadata,
        })
    }

    /// Fetch the current state of an intent
    pub async fn payment_status(&self, intent_id: &str) -> Result<PaymentIntent> {
        validate_intent_id(intent_id)?;

        let token = self.authenticate().await?;
        self.gateway
            .retrieve_payment_intent(&token, intent_id)
            .await
            .map_err(|e| {
                tracing::error!(intent_id, error = %e, "Failed to fetch payment intent");
                PaymentError::IntentRetrieval(e.to_string())
            })
    }

    async fn submit_intent(
        &self,
        token: &AuthToken,
        request: &CreatePaymentIntentRequest,
        failure: fn(String) -> PaymentError,
    ) -> Result<PaymentIntent> {
        let intent = self
            .gateway
            .create_payment_intent(token, request)
            .await
            .map_err(|e| {
                tracing::error!(
                    merchant_order_id = %request.merchant_order_id,
                    error = %e,
                    "Airwallex payment intent creation failed"
                );
                failure(e.to_string())
            })?;

        tracing::info!(
            intent_id = %intent.id,
            amount = %intent.amount,
            currency = %intent.currency,
            stage = ?CheckoutStage::IntentCreated,
            "Created payment intent"
        );
        Ok(intent)
    }

    async fn attach_metadata(
        &self,
        token: &AuthToken,
        intent_id: &str,
        metadata: SubscriptionMetadata,
    ) -> MetadataOutcome {
        let request = UpdatePaymentIntentRequest { metadata };

        match self
            .gateway
            .update_payment_intent(token, intent_id, &request)
            .await
        {
            Ok(()) => MetadataOutcome::Attached,
            Err(e) => {
                let err = PaymentError::MetadataAttach(e.to_string());
                tracing::warn!(intent_id, error = %err, "Intent left without subscription metadata");
                MetadataOutcome::Failed(err.to_string())
            }
        }
    }

    fn currency_or_default(&self, currency: Option<&str>) -> Result<Currency> {
        match currency.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Currency::parse(code),
            None => Ok(self.default_currency.clone()),
        }
    }
}

/// Intent ids end up in the URL path
fn validate_intent_id(intent_id: &str) -> Result<()> {
    let valid = !intent_id.is_empty()
        && intent_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(PaymentError::InvalidRequest("Invalid payment intent id".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{DemoGateway, Endpoint, GatewayCall};
    use crate::idempotency::SequentialKeyGenerator;
    use rust_decimal_macros::dec;

    fn service(gateway: Arc<DemoGateway>) -> CheckoutService {
        let config = CheckoutConfig::new(Credentials::new("key", "client").unwrap()).unwrap();
        CheckoutService::new(gateway, &config)
            .with_key_generator(Arc::new(SequentialKeyGenerator::new()))
    }

    fn jane() -> CustomerInfo {
        CustomerInfo::new("Jane Doe", "jane@x.com")
    }

    fn pro_subscription() -> SubscriptionRequest {
        SubscriptionRequest {
            plan: "pro".into(),
            price: dec!(199),
            currency: None,
            customer: jane(),
        }
    }

    #[tokio::test]
    async fn test_create_payment_intent_single_create_call() {
        let gateway = Arc::new(DemoGateway::new());
        let svc = service(gateway.clone());

        let summary = svc.create_payment_intent(dec!(99), Some("CNY")).await.unwrap();

        assert_eq!(summary.amount.value(), dec!(99));
        assert_eq!(summary.currency.as_str(), "CNY");
        assert_eq!(summary.status, IntentStatus::RequiresPaymentMethod);
        assert!(!summary.client_secret.is_empty());
        assert_eq!(gateway.call_count(Endpoint::CreatePaymentIntent), 1);
        assert_eq!(gateway.call_count(Endpoint::Login), 1);
    }

    #[tokio::test]
    async fn test_currency_defaults_to_config() {
        let gateway = Arc::new(DemoGateway::new());
        let svc = service(gateway);

        let summary = svc.create_payment_intent(dec!(10), None).await.unwrap();
        assert_eq!(summary.currency.as_str(), "CNY");
    }

    #[tokio::test]
    async fn test_invalid_amount_rejected_before_network() {
        let gateway = Arc::new(DemoGateway::new());
        let svc = service(gateway.clone());

        for amount in [dec!(0), dec!(-1)] {
            let err = svc.create_payment_intent(amount, None).await.unwrap_err();
            assert!(err.is_client_error());
        }
        let err = svc.create_payment_intent(dec!(5), Some("XX")).await.unwrap_err();
        assert!(err.is_client_error());

        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_auth_failure_aborts() {
        let gateway = Arc::new(DemoGateway::new().failing(Endpoint::Login));
        let svc = service(gateway.clone());

        let err = svc.create_payment_intent(dec!(99), None).await.unwrap_err();
        assert!(matches!(err, PaymentError::Auth(_)));
        assert_eq!(gateway.call_count(Endpoint::CreatePaymentIntent), 0);
    }

    #[tokio::test]
    async fn test_intent_creation_failure_is_fatal() {
        let gateway = Arc::new(DemoGateway::new().failing(Endpoint::CreatePaymentIntent));
        let svc = service(gateway.clone());

        let err = svc.create_subscription(pro_subscription()).await.unwrap_err();
        assert!(matches!(err, PaymentError::SubscriptionCreation(_)));
        assert_eq!(err.user_message(), "Failed to create subscription");
        assert_eq!(gateway.call_count(Endpoint::UpdatePaymentIntent), 0);

        let err = svc.create_payment_intent(dec!(99), None).await.unwrap_err();
        assert!(matches!(err, PaymentError::IntentCreation(_)));
        assert_eq!(err.user_message(), "Failed to create payment");
    }

    #[tokio::test]
    async fn test_resolve_existing_customer_is_idempotent() {
        let gateway = Arc::new(DemoGateway::new().with_customer("cus_1", "jane@x.com"));
        let svc = service(gateway.clone());
        let token = AuthToken::new("t");

        let first = svc.resolve_customer(&token, &jane()).await;
        let second = svc.resolve_customer(&token, &jane()).await;

        assert_eq!(first, CustomerResolution::Found("cus_1".into()));
        assert_eq!(second, first);
        assert_eq!(gateway.call_count(Endpoint::FindCustomers), 2);
        assert_eq!(gateway.call_count(Endpoint::CreateCustomer), 0);
    }

    #[tokio::test]
    async fn test_customer_phone_is_trimmed_or_omitted() {
        let gateway = Arc::new(DemoGateway::new());
        let svc = service(gateway.clone());
        let token = AuthToken::new("t");

        svc.resolve_customer(&token, &jane().with_phone("  +86 138 0000 0000 "))
            .await;
        svc.resolve_customer(
            &token,
            &CustomerInfo::new("Prince", "p@x.com").with_phone("   "),
        )
        .await;

        let created: Vec<CreateCustomerRequest> = gateway
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::CreateCustomer(req) => Some(req),
                _ => None,
            })
            .collect();
        assert_eq!(created.len(), 2);

        assert_eq!(created[0].phone_number.as_deref(), Some("+86 138 0000 0000"));
        let body = serde_json::to_value(&created[0]).unwrap();
        assert_eq!(body["phone_number"], "+86 138 0000 0000");

        assert_eq!(created[1].phone_number, None);
        let body = serde_json::to_value(&created[1]).unwrap();
        assert!(body.get("phone_number").is_none());
    }

    #[tokio::test]
    async fn test_lookup_failure_falls_through_to_create() {
        let gateway = Arc::new(DemoGateway::new().failing(Endpoint::FindCustomers));
        let svc = service(gateway.clone());

        let resolution = svc.resolve_customer(&AuthToken::new("t"), &jane()).await;
        assert!(matches!(resolution, CustomerResolution::Created(_)));
    }

    #[tokio::test]
    async fn test_customer_creation_failure_skips_customer() {
        let gateway = Arc::new(DemoGateway::new().failing(Endpoint::CreateCustomer));
        let svc = service(gateway.clone());

        let checkout = svc.create_subscription(pro_subscription()).await.unwrap();

        assert!(matches!(checkout.customer, CustomerResolution::Skipped(_)));
        assert_eq!(checkout.customer_id(), None);

        let created = gateway
            .calls()
            .into_iter()
            .find_map(|call| match call {
                GatewayCall::CreatePaymentIntent(req) => Some(req),
                _ => None,
            })
            .unwrap();
        assert_eq!(created.customer_id, None);
        let body = serde_json::to_value(&created).unwrap();
        assert!(body.get("customer_id").is_none());
    }

    #[tokio::test]
    async fn test_metadata_failure_keeps_intent() {
        let gateway = Arc::new(DemoGateway::new().failing(Endpoint::UpdatePaymentIntent));
        let svc = service(gateway.clone());

        let checkout = svc.create_subscription(pro_subscription()).await.unwrap();

        assert!(matches!(checkout.metadata, MetadataOutcome::Failed(_)));
        assert_eq!(checkout.stage(), CheckoutStage::MetadataFailed);

        let stored = svc.payment_status(&checkout.intent.id).await.unwrap();
        assert_eq!(stored.client_secret, checkout.intent.client_secret);
    }

    #[tokio::test]
    async fn test_subscription_scenario() {
        let gateway = Arc::new(DemoGateway::new());
        let svc = service(gateway.clone());

        let checkout = svc.create_subscription(pro_subscription()).await.unwrap();
        assert_eq!(checkout.stage(), CheckoutStage::MetadataAttached);
        assert_eq!(checkout.intent.amount.value(), dec!(199));

        let calls = gateway.calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[0], GatewayCall::Login);
        assert_eq!(
            calls[1],
            GatewayCall::FindCustomers {
                email: "jane@x.com".into()
            }
        );

        let GatewayCall::CreateCustomer(customer) = &calls[2] else {
            panic!("expected customer creation, got {:?}", calls[2]);
        };
        assert_eq!(customer.first_name, "Jane");
        assert_eq!(customer.last_name, "Doe");
        assert_eq!(customer.request_id, "req_customer_1");

        let GatewayCall::CreatePaymentIntent(intent) = &calls[3] else {
            panic!("expected intent creation, got {:?}", calls[3]);
        };
        let order = intent.order.as_ref().unwrap();
        assert_eq!(order.products[0].price.value(), dec!(199));
        assert_eq!(order.products[0].quantity, 1);
        assert_eq!(intent.merchant_order_id, "subscription_pro_2");
        assert_eq!(intent.customer_id.as_deref(), checkout.customer_id());
        assert!(checkout.customer_id().is_some());

        let GatewayCall::UpdatePaymentIntent { intent_id, request } = &calls[4] else {
            panic!("expected metadata update, got {:?}", calls[4]);
        };
        assert_eq!(intent_id, &checkout.intent.id);
        assert_eq!(request.metadata.subscription_plan, "pro");
        assert_eq!(request.metadata.subscription_type, "monthly");
        assert_eq!(request.metadata.customer_email, "jane@x.com");
        assert_eq!(request.metadata.customer_name, "Jane Doe");
    }

    #[tokio::test]
    async fn test_subscription_validation() {
        let gateway = Arc::new(DemoGateway::new());
        let svc = service(gateway.clone());

        let mut no_plan = pro_subscription();
        no_plan.plan = String::new();
        assert!(svc.create_subscription(no_plan).await.unwrap_err().is_client_error());

        let mut free = pro_subscription();
        free.price = dec!(0);
        assert!(svc.create_subscription(free).await.unwrap_err().is_client_error());

        let mut anonymous = pro_subscription();
        anonymous.customer.email = String::new();
        assert!(svc.create_subscription(anonymous).await.unwrap_err().is_client_error());

        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_payment_status_rejects_path_injection() {
        let gateway = Arc::new(DemoGateway::new());
        let svc = service(gateway.clone());

        let err = svc.payment_status("../customers/list").await.unwrap_err();
        assert!(err.is_client_error());
        assert!(gateway.calls().is_empty());
    }
}
