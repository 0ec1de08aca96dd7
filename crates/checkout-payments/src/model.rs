//! Domain Models
//!
//! Checkout types and the JSON bodies exchanged with the Airwallex API.
//! Field names on the wire types match the remote contract exactly.
//! Uses `rust_decimal` for all monetary values.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{PaymentError, Result};

/// Fallback currency when neither request nor config names one
pub const DEFAULT_CURRENCY: &str = "CNY";

/// Subscriptions are always billed monthly
pub const SUBSCRIPTION_TYPE: &str = "monthly";

/// Placeholder last name for single-word customer names
pub const LAST_NAME_PLACEHOLDER: &str = "-";

// ============================================================================
// Money
// ============================================================================

/// A strictly positive amount, sent to Airwallex as a JSON number
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Decimal);

impl Amount {
    /// Reject zero and negative amounts
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(PaymentError::InvalidRequest(
                "Please provide a valid amount".into(),
            ));
        }
        Ok(Self(value))
    }

    /// Accept a JSON number or a numeric string, as browsers send either
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let parsed = match value {
            serde_json::Value::Number(n) => parse_decimal(&n.to_string()),
            serde_json::Value::String(s) => parse_decimal(s.trim()),
            _ => None,
        };

        parsed
            .ok_or_else(|| PaymentError::InvalidRequest("Please provide a valid amount".into()))
            .and_then(Self::new)
    }

    pub const fn value(&self) -> Decimal {
        self.0
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.normalize(), f)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let normalized = self.0.normalize();
        if normalized.fract().is_zero() {
            if let Some(whole) = normalized.to_i64() {
                return serializer.serialize_i64(whole);
            }
        }
        match normalized.to_f64() {
            Some(float) => serializer.serialize_f64(float),
            None => Err(serde::ser::Error::custom("amount out of range")),
        }
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = <Decimal as Deserialize>::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

/// ISO 4217 code, stored upper-case
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn parse(raw: &str) -> Result<Self> {
        let code = raw.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PaymentError::InvalidRequest(format!(
                "Unsupported currency: {raw}"
            )));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self(DEFAULT_CURRENCY.into())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Currency {
    type Error = PaymentError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

// ============================================================================
// Auth
// ============================================================================

/// Bearer token from `/authentication/login`. Never cached.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

// ============================================================================
// Customers
// ============================================================================

/// Customer details collected at checkout
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub phone: Option<String>,
}

impl CustomerInfo {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Name and email are mandatory
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() {
            return Err(PaymentError::InvalidRequest(
                "Please provide valid customer information".into(),
            ));
        }
        Ok(())
    }

    /// First token is the first name, the rest is the last name
    pub fn split_name(&self) -> (String, String) {
        let mut tokens = self.name.split_whitespace();
        let first = tokens.next().unwrap_or_default().to_string();
        let rest = tokens.collect::<Vec<_>>().join(" ");
        let last = if rest.is_empty() {
            LAST_NAME_PLACEHOLDER.to_string()
        } else {
            rest
        };
        (first, last)
    }

    /// Phone number, if one was given
    pub fn phone_number(&self) -> Option<&str> {
        self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }
}

/// Customer as stored by Airwallex
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CustomerList {
    #[serde(default)]
    pub items: Vec<Customer>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    pub request_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

// ============================================================================
// Plans
// ============================================================================

/// Subscription plan offered on the pricing page
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SubscriptionPlan {
    Basic,
    Pro,
    Enterprise,
    /// Any other plan name is passed through unchanged
    Custom(String),
}

impl SubscriptionPlan {
    pub fn parse(raw: &str) -> Result<Self> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(PaymentError::InvalidRequest(
                "Please provide a valid plan and price".into(),
            ));
        }
        Ok(match name {
            "basic" => Self::Basic,
            "pro" => Self::Pro,
            "enterprise" => Self::Enterprise,
            other => Self::Custom(other.to_string()),
        })
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Basic => "basic",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
            Self::Custom(name) => name,
        }
    }

    /// Line item shown on the Airwallex order
    pub fn product(&self, price: Amount) -> Product {
        Product {
            name: format!("{} subscription", self.as_str()),
            quantity: 1,
            price,
            desc: format!("{} {SUBSCRIPTION_TYPE} subscription", self.as_str()),
        }
    }
}

impl fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Payment intents
// ============================================================================

/// Lifecycle status reported by Airwallex
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresCustomerAction,
    RequiresCapture,
    Pending,
    Succeeded,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// Payment intent as returned by Airwallex
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,

    #[serde(default)]
    pub client_secret: String,

    pub amount: Amount,
    pub currency: Currency,
    pub status: IntentStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant_order_id: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,

    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// Airwallex emits both RFC 3339 and `+0000` offsets; unknown formats become `None`
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .or_else(|_| DateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S%z"))
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&s, "%Y-%m-%dT%H:%M:%S")
                    .map(|naive| naive.and_utc())
                    .ok()
            })
    }))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub quantity: u32,
    pub price: Amount,
    pub desc: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub products: Vec<Product>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePaymentIntentRequest {
    pub amount: Amount,
    pub currency: Currency,
    pub merchant_order_id: String,
    pub request_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
}

/// Subscription details attached to an intent after creation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionMetadata {
    pub subscription_plan: String,
    pub subscription_type: String,
    pub customer_email: String,
    pub customer_name: String,
}

impl SubscriptionMetadata {
    pub fn new(plan: &SubscriptionPlan, customer: &CustomerInfo) -> Self {
        Self {
            subscription_plan: plan.as_str().to_string(),
            subscription_type: SUBSCRIPTION_TYPE.to_string(),
            customer_email: customer.email.clone(),
            customer_name: customer.name.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePaymentIntentRequest {
    pub metadata: SubscriptionMetadata,
}
