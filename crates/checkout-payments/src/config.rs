//! Credentials and Client Configuration
//!
//! Credentials are resolved once at startup and injected into the
//! [`CheckoutService`](crate::CheckoutService); nothing in the request path
//! reads the environment.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::{PaymentError, Result};
use crate::model::Currency;

pub const API_KEY_VAR: &str = "AIRWALLEX_API_KEY";
pub const CLIENT_ID_VAR: &str = "AIRWALLEX_CLIENT_ID";
pub const BASE_URL_VAR: &str = "AIRWALLEX_BASE_URL";
pub const TIMEOUT_VAR: &str = "AIRWALLEX_TIMEOUT_SECS";
pub const DEFAULT_CURRENCY_VAR: &str = "CHECKOUT_DEFAULT_CURRENCY";

/// Production API root
pub const DEFAULT_BASE_URL: &str = "https://api.airwallex.com/api/v1";

/// Variables that must be set for payments to work
pub const REQUIRED_VARS: [&str; 2] = [API_KEY_VAR, CLIENT_ID_VAR];

/// Airwallex API key + client ID
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    client_id: String,
}

impl Credentials {
    /// Both values must be non-blank.
    pub fn new(api_key: impl Into<String>, client_id: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        let client_id = client_id.into();

        if api_key.trim().is_empty() {
            return Err(PaymentError::Config(format!("{API_KEY_VAR} not set")));
        }
        if client_id.trim().is_empty() {
            return Err(PaymentError::Config(format!("{CLIENT_ID_VAR} not set")));
        }

        Ok(Self { api_key, client_id })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("client_id", &self.client_id)
            .finish()
    }
}

/// Everything the checkout flow needs to talk to Airwallex
#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    pub credentials: Credentials,

    /// API root, e.g. `https://api.airwallex.com/api/v1`
    pub base_url: Url,

    /// Bound on every outbound call
    pub timeout: Duration,

    /// Used when a request does not name a currency
    pub default_currency: Currency,
}

impl CheckoutConfig {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Config against the production API with default settings
    pub fn new(credentials: Credentials) -> Result<Self> {
        Ok(Self {
            credentials,
            base_url: parse_base_url(DEFAULT_BASE_URL)?,
            timeout: Self::DEFAULT_TIMEOUT,
            default_currency: Currency::default(),
        })
    }

    /// Point the client at another API root (sandbox, mock server)
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_default_currency(mut self, currency: Currency) -> Self {
        self.default_currency = currency;
        self
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials::new(
            lookup(API_KEY_VAR).unwrap_or_default(),
            lookup(CLIENT_ID_VAR).unwrap_or_default(),
        )?;

        let mut config = Self::new(credentials)?;

        if let Some(raw) = non_blank(lookup(BASE_URL_VAR)) {
            config.base_url = parse_base_url(&raw)?;
        }

        if let Some(raw) = non_blank(lookup(TIMEOUT_VAR)) {
            let secs: u64 = raw
                .parse()
                .map_err(|_| PaymentError::Config(format!("{TIMEOUT_VAR} must be whole seconds")))?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(raw) = non_blank(lookup(DEFAULT_CURRENCY_VAR)) {
            config.default_currency = Currency::parse(&raw)
                .map_err(|e| PaymentError::Config(format!("{DEFAULT_CURRENCY_VAR}: {e}")))?;
        }

        Ok(config)
    }
}

/// Required variables that are unset or blank
pub fn missing_env_vars<F>(lookup: F) -> Vec<&'static str>
where
    F: Fn(&str) -> Option<String>,
{
    REQUIRED_VARS
        .into_iter()
        .filter(|key| non_blank(lookup(*key)).is_none())
        .collect()
}

fn parse_base_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| PaymentError::Config(format!("{BASE_URL_VAR} is invalid: {e}")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
