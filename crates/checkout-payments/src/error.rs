//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Checkout and payment-provider errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Missing or invalid credentials/configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied an invalid amount, currency, plan or customer
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Login against the provider was rejected
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Customer search failed
    #[error("Customer lookup failed: {0}")]
    Lookup(String),

    /// Customer creation failed
    #[error("Customer creation failed: {0}")]
    CustomerCreation(String),

    /// Payment intent creation failed
    #[error("Payment intent creation failed: {0}")]
    IntentCreation(String),

    /// Subscription intent creation failed
    #[error("Subscription creation failed: {0}")]
    SubscriptionCreation(String),

    /// Subscription metadata could not be attached to the intent
    #[error("Metadata attach failed: {0}")]
    MetadataAttach(String),

    /// Payment intent could not be fetched
    #[error("Payment intent retrieval failed: {0}")]
    IntentRetrieval(String),

    /// Provider answered with a non-success status
    #[error("Airwallex API error: {endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PaymentError {
    /// Whether the caller is at fault (maps to a 4xx response)
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }

    /// Get user-friendly message. Never includes remote payloads or secrets.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidRequest(msg) => msg.clone(),
            Self::Config(_) => "Server configuration error".into(),
            Self::Auth(_) => "Payment service authentication failed".into(),
            Self::IntentCreation(_) => "Failed to create payment".into(),
            Self::SubscriptionCreation(_) => "Failed to create subscription".into(),
            Self::IntentRetrieval(_) => "Failed to fetch payment status".into(),
            _ => "An error occurred while processing the payment".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_remote_body() {
        let err = PaymentError::IntentCreation(
            PaymentError::Api {
                endpoint: "POST /pa/payment_intents/create",
                status: 400,
                body: r#"{"code":"validation_error","message":"secret detail"}"#.into(),
            }
            .to_string(),
        );
        assert!(!err.user_message().contains("secret detail"));
        assert!(err.to_string().contains("secret detail"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(PaymentError::InvalidRequest("bad amount".into()).is_client_error());
        assert!(!PaymentError::Config("missing key".into()).is_client_error());
        assert_eq!(
            PaymentError::Config("AIRWALLEX_API_KEY not set".into()).user_message(),
            "Server configuration error"
        );
    }

    #[test]
    fn test_subscription_failure_message() {
        let err = PaymentError::SubscriptionCreation("remote said no".into());
        assert_eq!(err.user_message(), "Failed to create subscription");
        assert!(!err.is_client_error());
    }
}
