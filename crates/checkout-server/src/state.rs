//! Application State

use std::sync::Arc;

use checkout_payments::CheckoutService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Checkout orchestrator (None if Airwallex credentials are missing)
    pub checkout: Option<Arc<CheckoutService>>,
}

impl AppState {
    pub fn new(checkout: Option<CheckoutService>) -> Self {
        Self {
            checkout: checkout.map(Arc::new),
        }
    }
}
