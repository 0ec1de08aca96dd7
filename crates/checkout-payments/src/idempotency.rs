//! Idempotency Keys
//!
//! `merchant_order_id` and `request_id` values sent to Airwallex. The
//! generator is injected so tests can predict the ids.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Produces `<prefix>_<unique suffix>` identifiers
pub trait IdempotencyKeyGenerator: Send + Sync {
    fn generate(&self, prefix: &str) -> String;
}

/// UUID v4 backed generator used in production
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidKeyGenerator;

impl IdempotencyKeyGenerator for UuidKeyGenerator {
    fn generate(&self, prefix: &str) -> String {
        format!("{prefix}_{}", Uuid::new_v4().simple())
    }
}

/// Deterministic counter for tests and demos
#[derive(Debug, Default)]
pub struct SequentialKeyGenerator {
    next: AtomicU64,
}

impl SequentialKeyGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdempotencyKeyGenerator for SequentialKeyGenerator {
    fn generate(&self, prefix: &str) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}_{n}")
    }
}
