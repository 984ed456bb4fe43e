use document_store::StoreError;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum BillingError {
    /// Id does not resolve within the tenant scope
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// Lifecycle validator refused the status move
    #[error("invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },

    /// Business-rule violation (amount invariants, missing attributes)
    #[error("validation error: {0}")]
    Validation(String),

    /// Store-level failure; transient on reads, surfaced on writes with no
    /// automatic retry (a retry could double-apply a financial transition)
    #[error("backend error: {0}")]
    Backend(#[from] StoreError),
}

pub type BillingResult<T> = Result<T, BillingError>;

/// Error callback handed to repository subscriptions
pub type FailureHandler = Arc<dyn Fn(BillingError) + Send + Sync>;
