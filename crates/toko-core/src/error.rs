//! # Error Types
//!
//! Domain-specific error types for toko-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  toko-core errors (this file)                                          │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  toko-db errors (separate crate)                                       │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant carries the ids and quantities needed to render a specific
//! message. A `CoreError` raised inside a ledger transaction always rolls the
//! whole transaction back.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The eligible batches of a product variant cannot cover a demand.
    ///
    /// ## When This Occurs
    /// - Selling more than the sum of `current_stock` over the variant's batches
    /// - Finalizing an opname shortage larger than what the batches still hold
    ///
    /// ```text
    /// Sell qty 20 of P / Standard
    ///      │
    ///      ▼
    /// Batches: A=5, B=10  → available 15
    ///      │
    ///      ▼
    /// InsufficientStock { available: 15, requested: 20 }
    /// ```
    #[error("Insufficient stock for product {product_id} ({variant}): available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        variant: String,
        available: i64,
        requested: i64,
    },

    /// A specific batch holds less than the quantity an operation must remove.
    #[error("Insufficient stock in batch {batch_id}: available {available}, requested {requested}")]
    InsufficientBatchStock {
        batch_id: String,
        available: i64,
        requested: i64,
    },

    /// Tender total is below the amount due.
    #[error("Insufficient payment: required {required}, paid {paid}")]
    InsufficientPayment { required: i64, paid: i64 },

    /// A tempo charge would push the member's debt past the credit limit.
    #[error("Credit limit exceeded for member {member_id}: debt {debt} + {requested} > limit {credit_limit}")]
    CreditLimitExceeded {
        member_id: String,
        debt: i64,
        credit_limit: i64,
        requested: i64,
    },

    /// The member referenced by a tempo sale does not exist.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// A purchase with the same invoice number was already recorded.
    #[error("Duplicate invoice: '{0}' already recorded")]
    DuplicateInvoice(String),

    /// One purchase return covers goods from one supplier only.
    ///
    /// ## When This Occurs
    /// - Defective items from different suppliers in one return
    /// - Direct return lines whose batches disagree with each other or with
    ///   the requested supplier
    #[error("Return lines belong to different suppliers: {expected} and {found}")]
    MixedSupplier { expected: String, found: String },

    /// The entity is not in a state that allows the operation.
    ///
    /// ## When This Occurs
    /// - Finalizing or cancelling an opname session that is not `draft`
    /// - Returning a defective item that is already `processed`
    #[error("{entity} {id} is {status}, expected {expected}")]
    InvalidState {
        entity: String,
        id: String,
        status: String,
        expected: String,
    },

    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A conditional update matched no row after the guarded read succeeded.
    ///
    /// Nothing was committed, so the operation can be retried immediately.
    #[error("Concurrent modification of {entity} {id}, retry the operation")]
    ConcurrencyConflict { entity: String, id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a ConcurrencyConflict error.
    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::ConcurrencyConflict {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidState error.
    pub fn invalid_state(
        entity: impl Into<String>,
        id: impl Into<String>,
        status: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        CoreError::InvalidState {
            entity: entity.into(),
            id: id.into(),
            status: status.into(),
            expected: expected.into(),
        }
    }

    /// Whether the caller may retry the operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::ConcurrencyConflict { .. })
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet requirements.
/// Raised before any stock is read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Collection must contain at least one entry.
    #[error("{field} must not be empty")]
    Empty { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "P-1".to_string(),
            variant: "Standard".to_string(),
            available: 15,
            requested: 20,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for product P-1 (Standard): available 15, requested 20"
        );

        let err = CoreError::CreditLimitExceeded {
            member_id: "M-1".to_string(),
            debt: 50_000,
            credit_limit: 100_000,
            requested: 60_000,
        };
        assert_eq!(
            err.to_string(),
            "Credit limit exceeded for member M-1: debt 50000 + 60000 > limit 100000"
        );
    }

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(CoreError::conflict("ProductBatch", "b-1").is_retryable());
        assert!(!CoreError::not_found("Product", "p-1").is_retryable());
        assert!(!CoreError::DuplicateInvoice("INV-1".into()).is_retryable());
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "member_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
