//! # Validation Module
//!
//! Input checks run before any ledger operation opens a transaction.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Deserialization                                               │
//! │  └── Variant normalization, defaulted optional fields                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── positive quantities, non-negative prices                           │
//! │  └── non-empty line lists, well-formed ids and invoice numbers          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── CHECK (current_stock >= 0)                                         │
//! │  ├── UNIQUE (invoice_number)                                            │
//! │  └── foreign keys                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use toko_core::validation::{validate_invoice_number, validate_quantity};
//!
//! validate_quantity(5).unwrap();
//! validate_invoice_number("INV/2024/0012").unwrap();
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_AMOUNT, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a supplier invoice number.
///
/// ## Rules
/// - Must not be blank
/// - At most 64 characters
/// - Letters, digits, `-`, `_`, `/` and `.` only
///
/// ## Example
/// ```rust
/// use toko_core::validation::validate_invoice_number;
///
/// assert!(validate_invoice_number("INV-001").is_ok());
/// assert!(validate_invoice_number("").is_err());
/// assert!(validate_invoice_number("INV 001").is_err());
/// ```
pub fn validate_invoice_number(invoice: &str) -> ValidationResult<()> {
    let invoice = invoice.trim();

    if invoice.is_empty() {
        return Err(ValidationError::Required {
            field: "invoice_number".to_string(),
        });
    }

    if invoice.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "invoice_number".to_string(),
            max: 64,
        });
    }

    if !invoice
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '/' | '.'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "invoice_number".to_string(),
            reason: "must contain only letters, numbers, '-', '_', '/' and '.'".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (product, member, supplier).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_LINE_QUANTITY`]
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price or discount in minor units. Zero is allowed, values
/// above [`MAX_AMOUNT`] are not.
///
/// ```rust
/// use toko_core::validation::validate_price;
///
/// assert!(validate_price("buy_price", 0).is_ok());
/// assert!(validate_price("buy_price", -1).is_err());
/// assert!(validate_price("buy_price", i64::MAX).is_err());
/// ```
pub fn validate_price(field: &str, amount: i64) -> ValidationResult<()> {
    if !(0..=MAX_AMOUNT).contains(&amount) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT,
        });
    }

    Ok(())
}

/// Validates a payment amount. Zero-value tenders are rejected.
pub fn validate_payment_amount(amount: i64) -> ValidationResult<()> {
    if amount <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    if amount > MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: "payment amount".to_string(),
            min: 1,
            max: MAX_AMOUNT,
        });
    }

    Ok(())
}

/// Sums `amount × qty` terms, failing once the total leaves `0..=MAX_AMOUNT`.
///
/// ```rust
/// use toko_core::validation::checked_total;
///
/// assert_eq!(checked_total("subtotal", [(2_500, 4), (1_000, 1)]).unwrap().minor(), 11_000);
/// assert!(checked_total("subtotal", [(i64::MAX / 2 + 1, 2)]).is_err());
/// ```
pub fn checked_total(
    field: &str,
    terms: impl IntoIterator<Item = (i64, i64)>,
) -> ValidationResult<Money> {
    terms.into_iter().try_fold(Money::zero(), |total, (amount, qty)| {
        Money::from_minor(amount)
            .checked_multiply_quantity(qty)
            .and_then(|line| total.checked_add(line))
            .filter(|sum| (0..=MAX_AMOUNT).contains(&sum.minor()))
            .ok_or_else(|| ValidationError::OutOfRange {
                field: field.to_string(),
                min: 0,
                max: MAX_AMOUNT,
            })
    })
}

/// Physical counts may be zero but never negative.
pub fn validate_physical_count(count: i64) -> ValidationResult<()> {
    if count < 0 {
        return Err(ValidationError::OutOfRange {
            field: "physical_stock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Rejects an operation with no lines.
pub fn validate_non_empty(field: &str, len: usize) -> ValidationResult<()> {
    if len == 0 {
        return Err(ValidationError::Empty {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
///
/// ## Example
/// ```rust
/// use toko_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
