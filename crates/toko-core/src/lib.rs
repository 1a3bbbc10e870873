//! # toko-core: Pure Ledger Logic for Toko
//!
//! Everything the batch-costed inventory ledger decides without storage:
//! FIFO allocation, sale totals and tender rules, opname planning, variant
//! normalization and input validation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Toko Ledger Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Callers (back-office service, seed binary, tests)      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                toko-db (transactional engines)                  │   │
//! │  │   sales, purchases, returns, opname, outbox, activity log       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ plain function calls                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ toko-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  fifo   │ │ checkout │ │  opname  │ │ variant  │          │   │
//! │  │   └─────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │   ┌─────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  types  │ │  money   │ │  input   │ │validation│          │   │
//! │  │   └─────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Persisted entities (Product, ProductBatch, Sale, ...)
//! - [`money`] - Integer money in minor units
//! - [`variant`] - Canonical batch variant
//! - [`fifo`] - Oldest-first batch allocation
//! - [`checkout`] - Sale totals, tempo detection, credit rule
//! - [`opname`] - Count difference to batch adjustments
//! - [`input`] - Request payloads
//! - [`validation`] - Input rules
//! - [`error`] - Domain error taxonomy
//!
//! ## Example Usage
//!
//! ```rust
//! use toko_core::checkout::{quote_sale, NewSale, SaleLine, TenderLine, TenderRules};
//! use toko_core::{PaymentStatus, Variant};
//!
//! let sale = NewSale {
//!     user_id: "kasir-1".into(),
//!     member_id: None,
//!     items: vec![SaleLine { product_id: "p".into(), variant: Variant::standard(), qty: 2, price: 4_000 }],
//!     payments: vec![TenderLine { method: "cash".into(), amount: 10_000, method_id: None, variant_id: None, reference: None }],
//!     discount_amount: 500,
//!     notes: None,
//! };
//! let quote = quote_sale(&sale, &TenderRules::default()).unwrap();
//! assert_eq!(quote.final_amount.minor(), 7_500);
//! assert_eq!(quote.change.minor(), 2_500);
//! assert_eq!(quote.payment_status, PaymentStatus::Paid);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod fifo;
pub mod input;
pub mod money;
pub mod opname;
pub mod types;
pub mod validation;
pub mod variant;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use fifo::{allocate_fifo, Allocation, BatchStock};
pub use money::Money;
pub use types::*;
pub use variant::{Variant, STANDARD_VARIANT};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Upper bound for a single line quantity.
///
/// Catches keying mistakes (an extra zero or two) before they reach stock.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

/// Upper bound for any price, payment or document total, in minor units.
///
/// Keeps `qty × price` and running totals inside `i64`.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;
