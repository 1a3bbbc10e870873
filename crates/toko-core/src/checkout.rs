//! # Checkout Math
//!
//! Everything about a sale that can be decided without touching storage:
//! totals, tender classification, tempo detection, payment status and change.
//! The sale engine in toko-db calls [`quote_sale`] before it opens a
//! transaction and only then reads members and batches.
//!
//! ## Quote Flow
//! ```text
//! lines ──► subtotal = Σ qty × price
//!               │
//!               ▼
//!          final = max(0, subtotal - discount)
//!               │
//! payments ─► paid = Σ amount ──► paid < final? ──► InsufficientPayment
//!               │
//!               ├─► method  : one known payment → cash|transfer|qris, else mixed
//!               ├─► tempo   : Σ amount of tempo payments (needs a member)
//!               ├─► status  : non-tempo paid ≥ final → paid, > 0 → partial, else unpaid
//!               └─► change  : tempo used → 0, else max(0, paid - final)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethodKind, PaymentStatus};
use crate::validation::{
    checked_total, validate_non_empty, validate_payment_amount, validate_price, validate_quantity,
};
use crate::variant::Variant;

/// Method names that mark a payment as deferred credit.
/// Bare "credit" is a card tender. Other store-credit methods go by id.
pub const DEFAULT_TEMPO_KEYWORDS: &[&str] = &["tempo", "kredit", "hutang"];

// =============================================================================
// Inputs
// =============================================================================

/// A requested sale line, before FIFO splitting.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub product_id: String,
    #[serde(default)]
    pub variant: Variant,
    pub qty: i64,
    /// Price charged per unit, independent of the batch sell price.
    pub price: i64,
}

/// One tender line as entered at the register.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TenderLine {
    pub method: String,
    pub amount: i64,
    #[serde(default)]
    pub method_id: Option<String>,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
}

/// Input for the sale engine.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    pub user_id: String,
    #[serde(default)]
    pub member_id: Option<String>,
    pub items: Vec<SaleLine>,
    pub payments: Vec<TenderLine>,
    /// Flat discount on the whole sale.
    #[serde(default)]
    pub discount_amount: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// Tender Rules
// =============================================================================

/// How tempo payments are recognised.
///
/// A payment is tempo when its method name matches a keyword
/// (case-insensitive) or its `method_id` is one of `tempo_method_ids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenderRules {
    pub tempo_keywords: Vec<String>,
    pub tempo_method_ids: Vec<String>,
}

impl Default for TenderRules {
    fn default() -> Self {
        TenderRules {
            tempo_keywords: DEFAULT_TEMPO_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            tempo_method_ids: Vec::new(),
        }
    }
}

impl TenderRules {
    /// Adds payment-method ids that always count as tempo.
    pub fn with_tempo_method_ids(mut self, ids: impl IntoIterator<Item = String>) -> Self {
        self.tempo_method_ids.extend(ids);
        self
    }

    pub fn is_tempo(&self, tender: &TenderLine) -> bool {
        let method = tender.method.trim().to_lowercase();
        if self.tempo_keywords.iter().any(|k| k.eq_ignore_ascii_case(&method)) {
            return true;
        }
        tender
            .method_id
            .as_deref()
            .map(|id| self.tempo_method_ids.iter().any(|t| t == id))
            .unwrap_or(false)
    }
}

// =============================================================================
// Quote
// =============================================================================

/// Every figure the sale header needs, computed up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleQuote {
    pub subtotal: Money,
    pub discount: Money,
    pub final_amount: Money,
    pub total_paid: Money,
    pub tempo_amount: Money,
    pub non_tempo_paid: Money,
    pub payment_method: PaymentMethodKind,
    pub payment_status: PaymentStatus,
    pub change: Money,
}

impl SaleQuote {
    pub fn uses_tempo(&self) -> bool {
        self.tempo_amount.is_positive()
    }
}

/// Validates a sale request and computes its totals.
///
/// ## Errors
/// - `Validation` for empty lines/payments, bad quantities or amounts, a
///   subtotal or payment total above [`MAX_AMOUNT`](crate::MAX_AMOUNT), or a
///   tempo payment without `member_id`
/// - `InsufficientPayment` when Σ payments < final amount
pub fn quote_sale(sale: &NewSale, rules: &TenderRules) -> CoreResult<SaleQuote> {
    validate_non_empty("items", sale.items.len())?;
    validate_non_empty("payments", sale.payments.len())?;
    for line in &sale.items {
        validate_quantity(line.qty)?;
        validate_price("price", line.price)?;
    }
    for tender in &sale.payments {
        validate_payment_amount(tender.amount)?;
    }
    validate_price("discount_amount", sale.discount_amount)?;

    let subtotal = checked_total("subtotal", sale.items.iter().map(|l| (l.price, l.qty)))?;
    let discount = Money::from_minor(sale.discount_amount);
    let final_amount = subtotal.sub_floor_zero(discount);

    let total_paid = checked_total("total_paid", sale.payments.iter().map(|p| (p.amount, 1)))?;
    if total_paid < final_amount {
        return Err(CoreError::InsufficientPayment {
            required: final_amount.minor(),
            paid: total_paid.minor(),
        });
    }

    let tempo_amount: Money = sale
        .payments
        .iter()
        .filter(|p| rules.is_tempo(p))
        .map(|p| Money::from_minor(p.amount))
        .sum();
    if tempo_amount.is_positive() && sale.member_id.as_deref().map_or(true, |m| m.trim().is_empty()) {
        return Err(ValidationError::Required {
            field: "member_id".to_string(),
        }
        .into());
    }
    let non_tempo_paid = total_paid - tempo_amount;

    let change = if tempo_amount.is_positive() {
        Money::zero()
    } else {
        total_paid.sub_floor_zero(final_amount)
    };

    Ok(SaleQuote {
        subtotal,
        discount,
        final_amount,
        total_paid,
        tempo_amount,
        non_tempo_paid,
        payment_method: classify_payment_method(&sale.payments),
        payment_status: payment_status(non_tempo_paid, final_amount),
        change,
    })
}

/// Overall method: the single payment's category, otherwise `Mixed`.
pub fn classify_payment_method(payments: &[TenderLine]) -> PaymentMethodKind {
    match payments {
        [only] => PaymentMethodKind::categorize(&only.method).unwrap_or(PaymentMethodKind::Mixed),
        _ => PaymentMethodKind::Mixed,
    }
}

/// Settlement state from the cash-in-hand portion of the tender.
pub fn payment_status(non_tempo_paid: Money, final_amount: Money) -> PaymentStatus {
    if non_tempo_paid >= final_amount {
        PaymentStatus::Paid
    } else if non_tempo_paid.is_positive() {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Unpaid
    }
}

/// Credit rule: with a positive limit, `debt + tempo` must not exceed it.
pub fn check_credit_limit(
    member_id: &str,
    debt: i64,
    credit_limit: i64,
    tempo: i64,
) -> CoreResult<()> {
    if credit_limit > 0 && debt.saturating_add(tempo) > credit_limit {
        return Err(CoreError::CreditLimitExceeded {
            member_id: member_id.to_string(),
            debt,
            credit_limit,
            requested: tempo,
        });
    }
    Ok(())
}
