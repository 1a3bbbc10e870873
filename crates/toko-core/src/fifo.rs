//! # FIFO Allocator
//!
//! Partitions a `(product, variant, quantity)` demand across batches,
//! oldest first.
//!
//! ## Allocation Walk
//! ```text
//! demand: 8 units of P / Standard
//!
//!   Batch A (day 1, stock 5) ──► take 5   remaining 3
//!   Batch B (day 2, stock 10) ─► take 3   remaining 0  ✓
//!   Batch C (day 3, stock 4)     untouched
//!
//! result: [(A, 5), (B, 3)]
//! ```
//!
//! ## Guarantees
//! - Σ allocated == requested
//! - batches visited by ascending `created_at`, ties by batch id ascending
//! - only batches with `current_stock > 0` participate
//! - no batch gives more than its `current_stock`
//! - on shortage nothing is returned, so callers have nothing to half-apply
//!
//! The same walk distributes stock-opname shortages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::variant::Variant;

/// The slice of a batch the allocator needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchStock {
    pub batch_id: String,
    pub created_at: DateTime<Utc>,
    pub current_stock: i64,
}

/// Quantity taken from one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Allocation {
    pub batch_id: String,
    pub qty: i64,
}

/// Sorts batches oldest first with a deterministic tie-break.
pub fn sort_oldest_first(batches: &mut [BatchStock]) {
    batches.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.batch_id.cmp(&b.batch_id))
    });
}

/// Σ `current_stock` over batches that hold stock.
pub fn available_stock(batches: &[BatchStock]) -> i64 {
    batches
        .iter()
        .filter(|b| b.current_stock > 0)
        .map(|b| b.current_stock)
        .sum()
}

/// Allocates `quantity` units across `candidates`, oldest batch first.
///
/// `candidates` must already be restricted to one product and variant; they
/// may arrive in any order.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use toko_core::fifo::{allocate_fifo, BatchStock};
/// use toko_core::Variant;
///
/// let batches = vec![
///     BatchStock { batch_id: "B".into(), created_at: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(), current_stock: 10 },
///     BatchStock { batch_id: "A".into(), created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), current_stock: 5 },
/// ];
/// let plan = allocate_fifo("P", &Variant::standard(), 8, &batches).unwrap();
/// assert_eq!(plan[0].batch_id, "A");
/// assert_eq!(plan[0].qty, 5);
/// assert_eq!(plan[1].batch_id, "B");
/// assert_eq!(plan[1].qty, 3);
/// ```
pub fn allocate_fifo(
    product_id: &str,
    variant: &Variant,
    quantity: i64,
    candidates: &[BatchStock],
) -> CoreResult<Vec<Allocation>> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into());
    }

    let mut eligible: Vec<BatchStock> = candidates
        .iter()
        .filter(|b| b.current_stock > 0)
        .cloned()
        .collect();
    sort_oldest_first(&mut eligible);

    let available = available_stock(&eligible);
    if available < quantity {
        return Err(CoreError::InsufficientStock {
            product_id: product_id.to_string(),
            variant: variant.to_string(),
            available,
            requested: quantity,
        });
    }

    let mut remaining = quantity;
    let mut plan = Vec::new();
    for batch in eligible {
        if remaining == 0 {
            break;
        }
        let take = batch.current_stock.min(remaining);
        plan.push(Allocation {
            batch_id: batch.batch_id,
            qty: take,
        });
        remaining -= take;
    }

    Ok(plan)
}
