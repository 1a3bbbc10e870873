//! # Stock Opname Planning
//!
//! Turns a counted difference for one `(product, variant)` group into batch
//! adjustments. The database layer applies the plan inside the finalize
//! transaction.
//!
//! ```text
//! difference < 0 (shortage) ──► FIFO walk, oldest batch loses stock first
//! difference > 0 (surplus)  ──► whole surplus onto the oldest batch
//!                               (no batch at all → new adjustment batch)
//! difference = 0            ──► nothing
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::fifo::{allocate_fifo, sort_oldest_first, BatchStock};
use crate::variant::Variant;

/// One step of an opname plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum BatchAdjustment {
    Decrement { batch_id: String, qty: i64 },
    Increment { batch_id: String, qty: i64 },
    /// The group has no batch to absorb a surplus.
    CreateAdjustmentBatch { qty: i64 },
}

impl BatchAdjustment {
    /// Signed stock change this step causes.
    pub fn delta(&self) -> i64 {
        match self {
            BatchAdjustment::Decrement { qty, .. } => -qty,
            BatchAdjustment::Increment { qty, .. } => *qty,
            BatchAdjustment::CreateAdjustmentBatch { qty } => *qty,
        }
    }
}

/// `physical - system`.
pub fn count_difference(system_stock: i64, physical_stock: i64) -> i64 {
    physical_stock - system_stock
}

/// Plans the batch moves that realise `difference` for one group.
///
/// `batches` holds every batch of the group, empty ones included: an empty
/// oldest batch still receives surplus.
///
/// ## Errors
/// `InsufficientStock` when a shortage exceeds the stock the batches still
/// hold.
pub fn plan_adjustment(
    product_id: &str,
    variant: &Variant,
    difference: i64,
    batches: &[BatchStock],
) -> CoreResult<Vec<BatchAdjustment>> {
    if difference < 0 {
        let plan = allocate_fifo(product_id, variant, -difference, batches)?;
        return Ok(plan
            .into_iter()
            .map(|a| BatchAdjustment::Decrement {
                batch_id: a.batch_id,
                qty: a.qty,
            })
            .collect());
    }

    if difference == 0 {
        return Ok(Vec::new());
    }

    let mut ordered = batches.to_vec();
    sort_oldest_first(&mut ordered);
    Ok(match ordered.into_iter().next() {
        Some(oldest) => vec![BatchAdjustment::Increment {
            batch_id: oldest.batch_id,
            qty: difference,
        }],
        None => vec![BatchAdjustment::CreateAdjustmentBatch { qty: difference }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use chrono::{TimeZone, Utc};

    fn batch(id: &str, day: u32, stock: i64) -> BatchStock {
        BatchStock {
            batch_id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, day, 8, 0, 0).unwrap(),
            current_stock: stock,
        }
    }

    #[test]
    fn test_shortage_consumes_oldest_first() {
        let batches = vec![batch("Y", 2, 8), batch("X", 1, 12)];
        let plan = plan_adjustment("P", &Variant::standard(), -5, &batches).unwrap();
        assert_eq!(
            plan,
            vec![BatchAdjustment::Decrement { batch_id: "X".into(), qty: 5 }]
        );
    }

    #[test]
    fn test_shortage_spills_into_next_batch() {
        let batches = vec![batch("X", 1, 3), batch("Y", 2, 8)];
        let plan = plan_adjustment("P", &Variant::standard(), -5, &batches).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.iter().map(BatchAdjustment::delta).sum::<i64>(), -5);
    }

    #[test]
    fn test_shortage_beyond_stock_fails() {
        let batches = vec![batch("X", 1, 2)];
        let err = plan_adjustment("P", &Variant::standard(), -3, &batches).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { available: 2, requested: 3, .. }));
    }

    #[test]
    fn test_surplus_goes_to_oldest_even_when_empty() {
        let batches = vec![batch("new", 9, 4), batch("old", 1, 0)];
        let plan = plan_adjustment("P", &Variant::standard(), 2, &batches).unwrap();
        assert_eq!(
            plan,
            vec![BatchAdjustment::Increment { batch_id: "old".into(), qty: 2 }]
        );
    }

    #[test]
    fn test_surplus_without_batches_creates_adjustment_batch() {
        let plan = plan_adjustment("P", &Variant::from("Hitam"), 4, &[]).unwrap();
        assert_eq!(plan, vec![BatchAdjustment::CreateAdjustmentBatch { qty: 4 }]);
    }

    #[test]
    fn test_zero_difference_is_noop() {
        assert!(plan_adjustment("P", &Variant::standard(), 0, &[batch("X", 1, 1)])
            .unwrap()
            .is_empty());
        assert_eq!(count_difference(20, 15), -5);
    }
}
