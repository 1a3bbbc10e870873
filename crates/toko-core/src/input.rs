//! Request payloads for the ledger operations other than sales
//! (see [`crate::checkout::NewSale`]).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::types::DefectSource;
use crate::validation::{
    checked_total, validate_invoice_number, validate_name, validate_non_empty, validate_price,
    validate_quantity,
};
use crate::variant::Variant;

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub min_stock: i64,
}

impl NewProduct {
    pub fn validate(&self) -> CoreResult<()> {
        validate_name("name", &self.name)?;
        validate_price("min_stock", self.min_stock)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewMember {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// `0` for unlimited credit.
    #[serde(default)]
    pub credit_limit: i64,
}

impl NewMember {
    pub fn validate(&self) -> CoreResult<()> {
        validate_name("name", &self.name)?;
        validate_price("credit_limit", self.credit_limit)?;
        Ok(())
    }
}

// =============================================================================
// Purchase Intake
// =============================================================================

/// One received line. Lines sharing `(product, buy_price, variant)` with an
/// existing batch of the same supplier replenish that batch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseLine {
    pub product_id: String,
    #[serde(default)]
    pub variant: Variant,
    pub qty: i64,
    pub buy_price: i64,
    pub sell_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPurchase {
    pub supplier_id: String,
    pub user_id: String,
    #[serde(default)]
    pub invoice_number: Option<String>,
    pub items: Vec<PurchaseLine>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewPurchase {
    pub fn validate(&self) -> CoreResult<()> {
        validate_non_empty("items", self.items.len())?;
        if let Some(invoice) = self.invoice() {
            validate_invoice_number(invoice)?;
        }
        for line in &self.items {
            validate_quantity(line.qty)?;
            validate_price("buy_price", line.buy_price)?;
            validate_price("sell_price", line.sell_price)?;
        }
        self.total_amount()?;
        Ok(())
    }

    /// Invoice number trimmed, blank treated as absent.
    pub fn invoice(&self) -> Option<&str> {
        self.invoice_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Σ qty × buy_price, rejected once it leaves the money bound.
    pub fn total_amount(&self) -> CoreResult<i64> {
        let total = checked_total("total_amount", self.items.iter().map(|l| (l.buy_price, l.qty)))?;
        Ok(total.minor())
    }
}

// =============================================================================
// Returns & Defects
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReturnLine {
    pub batch_id: String,
    pub qty: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPurchaseReturn {
    #[serde(default)]
    pub supplier_id: Option<String>,
    pub user_id: String,
    pub items: Vec<ReturnLine>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewPurchaseReturn {
    pub fn validate(&self) -> CoreResult<()> {
        validate_non_empty("items", self.items.len())?;
        for line in &self.items {
            validate_quantity(line.qty)?;
        }
        Ok(())
    }
}

/// Units pulled from a batch into quarantine.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewDefectiveItem {
    pub batch_id: String,
    pub qty: i64,
    pub source: DefectSource,
    #[serde(default)]
    pub reason: Option<String>,
    pub user_id: String,
}

impl NewDefectiveItem {
    pub fn validate(&self) -> CoreResult<()> {
        validate_quantity(self.qty)?;
        Ok(())
    }
}

// =============================================================================
// Stock Opname
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOpnameSession {
    pub user_id: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// Restrict the snapshot to one category.
    #[serde(default)]
    pub category_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, ValidationError};

    fn line(qty: i64, buy: i64) -> PurchaseLine {
        PurchaseLine {
            product_id: "p-1".into(),
            variant: Variant::standard(),
            qty,
            buy_price: buy,
            sell_price: buy + 500,
        }
    }

    #[test]
    fn test_purchase_totals_and_invoice() {
        let purchase = NewPurchase {
            supplier_id: "s-1".into(),
            user_id: "u-1".into(),
            invoice_number: Some("  ".into()),
            items: vec![line(2, 1_000), line(3, 1_200)],
            notes: None,
        };
        assert!(purchase.validate().is_ok());
        assert_eq!(purchase.invoice(), None);
        assert_eq!(purchase.total_amount().unwrap(), 5_600);

        let purchase = NewPurchase {
            invoice_number: Some("INV 01".into()),
            ..purchase
        };
        assert!(purchase.validate().is_err());
    }

    #[test]
    fn test_purchase_total_out_of_range() {
        let purchase = NewPurchase {
            supplier_id: "s-1".into(),
            user_id: "u-1".into(),
            invoice_number: None,
            items: vec![line(1_000, crate::MAX_AMOUNT / 2)],
            notes: None,
        };
        assert!(matches!(
            purchase.validate(),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(purchase.total_amount().is_err());

        let purchase = NewPurchase {
            items: vec![PurchaseLine {
                buy_price: i64::MAX,
                sell_price: 0,
                ..line(1, 0)
            }],
            ..purchase
        };
        assert!(purchase.validate().is_err());
    }

    #[test]
    fn test_purchase_line_variant_defaults_to_standard() {
        let json = r#"{"product_id":"p-1","qty":1,"buy_price":10,"sell_price":12}"#;
        let line: PurchaseLine = serde_json::from_str(json).unwrap();
        assert!(line.variant.is_standard());
    }

    #[test]
    fn test_return_requires_positive_lines() {
        let ret = NewPurchaseReturn {
            supplier_id: None,
            user_id: "u-1".into(),
            items: vec![ReturnLine { batch_id: "b".into(), qty: 0, reason: None }],
            notes: None,
        };
        assert!(ret.validate().is_err());
    }
}
