//! # Repository Module
//!
//! Ledger engines and read models.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Operation, One Transaction                       │
//! │                                                                         │
//! │  db.sales().create_sale(&input)                                        │
//! │       │                                                                 │
//! │       │  let mut tx = pool.begin()                                     │
//! │       ▼                                                                 │
//! │  ┌──────────────────────────────────────────────────────────────┐      │
//! │  │ member::charge_debt(&mut tx, ..)                             │      │
//! │  │ batch::allocate_in_tx(&mut tx, ..)                           │      │
//! │  │ batch::decrement_batch(&mut tx, ..)                          │      │
//! │  │ product::sync_product_stock(&mut tx, ..)                     │      │
//! │  │ activity::record(&mut tx, ..)                                │      │
//! │  │ outbox::enqueue(&mut tx, ..)                                 │      │
//! │  └──────────────────────────────────────────────────────────────┘      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tx.commit()   ── any `?` before this drops tx → ROLLBACK              │
//! │                                                                         │
//! │  Mutating helpers accept `&mut Transaction<'_, Sqlite>` only, so a     │
//! │  step cannot write outside the operation's transaction.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - catalog, stock sync
//! - [`SupplierRepository`](supplier::SupplierRepository)
//! - [`MemberRepository`](member::MemberRepository) - customers, debt
//! - [`BatchRepository`](batch::BatchRepository) - batches, FIFO preview, drift audit
//! - [`SaleRepository`](sale::SaleRepository) - sale engine
//! - [`PurchaseRepository`](purchase::PurchaseRepository) - intake and deletion
//! - [`ReturnRepository`](returns::ReturnRepository) - returns, defect quarantine
//! - [`OpnameRepository`](opname::OpnameRepository) - stock opname
//! - [`ActivityLogRepository`](activity::ActivityLogRepository)
//! - [`OutboxRepository`](outbox::OutboxRepository)

use uuid::Uuid;

pub mod activity;
pub mod batch;
pub mod member;
pub mod opname;
pub mod outbox;
pub mod product;
pub mod purchase;
pub mod returns;
pub mod sale;
pub mod supplier;

/// Fresh UUID v4 row id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
