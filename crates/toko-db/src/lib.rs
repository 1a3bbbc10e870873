//! # toko-db: Transactional Ledger Engines for Toko
//!
//! Batch-costed inventory ledger on SQLite. Every engine operation runs in
//! one sqlx transaction: stock, debt, audit trail and outbox rows commit
//! together or not at all.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Toko Ledger Data Flow                            │
//! │                                                                         │
//! │  Register / back office (caller)                                       │
//! │       │  NewSale, NewPurchase, NewPurchaseReturn, counts               │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     toko-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │    Engines    │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  sale.rs      │    │  (embedded)  │  │   │
//! │  │   │               │    │  purchase.rs  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│  returns.rs   │    │ 001_ledger_  │  │   │
//! │  │   │ LedgerSettings│    │  opname.rs    │    │   schema.sql │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                              │                                  │   │
//! │  │                              ▼                                  │   │
//! │  │                   toko-core (FIFO, checkout math)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ledger_outbox ──► journal poster / notifications (external)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Environment configuration
//! - [`pool`] - Connection pool and repository access
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Ledger engines and read models
//!
//! ## Usage
//!
//! ```rust,ignore
//! use toko_db::{Database, LedgerConfig};
//!
//! let db = Database::open(&LedgerConfig::load()?).await?;
//!
//! let receipt = db.sales().create_sale(&new_sale).await?;
//! println!("change: {}", receipt.change_amount);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, LedgerConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, LedgerSettings};

// Repository re-exports for convenience
pub use repository::activity::ActivityLogRepository;
pub use repository::batch::{BatchRepository, StockDrift, VariantStock};
pub use repository::member::MemberRepository;
pub use repository::opname::{OpnameRepository, OpnameSummary};
pub use repository::outbox::OutboxRepository;
pub use repository::product::ProductRepository;
pub use repository::purchase::PurchaseRepository;
pub use repository::returns::ReturnRepository;
pub use repository::sale::{SaleReceipt, SaleRepository};
pub use repository::supplier::SupplierRepository;
