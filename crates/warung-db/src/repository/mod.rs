//! # Repository Module
//!
//! Database repository implementations for Warung.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CLI command                                                            │
//! │       │                                                                 │
//! │       │  db.products().list_in_stock()                                  │
//! │       ▼                                                                 │
//! │  ProductRepository          TransactionRepository     SaleExecutor      │
//! │  ├── list / list_in_stock   ├── list (newest first)   └── execute       │
//! │  ├── get_by_id              ├── get_by_id                 (atomic)      │
//! │  ├── insert / update        └── record_expense                          │
//! │  └── delete                                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Besides the repositories, [`product`] and [`transaction`] expose the
//! connection-level operations (`read_product`, `write_product_stock`,
//! `append_transaction`) that the sale executor composes inside one unit.

pub mod product;
pub mod sale;
pub mod transaction;
