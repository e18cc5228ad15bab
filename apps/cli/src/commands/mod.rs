//! # Commands Module
//!
//! One function per `warung` subcommand.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (Context, Output, dispatch)
//! ├── product.rs  ◄─── Catalogue listing and CRUD
//! ├── sale.rs     ◄─── Checkout and history
//! ├── expense.rs  ◄─── Money spent
//! └── report.rs   ◄─── Profit/loss and stock reports
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  warung sell p-1:2 --json                                               │
//! │         │                                                               │
//! │         │ cli::parse                                                    │
//! │         ▼                                                               │
//! │  Command::Sell { lines }                                                │
//! │         │                                                               │
//! │         │ dispatch(&Context, command)                                   │
//! │         ▼                                                               │
//! │  sale::sell(&ctx, &lines) ─► Result<TransactionDto, CliError>           │
//! │         │                                                               │
//! │         │ Output::new (Render + Serialize)                              │
//! │         ▼                                                               │
//! │  text table on stdout, or JSON with --json                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Commands receive everything through [`Context`]; nothing is global.

pub mod expense;
pub mod product;
pub mod report;
pub mod sale;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::cli::Command;
use crate::config::AppConfig;
use crate::error::CliResult;
use warung_core::Session;
use warung_db::Database;

/// What a command needs from the outside world.
#[derive(Debug, Clone)]
pub struct Context {
    pub db: Database,
    pub session: Session,
    /// Shop's local offset for dates shown and report buckets.
    pub offset: FixedOffset,
    pub low_stock_threshold: i64,
}

impl Context {
    pub fn new(db: Database, config: &AppConfig) -> Self {
        Context {
            db,
            session: config.session(),
            offset: config.utc_offset(),
            low_stock_threshold: config.report.low_stock_threshold,
        }
    }

    /// Formats a stored instant in local time.
    pub fn local_time(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.offset)
            .format("%Y-%m-%d %H:%M")
            .to_string()
    }
}

/// Human-readable rendering of a command result.
pub trait Render {
    fn render(&self) -> String;
}

/// A finished command: text for the terminal and JSON for `--json`.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub text: String,
    pub json: serde_json::Value,
}

impl Output {
    pub fn new<T: Serialize + Render>(value: &T) -> CliResult<Self> {
        Ok(Output {
            text: value.render(),
            json: serde_json::to_value(value)?,
        })
    }
}

/// Runs one parsed command.
pub async fn dispatch(ctx: &Context, command: Command) -> CliResult<Output> {
    match command {
        Command::Products { category } => {
            Output::new(&product::list_products(ctx, category.as_deref()).await?)
        }
        Command::Categories => Output::new(&product::list_categories(ctx).await?),
        Command::AddProduct(fields) => Output::new(&product::add_product(ctx, fields).await?),
        Command::EditProduct { id, fields } => {
            Output::new(&product::edit_product(ctx, &id, fields).await?)
        }
        Command::DeleteProduct { id } => Output::new(&product::delete_product(ctx, &id).await?),
        Command::Sell { lines } => Output::new(&sale::sell(ctx, &lines).await?),
        Command::Expense { note, amount, date } => {
            Output::new(&expense::record_expense(ctx, note, amount, date, Utc::now()).await?)
        }
        Command::History => Output::new(&sale::history(ctx).await?),
        Command::Report(request) => {
            Output::new(&report::profit_loss(ctx, request, Utc::now()).await?)
        }
        Command::StockReport { threshold } => {
            Output::new(&report::stock_report(ctx, threshold).await?)
        }
        Command::Help => dispatch_help(),
    }
}

/// Usage text; needs no database.
pub fn dispatch_help() -> CliResult<Output> {
    Ok(Output {
        text: crate::cli::USAGE.to_string(),
        json: serde_json::json!({ "usage": crate::cli::USAGE }),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use warung_core::{NewProduct, Product};
    use warung_db::DbConfig;

    pub async fn context() -> Context {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Context::new(db, &AppConfig::default())
    }

    pub async fn product(ctx: &Context, name: &str, stock: i64, price: i64, category: &str) -> Product {
        ctx.db
            .products()
            .insert(&NewProduct {
                name: name.to_string(),
                stock,
                price,
                category: Some(category.to_string()),
                image_url: None,
            })
            .await
            .unwrap()
    }
}
