//! # Report Commands
//!
//! `report day|month` and `stock-report`. Both read everything and reduce
//! in `warung_core::report`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::sale::TransactionDto;
use super::{Context, Render};
use crate::cli::ReportRequest;
use crate::error::{CliError, CliResult};
use warung_core::{Money, ProfitLoss, ReportPeriod, StockSummary};

/// Profit/loss for one period, with local times on each entry.
#[derive(Debug, Clone, Serialize)]
pub struct ProfitLossView {
    pub period: ReportPeriod,
    pub income: Money,
    pub expense: Money,
    pub net: Money,
    pub transactions: Vec<TransactionDto>,
}

impl Render for ProfitLossView {
    fn render(&self) -> String {
        let mut out = format!(
            "Report {}\n  Income:  {:>14}\n  Expense: {:>14}\n  Net:     {:>14}",
            self.period,
            self.income.to_string(),
            self.expense.to_string(),
            self.net.to_string()
        );

        if self.transactions.is_empty() {
            out.push_str("\n\nNo transactions in this period.");
        } else {
            out.push('\n');
            for t in &self.transactions {
                out.push('\n');
                out.push_str(&t.row());
            }
        }
        out
    }
}

impl Render for StockSummary {
    fn render(&self) -> String {
        let mut out = format!(
            "Products:        {}\nUnits in stock:  {}\nInventory value: {}\nOut of stock:    {}",
            self.product_count, self.total_units, self.inventory_value, self.out_of_stock
        );

        if self.low_stock.is_empty() {
            out.push_str(&format!("\n\nNothing at or below {} units.", self.low_stock_threshold));
        } else {
            out.push_str(&format!("\n\nLow stock (<= {}):", self.low_stock_threshold));
            for p in &self.low_stock {
                out.push_str(&format!("\n  {:>4}  {}", p.stock, p.name));
            }
        }
        out
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Profit/loss for the requested period, defaulting to the one containing
/// `now` in the shop's offset.
pub async fn profit_loss(
    ctx: &Context,
    request: ReportRequest,
    now: DateTime<Utc>,
) -> CliResult<ProfitLossView> {
    let period = match request {
        ReportRequest::Day(period) => {
            period.unwrap_or_else(|| ReportPeriod::day_containing(now, &ctx.offset))
        }
        ReportRequest::Month(period) => {
            period.unwrap_or_else(|| ReportPeriod::month_containing(now, &ctx.offset))
        }
    };
    debug!(%period, "report command");

    let transactions = ctx.db.transactions().list().await?;
    let report = ProfitLoss::compute(&transactions, period, &ctx.offset);

    Ok(ProfitLossView {
        period: report.period,
        income: report.income,
        expense: report.expense,
        net: report.net,
        transactions: report
            .transactions
            .into_iter()
            .map(|t| TransactionDto::new(ctx, t))
            .collect(),
    })
}

pub async fn stock_report(ctx: &Context, threshold: Option<i64>) -> CliResult<StockSummary> {
    let threshold = threshold.unwrap_or(ctx.low_stock_threshold);
    if threshold < 0 {
        return Err(CliError::validation("threshold must not be negative"));
    }

    let products = ctx.db.products().list().await?;
    Ok(StockSummary::compute(&products, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::expense::record_expense;
    use crate::commands::sale::sell;
    use crate::commands::test_support::{context, product};
    use chrono::{NaiveDate, TimeZone};

    #[tokio::test]
    async fn test_day_report_totals() {
        let ctx = context().await;
        let kapal = product(&ctx, "Pempek Kapal Selam", 10, 25_000, "Pempek").await;
        let tekwan = product(&ctx, "Tekwan", 10, 15_000, "Kuah").await;

        sell(&ctx, &[(kapal.id.clone(), 2)]).await.unwrap();
        sell(&ctx, &[(tekwan.id.clone(), 2)]).await.unwrap();
        let now = Utc::now();
        record_expense(&ctx, "Ikan".to_string(), 20_000, None, now).await.unwrap();

        let view = profit_loss(&ctx, ReportRequest::Day(None), now).await.unwrap();
        assert_eq!(view.income, Money::from_units(80_000));
        assert_eq!(view.expense, Money::from_units(20_000));
        assert_eq!(view.net, Money::from_units(60_000));
        assert_eq!(view.transactions.len(), 3);
        assert!(view.render().contains("Rp 60.000"));
    }

    #[tokio::test]
    async fn test_other_month_is_empty() {
        let ctx = context().await;
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 5, 0, 0).unwrap();
        record_expense(
            &ctx,
            "Sewa".to_string(),
            500_000,
            NaiveDate::from_ymd_opt(2025, 2, 1),
            now,
        )
        .await
        .unwrap();

        let march = profit_loss(&ctx, ReportRequest::Month(None), now).await.unwrap();
        assert!(march.transactions.is_empty());

        let february = profit_loss(
            &ctx,
            ReportRequest::Month(Some(ReportPeriod::Month { year: 2025, month: 2 })),
            now,
        )
        .await
        .unwrap();
        assert_eq!(february.expense, Money::from_units(500_000));
        assert_eq!(february.net, Money::from_units(-500_000));
    }

    #[tokio::test]
    async fn test_stock_report_threshold() {
        let ctx = context().await;
        product(&ctx, "Celimpungan", 3, 17_000, "Kuah").await;
        product(&ctx, "Es Teh Manis", 50, 4_000, "Minuman").await;
        product(&ctx, "Kemplang", 0, 20_000, "").await;

        let summary = stock_report(&ctx, None).await.unwrap();
        assert_eq!(summary.product_count, 3);
        assert_eq!(summary.out_of_stock, 1);
        assert_eq!(summary.inventory_value, Money::from_units(3 * 17_000 + 50 * 4_000));
        let low: Vec<_> = summary.low_stock.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(low, vec!["Kemplang", "Celimpungan"]);

        let wide = stock_report(&ctx, Some(100)).await.unwrap();
        assert_eq!(wide.low_stock.len(), 3);
        assert!(stock_report(&ctx, Some(-1)).await.is_err());
    }
}
