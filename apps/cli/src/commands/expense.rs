//! # Expense Command
//!
//! Records money spent. `--date` back-dates the entry: a past or future
//! day is stored at local midnight of that day, today is stored as now.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::debug;

use super::sale::TransactionDto;
use super::Context;
use crate::error::{CliError, CliResult};
use warung_core::NewExpense;

pub async fn record_expense(
    ctx: &Context,
    note: String,
    amount: i64,
    date: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> CliResult<TransactionDto> {
    let occurred_at = occurred_at(ctx, date, now)?;
    debug!(amount, %occurred_at, "expense command");

    let recorded = ctx
        .db
        .transactions()
        .record_expense(
            &ctx.session,
            &NewExpense {
                note,
                amount,
                occurred_at,
            },
        )
        .await?;

    Ok(TransactionDto::new(ctx, recorded))
}

fn occurred_at(ctx: &Context, date: Option<NaiveDate>, now: DateTime<Utc>) -> CliResult<DateTime<Utc>> {
    let Some(date) = date else {
        return Ok(now);
    };

    if now.with_timezone(&ctx.offset).date_naive() == date {
        return Ok(now);
    }

    date.and_time(NaiveTime::MIN)
        .and_local_timezone(ctx.offset)
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| CliError::validation(format!("Cannot place {} in local time", date)))
}
