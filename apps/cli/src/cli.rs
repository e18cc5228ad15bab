//! # Argument Parsing
//!
//! Turns `argv` into a [`Invocation`]: global options plus one [`Command`].
//!
//! ```text
//! warung [--db PATH] [--config PATH] [--json] <command> [args...]
//!
//!   products [--category C]         list catalogue
//!   categories                      distinct categories
//!   add-product --name N --stock S --price P [--category C] [--image URL]
//!   edit-product <id> [--name N] [--stock S] [--price P] [--category C] [--image URL]
//!   delete-product <id>
//!   sell <id>[:qty] [<id>[:qty] ...]
//!   expense --note N --amount A [--date YYYY-MM-DD]
//!   history
//!   report day [YYYY-MM-DD] | month [YYYY-MM]
//!   stock-report [--threshold N]
//! ```
//!
//! Global options are accepted anywhere on the line. Every `--key value`
//! option may also be written `--key=value`.

use chrono::NaiveDate;
use std::path::PathBuf;

use crate::error::{CliError, CliResult};
use warung_core::ReportPeriod;

pub const USAGE: &str = "\
Warung - shop inventory and point of sale

Usage: warung [OPTIONS] <COMMAND> [ARGS]

Commands:
  products [--category C]             List products (optionally one category)
  categories                          List product categories
  add-product --name N --stock S --price P [--category C] [--image URL]
  edit-product <ID> [--name N] [--stock S] [--price P] [--category C] [--image URL]
  delete-product <ID>
  sell <ID>[:QTY] ...                 Sell products (QTY defaults to 1)
  expense --note N --amount A [--date YYYY-MM-DD]
  history                             All transactions, newest first
  report day [YYYY-MM-DD]             Profit/loss for one day (default today)
  report month [YYYY-MM]              Profit/loss for one month (default this month)
  stock-report [--threshold N]        Inventory value and low-stock list
  help                                Show this message

Options:
  --db <PATH>       Database file (overrides config)
  --config <PATH>   Config file (default: platform config dir)
  --json            Print machine-readable JSON
";

/// Fields of `add-product` / `edit-product`. Every field is optional here;
/// `add-product` checks the required ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFields {
    pub name: Option<String>,
    pub stock: Option<i64>,
    pub price: Option<i64>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// Which report period the user asked for. `None` means the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportRequest {
    Day(Option<ReportPeriod>),
    Month(Option<ReportPeriod>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Products { category: Option<String> },
    Categories,
    AddProduct(ProductFields),
    EditProduct { id: String, fields: ProductFields },
    DeleteProduct { id: String },
    Sell { lines: Vec<(String, i64)> },
    Expense { note: String, amount: i64, date: Option<NaiveDate> },
    History,
    Report(ReportRequest),
    StockReport { threshold: Option<i64> },
    Help,
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub db: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub command: Command,
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses arguments, excluding the program name.
pub fn parse<I, S>(args: I) -> CliResult<Invocation>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut db = None;
    let mut config = None;
    let mut json = false;
    let mut rest = Vec::new();

    let mut args = split_equals(args.into_iter().map(Into::into)).into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => db = Some(PathBuf::from(required_value(&mut args, "--db")?)),
            "--config" => config = Some(PathBuf::from(required_value(&mut args, "--config")?)),
            "--json" => json = true,
            "-h" | "--help" => rest.insert(0, "help".to_string()),
            _ => rest.push(arg),
        }
    }

    let command = parse_command(rest)?;
    Ok(Invocation {
        db,
        config,
        json,
        command,
    })
}

/// `--key=value` becomes `--key value`.
fn split_equals(args: impl Iterator<Item = String>) -> Vec<String> {
    let mut out = Vec::new();
    for arg in args {
        match arg.strip_prefix("--").and_then(|body| body.split_once('=')) {
            Some((key, value)) => {
                out.push(format!("--{}", key));
                out.push(value.to_string());
            }
            None => out.push(arg),
        }
    }
    out
}

fn required_value(args: &mut impl Iterator<Item = String>, flag: &str) -> CliResult<String> {
    args.next()
        .ok_or_else(|| CliError::usage(format!("{} needs a value", flag)))
}

fn parse_command(args: Vec<String>) -> CliResult<Command> {
    let mut args = args.into_iter();
    let Some(name) = args.next() else {
        return Ok(Command::Help);
    };
    let rest: Vec<String> = args.collect();

    match name.as_str() {
        "help" => Ok(Command::Help),
        "products" => {
            let (opts, positional) = options(rest, &["--category"])?;
            no_positional(&name, &positional)?;
            Ok(Command::Products {
                category: opts.get("--category"),
            })
        }
        "categories" => {
            no_positional(&name, &rest)?;
            Ok(Command::Categories)
        }
        "add-product" => {
            let (opts, positional) = options(rest, PRODUCT_FLAGS)?;
            no_positional(&name, &positional)?;
            let fields = product_fields(&opts)?;
            for (flag, present) in [
                ("--name", fields.name.is_some()),
                ("--stock", fields.stock.is_some()),
                ("--price", fields.price.is_some()),
            ] {
                if !present {
                    return Err(CliError::usage(format!("add-product needs {}", flag)));
                }
            }
            Ok(Command::AddProduct(fields))
        }
        "edit-product" => {
            let (opts, positional) = options(rest, PRODUCT_FLAGS)?;
            let id = single_id(&name, positional)?;
            let fields = product_fields(&opts)?;
            if fields == ProductFields::default() {
                return Err(CliError::usage("edit-product needs at least one field to change"));
            }
            Ok(Command::EditProduct { id, fields })
        }
        "delete-product" => Ok(Command::DeleteProduct {
            id: single_id(&name, rest)?,
        }),
        "sell" => {
            if rest.is_empty() {
                return Err(CliError::usage("sell needs at least one <id>[:qty]"));
            }
            let lines = rest
                .iter()
                .map(|raw| parse_sell_line(raw))
                .collect::<CliResult<Vec<_>>>()?;
            Ok(Command::Sell { lines })
        }
        "expense" => {
            let (opts, positional) = options(rest, &["--note", "--amount", "--date"])?;
            no_positional(&name, &positional)?;
            let note = opts
                .get("--note")
                .ok_or_else(|| CliError::usage("expense needs --note"))?;
            let amount = opts
                .get("--amount")
                .ok_or_else(|| CliError::usage("expense needs --amount"))
                .and_then(|raw| parse_amount("--amount", &raw))?;
            let date = opts
                .get("--date")
                .map(|raw| {
                    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                        CliError::usage(format!("--date must be YYYY-MM-DD, got '{}'", raw))
                    })
                })
                .transpose()?;
            Ok(Command::Expense { note, amount, date })
        }
        "history" => {
            no_positional(&name, &rest)?;
            Ok(Command::History)
        }
        "report" => parse_report(rest),
        "stock-report" => {
            let (opts, positional) = options(rest, &["--threshold"])?;
            no_positional(&name, &positional)?;
            let threshold = opts
                .get("--threshold")
                .map(|raw| parse_amount("--threshold", &raw))
                .transpose()?;
            Ok(Command::StockReport { threshold })
        }
        other => Err(CliError::usage(format!(
            "Unknown command '{}'. Run `warung help` for usage.",
            other
        ))),
    }
}

const PRODUCT_FLAGS: &[&str] = &["--name", "--stock", "--price", "--category", "--image"];

fn product_fields(opts: &Options) -> CliResult<ProductFields> {
    Ok(ProductFields {
        name: opts.get("--name"),
        stock: opts
            .get("--stock")
            .map(|raw| parse_amount("--stock", &raw))
            .transpose()?,
        price: opts
            .get("--price")
            .map(|raw| parse_amount("--price", &raw))
            .transpose()?,
        category: opts.get("--category"),
        image_url: opts.get("--image"),
    })
}

fn parse_report(rest: Vec<String>) -> CliResult<Command> {
    let mut rest = rest.into_iter();
    let unit = rest
        .next()
        .ok_or_else(|| CliError::usage("report needs 'day' or 'month'"))?;
    let when = rest.next();
    if let Some(extra) = rest.next() {
        return Err(CliError::usage(format!("Unexpected argument '{}'", extra)));
    }

    let request = match unit.as_str() {
        "day" => ReportRequest::Day(when.as_deref().map(ReportPeriod::parse_day).transpose()?),
        "month" => {
            ReportRequest::Month(when.as_deref().map(ReportPeriod::parse_month).transpose()?)
        }
        other => {
            return Err(CliError::usage(format!(
                "report needs 'day' or 'month', got '{}'",
                other
            )))
        }
    };
    Ok(Command::Report(request))
}

/// `<id>` or `<id>:<qty>`.
fn parse_sell_line(raw: &str) -> CliResult<(String, i64)> {
    let (id, qty) = match raw.rsplit_once(':') {
        Some((id, qty)) => (id, parse_amount("quantity", qty)?),
        None => (raw, 1),
    };
    if id.trim().is_empty() {
        return Err(CliError::usage(format!("Missing product id in '{}'", raw)));
    }
    Ok((id.trim().to_string(), qty))
}

/// Whole number, allowing `.` and `_` as thousands separators (`15.000`).
fn parse_amount(what: &str, raw: &str) -> CliResult<i64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != '.' && *c != '_').collect();
    cleaned
        .parse::<i64>()
        .map_err(|_| CliError::usage(format!("{} must be a whole number, got '{}'", what, raw)))
}

// =============================================================================
// Option Helpers
// =============================================================================

#[derive(Debug, Default)]
struct Options(Vec<(String, String)>);

impl Options {
    /// Last occurrence wins.
    fn get(&self, flag: &str) -> Option<String> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k == flag)
            .map(|(_, v)| v.clone())
    }
}

/// Splits known `--flag value` pairs from positional arguments.
fn options(args: Vec<String>, allowed: &[&str]) -> CliResult<(Options, Vec<String>)> {
    let mut opts = Options::default();
    let mut positional = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg.starts_with("--") {
            if !allowed.contains(&arg.as_str()) {
                return Err(CliError::usage(format!("Unknown option '{}'", arg)));
            }
            let value = required_value(&mut args, &arg)?;
            opts.0.push((arg, value));
        } else {
            positional.push(arg);
        }
    }

    Ok((opts, positional))
}

fn no_positional(command: &str, positional: &[String]) -> CliResult<()> {
    match positional.first() {
        Some(extra) => Err(CliError::usage(format!(
            "Unexpected argument '{}' for {}",
            extra, command
        ))),
        None => Ok(()),
    }
}

fn single_id(command: &str, positional: Vec<String>) -> CliResult<String> {
    let mut positional = positional.into_iter();
    let id = positional
        .next()
        .ok_or_else(|| CliError::usage(format!("{} needs a product id", command)))?;
    no_positional(command, &positional.collect::<Vec<_>>())?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn cmd(args: &[&str]) -> Command {
        parse(args.iter().copied()).unwrap().command
    }

    #[test]
    fn test_no_arguments_shows_help() {
        assert_eq!(cmd(&[]), Command::Help);
        assert_eq!(cmd(&["--help"]), Command::Help);
    }

    #[test]
    fn test_global_options_anywhere() {
        let inv = parse(["history", "--json", "--db=/tmp/a.db"]).unwrap();
        assert!(inv.json);
        assert_eq!(inv.db, Some(PathBuf::from("/tmp/a.db")));
        assert_eq!(inv.command, Command::History);
    }

    #[test]
    fn test_sell_lines_default_to_one() {
        assert_eq!(
            cmd(&["sell", "p-1:3", "p-2"]),
            Command::Sell {
                lines: vec![("p-1".to_string(), 3), ("p-2".to_string(), 1)]
            }
        );
    }

    #[test]
    fn test_add_product_requires_fields() {
        let err = parse(["add-product", "--name", "Lenjer", "--price", "8000"]).unwrap_err();
        assert_eq!(err.code, ErrorCode::UsageError);
        assert!(err.message.contains("--stock"));

        assert_eq!(
            cmd(&["add-product", "--name=Lenjer", "--stock", "10", "--price", "8.000"]),
            Command::AddProduct(ProductFields {
                name: Some("Lenjer".to_string()),
                stock: Some(10),
                price: Some(8_000),
                category: None,
                image_url: None,
            })
        );
    }

    #[test]
    fn test_edit_needs_a_field() {
        assert!(parse(["edit-product", "p-1"]).is_err());
        match cmd(&["edit-product", "p-1", "--stock", "7"]) {
            Command::EditProduct { id, fields } => {
                assert_eq!(id, "p-1");
                assert_eq!(fields.stock, Some(7));
                assert_eq!(fields.name, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_expense_with_date() {
        assert_eq!(
            cmd(&["expense", "--note", "Gas", "--amount", "25_000", "--date", "2025-03-01"]),
            Command::Expense {
                note: "Gas".to_string(),
                amount: 25_000,
                date: NaiveDate::from_ymd_opt(2025, 3, 1),
            }
        );
        assert!(parse(["expense", "--note", "Gas", "--amount", "lots"]).is_err());
    }

    #[test]
    fn test_report_periods() {
        assert_eq!(cmd(&["report", "day"]), Command::Report(ReportRequest::Day(None)));
        assert_eq!(
            cmd(&["report", "month", "2025-03"]),
            Command::Report(ReportRequest::Month(Some(ReportPeriod::Month {
                year: 2025,
                month: 3
            })))
        );
        assert!(parse(["report", "week"]).is_err());
    }

    #[test]
    fn test_unknown_command_and_option() {
        assert_eq!(parse(["refund"]).unwrap_err().code, ErrorCode::UsageError);
        assert_eq!(
            parse(["products", "--colour", "red"]).unwrap_err().code,
            ErrorCode::UsageError
        );
    }
}
