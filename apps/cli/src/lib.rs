//! # Warung CLI Library
//!
//! Everything behind the `warung` binary. Kept in a library so the commands
//! can be driven from tests against an in-memory database.
//!
//! ## Module Structure
//! ```text
//! warung_cli/
//! ├── lib.rs       ◄─── You are here (run, tracing setup)
//! ├── cli.rs       ◄─── Argument parsing
//! ├── config.rs    ◄─── warung.toml + environment overrides
//! ├── error.rs     ◄─── CliError (code + message)
//! └── commands/    ◄─── One function per subcommand
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Command, Invocation};
use commands::{Context, Output};
use config::AppConfig;
use error::{CliError, CliResult};
use warung_db::Database;

/// Runs one invocation end to end.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Parse arguments ──────────────────────────────► USAGE_ERROR (2)     │
/// │  2. Load config (file, env, --db) ────────────────► CONFIG_ERROR        │
/// │  3. Initialize tracing (RUST_LOG, else log.filter)                      │
/// │  4. Open database & run migrations                                      │
/// │  5. Dispatch the command                                                │
/// │  6. Print text, or JSON with --json                                     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
///
/// Results go to stdout; errors and logs go to stderr.
pub async fn run(args: Vec<String>) -> ExitCode {
    let wants_json = args.iter().any(|a| a == "--json");

    let invocation = match cli::parse(args) {
        Ok(invocation) => invocation,
        Err(err) => return fail(&err, wants_json),
    };
    let json = invocation.json;

    match execute(invocation).await {
        Ok(output) => {
            if json {
                match serde_json::to_string_pretty(&output.json) {
                    Ok(body) => println!("{}", body),
                    Err(e) => return fail(&CliError::from(e), json),
                }
            } else {
                println!("{}", output.text);
            }
            ExitCode::SUCCESS
        }
        Err(err) => fail(&err, json),
    }
}

async fn execute(invocation: Invocation) -> CliResult<Output> {
    if invocation.command == Command::Help {
        return commands::dispatch_help();
    }

    let mut config = AppConfig::load(invocation.config.as_deref())?;
    if let Some(path) = invocation.db {
        config.database.path = Some(path);
    }

    init_tracing(&config.log.filter);

    let db_config = config.db_config()?;
    info!(path = %db_config.database_path.display(), user = %config.session.user_id, "Opening database");
    let db = Database::new(db_config).await?;

    let ctx = Context::new(db, &config);
    let result = commands::dispatch(&ctx, invocation.command).await;
    ctx.db.close().await;

    result
}

fn fail(err: &CliError, json: bool) -> ExitCode {
    if json {
        match serde_json::to_string(err) {
            Ok(body) => eprintln!("{}", body),
            Err(_) => eprintln!("{}", err),
        }
    } else {
        eprintln!("{}", err);
    }
    err.exit_code()
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=warung=trace` - Trace only our crates
/// - otherwise `log.filter` from the config (default `info,warung=debug,sqlx=warn`)
///
/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
