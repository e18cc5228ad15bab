//! # Warung Entry Point
//!
//! `warung` - inventory and point of sale for a small shop.
//!
//! The actual work is in `lib.rs` for better testability.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    warung_cli::run(std::env::args().skip(1).collect()).await
}
