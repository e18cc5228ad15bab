//! # Configuration
//!
//! Settings for the `warung` binary.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Command line (highest priority)                                    │
//! │     --db ./toko.db                                                     │
//! │                                                                         │
//! │  2. Environment Variables                                              │
//! │     WARUNG_DB_PATH, WARUNG_USER, WARUNG_LOG,                           │
//! │     WARUNG_SALE_MAX_ATTEMPTS                                           │
//! │                                                                         │
//! │  3. TOML Config File                                                   │
//! │     --config <path>, else the platform config dir:                     │
//! │     ~/.config/warung/warung.toml (Linux)                               │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/home/toko/warung.db"
//! max_connections = 5
//!
//! [session]
//! user_id = "ibu-sari"
//!
//! [sale]
//! max_attempts = 5
//! initial_backoff_ms = 20
//! max_backoff_ms = 500
//!
//! [report]
//! low_stock_threshold = 5
//! utc_offset_minutes = 420   # WIB
//!
//! [log]
//! filter = "info,warung=debug,sqlx=warn"
//! ```

use chrono::{FixedOffset, Offset, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{CliError, CliResult};
use warung_core::{Session, DEFAULT_LOW_STOCK_THRESHOLD};
use warung_db::{DbConfig, RetryPolicy};

pub const DEFAULT_LOG_FILTER: &str = "info,warung=debug,sqlx=warn";

// =============================================================================
// Sections
// =============================================================================

/// `[database]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to `warung.db` in the platform data dir.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

/// `[session]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Recorded on every sale and expense.
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

fn default_user_id() -> String {
    "owner".to_string()
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            user_id: default_user_id(),
        }
    }
}

/// `[sale]` - conflict retry budget for checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}
fn default_initial_backoff() -> u64 {
    20
}
fn default_max_backoff() -> u64 {
    500
}

impl Default for SaleSettings {
    fn default() -> Self {
        SaleSettings {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

/// `[report]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSettings {
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,

    /// Local offset used to bucket transactions into days and months.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,
}

fn default_low_stock_threshold() -> i64 {
    DEFAULT_LOW_STOCK_THRESHOLD
}
fn default_utc_offset() -> i32 {
    7 * 60
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            low_stock_threshold: default_low_stock_threshold(),
            utc_offset_minutes: default_utc_offset(),
        }
    }
}

/// `[log]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directives; `RUST_LOG` still wins when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// App Config
// =============================================================================

/// Complete configuration for one `warung` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub sale: SaleSettings,

    #[serde(default)]
    pub report: ReportSettings,

    #[serde(default)]
    pub log: LogSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (an explicit path must exist; the default one may not)
    /// 3. Environment variables
    pub fn load(config_path: Option<&Path>) -> CliResult<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!(?path, "Config file not found, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses one TOML file.
    pub fn from_file(path: &Path) -> CliResult<Self> {
        debug!(?path, "Loading config from file");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| CliError::config(format!("Cannot read {}: {}", path.display(), e)))?;

        toml::from_str(&contents)
            .map_err(|e| CliError::config(format!("Invalid {}: {}", path.display(), e)))
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CliResult<()> {
        if self.session.user_id.trim().is_empty() {
            return Err(CliError::config("session.user_id must not be empty"));
        }

        if self.database.max_connections == 0 {
            return Err(CliError::config("database.max_connections must be greater than 0"));
        }

        if self.sale.max_attempts == 0 {
            return Err(CliError::config("sale.max_attempts must be greater than 0"));
        }

        if self.sale.initial_backoff_ms > self.sale.max_backoff_ms {
            return Err(CliError::config(
                "sale.initial_backoff_ms must not exceed sale.max_backoff_ms",
            ));
        }

        if self.report.low_stock_threshold < 0 {
            return Err(CliError::config("report.low_stock_threshold must not be negative"));
        }

        if self.fixed_offset().is_none() {
            return Err(CliError::config(format!(
                "report.utc_offset_minutes out of range: {}",
                self.report.utc_offset_minutes
            )));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("WARUNG_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(user) = lookup("WARUNG_USER") {
            self.session.user_id = user;
        }

        if let Some(filter) = lookup("WARUNG_LOG") {
            self.log.filter = filter;
        }

        if let Some(attempts) = lookup("WARUNG_SALE_MAX_ATTEMPTS") {
            match attempts.parse::<u32>() {
                Ok(n) => self.sale.max_attempts = n,
                Err(_) => warn!(value = %attempts, "Ignoring invalid WARUNG_SALE_MAX_ATTEMPTS"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("id", "warung", "warung").map(|dirs| dirs.config_dir().join("warung.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Database file to open: explicit setting, else the platform data dir.
    pub fn database_path(&self) -> CliResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }

        let dirs = ProjectDirs::from("id", "warung", "warung")
            .ok_or_else(|| CliError::config("Could not determine app data directory"))?;
        let data_dir = dirs.data_dir();

        std::fs::create_dir_all(data_dir)
            .map_err(|e| CliError::config(format!("Cannot create {}: {}", data_dir.display(), e)))?;

        Ok(data_dir.join("warung.db"))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.sale.max_attempts).backoff(
            Duration::from_millis(self.sale.initial_backoff_ms),
            Duration::from_millis(self.sale.max_backoff_ms),
        )
    }

    pub fn db_config(&self) -> CliResult<DbConfig> {
        Ok(DbConfig::new(self.database_path()?)
            .max_connections(self.database.max_connections)
            .sale_retry(self.retry_policy()))
    }

    pub fn session(&self) -> Session {
        Session::new(self.session.user_id.trim())
    }

    /// The shop's local offset. Falls back to UTC if out of range, which
    /// [`AppConfig::validate`] already rejects.
    pub fn utc_offset(&self) -> FixedOffset {
        self.fixed_offset().unwrap_or_else(|| Utc.fix())
    }

    fn fixed_offset(&self) -> Option<FixedOffset> {
        self.report
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.session.user_id, "owner");
        assert_eq!(config.sale.max_attempts, 5);
        assert_eq!(config.report.low_stock_threshold, 5);
        assert_eq!(config.log.filter, DEFAULT_LOG_FILTER);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [session]
            user_id = "ibu-sari"

            [report]
            utc_offset_minutes = 480
            "#,
        )
        .unwrap();

        assert_eq!(config.session.user_id, "ibu-sari");
        assert_eq!(config.report.utc_offset_minutes, 480);
        assert_eq!(config.report.low_stock_threshold, 5);
        assert_eq!(config.sale, SaleSettings::default());
        assert_eq!(config.utc_offset().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("WARUNG_DB_PATH", "/tmp/toko.db"),
            ("WARUNG_USER", "kasir-2"),
            ("WARUNG_SALE_MAX_ATTEMPTS", "9"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/toko.db")));
        assert_eq!(config.session().user_id, "kasir-2");
        assert_eq!(config.retry_policy().max_attempts, 9);
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/toko.db"));
    }

    #[test]
    fn test_invalid_env_number_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(|k| (k == "WARUNG_SALE_MAX_ATTEMPTS").then(|| "lots".to_string()));
        assert_eq!(config.sale.max_attempts, 5);
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.session.user_id = "  ".to_string();
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.sale.max_attempts = 0;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.sale.initial_backoff_ms = 1_000;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.report.utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/definitely/not/here/warung.toml"))).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ConfigError);
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).unwrap();
        assert!(toml_str.contains("[session]"));
        assert!(toml_str.contains("[sale]"));
    }
}
