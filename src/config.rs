use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use ::config::{Config as Source, ConfigBuilder, Environment, File};
use ::config::builder::DefaultState;
use serde_derive::Deserialize;
use simplelog::LevelFilter;

use crate::utils::{ErrorStr, Result};


const ENV_PREFIX: &str = "USERDESK";

pub const CONFIG_ERROR: &str = "config error";
pub const INVALID_WORKERS_ERROR: &str = "invalid workers count";
pub const INVALID_LOG_LEVEL_ERROR: &str = "invalid log level";

pub const LOG_CONSOLE: &str = "console";
pub const LOG_FILE: &str = "file";
pub const LOG_COMBINED: &str = "combined";


#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub log: LogConfig,
    pub pages: PagesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound of connections handled at the same time
    pub workers: usize,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    /// Budget for the request line and headers together
    pub max_head_bytes: usize,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub kind: String,
    pub level: String,
    /// Empty means `logs/app-<unix seconds>.log`
    pub file: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PagesConfig {
    pub dashboard: String,
}


fn report(e: impl Display) -> ErrorStr {
    // logger is not initialized yet at this point
    eprintln!("[CONFIG] Failed to load configuration: {}", e);
    CONFIG_ERROR
}

fn defaults() -> std::result::Result<ConfigBuilder<DefaultState>, ::config::ConfigError> {
    Source::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080_i64)?
        .set_default("server.workers", 8_i64)?
        .set_default("server.read_timeout_secs", 10_i64)?
        .set_default("server.write_timeout_secs", 10_i64)?
        .set_default("server.max_head_bytes", 8192_i64)?
        .set_default("server.max_body_bytes", 65536_i64)?
        .set_default("log.kind", LOG_CONSOLE)?
        .set_default("log.level", "info")?
        .set_default("log.file", "")?
        .set_default("pages.dashboard", "../config/dashboard.html")
}

impl Config {
    /// Load configuration: built-in defaults, then the optional file, then `USERDESK__*` env variables
    pub fn load(path: Option<&str>) -> Result<Config> {
        let mut builder = defaults().map_err(report)?;
        if let Some(p) = path {
            builder = builder.add_source(File::with_name(p));
        }
        let cfg: Config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true))
            .build().map_err(report)?
            .try_deserialize().map_err(report)?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Built-in defaults only, ignoring files and environment
    #[cfg(test)]
    pub fn default_config() -> Result<Config> {
        defaults().map_err(report)?
            .build().map_err(report)?
            .try_deserialize().map_err(report)
    }

    fn validate(&self) -> Result<()> {
        if self.server.workers == 0 {
            eprintln!("[CONFIG] server.workers must be greater than zero");
            return Err(INVALID_WORKERS_ERROR);
        }
        self.log.level_filter().map(|_| ())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        timeout(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        timeout(self.write_timeout_secs)
    }
}

fn timeout(secs: u64) -> Option<Duration> {
    if secs == 0 { None } else { Some(Duration::from_secs(secs)) }
}

impl LogConfig {
    pub fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.level).map_err(|_| {
            eprintln!("[CONFIG] Unknown log level: {}", self.level);
            INVALID_LOG_LEVEL_ERROR
        })
    }

    pub fn file_path(&self) -> String {
        if self.file.is_empty() {
            format!("logs/app-{}.log", time::OffsetDateTime::now_utc().unix_timestamp())
        } else {
            self.file.clone()
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default_config().unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.workers, 8);
        assert_eq!(cfg.server.max_head_bytes, 8192);
        assert_eq!(cfg.server.max_body_bytes, 65536);
        assert_eq!(cfg.server.read_timeout(), Some(Duration::from_secs(10)));
        assert_eq!(cfg.log.kind, LOG_CONSOLE);
        assert_eq!(cfg.log.level_filter().unwrap(), LevelFilter::Info);
        assert_eq!(cfg.pages.dashboard, "../config/dashboard.html");
        assert_eq!(cfg.address(), "0.0.0.0:8080");
    }

    #[test]
    fn file_overrides_defaults() {
        let mut f = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(f, "[server]\nport = 9090\nworkers = 2\nread_timeout_secs = 0\n\n[log]\nlevel = \"debug\"").unwrap();

        let cfg = Config::load(f.path().to_str()).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.workers, 2);
        assert_eq!(cfg.server.read_timeout(), None);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.log.level_filter().unwrap(), LevelFilter::Debug);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let mut f = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(f, "[server]\nworkers = 0").unwrap();

        assert_eq!(Config::load(f.path().to_str()).unwrap_err(), INVALID_WORKERS_ERROR);
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let log = LogConfig { kind: LOG_CONSOLE.to_string(), level: "loud".to_string(), file: String::new() };
        assert_eq!(log.level_filter().unwrap_err(), INVALID_LOG_LEVEL_ERROR);
    }

    #[test]
    fn empty_log_file_gets_generated_name() {
        let log = LogConfig { kind: LOG_FILE.to_string(), level: "info".to_string(), file: String::new() };
        let path = log.file_path();
        assert!(path.starts_with("logs/app-") && path.ends_with(".log"));
    }
}
