//! Worker configuration.
//!
//! Read once at start-up from the environment. The database URL and the
//! secure payload key are redacted from `Debug` output.

use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

use crate::secure::{SecureError, SecureKey};

const DEFAULT_POLL_BATCH_SIZE: usize = 10;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_VISIBILITY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BLOB_TIMEOUT_SECS: u64 = 30;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("invalid SECURE_PAYLOAD_KEY: {0}")]
    SecureKey(#[from] SecureError),
}

#[derive(Clone)]
pub struct WorkerConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Base URL change-request keys resolve against. Only `run` needs it.
    pub blob_base_url: Option<Url>,
    /// Key for legacy secure payloads; without it such messages fail.
    pub secure_payload_key: Option<SecureKey>,
    pub poll_batch_size: usize,
    pub poll_interval: Duration,
    pub visibility_timeout: Duration,
    pub blob_timeout: Duration,
    /// Prometheus listener address; no exporter when unset.
    pub metrics_addr: Option<SocketAddr>,
}

impl std::fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("database_url", &"[REDACTED]")
            .field("blob_base_url", &self.blob_base_url)
            .field("secure_payload_key", &self.secure_payload_key.as_ref().map(|_| "[REDACTED]"))
            .field("poll_batch_size", &self.poll_batch_size)
            .field("poll_interval", &self.poll_interval)
            .field("visibility_timeout", &self.visibility_timeout)
            .field("blob_timeout", &self.blob_timeout)
            .field("metrics_addr", &self.metrics_addr)
            .finish()
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `DATABASE_URL` (required)
    /// - `BLOB_BASE_URL`
    /// - `SECURE_PAYLOAD_KEY` (64 hex characters)
    /// - `POLL_BATCH_SIZE` (default: 10)
    /// - `POLL_INTERVAL_MS` (default: 1000)
    /// - `VISIBILITY_TIMEOUT_SECS` (default: 30)
    /// - `BLOB_TIMEOUT_SECS` (default: 30)
    /// - `METRICS_ADDR`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let present = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let database_url = present("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let blob_base_url = present("BLOB_BASE_URL")
            .map(|raw| {
                Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
                    var: "BLOB_BASE_URL",
                    reason: e.to_string(),
                })
            })
            .transpose()?;
        let secure_payload_key = present("SECURE_PAYLOAD_KEY")
            .map(|hex| SecureKey::from_hex(&hex))
            .transpose()?;
        let metrics_addr = present("METRICS_ADDR")
            .map(|raw| {
                raw.trim().parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
                    var: "METRICS_ADDR",
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let number = |var: &'static str, default: u64| -> Result<u64, ConfigError> {
            match present(var) {
                None => Ok(default),
                Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                    var,
                    reason: e.to_string(),
                }),
            }
        };

        let poll_batch_size = number("POLL_BATCH_SIZE", DEFAULT_POLL_BATCH_SIZE as u64)?;
        if poll_batch_size == 0 {
            return Err(ConfigError::Invalid {
                var: "POLL_BATCH_SIZE",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            database_url,
            blob_base_url,
            secure_payload_key,
            poll_batch_size: usize::try_from(poll_batch_size).unwrap_or(DEFAULT_POLL_BATCH_SIZE),
            poll_interval: Duration::from_millis(number("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?),
            visibility_timeout: Duration::from_secs(number("VISIBILITY_TIMEOUT_SECS", DEFAULT_VISIBILITY_TIMEOUT_SECS)?),
            blob_timeout: Duration::from_secs(number("BLOB_TIMEOUT_SECS", DEFAULT_BLOB_TIMEOUT_SECS)?),
            metrics_addr,
        })
    }

    /// The blob base URL, required by the `run` subcommand.
    pub fn require_blob_base_url(&self) -> Result<&Url, ConfigError> {
        self.blob_base_url.as_ref().ok_or(ConfigError::Missing("BLOB_BASE_URL"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<WorkerConfig, ConfigError> {
        let env: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        WorkerConfig::from_lookup(|var| env.get(var).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_is_set() {
        let cfg = load(&[("DATABASE_URL", "postgres://asl:secret@db/asl")]).unwrap();
        assert_eq!(cfg.poll_batch_size, 10);
        assert_eq!(cfg.poll_interval, Duration::from_millis(1000));
        assert_eq!(cfg.visibility_timeout, Duration::from_secs(30));
        assert!(cfg.blob_base_url.is_none());
        assert!(cfg.secure_payload_key.is_none());
        assert!(cfg.metrics_addr.is_none());
        assert!(matches!(cfg.require_blob_base_url(), Err(ConfigError::Missing("BLOB_BASE_URL"))));
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("DATABASE_URL"))));
        assert!(matches!(load(&[("DATABASE_URL", " ")]), Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn full_configuration_parses() {
        let key = "ab".repeat(32);
        let cfg = load(&[
            ("DATABASE_URL", "postgres://db/asl"),
            ("BLOB_BASE_URL", "https://blobs.example.test/requests/"),
            ("SECURE_PAYLOAD_KEY", key.as_str()),
            ("POLL_BATCH_SIZE", "25"),
            ("POLL_INTERVAL_MS", "250"),
            ("VISIBILITY_TIMEOUT_SECS", "120"),
            ("METRICS_ADDR", "0.0.0.0:9100"),
        ])
        .unwrap();
        assert_eq!(cfg.poll_batch_size, 25);
        assert_eq!(cfg.poll_interval, Duration::from_millis(250));
        assert_eq!(cfg.visibility_timeout, Duration::from_secs(120));
        assert!(cfg.secure_payload_key.is_some());
        assert_eq!(cfg.metrics_addr.unwrap().port(), 9100);
        assert_eq!(cfg.require_blob_base_url().unwrap().host_str(), Some("blobs.example.test"));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = load(&[("DATABASE_URL", "postgres://db"), ("POLL_INTERVAL_MS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("POLL_INTERVAL_MS"));

        let err = load(&[("DATABASE_URL", "postgres://db"), ("POLL_BATCH_SIZE", "0")]).unwrap_err();
        assert!(err.to_string().contains("POLL_BATCH_SIZE"));

        let err = load(&[("DATABASE_URL", "postgres://db"), ("SECURE_PAYLOAD_KEY", "abcd")]).unwrap_err();
        assert!(matches!(err, ConfigError::SecureKey(SecureError::KeyLength(2))));
    }

    #[test]
    fn debug_redacts_secrets() {
        let key = "cd".repeat(32);
        let cfg = load(&[
            ("DATABASE_URL", "postgres://asl:hunter2@db/asl"),
            ("SECURE_PAYLOAD_KEY", key.as_str()),
        ])
        .unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("cdcd"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
