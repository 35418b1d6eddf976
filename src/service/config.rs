//! # Service configuration.
//!
//! [`ServiceConfig`] is read from process environment variables, after an
//! optional `.env` file in the working directory has been merged in.
//!
//! | Variable              | Default                    |
//! |-----------------------|----------------------------|
//! | `HTTP_HOST`           | `0.0.0.0`                  |
//! | `HTTP_PORT`           | `8080`                     |
//! | `SERVICE_NAME`        | `game-result-microservice` |
//! | `SUBSCRIBE_CHANNELS`  | `game-results`             |
//! | `LOG_LEVEL`           | `info`                     |
//! | `DRAIN_TIMEOUT_SECS`  | `0` (unbounded)            |
//! | `SHUTDOWN_GRACE_SECS` | `30`                       |
//! | `BROKER`              | `redis` (`redis`/`memory`) |
//! | `REDIS_HOST`          | `localhost`                |
//! | `REDIS_PORT`          | `6379`                     |
//! | `REDIS_USERNAME`      | empty                      |
//! | `REDIS_PASSWORD`      | empty                      |
//! | `REDIS_DB`            | `0`                        |
//!
//! Empty values use the default. Integers that fail to parse also use the
//! default; the offending variable is remembered and reported by
//! [`ServiceConfig::log_fallbacks`] once logging is up.

use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn};

use crate::{ManagerConfig, RedisOptions};

/// Which broker the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerKind {
    /// Redis pub/sub (`RedisTransport`).
    Redis,
    /// In-process broker, fed through `POST /publish/{channel}`.
    Memory,
}

impl FromStr for BrokerKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(BrokerKind::Redis),
            "memory" => Ok(BrokerKind::Memory),
            _ => Err(()),
        }
    }
}

/// A variable whose value could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallback {
    /// Environment variable name.
    pub key: &'static str,
    /// Rejected raw value.
    pub value: String,
}

/// Runtime settings of the microservice.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Interface the HTTP server binds to.
    pub http_host: String,
    /// Port the HTTP server binds to.
    pub http_port: u16,
    /// Name reported by `/health`.
    pub service_name: String,
    /// Channels to subscribe at startup.
    pub subscribe_channels: Vec<String>,
    /// Default `tracing` filter directive (`RUST_LOG` overrides it).
    pub log_level: String,
    /// Per-listener drain bound on unsubscribe (`0s` = unbounded).
    pub drain_timeout: Duration,
    /// Upper bound for the graceful HTTP shutdown.
    pub shutdown_grace: Duration,
    /// Broker implementation.
    pub broker: BrokerKind,
    /// Redis connection settings (used when `broker` is `Redis`).
    pub redis: RedisOptions,

    fallbacks: Vec<Fallback>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            service_name: "game-result-microservice".to_string(),
            subscribe_channels: vec!["game-results".to_string()],
            log_level: "info".to_string(),
            drain_timeout: Duration::ZERO,
            shutdown_grace: Duration::from_secs(30),
            broker: BrokerKind::Redis,
            redis: RedisOptions::default(),
            fallbacks: Vec::new(),
        }
    }
}

impl ServiceConfig {
    /// Loads `.env` (a missing file is fine) and reads the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let mut fallbacks = Vec::new();

        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut parse = |key: &'static str, default: u64| -> u64 {
            match get(key) {
                None => default,
                Some(raw) => parse_or(key, raw, default, &mut fallbacks),
            }
        };
        let drain_secs = parse("DRAIN_TIMEOUT_SECS", 0);
        let grace_secs = parse("SHUTDOWN_GRACE_SECS", defaults.shutdown_grace.as_secs());

        let http_port = match get("HTTP_PORT") {
            None => defaults.http_port,
            Some(raw) => parse_or("HTTP_PORT", raw, defaults.http_port, &mut fallbacks),
        };

        let redis_port = match get("REDIS_PORT") {
            None => defaults.redis.port,
            Some(raw) => parse_or("REDIS_PORT", raw, defaults.redis.port, &mut fallbacks),
        };
        let redis_db = match get("REDIS_DB") {
            None => defaults.redis.db,
            Some(raw) => parse_or("REDIS_DB", raw, defaults.redis.db, &mut fallbacks),
        };
        let broker = match get("BROKER") {
            None => defaults.broker,
            Some(raw) => parse_or("BROKER", raw, defaults.broker, &mut fallbacks),
        };

        let subscribe_channels = get("SUBSCRIBE_CHANNELS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.subscribe_channels);

        Self {
            http_host: get("HTTP_HOST").unwrap_or(defaults.http_host),
            http_port,
            service_name: get("SERVICE_NAME").unwrap_or(defaults.service_name),
            subscribe_channels,
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
            drain_timeout: Duration::from_secs(drain_secs),
            shutdown_grace: Duration::from_secs(grace_secs),
            broker,
            redis: RedisOptions {
                host: get("REDIS_HOST").unwrap_or(defaults.redis.host),
                port: redis_port,
                username: lookup("REDIS_USERNAME").unwrap_or_default(),
                password: lookup("REDIS_PASSWORD").unwrap_or_default(),
                db: redis_db,
            },
            fallbacks,
        }
    }

    /// `host:port` string for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Manager settings derived from this configuration.
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            drain_timeout: self.drain_timeout,
            ..ManagerConfig::default()
        }
    }

    /// Variables that were set but could not be parsed.
    pub fn fallbacks(&self) -> &[Fallback] {
        &self.fallbacks
    }

    /// Logs the effective configuration and every parse fallback.
    pub fn log_fallbacks(&self) {
        for f in &self.fallbacks {
            warn!(key = f.key, value = %f.value, "invalid value in environment; using default");
        }
        info!(
            addr = %self.bind_addr(),
            service = %self.service_name,
            channels = ?self.subscribe_channels,
            drain_timeout = ?self.drain_timeout,
            shutdown_grace = ?self.shutdown_grace,
            broker = ?self.broker,
            redis_host = %self.redis.host,
            redis_port = self.redis.port,
            redis_db = self.redis.db,
            "configuration loaded"
        );
    }
}

fn parse_or<T: FromStr>(
    key: &'static str,
    raw: String,
    default: T,
    fallbacks: &mut Vec<Fallback>,
) -> T {
    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            fallbacks.push(Fallback { key, value: raw });
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> ServiceConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let cfg = from_pairs(&[]);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8080");
        assert_eq!(cfg.service_name, "game-result-microservice");
        assert_eq!(cfg.subscribe_channels, vec!["game-results".to_string()]);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.drain_timeout, Duration::ZERO);
        assert_eq!(cfg.shutdown_grace, Duration::from_secs(30));
        assert_eq!(cfg.broker, BrokerKind::Redis);
        assert_eq!(cfg.redis, RedisOptions::default());
        assert_eq!(cfg.redis.host, "localhost");
        assert_eq!(cfg.redis.port, 6379);
        assert!(cfg.fallbacks().is_empty());
    }

    #[test]
    fn test_empty_values_use_defaults() {
        let cfg = from_pairs(&[
            ("HTTP_HOST", ""),
            ("HTTP_PORT", " "),
            ("SUBSCRIBE_CHANNELS", ", ,"),
        ]);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8080");
        assert_eq!(cfg.subscribe_channels, vec!["game-results".to_string()]);
        assert!(cfg.fallbacks().is_empty());
    }

    #[test]
    fn test_overrides_are_applied() {
        let cfg = from_pairs(&[
            ("HTTP_HOST", "127.0.0.1"),
            ("HTTP_PORT", "9000"),
            ("SUBSCRIBE_CHANNELS", "game-results, chat-messages"),
            ("DRAIN_TIMEOUT_SECS", "5"),
        ]);
        assert_eq!(cfg.bind_addr(), "127.0.0.1:9000");
        assert_eq!(
            cfg.subscribe_channels,
            vec!["game-results".to_string(), "chat-messages".to_string()]
        );
        assert_eq!(cfg.manager_config().drain_limit(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_redis_settings_are_read() {
        let cfg = from_pairs(&[
            ("BROKER", "Memory"),
            ("REDIS_HOST", "cache.internal"),
            ("REDIS_PORT", "6380"),
            ("REDIS_USERNAME", "svc"),
            ("REDIS_PASSWORD", "s3cret"),
            ("REDIS_DB", "3"),
        ]);
        assert_eq!(cfg.broker, BrokerKind::Memory);
        assert_eq!(
            cfg.redis,
            RedisOptions {
                host: "cache.internal".into(),
                port: 6380,
                username: "svc".into(),
                password: "s3cret".into(),
                db: 3,
            }
        );
    }

    #[test]
    fn test_unknown_broker_falls_back_to_redis() {
        let cfg = from_pairs(&[("BROKER", "kafka"), ("REDIS_DB", "zero")]);
        assert_eq!(cfg.broker, BrokerKind::Redis);
        assert_eq!(cfg.redis.db, 0);

        let keys: Vec<_> = cfg.fallbacks().iter().map(|f| f.key).collect();
        assert_eq!(keys, vec!["REDIS_DB", "BROKER"]);
    }

    #[test]
    fn test_unparsable_integer_falls_back() {
        let cfg = from_pairs(&[("HTTP_PORT", "eighty"), ("SHUTDOWN_GRACE_SECS", "-1")]);
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.shutdown_grace, Duration::from_secs(30));

        let keys: Vec<_> = cfg.fallbacks().iter().map(|f| f.key).collect();
        assert_eq!(keys, vec!["SHUTDOWN_GRACE_SECS", "HTTP_PORT"]);
    }
}
