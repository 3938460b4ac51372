//! Process configuration, read from environment variables.

use std::net::SocketAddr;

use larder_infra::LedgerSettings;
use larder_infra::config::{ConfigError, StoreConfig, parse_or};
use larder_infra::ledger_service::DEFAULT_GENERATION_WINDOW_DAYS;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub store: StoreConfig,
    pub ledger: LedgerSettings,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = match lookup("LARDER_BIND_ADDR") {
            None => DEFAULT_BIND_ADDR.parse().map_err(|_| ConfigError::Invalid {
                name: "LARDER_BIND_ADDR",
                value: DEFAULT_BIND_ADDR.to_string(),
            })?,
            Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "LARDER_BIND_ADDR",
                value: v.clone(),
            })?,
        };
        let generation_window_days =
            parse_or("RECORD_GENERATION_WINDOW_DAYS", &lookup, DEFAULT_GENERATION_WINDOW_DAYS)?;

        Ok(Self {
            bind_addr,
            store: StoreConfig::from_lookup(&lookup)?,
            ledger: LedgerSettings {
                generation_window_days,
            },
        })
    }
}
