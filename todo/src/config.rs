//! Configuration management for the todo list.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use todoflow_runtime::StoreConfig;

use crate::view::ViewTimings;

/// Errors from loading or validating configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set to something that cannot be parsed
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue {
        /// Environment variable name
        name: &'static str,
        /// The offending value
        value: String,
    },

    /// A setting is outside its allowed range
    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Seconds before the list view closes its static alert (default: 20)
    pub alert_dismiss_secs: u64,
    /// Seconds of quiet before a success message is cleared (default: 3)
    pub success_message_secs: u64,
    /// Capacity of the store's action broadcast channel (default: 16)
    pub broadcast_capacity: usize,
    /// Graceful shutdown timeout in seconds (default: 30)
    pub shutdown_timeout_secs: u64,
    /// Prometheus listener address; unset disables the exporter
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            alert_dismiss_secs: 20,
            success_message_secs: 3,
            broadcast_capacity: 16,
            shutdown_timeout_secs: 30,
            metrics_addr: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `TODO_METRICS_ADDR` is set but
    /// is not a socket address.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Numeric settings that are missing or unparsable fall back to their
    /// defaults. An unparsable value is logged as a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `TODO_METRICS_ADDR` is set but
    /// is not a socket address.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let metrics_addr = match lookup("TODO_METRICS_ADDR") {
            Some(value) if !value.trim().is_empty() => {
                Some(value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    name: "TODO_METRICS_ADDR",
                    value,
                })?)
            },
            _ => None,
        };

        Ok(Self {
            alert_dismiss_secs: parse_or(&lookup, "TODO_ALERT_DISMISS_SECS", defaults.alert_dismiss_secs),
            success_message_secs: parse_or(&lookup, "TODO_SUCCESS_MESSAGE_SECS", defaults.success_message_secs),
            broadcast_capacity: parse_or(&lookup, "TODO_BROADCAST_CAPACITY", defaults.broadcast_capacity),
            shutdown_timeout_secs: parse_or(&lookup, "TODO_SHUTDOWN_TIMEOUT_SECS", defaults.shutdown_timeout_secs),
            metrics_addr,
        })
    }

    /// Check that every setting is usable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MustBePositive`] naming the first zero setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alert_dismiss_secs == 0 {
            return Err(ConfigError::MustBePositive("TODO_ALERT_DISMISS_SECS"));
        }
        if self.success_message_secs == 0 {
            return Err(ConfigError::MustBePositive("TODO_SUCCESS_MESSAGE_SECS"));
        }
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::MustBePositive("TODO_BROADCAST_CAPACITY"));
        }
        Ok(())
    }

    /// Timer durations for the list view
    #[must_use]
    pub const fn view_timings(&self) -> ViewTimings {
        ViewTimings {
            alert_dismiss: Duration::from_secs(self.alert_dismiss_secs),
            success_message: Duration::from_secs(self.success_message_secs),
        }
    }

    /// Store configuration for the application store
    #[must_use]
    pub const fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.broadcast_capacity, self.shutdown_timeout())
    }

    /// Graceful shutdown timeout
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Reads a numeric variable, keeping `default` when it is missing or unparsable
fn parse_or<T, F>(lookup: &F, name: &'static str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Debug,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, %value, ?default, "Ignoring unparsable setting");
            default
        }),
        None => default,
    }
}
