//! Runtime settings, read from the environment.
//!
//! | variable           | default                 |
//! |--------------------|-------------------------|
//! | `TARIFF_CATALOG`   | `tariffs/tarifas.json`  |
//! | `TARIFF_BIND_ADDR` | `127.0.0.1:3000`        |
//! | `RUST_LOG`         | `info`                  |
//!
//! `TARIFF_CATALOG` may point to a single JSON file or to a directory
//! of JSON files.

use std::path::PathBuf;

pub const CATALOG_VAR: &str = "TARIFF_CATALOG";
pub const BIND_ADDR_VAR: &str = "TARIFF_BIND_ADDR";

const DEFAULT_CATALOG: &str = "tariffs/tarifas.json";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub catalog_path: PathBuf,
    pub bind_addr: String,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            catalog_path: PathBuf::from(get(CATALOG_VAR, DEFAULT_CATALOG)),
            bind_addr: get(BIND_ADDR_VAR, DEFAULT_BIND_ADDR),
        }
    }
}
