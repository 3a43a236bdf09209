//! Error taxonomy for the tariff engine.
//!
//! Two families of errors exist.  [`ConfigError`] describes a single
//! malformed tariff definition; the catalog collects these per tariff
//! so that a comparison can exclude the offending entry instead of
//! aborting.  [`CatalogError`] describes a failure to read the catalog
//! document as a whole, which is fatal for the caller.
//!
//! Reading values are never a source of errors: missing or invalid
//! numbers are coerced to zero when decoded.

use std::path::PathBuf;
use thiserror::Error;

/// A tariff definition that cannot be evaluated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("tariff {tariff}: unknown energy model `{kind}`")]
    UnknownEnergyModel { tariff: String, kind: String },

    #[error("tariff {tariff}: unknown power model `{kind}`")]
    UnknownPowerModel { tariff: String, kind: String },

    #[error("tariff {tariff}: unknown reactive model `{model}`")]
    UnknownReactiveModel { tariff: String, model: String },

    #[error("tariff {tariff}: missing required field `{field}`")]
    MissingField { tariff: String, field: &'static str },

    #[error("tariff {tariff}: {reason}")]
    Invalid { tariff: String, reason: String },

    #[error("tariff {tariff}: {source}")]
    Malformed {
        tariff: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Identifier of the tariff the error refers to.  Entries without
    /// an `id` are reported as `"<unnamed>"`.
    pub fn tariff(&self) -> &str {
        match self {
            ConfigError::UnknownEnergyModel { tariff, .. }
            | ConfigError::UnknownPowerModel { tariff, .. }
            | ConfigError::UnknownReactiveModel { tariff, .. }
            | ConfigError::MissingField { tariff, .. }
            | ConfigError::Invalid { tariff, .. }
            | ConfigError::Malformed { tariff, .. } => tariff,
        }
    }
}

/// The catalog document could not be loaded.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog is not a valid tariff document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("catalog contains no tariffs")]
    Empty,
}
