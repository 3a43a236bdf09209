//! Tariff catalog.
//!
//! The catalog is a JSON document holding the tariff definitions,
//! either as `{"tariffs": [...]}` or as a bare array.  It is read once
//! and never mutated; callers share it by reference (usually through an
//! `Arc`).  Entries that fail to decode are kept aside in
//! [`Catalog::rejected`] so that the remaining tariffs stay usable.

use crate::error::{CatalogError, ConfigError};
use crate::models::TariffDefinition;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, warn};

/// Read-only collection of tariff definitions.
#[derive(Debug, Default)]
pub struct Catalog {
    tariffs: Vec<TariffDefinition>,
    rejected: Vec<ConfigError>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    Wrapped {
        #[serde(alias = "tarifas")]
        tariffs: Vec<Value>,
    },
    Bare(Vec<Value>),
}

impl CatalogDocument {
    fn into_entries(self) -> Vec<Value> {
        match self {
            CatalogDocument::Wrapped { tariffs } => tariffs,
            CatalogDocument::Bare(entries) => entries,
        }
    }
}

impl Catalog {
    /// Build a catalog from raw entries, decoding each one on its own.
    pub fn from_entries(entries: Vec<Value>) -> Self {
        let mut catalog = Catalog::default();
        for entry in entries {
            match TariffDefinition::from_value(entry) {
                Ok(tariff) => {
                    debug!(tariff = %tariff.id, energy = tariff.energy.kind(), "tariff loaded");
                    catalog.tariffs.push(tariff);
                }
                Err(err) => {
                    warn!(tariff = err.tariff(), error = %err, "tariff rejected");
                    catalog.rejected.push(err);
                }
            }
        }
        catalog
    }

    /// Parse a catalog document.
    pub fn from_json_str(data: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(data)?;
        let catalog = Self::from_entries(document.into_entries());
        if catalog.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(catalog)
    }

    /// Load the catalog from a JSON file, or from every `.json` file
    /// of a directory (in file-name order).
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let io_err = |source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        };

        let catalog = if path.is_dir() {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(path).map_err(io_err)? {
                let entry_path = entry.map_err(io_err)?.path();
                if entry_path.is_file() && entry_path.extension().is_some_and(|ext| ext == "json") {
                    files.push(entry_path);
                }
            }
            files.sort();

            let mut entries = Vec::new();
            for file in files {
                let data = std::fs::read_to_string(&file).map_err(|source| CatalogError::Io {
                    path: file.clone(),
                    source,
                })?;
                let document: CatalogDocument = serde_json::from_str(&data)?;
                entries.extend(document.into_entries());
            }
            let catalog = Self::from_entries(entries);
            if catalog.is_empty() {
                return Err(CatalogError::Empty);
            }
            catalog
        } else {
            let data = std::fs::read_to_string(path).map_err(io_err)?;
            Self::from_json_str(&data)?
        };

        info!(
            path = %path.display(),
            tariffs = catalog.tariffs.len(),
            rejected = catalog.rejected.len(),
            "tariff catalog loaded"
        );
        Ok(catalog)
    }

    pub fn tariffs(&self) -> &[TariffDefinition] {
        &self.tariffs
    }

    /// Entries that could not be decoded, with the reason.
    pub fn rejected(&self) -> &[ConfigError] {
        &self.rejected
    }

    pub fn get(&self, id: &str) -> Option<&TariffDefinition> {
        self.tariffs.iter().find(|t| t.id == id)
    }

    /// Rejection reason for `id`, if that entry failed to decode.
    pub fn rejection(&self, id: &str) -> Option<&ConfigError> {
        self.rejected.iter().find(|err| err.tariff() == id)
    }

    /// True when neither usable nor rejected entries exist.
    pub fn is_empty(&self) -> bool {
        self.tariffs.is_empty() && self.rejected.is_empty()
    }
}
