//! Host-supplied connection configuration.
//!
//! # Responsibility
//! - Deserialize datasource settings handed over by the host.
//! - Reject missing or unusable connection parameters before any call.
//!
//! # Invariants
//! - A resolved config always has a non-blank region and ledger.
//! - Table and id-field names in a resolved config are plain identifiers.

use crate::driver::DriverOptions;
use crate::query::is_identifier;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Id field used by the host datasource when none is configured.
pub const DEFAULT_DATASOURCE_ID_FIELD: &str = "documentId";

/// Raw settings as received from the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerConfig {
    pub region: Option<String>,
    pub ledger: Option<String>,
    /// Default table; payloads may name another one per call.
    pub table: Option<String>,
    pub id_field: Option<String>,
    pub driver: DriverOptions,
}

/// Validated settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub region: String,
    pub ledger: String,
    pub table: Option<String>,
    pub id_field: String,
    pub driver: DriverOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    InvalidName { setting: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(setting) => write!(f, "required setting `{setting}` is not defined"),
            Self::InvalidName { setting, value } => {
                write!(f, "setting `{setting}` has invalid name `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

impl LedgerConfig {
    /// Validates the raw settings.
    ///
    /// # Errors
    /// - `ConfigError::Missing` for an absent or blank region or ledger.
    /// - `ConfigError::InvalidName` for a table or id field that is not a
    ///   plain identifier.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let region = required("region", self.region.as_deref())?;
        let ledger = required("ledger", self.ledger.as_deref())?;

        let table = match non_blank(self.table.as_deref()) {
            Some(table) => Some(identifier("table", table)?),
            None => None,
        };
        let id_field = match non_blank(self.id_field.as_deref()) {
            Some(id_field) => identifier("idField", id_field)?,
            None => DEFAULT_DATASOURCE_ID_FIELD.to_string(),
        };

        Ok(ResolvedConfig {
            region,
            ledger,
            table,
            id_field,
            driver: self.driver.clone(),
        })
    }
}

/// Validates a table name supplied outside the config, e.g. per call.
pub fn validate_table(table: &str) -> Result<String, ConfigError> {
    identifier("table", table.trim())
}

fn required(setting: &'static str, value: Option<&str>) -> Result<String, ConfigError> {
    non_blank(value)
        .map(str::to_string)
        .ok_or(ConfigError::Missing(setting))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn identifier(setting: &'static str, value: &str) -> Result<String, ConfigError> {
    if is_identifier(value) {
        Ok(value.to_string())
    } else {
        Err(ConfigError::InvalidName {
            setting,
            value: value.to_string(),
        })
    }
}
