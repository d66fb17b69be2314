//! Host integration for ledger tables.
//! Exposes named CRUD operations that take JSON payloads and return JSON.

mod api;
mod error;
pub mod payload;

pub use api::LedgerDatasource;
pub use error::{DatasourceError, DatasourceResult};
pub use ledgerdoc_core::{core_version, init_logging, DriverRegistry, LedgerConfig};
pub use payload::Operation;
