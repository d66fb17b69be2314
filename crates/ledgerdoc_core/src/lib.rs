//! Ledger document repository core.
//! Statement assembly, value normalization and write policies live here.

pub mod config;
pub mod driver;
pub mod ion;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod testing;

pub use config::{validate_table, ConfigError, LedgerConfig, ResolvedConfig};
pub use driver::{
    DriverError, DriverFactory, DriverOptions, DriverRegistry, DriverResult, LedgerDriver,
    LedgerSession, LedgerTransaction, RetryConfig, RetryableError, TransactionExecutor, TxnFuture,
};
pub use ion::{from_json, normalize, normalize_all, struct_from_json, IonStruct, IonType, IonValue};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::timestamps::{Clock, FixedClock, SystemClock};
pub use query::{Predicate, StatementError};
pub use repo::{LedgerRepository, RepoError, RepoResult, UpsertOutcome, DEFAULT_ID_FIELD};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
