//! Ledger driver contracts.
//!
//! # Responsibility
//! - Define the transactional executor the repository runs statements on.
//! - Define the driver/factory seams the network client plugs into.
//! - Own session-level retry and concurrency limits.
//!
//! # Invariants
//! - Driver errors reach callers unchanged; only the session retries them.
//! - Parameters bind positionally in the order given.

use crate::ion::IonValue;
use async_trait::async_trait;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

mod registry;
mod session;

pub use registry::{DriverFactory, DriverRegistry};
pub use session::{LedgerSession, RetryableError, TxnFuture};

pub type DriverResult<T> = Result<T, DriverError>;

/// Failure raised by the ledger driver or its transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Optimistic concurrency conflict detected at commit or read time.
    OccConflict(String),
    /// Network or throttling fault that may succeed on a fresh transaction.
    Transient(String),
    /// Statement rejected by the ledger.
    Statement(String),
    /// Session could not be opened or was closed.
    Session(String),
}

impl DriverError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OccConflict(_) | Self::Transient(_))
    }
}

impl Display for DriverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OccConflict(message) => write!(f, "occ conflict: {message}"),
            Self::Transient(message) => write!(f, "transient driver failure: {message}"),
            Self::Statement(message) => write!(f, "statement rejected: {message}"),
            Self::Session(message) => write!(f, "session failure: {message}"),
        }
    }
}

impl Error for DriverError {}

/// Executes parameterized statements inside one open transaction.
#[async_trait]
pub trait TransactionExecutor: Send {
    /// Runs `statement` with `?` placeholders bound to `params` in order and
    /// returns the result rows in native form.
    async fn execute(&mut self, statement: &str, params: &[IonValue])
        -> DriverResult<Vec<IonValue>>;
}

/// Transaction handle handed out by a driver.
#[async_trait]
pub trait LedgerTransaction: TransactionExecutor {
    async fn commit(&mut self) -> DriverResult<()>;
    async fn abort(&mut self) -> DriverResult<()>;
}

/// Connection to one ledger in one region.
#[async_trait]
pub trait LedgerDriver: Send + Sync {
    async fn begin(&self) -> DriverResult<Box<dyn LedgerTransaction>>;
}

/// Retry policy for retryable transaction failures.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Retries after the first attempt; `0` disables retrying.
    pub retry_limit: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryConfig {
    /// Exponential delay before retry number `attempt` (0-based), capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(
            self.base_delay_ms
                .saturating_mul(factor)
                .min(self.max_delay_ms),
        )
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_limit: 4,
            base_delay_ms: 10,
            max_delay_ms: 5_000,
        }
    }
}

/// Driver construction options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriverOptions {
    pub max_concurrent_transactions: usize,
    #[serde(flatten)]
    pub retry: RetryConfig,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            max_concurrent_transactions: 10,
            retry: RetryConfig::default(),
        }
    }
}
