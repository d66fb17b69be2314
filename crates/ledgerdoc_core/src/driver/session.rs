//! Transaction session with retry and concurrency limits.
//!
//! # Responsibility
//! - Run one unit of work per transaction: begin, work, commit.
//! - Abort on failure and retry retryable failures with backoff.
//! - Cap concurrently open transactions per session.
//!
//! # Invariants
//! - A unit of work never observes a transaction from a previous attempt.
//! - Non-retryable failures are returned after the first attempt.

use super::{DriverError, DriverOptions, LedgerDriver, LedgerTransaction};
use log::{debug, error, warn};
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use uuid::Uuid;

/// Boxed future returned by a unit of work borrowing its transaction.
pub type TxnFuture<'t, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 't>>;

/// Error types a session can classify for retry.
pub trait RetryableError: From<DriverError> {
    fn is_retryable(&self) -> bool;
}

impl RetryableError for DriverError {
    fn is_retryable(&self) -> bool {
        DriverError::is_retryable(self)
    }
}

/// Shared entry point for transactional work against one ledger.
pub struct LedgerSession {
    ledger: String,
    region: String,
    driver: Arc<dyn LedgerDriver>,
    options: DriverOptions,
    permits: Semaphore,
}

impl LedgerSession {
    pub fn new(
        ledger: impl Into<String>,
        region: impl Into<String>,
        driver: Arc<dyn LedgerDriver>,
        options: DriverOptions,
    ) -> Self {
        let permits = Semaphore::new(options.max_concurrent_transactions.max(1));
        Self {
            ledger: ledger.into(),
            region: region.into(),
            driver,
            options,
            permits,
        }
    }

    pub fn ledger(&self) -> &str {
        &self.ledger
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Runs `work` in a fresh transaction, retrying retryable failures.
    ///
    /// # Errors
    /// - Returns the last failure once retries are exhausted.
    /// - Returns non-retryable failures immediately.
    pub async fn execute_lambda<T, E, F>(&self, mut work: F) -> Result<T, E>
    where
        T: Send,
        E: RetryableError + Display + Send,
        F: for<'t> FnMut(&'t mut (dyn LedgerTransaction + 'static)) -> TxnFuture<'t, T, E> + Send,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| E::from(DriverError::Session("session is closed".to_string())))?;

        let retry_limit = self.options.retry.retry_limit;
        let mut attempt: u32 = 0;
        loop {
            let attempt_id = Uuid::new_v4();
            let started_at = Instant::now();
            debug!(
                "event=txn module=driver status=start ledger={} attempt={} attempt_id={}",
                self.ledger, attempt, attempt_id
            );

            match self.run_once(&mut work).await {
                Ok(value) => {
                    debug!(
                        "event=txn module=driver status=ok ledger={} attempt={} attempt_id={} duration_ms={}",
                        self.ledger,
                        attempt,
                        attempt_id,
                        started_at.elapsed().as_millis()
                    );
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < retry_limit => {
                    let delay = self.options.retry.backoff(attempt);
                    warn!(
                        "event=txn module=driver status=retry ledger={} attempt={} attempt_id={} delay_ms={} error={}",
                        self.ledger,
                        attempt,
                        attempt_id,
                        delay.as_millis(),
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!(
                        "event=txn module=driver status=error ledger={} attempt={} attempt_id={} duration_ms={} error={}",
                        self.ledger,
                        attempt,
                        attempt_id,
                        started_at.elapsed().as_millis(),
                        err
                    );
                    return Err(err);
                }
            }
        }
    }

    async fn run_once<T, E, F>(&self, work: &mut F) -> Result<T, E>
    where
        T: Send,
        E: RetryableError + Display + Send,
        F: for<'t> FnMut(&'t mut (dyn LedgerTransaction + 'static)) -> TxnFuture<'t, T, E> + Send,
    {
        let mut txn = self.driver.begin().await.map_err(E::from)?;
        match work(txn.as_mut()).await {
            Ok(value) => match txn.commit().await {
                Ok(()) => Ok(value),
                Err(err) => {
                    self.abort(txn.as_mut()).await;
                    Err(E::from(err))
                }
            },
            Err(err) => {
                self.abort(txn.as_mut()).await;
                Err(err)
            }
        }
    }

    async fn abort(&self, txn: &mut (dyn LedgerTransaction + 'static)) {
        if let Err(abort_err) = txn.abort().await {
            warn!(
                "event=txn_abort module=driver status=error ledger={} error={}",
                self.ledger, abort_err
            );
        }
    }
}
