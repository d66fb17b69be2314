//! Session registry keyed by region and ledger.
//!
//! # Responsibility
//! - Build one session per `region/ledger` on first request.
//! - Hand out the cached session afterwards.
//!
//! # Invariants
//! - Options only take effect when the session is first built.
//! - Sessions live as long as the registry; there is no eviction.

use super::{DriverOptions, DriverResult, LedgerDriver, LedgerSession};
use crate::driver::DriverError;
use log::info;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Builds drivers for a ledger in a region.
pub trait DriverFactory: Send + Sync {
    fn build(
        &self,
        ledger: &str,
        region: &str,
        options: &DriverOptions,
    ) -> DriverResult<Arc<dyn LedgerDriver>>;
}

/// Injectable cache of ledger sessions.
pub struct DriverRegistry {
    factory: Arc<dyn DriverFactory>,
    sessions: Mutex<BTreeMap<String, Arc<LedgerSession>>>,
}

impl DriverRegistry {
    pub fn new(factory: Arc<dyn DriverFactory>) -> Self {
        Self {
            factory,
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the session for `ledger` in `region`, building it if needed.
    ///
    /// # Errors
    /// - Returns factory failures unchanged.
    /// - Returns `DriverError::Session` when the registry lock is poisoned.
    pub fn get(
        &self,
        ledger: &str,
        region: &str,
        options: &DriverOptions,
    ) -> DriverResult<Arc<LedgerSession>> {
        let key = session_key(region, ledger);
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| DriverError::Session("driver registry lock poisoned".to_string()))?;
        if let Some(session) = sessions.get(&key) {
            return Ok(Arc::clone(session));
        }

        let driver = self.factory.build(ledger, region, options)?;
        info!(
            "event=driver_build module=driver status=ok key={} max_concurrent_transactions={} retry_limit={}",
            key, options.max_concurrent_transactions, options.retry.retry_limit
        );
        let session = Arc::new(LedgerSession::new(ledger, region, driver, options.clone()));
        sessions.insert(key, Arc::clone(&session));
        Ok(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map_or(0, |sessions| sessions.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn session_key(region: &str, ledger: &str) -> String {
    format!("{region}/{ledger}")
}
