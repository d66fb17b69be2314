//! Scripted in-memory ledger for tests of repository and host code.
//!
//! Responses are queued up front and handed out in order, one per executed
//! statement, across every transaction the ledger opens. Executed statements
//! are recorded for later assertions.

use crate::driver::{
    DriverError, DriverFactory, DriverOptions, DriverResult, LedgerDriver, LedgerTransaction,
    TransactionExecutor,
};
use crate::ion::IonValue;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// One statement as received by the scripted ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub text: String,
    pub params: Vec<IonValue>,
}

#[derive(Default)]
struct ScriptState {
    responses: VecDeque<DriverResult<Vec<IonValue>>>,
    commit_failures: VecDeque<DriverError>,
    build_failures: VecDeque<DriverError>,
    statements: Vec<RecordedStatement>,
    built: usize,
    begun: usize,
    committed: usize,
    aborted: usize,
}

/// Fake driver, factory and transaction source sharing one script.
#[derive(Clone, Default)]
pub struct ScriptedLedger {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues result rows for the next unanswered statement.
    pub fn respond(&self, rows: Vec<IonValue>) -> &Self {
        self.lock().responses.push_back(Ok(rows));
        self
    }

    /// Queues a failure for the next unanswered statement.
    pub fn fail(&self, error: DriverError) -> &Self {
        self.lock().responses.push_back(Err(error));
        self
    }

    pub fn fail_next_commit(&self, error: DriverError) -> &Self {
        self.lock().commit_failures.push_back(error);
        self
    }

    pub fn fail_next_build(&self, error: DriverError) -> &Self {
        self.lock().build_failures.push_back(error);
        self
    }

    /// Opens a standalone transaction on the shared script.
    pub fn transaction(&self) -> ScriptedTransaction {
        ScriptedTransaction {
            state: Arc::clone(&self.state),
        }
    }

    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.lock().statements.clone()
    }

    /// Unanswered queued responses.
    pub fn pending(&self) -> usize {
        self.lock().responses.len()
    }

    pub fn built(&self) -> usize {
        self.lock().built
    }

    pub fn begun(&self) -> usize {
        self.lock().begun
    }

    pub fn committed(&self) -> usize {
        self.lock().committed
    }

    pub fn aborted(&self) -> usize {
        self.lock().aborted
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        lock_state(&self.state)
    }
}

#[async_trait]
impl LedgerDriver for ScriptedLedger {
    async fn begin(&self) -> DriverResult<Box<dyn LedgerTransaction>> {
        self.lock().begun += 1;
        Ok(Box::new(self.transaction()))
    }
}

impl DriverFactory for ScriptedLedger {
    fn build(
        &self,
        _ledger: &str,
        _region: &str,
        _options: &DriverOptions,
    ) -> DriverResult<Arc<dyn LedgerDriver>> {
        let mut state = self.lock();
        if let Some(error) = state.build_failures.pop_front() {
            return Err(error);
        }
        state.built += 1;
        Ok(Arc::new(self.clone()))
    }
}

/// Transaction handle over a [`ScriptedLedger`] script.
pub struct ScriptedTransaction {
    state: Arc<Mutex<ScriptState>>,
}

#[async_trait]
impl TransactionExecutor for ScriptedTransaction {
    async fn execute(
        &mut self,
        statement: &str,
        params: &[IonValue],
    ) -> DriverResult<Vec<IonValue>> {
        let mut state = lock_state(&self.state);
        state.statements.push(RecordedStatement {
            text: statement.to_string(),
            params: params.to_vec(),
        });
        state.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[async_trait]
impl LedgerTransaction for ScriptedTransaction {
    async fn commit(&mut self) -> DriverResult<()> {
        let mut state = lock_state(&self.state);
        if let Some(error) = state.commit_failures.pop_front() {
            return Err(error);
        }
        state.committed += 1;
        Ok(())
    }

    async fn abort(&mut self) -> DriverResult<()> {
        lock_state(&self.state).aborted += 1;
        Ok(())
    }
}

fn lock_state(state: &Mutex<ScriptState>) -> MutexGuard<'_, ScriptState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
