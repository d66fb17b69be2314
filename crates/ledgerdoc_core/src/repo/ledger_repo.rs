//! Table repository over a transactional executor.
//!
//! # Responsibility
//! - Provide find/filter/insert/update/upsert/delete APIs for one table.
//! - Apply the timestamp and upsert policies around statement execution.
//! - Return results normalized to plain JSON.
//!
//! # Invariants
//! - Writes bind a stamped copy; the caller's document is left as passed.
//! - Upsert rejects an empty predicate before reading.
//! - Upsert reads before it writes and never writes on an ambiguous match.
//! - Insert and insert-into re-read the row through the id field reported by
//!   the ledger; a missing id is an error even though the write happened.
//! - The repository holds no transaction state between calls.

use crate::driver::{DriverError, RetryableError, TransactionExecutor};
use crate::ion::{normalize_all, IonStruct, IonValue};
use crate::model::timestamps::{stamp_for_insert, stamp_for_update, Clock, SystemClock};
use crate::query::{Predicate, Statement, StatementBuilder, StatementError};
use log::{debug, error};
use serde_json::Value as JsonValue;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

/// Id field used when none is configured.
pub const DEFAULT_ID_FIELD: &str = "_id";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for statement assembly, execution and policy checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    Statement(StatementError),
    Driver(DriverError),
    AmbiguousUpsert {
        predicate: String,
        matches: usize,
    },
    MissingId {
        operation: &'static str,
        field: String,
    },
    NotFound(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Statement(err) => write!(f, "{err}"),
            Self::Driver(err) => write!(f, "{err}"),
            Self::AmbiguousUpsert { predicate, matches } => write!(
                f,
                "upsert matched multiple documents; searching for {predicate}, found {matches} documents"
            ),
            Self::MissingId { operation, field } => write!(
                f,
                "{operation} result does not expose id field `{field}`; the write may already be applied"
            ),
            Self::NotFound(id) => write!(f, "document not found: {id}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Statement(err) => Some(err),
            Self::Driver(err) => Some(err),
            Self::AmbiguousUpsert { .. } => None,
            Self::MissingId { .. } => None,
            Self::NotFound(_) => None,
        }
    }
}

impl From<StatementError> for RepoError {
    fn from(value: StatementError) -> Self {
        Self::Statement(value)
    }
}

impl From<DriverError> for RepoError {
    fn from(value: DriverError) -> Self {
        Self::Driver(value)
    }
}

impl RetryableError for RepoError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Driver(err) if err.is_retryable())
    }
}

/// Outcome of [`LedgerRepository::upsert`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    /// No match existed; carries the re-read inserted document.
    Inserted(JsonValue),
    /// Exactly one match existed; carries the first update result row.
    Updated(Option<JsonValue>),
}

impl UpsertOutcome {
    pub fn into_json(self) -> JsonValue {
        match self {
            Self::Inserted(document) => document,
            Self::Updated(row) => row.unwrap_or(JsonValue::Null),
        }
    }
}

/// Repository for one ledger table.
#[derive(Clone)]
pub struct LedgerRepository {
    statements: StatementBuilder,
    clock: Arc<dyn Clock>,
}

impl LedgerRepository {
    /// Creates a repository keyed by [`DEFAULT_ID_FIELD`].
    pub fn new(table: impl Into<String>) -> RepoResult<Self> {
        Self::with_id_field(table, DEFAULT_ID_FIELD)
    }

    /// Creates a repository keyed by `id_field`.
    ///
    /// # Errors
    /// - `RepoError::Statement` when the table or id field is not an identifier.
    pub fn with_id_field(
        table: impl Into<String>,
        id_field: impl Into<String>,
    ) -> RepoResult<Self> {
        Ok(Self {
            statements: StatementBuilder::new(table, id_field)?,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the clock used for timestamp stamping.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn table(&self) -> &str {
        self.statements.table()
    }

    pub fn id_field(&self) -> &str {
        self.statements.id_field()
    }

    /// Returns every document in the table.
    pub async fn all<E>(&self, txn: &mut E) -> RepoResult<Vec<JsonValue>>
    where
        E: TransactionExecutor + ?Sized,
    {
        let rows = self.run(txn, "all", self.statements.select_all()).await?;
        Ok(normalize_all(&rows))
    }

    /// Returns the document whose id field equals `id`.
    pub async fn find<E>(&self, txn: &mut E, id: &str) -> RepoResult<Option<JsonValue>>
    where
        E: TransactionExecutor + ?Sized,
    {
        self.find_by(txn, &self.id_predicate(id)).await
    }

    /// Returns the first document matching `predicate`.
    pub async fn find_by<E>(
        &self,
        txn: &mut E,
        predicate: &Predicate,
    ) -> RepoResult<Option<JsonValue>>
    where
        E: TransactionExecutor + ?Sized,
    {
        Ok(self.filter(txn, predicate).await?.into_iter().next())
    }

    /// Returns every document matching `predicate`; an empty predicate
    /// matches the whole table.
    pub async fn filter<E>(
        &self,
        txn: &mut E,
        predicate: &Predicate,
    ) -> RepoResult<Vec<JsonValue>>
    where
        E: TransactionExecutor + ?Sized,
    {
        let statement = self.statements.select_by(predicate)?;
        let rows = self.run(txn, "filter", statement).await?;
        Ok(normalize_all(&rows))
    }

    /// Inserts a stamped copy of `document` and returns the stored row.
    ///
    /// # Errors
    /// - `RepoError::MissingId` when the insert result lacks the id field.
    /// - `RepoError::NotFound` when the re-read finds nothing.
    pub async fn insert<E>(&self, txn: &mut E, document: &IonStruct) -> RepoResult<JsonValue>
    where
        E: TransactionExecutor + ?Sized,
    {
        let stamped = stamp_for_insert(document, self.clock.now());
        let rows = self
            .run(txn, "insert", self.statements.insert(stamped))
            .await?;
        let id = self.reported_id("insert", &rows)?;
        self.refetch(txn, id).await
    }

    /// Appends `value` into `field` of the row matching `predicate` and
    /// returns that row.
    pub async fn insert_into<E>(
        &self,
        txn: &mut E,
        field: &str,
        value: IonValue,
        predicate: &Predicate,
    ) -> RepoResult<JsonValue>
    where
        E: TransactionExecutor + ?Sized,
    {
        let statement = self.statements.insert_into(field, value, predicate)?;
        let rows = self.run(txn, "insert_into", statement).await?;
        let id = self.reported_id("insert_into", &rows)?;
        self.refetch(txn, id).await
    }

    pub async fn insert_into_by_id<E>(
        &self,
        txn: &mut E,
        field: &str,
        value: IonValue,
        id: &str,
    ) -> RepoResult<JsonValue>
    where
        E: TransactionExecutor + ?Sized,
    {
        self.insert_into(txn, field, value, &self.id_predicate(id))
            .await
    }

    /// Updates every row matching `predicate` and returns the raw result rows.
    pub async fn update<E>(
        &self,
        txn: &mut E,
        document: &IonStruct,
        predicate: &Predicate,
    ) -> RepoResult<Vec<JsonValue>>
    where
        E: TransactionExecutor + ?Sized,
    {
        let stamped = stamp_for_update(document, self.clock.now());
        let statement = self.statements.update(&stamped, predicate)?;
        let rows = self.run(txn, "update", statement).await?;
        Ok(normalize_all(&rows))
    }

    pub async fn update_by_id<E>(
        &self,
        txn: &mut E,
        document: &IonStruct,
        id: &str,
    ) -> RepoResult<Vec<JsonValue>>
    where
        E: TransactionExecutor + ?Sized,
    {
        self.update(txn, document, &self.id_predicate(id)).await
    }

    /// Inserts or updates depending on how many rows match `predicate`.
    ///
    /// The insert branch also writes the predicate's equality fields that the
    /// document leaves out (except the id field and dotted paths), so the new
    /// row satisfies the predicate it was looked up by.
    ///
    /// # Errors
    /// - `RepoError::Statement` for an empty predicate, before any read.
    /// - `RepoError::AmbiguousUpsert` when more than one row matches; nothing
    ///   is written in that case.
    pub async fn upsert<E>(
        &self,
        txn: &mut E,
        document: &IonStruct,
        predicate: &Predicate,
    ) -> RepoResult<UpsertOutcome>
    where
        E: TransactionExecutor + ?Sized,
    {
        if predicate.is_empty() {
            return Err(StatementError::EmptyPredicate {
                operation: "upsert",
            }
            .into());
        }

        let existing = self.filter(txn, predicate).await?;
        match existing.len() {
            0 => {
                let merged = self.merge_predicate_fields(document, predicate);
                Ok(UpsertOutcome::Inserted(self.insert(txn, &merged).await?))
            }
            1 => {
                let rows = self.update(txn, document, predicate).await?;
                Ok(UpsertOutcome::Updated(rows.into_iter().next()))
            }
            matches => Err(RepoError::AmbiguousUpsert {
                predicate: predicate.to_string(),
                matches,
            }),
        }
    }

    pub async fn upsert_by_id<E>(
        &self,
        txn: &mut E,
        document: &IonStruct,
        id: &str,
    ) -> RepoResult<UpsertOutcome>
    where
        E: TransactionExecutor + ?Sized,
    {
        self.upsert(txn, document, &self.id_predicate(id)).await
    }

    /// Deletes every row matching `predicate` and returns the raw result rows.
    pub async fn delete<E>(
        &self,
        txn: &mut E,
        predicate: &Predicate,
    ) -> RepoResult<Vec<JsonValue>>
    where
        E: TransactionExecutor + ?Sized,
    {
        let statement = self.statements.delete(predicate)?;
        let rows = self.run(txn, "delete", statement).await?;
        Ok(normalize_all(&rows))
    }

    pub async fn delete_by_id<E>(&self, txn: &mut E, id: &str) -> RepoResult<Vec<JsonValue>>
    where
        E: TransactionExecutor + ?Sized,
    {
        self.delete(txn, &self.id_predicate(id)).await
    }

    fn id_predicate(&self, id: &str) -> Predicate {
        Predicate::by_id(self.id_field(), id)
    }

    async fn refetch<E>(&self, txn: &mut E, id: String) -> RepoResult<JsonValue>
    where
        E: TransactionExecutor + ?Sized,
    {
        match self.find(txn, &id).await? {
            Some(document) => Ok(document),
            None => Err(RepoError::NotFound(id)),
        }
    }

    fn reported_id(&self, operation: &'static str, rows: &[IonValue]) -> RepoResult<String> {
        rows.first()
            .and_then(|row| row.get(self.id_field()))
            .and_then(IonValue::as_text)
            .map(str::to_string)
            .ok_or_else(|| {
                error!(
                    "event=ledger_query module=repo status=error op={} table={} error_code=missing_id rows={}",
                    operation,
                    self.table(),
                    rows.len()
                );
                RepoError::MissingId {
                    operation,
                    field: self.id_field().to_string(),
                }
            })
    }

    fn merge_predicate_fields(&self, document: &IonStruct, predicate: &Predicate) -> IonStruct {
        let mut merged = document.clone();
        for clause in predicate.equalities() {
            if clause.field == self.id_field()
                || clause.field.contains('.')
                || merged.contains_field(&clause.field)
            {
                continue;
            }
            merged.push(clause.field.clone(), clause.value.clone());
        }
        merged
    }

    async fn run<E>(
        &self,
        txn: &mut E,
        operation: &'static str,
        statement: Statement,
    ) -> RepoResult<Vec<IonValue>>
    where
        E: TransactionExecutor + ?Sized,
    {
        let started_at = Instant::now();
        debug!(
            "event=ledger_query module=repo status=start op={} table={} statement={} param_types={}",
            operation,
            self.table(),
            statement.text,
            param_types(&statement.params)
        );

        match txn.execute(&statement.text, &statement.params).await {
            Ok(rows) => {
                debug!(
                    "event=ledger_query module=repo status=ok op={} table={} rows={} duration_ms={}",
                    operation,
                    self.table(),
                    rows.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(rows)
            }
            Err(err) => {
                error!(
                    "event=ledger_query module=repo status=error op={} table={} duration_ms={} error={}",
                    operation,
                    self.table(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }
}

fn param_types(params: &[IonValue]) -> String {
    params
        .iter()
        .map(|param| param.ion_type().as_str())
        .collect::<Vec<_>>()
        .join(",")
}
