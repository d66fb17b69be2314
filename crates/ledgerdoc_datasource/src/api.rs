//! Host-facing datasource over one ledger.
//!
//! # Responsibility
//! - Validate host configuration once, at construction.
//! - Map named host operations onto repository calls, one transaction each.
//! - Return results as plain JSON values (object, array or null).
//!
//! # Invariants
//! - Configuration and driver-build failures surface from `new`, never later.
//! - Every operation runs inside `LedgerSession::execute_lambda`.
//! - Repositories are cached per table for the lifetime of the datasource.
//! - The cache lock is never held across `.await`.
//!
//! # See also
//! - `ledgerdoc_core::repo::ledger_repo` for statement and write policies.

use crate::error::{DatasourceError, DatasourceResult};
use crate::payload::{
    CreatePayload, DocumentByIdPayload, FilterPayload, IdPayload, InsertIntoByIdPayload,
    InsertIntoPayload, JsonObject, Operation, WherePayload,
};
use ledgerdoc_core::{
    from_json, struct_from_json, validate_table, Clock, ConfigError, DriverRegistry, LedgerConfig,
    LedgerRepository, LedgerSession, LedgerTransaction, Predicate, RepoError, ResolvedConfig,
    TxnFuture, UpsertOutcome,
};
use log::{error, info};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// Named CRUD operations against one ledger.
pub struct LedgerDatasource {
    config: ResolvedConfig,
    session: Arc<LedgerSession>,
    clock: Option<Arc<dyn Clock>>,
    repositories: Mutex<BTreeMap<String, Arc<LedgerRepository>>>,
}

impl LedgerDatasource {
    /// Resolves `config` and obtains the ledger session from `registry`.
    ///
    /// # Errors
    /// - `DatasourceError::Config` for missing or invalid settings.
    /// - `DatasourceError::Driver` when the session cannot be built.
    pub fn new(config: &LedgerConfig, registry: &DriverRegistry) -> DatasourceResult<Self> {
        let config = config.resolve().map_err(|err| {
            error!(
                "event=datasource_init module=datasource status=error error={}",
                err
            );
            err
        })?;
        let session = registry.get(&config.ledger, &config.region, &config.driver)?;
        info!(
            "event=datasource_init module=datasource status=ok ledger={} region={} table={} id_field={}",
            config.ledger,
            config.region,
            config.table.as_deref().unwrap_or("-"),
            config.id_field
        );

        Ok(Self {
            config,
            session,
            clock: None,
            repositories: Mutex::new(BTreeMap::new()),
        })
    }

    /// Replaces the clock used by repositories built from now on.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self.lock_repositories().clear();
        self
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Dispatches a host call by its operation name.
    ///
    /// # Errors
    /// - `DatasourceError::UnknownOperation` for unrecognized names.
    /// - `DatasourceError::Payload` when `payload` does not fit the operation.
    pub async fn execute(
        &self,
        operation: &str,
        payload: JsonValue,
    ) -> DatasourceResult<JsonValue> {
        let operation: Operation = operation
            .parse()
            .map_err(DatasourceError::UnknownOperation)?;
        match operation {
            Operation::Create => self.create(parse_payload(payload)?).await,
            Operation::Read => self.read(parse_payload(payload)?).await,
            Operation::ReadById => self.read_by_id(parse_payload(payload)?).await,
            Operation::Update => self.update(parse_payload(payload)?).await,
            Operation::UpdateById => self.update_by_id(parse_payload(payload)?).await,
            Operation::Upsert => self.upsert(parse_payload(payload)?).await,
            Operation::InsertInto => self.insert_into(parse_payload(payload)?).await,
            Operation::InsertIntoById => self.insert_into_by_id(parse_payload(payload)?).await,
            Operation::Delete => self.delete(parse_payload(payload)?).await,
            Operation::DeleteById => self.delete_by_id(parse_payload(payload)?).await,
        }
    }

    /// Inserts `json` and returns the stored document.
    pub async fn create(&self, payload: CreatePayload) -> DatasourceResult<JsonValue> {
        let repo = self.repository(payload.table.as_deref())?;
        let document = struct_from_json(&payload.json);
        self.transact::<JsonValue, _>(Operation::Create, &repo, |txn| {
            let repo = Arc::clone(&repo);
            let document = document.clone();
            Box::pin(async move { repo.insert(txn, &document).await })
        })
        .await
    }

    /// Returns every document matching `json` as an array.
    pub async fn read(&self, payload: FilterPayload) -> DatasourceResult<JsonValue> {
        let repo = self.repository(payload.table.as_deref())?;
        let predicate = predicate_from(&payload.json);
        let rows = self
            .transact::<Vec<JsonValue>, _>(Operation::Read, &repo, |txn| {
                let repo = Arc::clone(&repo);
                let predicate = predicate.clone();
                Box::pin(async move { repo.filter(txn, &predicate).await })
            })
            .await?;
        Ok(JsonValue::Array(rows))
    }

    /// Returns the document with `id`, or null.
    pub async fn read_by_id(&self, payload: IdPayload) -> DatasourceResult<JsonValue> {
        let repo = self.repository(payload.table.as_deref())?;
        let id = payload.id;
        let found = self
            .transact::<Option<JsonValue>, _>(Operation::ReadById, &repo, |txn| {
                let repo = Arc::clone(&repo);
                let id = id.clone();
                Box::pin(async move { repo.find(txn, &id).await })
            })
            .await?;
        Ok(found.unwrap_or(JsonValue::Null))
    }

    pub async fn update(&self, payload: WherePayload) -> DatasourceResult<JsonValue> {
        let repo = self.repository(payload.table.as_deref())?;
        let document = struct_from_json(&payload.document);
        let predicate = predicate_from(&payload.predicate);
        let rows = self
            .transact::<Vec<JsonValue>, _>(Operation::Update, &repo, |txn| {
                let repo = Arc::clone(&repo);
                let document = document.clone();
                let predicate = predicate.clone();
                Box::pin(async move { repo.update(txn, &document, &predicate).await })
            })
            .await?;
        Ok(JsonValue::Array(rows))
    }

    pub async fn update_by_id(&self, payload: DocumentByIdPayload) -> DatasourceResult<JsonValue> {
        let repo = self.repository(payload.table.as_deref())?;
        let document = struct_from_json(&payload.document);
        let id = payload.id;
        let rows = self
            .transact::<Vec<JsonValue>, _>(Operation::UpdateById, &repo, |txn| {
                let repo = Arc::clone(&repo);
                let document = document.clone();
                let id = id.clone();
                Box::pin(async move { repo.update_by_id(txn, &document, &id).await })
            })
            .await?;
        Ok(JsonValue::Array(rows))
    }

    /// Inserts or updates; returns the inserted document or the first
    /// update result row (null when the ledger reports none).
    pub async fn upsert(&self, payload: WherePayload) -> DatasourceResult<JsonValue> {
        let repo = self.repository(payload.table.as_deref())?;
        let document = struct_from_json(&payload.document);
        let predicate = predicate_from(&payload.predicate);
        let outcome = self
            .transact::<UpsertOutcome, _>(Operation::Upsert, &repo, |txn| {
                let repo = Arc::clone(&repo);
                let document = document.clone();
                let predicate = predicate.clone();
                Box::pin(async move { repo.upsert(txn, &document, &predicate).await })
            })
            .await?;
        Ok(outcome.into_json())
    }

    pub async fn insert_into(&self, payload: InsertIntoPayload) -> DatasourceResult<JsonValue> {
        let repo = self.repository(payload.table.as_deref())?;
        let field = payload.field;
        let value = from_json(&payload.document);
        let predicate = predicate_from(&payload.predicate);
        self.transact::<JsonValue, _>(Operation::InsertInto, &repo, |txn| {
            let repo = Arc::clone(&repo);
            let field = field.clone();
            let value = value.clone();
            let predicate = predicate.clone();
            Box::pin(async move { repo.insert_into(txn, &field, value, &predicate).await })
        })
        .await
    }

    pub async fn insert_into_by_id(
        &self,
        payload: InsertIntoByIdPayload,
    ) -> DatasourceResult<JsonValue> {
        let repo = self.repository(payload.table.as_deref())?;
        let field = payload.field;
        let value = from_json(&payload.document);
        let id = payload.id;
        self.transact::<JsonValue, _>(Operation::InsertIntoById, &repo, |txn| {
            let repo = Arc::clone(&repo);
            let field = field.clone();
            let value = value.clone();
            let id = id.clone();
            Box::pin(async move { repo.insert_into_by_id(txn, &field, value, &id).await })
        })
        .await
    }

    pub async fn delete(&self, payload: FilterPayload) -> DatasourceResult<JsonValue> {
        let repo = self.repository(payload.table.as_deref())?;
        let predicate = predicate_from(&payload.json);
        let rows = self
            .transact::<Vec<JsonValue>, _>(Operation::Delete, &repo, |txn| {
                let repo = Arc::clone(&repo);
                let predicate = predicate.clone();
                Box::pin(async move { repo.delete(txn, &predicate).await })
            })
            .await?;
        Ok(JsonValue::Array(rows))
    }

    pub async fn delete_by_id(&self, payload: IdPayload) -> DatasourceResult<JsonValue> {
        let repo = self.repository(payload.table.as_deref())?;
        let id = payload.id;
        let rows = self
            .transact::<Vec<JsonValue>, _>(Operation::DeleteById, &repo, |txn| {
                let repo = Arc::clone(&repo);
                let id = id.clone();
                Box::pin(async move { repo.delete_by_id(txn, &id).await })
            })
            .await?;
        Ok(JsonValue::Array(rows))
    }

    /// Number of tables with a cached repository.
    pub fn cached_repositories(&self) -> usize {
        self.lock_repositories().len()
    }

    fn repository(&self, table: Option<&str>) -> DatasourceResult<Arc<LedgerRepository>> {
        let table = match table.map(str::trim).filter(|table| !table.is_empty()) {
            Some(table) => validate_table(table)?,
            None => self
                .config
                .table
                .clone()
                .ok_or(ConfigError::Missing("table"))?,
        };

        let mut repositories = self.lock_repositories();
        if let Some(repo) = repositories.get(&table) {
            return Ok(Arc::clone(repo));
        }

        let mut repo =
            LedgerRepository::with_id_field(table.as_str(), self.config.id_field.as_str())?;
        if let Some(clock) = &self.clock {
            repo = repo.with_clock(Arc::clone(clock));
        }
        let repo = Arc::new(repo);
        repositories.insert(table, Arc::clone(&repo));
        Ok(repo)
    }

    async fn transact<T, F>(
        &self,
        operation: Operation,
        repo: &LedgerRepository,
        work: F,
    ) -> DatasourceResult<T>
    where
        T: Send,
        F: for<'t> FnMut(&'t mut (dyn LedgerTransaction + 'static)) -> TxnFuture<'t, T, RepoError>
            + Send,
    {
        let started_at = Instant::now();
        match self.session.execute_lambda(work).await {
            Ok(value) => {
                info!(
                    "event=datasource_call module=datasource status=ok op={} table={} duration_ms={}",
                    operation.as_str(),
                    repo.table(),
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Err(err) => {
                error!(
                    "event=datasource_call module=datasource status=error op={} table={} duration_ms={} error={}",
                    operation.as_str(),
                    repo.table(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }

    fn lock_repositories(&self) -> MutexGuard<'_, BTreeMap<String, Arc<LedgerRepository>>> {
        self.repositories
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn parse_payload<P: DeserializeOwned>(payload: JsonValue) -> DatasourceResult<P> {
    serde_json::from_value(payload).map_err(DatasourceError::Payload)
}

fn predicate_from(filter: &JsonObject) -> Predicate {
    Predicate::from_struct(&struct_from_json(filter))
}
