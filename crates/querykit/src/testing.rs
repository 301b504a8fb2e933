//! In-memory [`ConnectionProvider`] for tests.
//!
//! Responses are queued up front and consumed in order, one per `query` or
//! `execute` call. Every bound statement is recorded so tests can assert on
//! the exact text and values that would reach the database.
//!
//! ```ignore
//! let provider = MemoryProvider::new();
//! provider.respond_rows(&["Id", "Name"], vec![vec![1.into(), "Victor".into()]]);
//! let repo = Repository::new(provider);
//! ```

use crate::dialect::{BoundStatement, Dialect};
use crate::error::{OrmError, OrmResult};
use crate::provider::{ABORTED, ConnectionProvider};
use crate::record::Record;
use crate::value::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Canned answer for the next call.
#[derive(Debug)]
pub enum Response {
    Rows(Vec<Record>),
    Affected(u64),
    Error(OrmError),
}

#[derive(Debug, Default)]
pub struct MemoryProvider {
    dialect: Dialect,
    responses: Mutex<VecDeque<Response>>,
    statements: Mutex<Vec<BoundStatement>>,
    in_transaction: AtomicBool,
    failed: AtomicBool,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn respond(&self, response: Response) -> &Self {
        lock(&self.responses).push_back(response);
        self
    }

    /// Queue a result set; every row shares `columns`.
    pub fn respond_rows(&self, columns: &[&str], rows: Vec<Vec<Value>>) -> &Self {
        let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
        let records = rows
            .into_iter()
            .map(|values| Record::new(Arc::clone(&columns), values))
            .collect();
        self.respond(Response::Rows(records))
    }

    pub fn respond_affected(&self, rows: u64) -> &Self {
        self.respond(Response::Affected(rows))
    }

    pub fn fail_next(&self, error: OrmError) -> &Self {
        self.respond(Response::Error(error))
    }

    /// Every statement received, in order.
    pub fn statements(&self) -> Vec<BoundStatement> {
        lock(&self.statements).clone()
    }

    pub fn last_statement(&self) -> Option<BoundStatement> {
        lock(&self.statements).last().cloned()
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::Acquire)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::Acquire)
    }

    fn next(&self, statement: &BoundStatement) -> Option<Response> {
        lock(&self.statements).push(statement.clone());
        let response = lock(&self.responses).pop_front();
        if matches!(response, Some(Response::Error(_))) && self.in_transaction() {
            self.failed.store(true, Ordering::Release);
        }
        response
    }
}

impl ConnectionProvider for MemoryProvider {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn query(&self, statement: &BoundStatement) -> OrmResult<Vec<Record>> {
        match self.next(statement) {
            None | Some(Response::Affected(_)) => Ok(Vec::new()),
            Some(Response::Rows(records)) => Ok(records),
            Some(Response::Error(e)) => Err(e),
        }
    }

    async fn execute(&self, statement: &BoundStatement) -> OrmResult<u64> {
        match self.next(statement) {
            None => Ok(0),
            Some(Response::Affected(rows)) => Ok(rows),
            Some(Response::Rows(records)) => Ok(records.len() as u64),
            Some(Response::Error(e)) => Err(e),
        }
    }

    async fn begin(&self) -> OrmResult<()> {
        if self.in_transaction.swap(true, Ordering::AcqRel) {
            return Err(OrmError::Transaction(
                "a transaction is already open".to_string(),
            ));
        }
        self.failed.store(false, Ordering::Release);
        Ok(())
    }

    async fn commit(&self) -> OrmResult<()> {
        if !self.in_transaction.swap(false, Ordering::AcqRel) {
            return Err(OrmError::Transaction("no open transaction".to_string()));
        }
        if self.failed.swap(false, Ordering::AcqRel) {
            self.rollbacks.fetch_add(1, Ordering::AcqRel);
            return Err(OrmError::Transaction(ABORTED.to_string()));
        }
        self.commits.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn rollback(&self) -> OrmResult<()> {
        if !self.in_transaction.swap(false, Ordering::AcqRel) {
            return Err(OrmError::Transaction("no open transaction".to_string()));
        }
        self.failed.store(false, Ordering::Release);
        self.rollbacks.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction.load(Ordering::Acquire)
    }
}
