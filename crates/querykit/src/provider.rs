//! Connection providers: the seam between statement builders and a live database.

use crate::config::DatabaseConfig;
use crate::dialect::{BoundStatement, Dialect};
use crate::error::{OrmError, OrmResult};
use crate::record::Record;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_postgres::NoTls;
use tokio_postgres::types::ToSql;

/// Error text for a commit attempted after a statement failed.
pub(crate) const ABORTED: &str =
    "a statement failed inside the transaction; changes were rolled back";

/// One owned connection with at most one open transaction.
///
/// Every builder in this crate executes through this trait, so tests and
/// alternative backends only need to implement these few methods.
pub trait ConnectionProvider: Send + Sync {
    /// Rendering style the backend understands.
    fn dialect(&self) -> Dialect;

    /// Run a row-returning statement.
    fn query(
        &self,
        statement: &BoundStatement,
    ) -> impl std::future::Future<Output = OrmResult<Vec<Record>>> + Send;

    /// Run a statement and return the number of affected rows.
    fn execute(
        &self,
        statement: &BoundStatement,
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send;

    /// Open a transaction. Fails if one is already open.
    fn begin(&self) -> impl std::future::Future<Output = OrmResult<()>> + Send;

    /// Commit the open transaction.
    ///
    /// When a statement failed inside the transaction the server has already
    /// aborted it: the provider rolls back instead and returns
    /// [`OrmError::Transaction`].
    fn commit(&self) -> impl std::future::Future<Output = OrmResult<()>> + Send;

    /// Roll back the open transaction.
    fn rollback(&self) -> impl std::future::Future<Output = OrmResult<()>> + Send;

    fn in_transaction(&self) -> bool;
}

/// [`ConnectionProvider`] over a single tokio-postgres connection.
///
/// Transactions are driven with plain `BEGIN`/`COMMIT`/`ROLLBACK` on the
/// owned client, so the provider never borrows itself.
pub struct PostgresProvider {
    client: tokio_postgres::Client,
    in_transaction: AtomicBool,
    failed: AtomicBool,
}

impl PostgresProvider {
    /// Wrap an already connected client.
    pub fn new(client: tokio_postgres::Client) -> Self {
        Self {
            client,
            in_transaction: AtomicBool::new(false),
            failed: AtomicBool::new(false),
        }
    }

    /// Connect using `config` and spawn the connection driver task.
    pub async fn connect(config: &DatabaseConfig) -> OrmResult<Self> {
        let conn_str = config.connection_string()?;
        let (client, connection) = tokio_postgres::connect(&conn_str, NoTls)
            .await
            .map_err(|e| OrmError::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target: "querykit.sql", error = %e, "postgres connection error");
            }
        });

        Ok(Self::new(client))
    }

    pub fn client(&self) -> &tokio_postgres::Client {
        &self.client
    }

    /// Remember a statement failure inside the open transaction.
    fn track<T>(&self, result: OrmResult<T>) -> OrmResult<T> {
        if result.is_err() && self.in_transaction.load(Ordering::Acquire) {
            self.failed.store(true, Ordering::Release);
        }
        result
    }

    async fn batch(&self, sql: &str) -> OrmResult<()> {
        self.client
            .batch_execute(sql)
            .await
            .map_err(OrmError::from_db_error)
    }
}

fn sql_params(statement: &BoundStatement) -> Vec<&(dyn ToSql + Sync)> {
    statement
        .params()
        .iter()
        .map(|v| v as &(dyn ToSql + Sync))
        .collect()
}

impl ConnectionProvider for PostgresProvider {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn query(&self, statement: &BoundStatement) -> OrmResult<Vec<Record>> {
        let params = sql_params(statement);
        let rows = self.track(
            self.client
                .query(statement.sql(), &params)
                .await
                .map_err(OrmError::from_db_error),
        )?;
        self.track(Record::from_pg_rows(&rows))
    }

    async fn execute(&self, statement: &BoundStatement) -> OrmResult<u64> {
        let params = sql_params(statement);
        self.track(
            self.client
                .execute(statement.sql(), &params)
                .await
                .map_err(OrmError::from_db_error),
        )
    }

    async fn begin(&self) -> OrmResult<()> {
        if self.in_transaction.load(Ordering::Acquire) {
            return Err(OrmError::Transaction(
                "a transaction is already open".to_string(),
            ));
        }
        self.batch("BEGIN").await?;
        self.failed.store(false, Ordering::Release);
        self.in_transaction.store(true, Ordering::Release);
        tracing::debug!(target: "querykit.sql", "transaction started");
        Ok(())
    }

    async fn commit(&self) -> OrmResult<()> {
        if !self.in_transaction.load(Ordering::Acquire) {
            return Err(OrmError::Transaction("no open transaction".to_string()));
        }
        if self.failed.swap(false, Ordering::AcqRel) {
            self.in_transaction.store(false, Ordering::Release);
            self.batch("ROLLBACK").await?;
            tracing::warn!(
                target: "querykit.sql",
                "commit refused after a failed statement, rolled back"
            );
            return Err(OrmError::Transaction(ABORTED.to_string()));
        }
        self.batch("COMMIT").await?;
        self.in_transaction.store(false, Ordering::Release);
        tracing::debug!(target: "querykit.sql", "transaction committed");
        Ok(())
    }

    async fn rollback(&self) -> OrmResult<()> {
        if !self.in_transaction.load(Ordering::Acquire) {
            return Err(OrmError::Transaction("no open transaction".to_string()));
        }
        self.in_transaction.store(false, Ordering::Release);
        self.failed.store(false, Ordering::Release);
        self.batch("ROLLBACK").await?;
        tracing::debug!(target: "querykit.sql", "transaction rolled back");
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction.load(Ordering::Acquire)
    }
}
