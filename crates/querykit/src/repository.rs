//! Repository entry points over one connection provider.
//!
//! A [`Repository`] owns its provider, and through it one connection with at
//! most one open transaction. Read builders borrow the repository for the
//! duration of one statement. Write commands open the transaction on first
//! use and [`Repository::save_changes`] commits it.
//!
//! ```ignore
//! let repo = Repository::connect(&DatabaseConfig::from_env()?).await?;
//!
//! let people = repo
//!     .select_fields::<Person, _, _>(["Id", "Name"])
//!     .from("TestTable")
//!     .where_(|f| {
//!         f.column("Age").greater_than(26);
//!     })
//!     .build()?
//!     .get_list()
//!     .await;
//!
//! repo.delete_from("TestTable")
//!     .where_(|f| {
//!         f.column("Id").equal_to(3);
//!     })
//!     .execute()
//!     .await;
//! let saved = repo.save_changes().await;
//! ```

use crate::command::{CommandReady, DeleteCommand, InsertCommand, UpdateCommand};
use crate::config::DatabaseConfig;
use crate::entity::Entity;
use crate::error::OrmResult;
use crate::outcome::Outcome;
use crate::provider::{ConnectionProvider, PostgresProvider};
use crate::select::SelectQuery;
use crate::value::Value;
use std::marker::PhantomData;

const NO_TRANSACTION: &str = "There are no pending changes to save.";
const SAVE_EXCEPTION: &str = "Could not save the changes.";
const DISCARD_EXCEPTION: &str = "Could not discard the changes.";

/// Statement entry points bound to one provider.
#[derive(Debug)]
pub struct Repository<P: ConnectionProvider> {
    provider: P,
}

impl Repository<PostgresProvider> {
    /// Connect to PostgreSQL with `config`.
    pub async fn connect(config: &DatabaseConfig) -> OrmResult<Self> {
        let provider = PostgresProvider::connect(config).await?;
        Ok(Self::new(provider))
    }
}

impl<P: ConnectionProvider> Repository<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn into_provider(self) -> P {
        self.provider
    }

    /// SELECT of every column declared on `T`.
    pub fn select<T: Entity>(&self) -> SelectQuery<'_, T, P> {
        SelectQuery::with_metadata(&self.provider, false)
    }

    /// SELECT DISTINCT of every column declared on `T`.
    pub fn select_distinct<T: Entity>(&self) -> SelectQuery<'_, T, P> {
        SelectQuery::with_metadata(&self.provider, true)
    }

    /// SELECT of an explicit field list. An empty list fails at `build()`.
    pub fn select_fields<T, I, S>(&self, fields: I) -> SelectQuery<'_, T, P>
    where
        T: Entity,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        SelectQuery::with_fields(&self.provider, fields, false)
    }

    pub fn select_distinct_fields<T, I, S>(&self, fields: I) -> SelectQuery<'_, T, P>
    where
        T: Entity,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        SelectQuery::with_fields(&self.provider, fields, true)
    }

    /// SELECT of the declared columns of `T` from its default table.
    ///
    /// A type with no declared column or no default table fails at `build()`.
    pub fn auto_select<T: Entity>(&self) -> SelectQuery<'_, T, P> {
        let mut query = SelectQuery::with_metadata(&self.provider, false);
        let descriptor = T::descriptor();
        if descriptor.columns().is_empty() {
            query.fail(format!(
                "The type {} does not declare any database column.",
                descriptor.type_name()
            ));
        }
        query.from_default_table()
    }

    pub fn insert_into(&self, table: &str) -> InsertCommand<'_, P> {
        InsertCommand::new(&self.provider, table)
    }

    pub fn update(&self, table: &str) -> UpdateCommand<'_, P> {
        UpdateCommand::new(&self.provider, table)
    }

    pub fn delete_from(&self, table: &str) -> DeleteCommand<'_, P> {
        DeleteCommand::new(&self.provider, table)
    }

    /// Commit the transaction opened by earlier write commands.
    ///
    /// If any statement failed since the transaction opened, nothing is
    /// committed: the transaction is rolled back and the outcome is an
    /// exception.
    pub async fn save_changes(&self) -> Outcome<()> {
        if !self.provider.in_transaction() {
            return Outcome::fail(NO_TRANSACTION);
        }
        match self.provider.commit().await {
            Ok(()) => Outcome::success(()),
            Err(e) => Outcome::captured(SAVE_EXCEPTION, e),
        }
    }

    /// Roll back the open transaction; a no-op when none is open.
    pub async fn discard_changes(&self) -> Outcome<()> {
        if !self.provider.in_transaction() {
            return Outcome::success(());
        }
        match self.provider.rollback().await {
            Ok(()) => Outcome::success(()),
            Err(e) => Outcome::captured(DISCARD_EXCEPTION, e),
        }
    }
}

/// Repository bound to one entity type and one table.
#[derive(Debug)]
pub struct TypedRepository<T: Entity, P: ConnectionProvider> {
    repo: Repository<P>,
    table: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity, P: ConnectionProvider> TypedRepository<T, P> {
    pub fn new(repo: Repository<P>, table: impl Into<String>) -> Self {
        Self {
            repo,
            table: table.into().trim().to_string(),
            _entity: PhantomData,
        }
    }

    /// Bind to the default table declared on `T`, if any.
    pub fn for_default_table(repo: Repository<P>) -> Option<Self> {
        T::descriptor()
            .default_table()
            .map(|table| Self::new(repo, table))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn repository(&self) -> &Repository<P> {
        &self.repo
    }

    pub fn into_repository(self) -> Repository<P> {
        self.repo
    }

    pub fn select(&self) -> SelectQuery<'_, T, P> {
        self.repo.select::<T>().from(&self.table)
    }

    pub fn select_fields<I, S>(&self, fields: I) -> SelectQuery<'_, T, P>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.repo.select_fields::<T, _, _>(fields).from(&self.table)
    }

    pub fn select_top(&self, n: u32) -> SelectQuery<'_, T, P> {
        self.select().top(n)
    }

    pub fn select_top_fields<I, S>(&self, n: u32, fields: I) -> SelectQuery<'_, T, P>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.select_fields(fields).top(n)
    }

    pub fn select_distinct(&self) -> SelectQuery<'_, T, P> {
        self.repo.select_distinct::<T>().from(&self.table)
    }

    pub fn select_distinct_fields<I, S>(&self, fields: I) -> SelectQuery<'_, T, P>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.repo
            .select_distinct_fields::<T, _, _>(fields)
            .from(&self.table)
    }

    pub fn insert<I, F, V>(&self, fields: I) -> OrmResult<CommandReady<'_, P>>
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<Value>,
    {
        self.repo.insert_into(&self.table).field_values(fields)
    }

    pub fn update(&self) -> UpdateCommand<'_, P> {
        self.repo.update(&self.table)
    }

    pub fn delete(&self) -> DeleteCommand<'_, P> {
        self.repo.delete_from(&self.table)
    }

    pub async fn save_changes(&self) -> Outcome<()> {
        self.repo.save_changes().await
    }

    pub async fn discard_changes(&self) -> Outcome<()> {
        self.repo.discard_changes().await
    }
}
