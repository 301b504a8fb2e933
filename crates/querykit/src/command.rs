//! INSERT, UPDATE and DELETE commands.
//!
//! Commands reuse [`FilterBuilder`] for their WHERE clause. Field values are
//! bound under `@<field><ordinal>` from the same allocator; filter ordinals
//! continue after them, so the SET values of an UPDATE always come first in
//! the parameter list.
//!
//! Executing a command opens a transaction on the provider when none is open.
//! Nothing is committed until [`Repository::save_changes`](crate::Repository::save_changes).
//!
//! An UPDATE or DELETE whose filter adds no predicate renders `WHERE 1=0`
//! and touches no rows.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::filter::{FilterBuilder, Predicate, normalize, render};
use crate::outcome::Outcome;
use crate::param::{ParamList, placeholder_stem};
use crate::provider::ConnectionProvider;
use crate::value::Value;

const COMMAND_EXCEPTION: &str = "Could not execute the command.";
const DEFAULT_KEY_COLUMN: &str = "ID";

#[derive(Debug, Clone, PartialEq)]
enum Statement {
    Insert {
        table: String,
        columns: Vec<(String, String)>,
    },
    Update {
        table: String,
        sets: Vec<(String, String)>,
        predicates: Vec<Predicate>,
    },
    Delete {
        table: String,
        predicates: Vec<Predicate>,
    },
}

fn where_clause(predicates: &[Predicate]) -> String {
    if predicates.is_empty() {
        "WHERE 1=0".to_string()
    } else {
        render(predicates)
    }
}

fn assignments(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(column, name)| format!("{column} = @{name}"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Statement {
    fn render(&self, dialect: Dialect, key: Option<&str>) -> String {
        let sql = match self {
            Statement::Insert { table, columns } => {
                let names: Vec<&str> = columns.iter().map(|(c, _)| c.as_str()).collect();
                let markers: Vec<String> = columns.iter().map(|(_, n)| format!("@{n}")).collect();
                let head = format!("INSERT INTO {} ({})", table, names.join(", "));
                let values = format!("VALUES ({})", markers.join(", "));
                match (key, dialect) {
                    (Some(key), Dialect::Named) => format!("{head} OUTPUT Inserted.{key} {values}"),
                    (Some(key), Dialect::Postgres) => format!("{head} {values} RETURNING {key}"),
                    (None, _) => format!("{head} {values}"),
                }
            }
            Statement::Update {
                table,
                sets,
                predicates,
            } => format!(
                "UPDATE {} SET {} {}",
                table,
                assignments(sets),
                where_clause(predicates)
            ),
            Statement::Delete { table, predicates } => {
                format!("DELETE FROM {} {}", table, where_clause(predicates))
            }
        };
        normalize(&sql)
    }
}

/// Collect `(field, value)` pairs into columns and ordinal parameters.
fn bind_fields<I, F, V>(fields: I, params: &mut ParamList) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (F, V)>,
    F: Into<String>,
    V: Into<Value>,
{
    fields
        .into_iter()
        .map(|(field, value)| {
            let column = field.into().trim().to_string();
            let name = params.allocate(&placeholder_stem(&column), value);
            (column, name)
        })
        .collect()
}

/// `INSERT INTO table (...) VALUES (...)`
pub struct InsertCommand<'r, P: ConnectionProvider> {
    provider: &'r P,
    table: String,
}

impl<'r, P: ConnectionProvider> InsertCommand<'r, P> {
    pub(crate) fn new(provider: &'r P, table: &str) -> Self {
        Self {
            provider,
            table: table.trim().to_string(),
        }
    }

    /// Columns and values to insert.
    pub fn field_values<I, F, V>(self, fields: I) -> OrmResult<CommandReady<'r, P>>
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<Value>,
    {
        let mut params = ParamList::new();
        let columns = bind_fields(fields, &mut params);
        if columns.is_empty() {
            return Err(OrmError::configuration(
                "You have to specify the fields to insert.",
            ));
        }
        Ok(CommandReady::new(
            self.provider,
            Statement::Insert {
                table: self.table,
                columns,
            },
            params,
        ))
    }
}

/// `UPDATE table SET ... WHERE ...`
pub struct UpdateCommand<'r, P: ConnectionProvider> {
    provider: &'r P,
    table: String,
    sets: Vec<(String, String)>,
    params: ParamList,
}

impl<'r, P: ConnectionProvider> UpdateCommand<'r, P> {
    pub(crate) fn new(provider: &'r P, table: &str) -> Self {
        Self {
            provider,
            table: table.trim().to_string(),
            sets: Vec::new(),
            params: ParamList::new(),
        }
    }

    /// Columns to assign. Only the first call takes effect.
    pub fn field_values<I, F, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (F, V)>,
        F: Into<String>,
        V: Into<Value>,
    {
        if self.sets.is_empty() {
            self.sets = bind_fields(fields, &mut self.params);
        }
        self
    }

    /// Restrict the rows to update.
    pub fn where_(self, build: impl FnOnce(&mut FilterBuilder)) -> OrmResult<CommandReady<'r, P>> {
        if self.sets.is_empty() {
            return Err(OrmError::configuration(
                "You have to specify the fields to update with field_values(...).",
            ));
        }
        let mut filter = FilterBuilder::continuing(self.params);
        build(&mut filter);
        let (predicates, params) = filter.into_parts();
        Ok(CommandReady::new(
            self.provider,
            Statement::Update {
                table: self.table,
                sets: self.sets,
                predicates,
            },
            params,
        ))
    }
}

/// `DELETE FROM table WHERE ...`
pub struct DeleteCommand<'r, P: ConnectionProvider> {
    provider: &'r P,
    table: String,
}

impl<'r, P: ConnectionProvider> DeleteCommand<'r, P> {
    pub(crate) fn new(provider: &'r P, table: &str) -> Self {
        Self {
            provider,
            table: table.trim().to_string(),
        }
    }

    /// Restrict the rows to delete.
    pub fn where_(self, build: impl FnOnce(&mut FilterBuilder)) -> CommandReady<'r, P> {
        let mut filter = FilterBuilder::new();
        build(&mut filter);
        let (predicates, params) = filter.into_parts();
        CommandReady::new(
            self.provider,
            Statement::Delete {
                table: self.table,
                predicates,
            },
            params,
        )
    }
}

/// A fully specified write command.
pub struct CommandReady<'r, P: ConnectionProvider> {
    provider: &'r P,
    statement: Statement,
    params: ParamList,
    key_column: String,
}

impl<'r, P: ConnectionProvider> CommandReady<'r, P> {
    fn new(provider: &'r P, statement: Statement, params: ParamList) -> Self {
        Self {
            provider,
            statement,
            params,
            key_column: DEFAULT_KEY_COLUMN.to_string(),
        }
    }

    /// Generated-key column read by [`CommandReady::execute_scalar`] (default `ID`).
    pub fn key_column(mut self, column: &str) -> Self {
        self.key_column = column.trim().to_string();
        self
    }

    /// Canonical statement text with `@name` placeholders.
    pub fn sql(&self) -> String {
        self.statement.render(Dialect::Named, None)
    }

    pub fn params(&self) -> &ParamList {
        &self.params
    }

    fn is_insert(&self) -> bool {
        matches!(self.statement, Statement::Insert { .. })
    }

    async fn ensure_transaction(&self) -> OrmResult<()> {
        if !self.provider.in_transaction() {
            self.provider.begin().await?;
        }
        Ok(())
    }

    /// Run the command; returns the number of affected rows.
    pub async fn execute(self) -> Outcome<u64> {
        let result = async {
            let dialect = self.provider.dialect();
            let bound = dialect.bind(&self.statement.render(dialect, None), &self.params)?;
            self.ensure_transaction().await?;
            tracing::debug!(
                target: "querykit.sql",
                sql = bound.sql(),
                params = bound.params().len(),
                "executing command"
            );
            self.provider.execute(&bound).await
        }
        .await;

        match result {
            Ok(affected) => Outcome::success(affected),
            Err(e) => Outcome::captured(COMMAND_EXCEPTION, e),
        }
    }

    /// Run the command and return the first cell of the first row.
    ///
    /// For an INSERT this is the generated key (`OUTPUT Inserted.<key>` or
    /// `RETURNING <key>`). `Value::Null` when nothing came back.
    pub async fn execute_scalar(self) -> Outcome<Value> {
        let result = async {
            let dialect = self.provider.dialect();
            let key = self.is_insert().then_some(self.key_column.as_str());
            let bound = dialect.bind(&self.statement.render(dialect, key), &self.params)?;
            self.ensure_transaction().await?;
            tracing::debug!(
                target: "querykit.sql",
                sql = bound.sql(),
                params = bound.params().len(),
                "executing scalar command"
            );
            let records = self.provider.query(&bound).await?;
            Ok::<_, OrmError>(
                records
                    .first()
                    .and_then(|r| r.values().first().cloned())
                    .unwrap_or(Value::Null),
            )
        }
        .await;

        match result {
            Ok(value) => Outcome::success(value),
            Err(e) => Outcome::captured(COMMAND_EXCEPTION, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryProvider;

    #[test]
    fn insert_renders_named_columns() {
        let provider = MemoryProvider::new();
        let ready = InsertCommand::new(&provider, "TestTable")
            .field_values([("Name", Value::from("Victor")), ("Age", Value::from(26))])
            .unwrap();
        assert_eq!(
            ready.sql(),
            "INSERT INTO TestTable (Name, Age) VALUES (@Name0, @Age1)"
        );
        assert_eq!(ready.params().names(), vec!["Name0", "Age1"]);
    }

    #[test]
    fn insert_without_fields_is_a_configuration_error() {
        let provider = MemoryProvider::new();
        let err = InsertCommand::new(&provider, "TestTable")
            .field_values(Vec::<(&str, i32)>::new())
            .err()
            .unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn update_set_parameters_come_first() {
        let provider = MemoryProvider::new();
        let ready = UpdateCommand::new(&provider, "TestTable")
            .field_values([("Name", "Victor"), ("Surname", "Asuaje")])
            .field_values([("Ignored", "x")])
            .where_(|f| {
                f.column("Id").equal_to(1);
            })
            .unwrap();
        assert_eq!(
            ready.sql(),
            "UPDATE TestTable SET Name = @Name0, Surname = @Surname1 WHERE Id = @Id2"
        );
        assert_eq!(ready.params().names(), vec!["Name0", "Surname1", "Id2"]);
    }

    #[tokio::test]
    async fn write_parameter_names_never_collide() {
        let provider = MemoryProvider::new().with_dialect(Dialect::Postgres);
        let ready = UpdateCommand::new(&provider, "TestTable")
            .field_values([("Id1", Value::from(9)), ("[Name]", Value::from("x"))])
            .field_values([("Ignored", "y")])
            .where_(|f| {
                f.column("Id").equal_to(1).and("Name").equal_to("Victor");
            })
            .unwrap();
        assert_eq!(
            ready.sql(),
            "UPDATE TestTable SET Id1 = @Id10, [Name] = @Name1 WHERE Id = @Id2 AND Name = @Name3"
        );
        assert_eq!(ready.params().names(), vec!["Id10", "Name1", "Id2", "Name3"]);

        let outcome = ready.execute().await;
        assert!(outcome.is_success());
        let statement = provider.last_statement().unwrap();
        assert_eq!(
            statement.sql(),
            "UPDATE TestTable SET Id1 = $1, [Name] = $2 WHERE Id = $3 AND Name = $4"
        );
        assert_eq!(
            statement.params(),
            &[Value::Int(9), Value::from("x"), Value::Int(1), Value::from("Victor")]
        );
    }

    #[test]
    fn update_without_fields_is_a_configuration_error() {
        let provider = MemoryProvider::new();
        let result = UpdateCommand::new(&provider, "TestTable").where_(|f| {
            f.column("Id").equal_to(1);
        });
        assert!(result.err().unwrap().is_configuration());
    }

    #[test]
    fn delete_without_predicates_touches_nothing() {
        let provider = MemoryProvider::new();
        let ready = DeleteCommand::new(&provider, "TestTable").where_(|f| {
            f.column("Id").in_list(Vec::<i32>::new());
        });
        assert_eq!(ready.sql(), "DELETE FROM TestTable WHERE 1=0");
    }

    #[tokio::test]
    async fn execute_opens_a_transaction() {
        let provider = MemoryProvider::new();
        provider.respond_affected(2);
        let outcome = DeleteCommand::new(&provider, "TestTable")
            .where_(|f| {
                f.column("Age").greater_than(27);
            })
            .execute()
            .await;
        assert_eq!(outcome.value(), Some(&2));
        assert!(provider.in_transaction());
        assert_eq!(
            provider.last_statement().unwrap().sql(),
            "DELETE FROM TestTable WHERE Age > @Age0"
        );
    }

    #[tokio::test]
    async fn execute_scalar_reads_generated_key() {
        let provider = MemoryProvider::new();
        provider.respond_rows(&["ID"], vec![vec![Value::Int(5)]]);
        let outcome = InsertCommand::new(&provider, "TestTable")
            .field_values([("Name", "Victor")])
            .unwrap()
            .execute_scalar()
            .await;
        assert_eq!(outcome.value(), Some(&Value::Int(5)));
        assert_eq!(
            provider.last_statement().unwrap().sql(),
            "INSERT INTO TestTable (Name) OUTPUT Inserted.ID VALUES (@Name0)"
        );
    }

    #[tokio::test]
    async fn postgres_insert_returns_key() {
        let provider = MemoryProvider::new().with_dialect(Dialect::Postgres);
        let _ = InsertCommand::new(&provider, "items")
            .field_values([("name", "Victor")])
            .unwrap()
            .key_column("id")
            .execute_scalar()
            .await;
        assert_eq!(
            provider.last_statement().unwrap().sql(),
            "INSERT INTO items (name) VALUES ($1) RETURNING id"
        );
    }

    #[tokio::test]
    async fn provider_faults_become_exceptions() {
        let provider = MemoryProvider::new();
        provider.fail_next(OrmError::Connection("gone".into()));
        let outcome = DeleteCommand::new(&provider, "TestTable")
            .where_(|f| {
                f.column("Id").equal_to(1);
            })
            .execute()
            .await;
        assert!(outcome.is_exception());
        assert_eq!(outcome.message(), Some(COMMAND_EXCEPTION));
    }
}
