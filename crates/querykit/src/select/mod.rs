//! SELECT statement assembler.
//!
//! ```ignore
//! let outcome = repo
//!     .select::<TestItem>()
//!     .top(10)
//!     .from("TestTable")
//!     .where_(|f| {
//!         f.column("Id").greater_than(1).and("Name").not_null();
//!     })
//!     .order_by_desc("Id")
//!     .build()?
//!     .get_list()
//!     .await;
//! ```
//!
//! Configuration mistakes (empty field list, missing default table, no
//! projection at all) are recorded on the builder and returned by
//! [`SelectQuery::build`] before anything is sent to the database.

mod plan;


pub use plan::{Join, JoinKind, JoinOn, OrderBy, QueryPlan, Source, ViewBuilder};

use crate::dialect::{BoundStatement, Dialect};
use crate::entity::{Entity, EntityDescriptor};
use crate::error::{OrmError, OrmResult};
use crate::filter::{FilterBuilder, conjoin};
use crate::mapping::{FieldMap, Resolver};
use crate::outcome::Outcome;
use crate::param::ParamList;
use crate::projection::Projection;
use crate::provider::ConnectionProvider;
use std::marker::PhantomData;

pub(crate) const NO_FIELDS: &str = "No database fields specified. Pass fields to select_fields(...), \
     declare #[orm(column = ...)] on the entity, or supply a field map with map_fields(...)";
const LIST_EXCEPTION: &str = "There was an exception while getting the items.";
const ONE_EXCEPTION: &str = "There was an exception while getting the item.";
const NO_ITEM: &str = "There was no item that matched the criteria specified";
const TOO_MANY_ITEMS: &str = "The query returned more than one item with the criteria specified";

/// Fluent SELECT builder for entity `T` on provider `P`.
pub struct SelectQuery<'r, T: Entity, P: ConnectionProvider> {
    provider: &'r P,
    plan: QueryPlan,
    params: ParamList,
    map: Option<FieldMap>,
    by_name: bool,
    build_error: Option<String>,
    _entity: PhantomData<fn() -> T>,
}

impl<'r, T: Entity, P: ConnectionProvider> SelectQuery<'r, T, P> {
    fn empty(provider: &'r P, projection: Projection, distinct: bool) -> Self {
        Self {
            provider,
            plan: QueryPlan {
                projection,
                distinct,
                ..QueryPlan::default()
            },
            params: ParamList::new(),
            map: None,
            by_name: false,
            build_error: None,
            _entity: PhantomData,
        }
    }

    /// Projection taken from the caller's field list.
    pub(crate) fn with_fields<I, S>(provider: &'r P, fields: I, distinct: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let projection = Projection::from_fields(fields);
        let mut query = Self::empty(provider, projection, distinct);
        if query.plan.projection.is_empty() {
            query.fail("You have to specify the fields for the query.");
        }
        query
    }

    /// Projection discovered from the entity's declared columns.
    pub(crate) fn with_metadata(provider: &'r P, distinct: bool) -> Self {
        let projection = Projection::from_fields(Self::descriptor().columns());
        Self::empty(provider, projection, distinct)
    }

    fn descriptor() -> &'static EntityDescriptor<T> {
        T::descriptor()
    }

    /// Keep the first configuration error only.
    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        if self.build_error.is_none() {
            self.build_error = Some(message.into());
        }
    }

    /// `SELECT TOP(n)`; ignored when `n` is zero or a limit is already set.
    pub fn top(mut self, n: u32) -> Self {
        if self.plan.top.is_none() && n >= 1 {
            self.plan.top = Some(n);
        }
        self
    }

    /// `SELECT DISTINCT`; repeated calls have no further effect.
    pub fn distinct(mut self) -> Self {
        self.plan.distinct = true;
        self
    }

    /// Read from `table`.
    pub fn from(mut self, table: &str) -> Self {
        self.plan.source = Some(Source::table(table.trim()));
        self
    }

    /// Read from the table declared with `#[orm(table = "...")]`.
    pub fn from_default_table(mut self) -> Self {
        match Self::descriptor().default_table() {
            Some(table) => self.plan.source = Some(Source::table(table)),
            None => {
                let message = format!(
                    "The type {} does not have a default table declared.",
                    Self::descriptor().type_name()
                );
                self.fail(message);
            }
        }
        self
    }

    /// Read from `table AS alias` plus the joins registered on the view.
    pub fn from_view(
        mut self,
        table: &str,
        alias: Option<&str>,
        configure: impl FnOnce(&mut ViewBuilder),
    ) -> Self {
        let mut view = ViewBuilder::default();
        configure(&mut view);
        self.plan.source = Some(Source {
            table: table.trim().to_string(),
            alias: alias
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            joins: view.into_joins(),
        });
        self
    }

    /// Add a filter. Later filters are joined to earlier ones with `AND`,
    /// and parameter ordinals continue across calls.
    pub fn where_(mut self, build: impl FnOnce(&mut FilterBuilder)) -> Self {
        let mut filter = FilterBuilder::continuing(std::mem::take(&mut self.params));
        build(&mut filter);
        let (nodes, params) = filter.into_parts();
        self.params = params;
        self.plan.predicates = conjoin(std::mem::take(&mut self.plan.predicates), nodes);
        self
    }

    /// `ORDER BY column ASC`, honored only for a declared column and only once.
    pub fn order_by(self, column: &str) -> Self {
        self.order(column, false)
    }

    /// `ORDER BY column DESC`, honored only for a declared column and only once.
    pub fn order_by_desc(self, column: &str) -> Self {
        self.order(column, true)
    }

    fn order(mut self, column: &str, descending: bool) -> Self {
        if self.plan.order_by.is_none() && Self::descriptor().has_column(column) {
            self.plan.order_by = Some(OrderBy {
                column: column.to_string(),
                descending,
            });
        }
        self
    }

    /// Drop a declared column from the projection.
    pub fn remove_column(mut self, column: &str) -> Self {
        if Self::descriptor().has_column(column) {
            self.plan.projection.remove(column);
        }
        self
    }

    /// Project a declared column from another expression, e.g. a joined
    /// table's column, optionally under an alias.
    pub fn map_column(mut self, column: &str, expr: &str, alias: Option<&str>) -> Self {
        if Self::descriptor().has_column(column) {
            self.plan.projection.rename(column, expr, alias);
        }
        self
    }

    /// Map properties to columns explicitly for this query.
    ///
    /// A non-empty map replaces the projection with its columns; DISTINCT and
    /// TOP are kept.
    pub fn map_fields(mut self, configure: impl FnOnce(&mut FieldMap)) -> Self {
        let mut map = FieldMap::new();
        configure(&mut map);
        if map.is_empty() && self.plan.projection.is_empty() {
            self.fail(NO_FIELDS);
        } else if !map.is_empty() {
            self.plan.projection.replace(map.columns());
        }
        self.map = Some(map);
        self
    }

    /// Also fill properties from same-named result columns.
    pub fn by_property_name(mut self) -> Self {
        self.by_name = true;
        self
    }

    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    pub fn params(&self) -> &ParamList {
        &self.params
    }

    /// Canonical statement text with `@name` placeholders.
    pub fn built_query(&self) -> String {
        self.plan.render(Dialect::Named)
    }

    /// Validate the configuration and bind the statement for the provider.
    pub fn build(self) -> OrmResult<PreparedQuery<'r, T, P>> {
        if let Some(message) = self.build_error {
            return Err(OrmError::Configuration(message));
        }
        if self.plan.projection.is_empty() {
            return Err(OrmError::configuration(NO_FIELDS));
        }
        if self.plan.source.is_none() {
            return Err(OrmError::configuration(
                "No source table specified. Call from(...), from_default_table() or from_view(...)",
            ));
        }

        let dialect = self.provider.dialect();
        let sql = self.plan.render(dialect);
        let statement = dialect.bind(&sql, &self.params)?;
        Ok(PreparedQuery {
            provider: self.provider,
            sql: self.plan.render(Dialect::Named),
            statement,
            resolver: Resolver::new(self.plan.projection, self.map, self.by_name),
        })
    }
}

/// A bound SELECT ready to run once.
pub struct PreparedQuery<'r, T: Entity, P: ConnectionProvider> {
    provider: &'r P,
    sql: String,
    statement: BoundStatement,
    resolver: Resolver<T>,
}

impl<'r, T: Entity, P: ConnectionProvider> PreparedQuery<'r, T, P> {
    /// Canonical statement text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Statement as sent to the provider.
    pub fn statement(&self) -> &BoundStatement {
        &self.statement
    }

    async fn fetch(&self) -> OrmResult<Vec<T>> {
        tracing::debug!(
            target: "querykit.sql",
            sql = self.statement.sql(),
            params = self.statement.params().len(),
            "executing select"
        );
        let records = self.provider.query(&self.statement).await?;
        self.resolver.materialize_all(&records)
    }

    /// Every row that resolved at least one property.
    pub async fn get_list(self) -> Outcome<Vec<T>> {
        match self.fetch().await {
            Ok(items) => Outcome::success(items),
            Err(e) => Outcome::captured(LIST_EXCEPTION, e),
        }
    }

    /// Exactly one item; zero or several are a `Fail` outcome.
    pub async fn get_one(self) -> Outcome<T> {
        match self.fetch().await {
            Ok(items) => {
                let mut items = items.into_iter();
                match (items.next(), items.next()) {
                    (None, _) => Outcome::fail(NO_ITEM),
                    (Some(item), None) => Outcome::success(item),
                    (Some(_), Some(_)) => Outcome::fail(TOO_MANY_ITEMS),
                }
            }
            Err(e) => Outcome::captured(ONE_EXCEPTION, e),
        }
    }
}
