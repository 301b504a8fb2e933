//! WHERE-clause builder with nested AND/OR groups.
//!
//! A [`FilterBuilder`] collects comparisons into a predicate tree and
//! allocates one named parameter per literal. Parameter ordinals come from a
//! single counter owned by the builder, so they stay unique and increasing
//! across every nested group of the statement.
//!
//! ```ignore
//! use querykit::FilterBuilder;
//!
//! let mut filter = FilterBuilder::new();
//! filter
//!     .group(|g| {
//!         g.push(|f| {
//!             f.column("Id").not_null().and("Price").less_or_equal_to("500");
//!         });
//!     })
//!     .or_group(|g| {
//!         g.push(|f| {
//!             f.column("Id").equal_to("1").and("Name").like("Victor");
//!         });
//!     });
//!
//! assert_eq!(
//!     filter.text(),
//!     "WHERE ( Id IS NOT NULL AND Price <= @Price0 ) OR ( Id = @Id1 AND Name LIKE @Name2 )"
//! );
//! ```

mod predicate;

#[cfg(test)]
mod tests;

pub use predicate::{Keyword, Modifier};
pub(crate) use predicate::{Predicate, conjoin, normalize, render};

use crate::param::{ParamList, placeholder_stem};
use crate::value::Value;
use predicate::{Comparator, Test, lead_with};
use std::fmt;

/// A group that is still receiving children.
#[derive(Debug)]
struct OpenGroup {
    modifier: Modifier,
    children: Vec<Predicate>,
}

/// Incremental builder of one statement's predicate text and parameters.
#[derive(Debug, Default)]
pub struct FilterBuilder {
    nodes: Vec<Predicate>,
    open: Vec<OpenGroup>,
    params: ParamList,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a builder whose ordinals continue after `params`.
    ///
    /// Used when the statement already allocated parameters (SET values of
    /// an UPDATE, an earlier WHERE of the same SELECT).
    pub fn continuing(params: ParamList) -> Self {
        Self {
            nodes: Vec::new(),
            open: Vec::new(),
            params,
        }
    }

    /// Start a predicate on `column` with the contextual connector.
    pub fn column(&mut self, column: impl Into<String>) -> Column<'_> {
        Column::new(self, column.into(), Modifier::None)
    }

    /// Start a predicate joined with `AND`.
    pub fn and(&mut self, column: impl Into<String>) -> Column<'_> {
        Column::new(self, column.into(), Modifier::And)
    }

    /// Start a predicate joined with `OR`.
    pub fn or(&mut self, column: impl Into<String>) -> Column<'_> {
        Column::new(self, column.into(), Modifier::Or)
    }

    /// Parenthesized group with the contextual connector.
    pub fn group<'r>(&mut self, register: impl FnOnce(&mut GroupRegistry<'r>)) -> &mut Self {
        self.push_group(Modifier::None, register)
    }

    /// Parenthesized group joined with `AND`.
    pub fn and_group<'r>(&mut self, register: impl FnOnce(&mut GroupRegistry<'r>)) -> &mut Self {
        self.push_group(Modifier::And, register)
    }

    /// Parenthesized group joined with `OR`.
    pub fn or_group<'r>(&mut self, register: impl FnOnce(&mut GroupRegistry<'r>)) -> &mut Self {
        self.push_group(Modifier::Or, register)
    }

    /// Rendered predicate text: empty, or starting with `WHERE`.
    pub fn text(&self) -> String {
        render(&self.nodes)
    }

    pub fn params(&self) -> &ParamList {
        &self.params
    }

    /// True when no predicate was added.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Join this filter onto an existing condition with `AND`.
    pub fn apply_and(&self, existing: &str) -> String {
        self.apply_to(existing, Modifier::And)
    }

    /// Join this filter onto an existing condition with `OR`.
    pub fn apply_or(&self, existing: &str) -> String {
        self.apply_to(existing, Modifier::Or)
    }

    fn apply_to(&self, existing: &str, lead: Modifier) -> String {
        let existing = normalize(existing);
        if self.nodes.is_empty() {
            return existing;
        }
        if existing.is_empty() {
            return self.text();
        }
        let joined = lead_with(self.nodes.clone(), lead);
        format!("{} {}", existing, render(&joined))
    }

    /// Predicate nodes and the parameter list, for merging into a statement.
    pub(crate) fn into_parts(self) -> (Vec<Predicate>, ParamList) {
        (self.nodes, self.params)
    }

    fn resolve(&self, requested: Modifier) -> Modifier {
        match self.open.last() {
            Some(group) if group.children.is_empty() => Modifier::None,
            Some(_) => requested,
            None if self.nodes.is_empty() => Modifier::Where,
            None => requested,
        }
    }

    fn append(&mut self, node: Predicate) -> &mut Self {
        match self.open.last_mut() {
            Some(group) => group.children.push(node),
            None => self.nodes.push(node),
        }
        self
    }

    fn push_comparison(&mut self, requested: Modifier, column: String, test: Test) -> &mut Self {
        let modifier = self.resolve(requested);
        self.append(Predicate::Comparison {
            modifier,
            column,
            test,
        })
    }

    fn push_group<'r>(
        &mut self,
        requested: Modifier,
        register: impl FnOnce(&mut GroupRegistry<'r>),
    ) -> &mut Self {
        let mut registry = GroupRegistry::new();
        register(&mut registry);
        if registry.is_empty() {
            return self;
        }

        let modifier = self.resolve(requested);
        self.open.push(OpenGroup {
            modifier,
            children: Vec::new(),
        });
        for entry in registry.entries {
            entry(self);
        }

        match self.open.pop() {
            Some(group) if !group.children.is_empty() => self.append(Predicate::Group {
                modifier: group.modifier,
                children: group.children,
            }),
            _ => self,
        }
    }
}

/// Ordered list of sub-predicate callbacks for one group.
pub struct GroupRegistry<'r> {
    entries: Vec<Box<dyn FnOnce(&mut FilterBuilder) + 'r>>,
}

impl<'r> GroupRegistry<'r> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a callback; callbacks run in push order against the same builder.
    pub fn push(&mut self, entry: impl FnOnce(&mut FilterBuilder) + 'r) -> &mut Self {
        self.entries.push(Box::new(entry));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for GroupRegistry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Cursor over one column; applying a test appends the predicate and
/// hands the builder back for chaining.
#[must_use = "a column cursor adds nothing until a test is applied"]
pub struct Column<'f> {
    filter: &'f mut FilterBuilder,
    column: String,
    requested: Modifier,
}

impl<'f> Column<'f> {
    fn new(filter: &'f mut FilterBuilder, column: String, requested: Modifier) -> Self {
        Self {
            filter,
            column,
            requested,
        }
    }

    fn compare(self, op: Comparator, value: Value) -> &'f mut FilterBuilder {
        let Column {
            filter,
            column,
            requested,
        } = self;
        let name = filter.params.allocate(&placeholder_stem(&column), value);
        filter.push_comparison(requested, column, Test::Compare(op, name))
    }

    /// `col NOT <keyword>`; allocates no parameter.
    pub fn not(self, keyword: Keyword) -> &'f mut FilterBuilder {
        self.keyword(Test::Not(keyword))
    }

    /// `col IS <keyword>`; allocates no parameter.
    pub fn is(self, keyword: Keyword) -> &'f mut FilterBuilder {
        self.keyword(Test::Is(keyword))
    }

    fn keyword(self, test: Test) -> &'f mut FilterBuilder {
        let Column {
            filter,
            column,
            requested,
        } = self;
        filter.push_comparison(requested, column, test)
    }

    /// `col IS NULL`
    pub fn is_null(self) -> &'f mut FilterBuilder {
        self.keyword(Test::IsNull)
    }

    /// `col IS NOT NULL`
    pub fn not_null(self) -> &'f mut FilterBuilder {
        self.keyword(Test::NotNull)
    }

    pub fn equal_to(self, value: impl Into<Value>) -> &'f mut FilterBuilder {
        self.compare(Comparator::Equal, value.into())
    }

    pub fn not_equal(self, value: impl Into<Value>) -> &'f mut FilterBuilder {
        self.compare(Comparator::NotEqual, value.into())
    }

    pub fn less_than(self, value: impl Into<Value>) -> &'f mut FilterBuilder {
        self.compare(Comparator::Less, value.into())
    }

    pub fn greater_than(self, value: impl Into<Value>) -> &'f mut FilterBuilder {
        self.compare(Comparator::Greater, value.into())
    }

    pub fn less_or_equal_to(self, value: impl Into<Value>) -> &'f mut FilterBuilder {
        self.compare(Comparator::LessOrEqual, value.into())
    }

    pub fn greater_or_equal_to(self, value: impl Into<Value>) -> &'f mut FilterBuilder {
        self.compare(Comparator::GreaterOrEqual, value.into())
    }

    /// `col LIKE @p`, bound to `%value%`.
    pub fn like(self, value: impl fmt::Display) -> &'f mut FilterBuilder {
        let pattern = format!("%{value}%");
        self.compare(Comparator::Like, Value::Text(pattern))
    }

    /// `col BETWEEN @Min<n> AND @Max<n+1>`
    pub fn between(self, min: impl Into<Value>, max: impl Into<Value>) -> &'f mut FilterBuilder {
        let Column {
            filter,
            column,
            requested,
        } = self;
        let min = filter.params.allocate("Min", min);
        let max = filter.params.allocate("Max", max);
        filter.push_comparison(requested, column, Test::Between { min, max })
    }

    /// `col IN ( @p0, @p1, ... )`; an empty list adds nothing.
    pub fn in_list<I>(self, values: I) -> &'f mut FilterBuilder
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.membership(values, false)
    }

    /// `col NOT IN ( @p0, @p1, ... )`; an empty list adds nothing.
    pub fn not_in<I>(self, values: I) -> &'f mut FilterBuilder
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.membership(values, true)
    }

    fn membership<I>(self, values: I, negated: bool) -> &'f mut FilterBuilder
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let Column {
            filter,
            column,
            requested,
        } = self;
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return filter;
        }
        let stem = placeholder_stem(&column);
        let names = values
            .into_iter()
            .map(|value| filter.params.allocate(&stem, value))
            .collect();
        filter.push_comparison(requested, column, Test::InList { names, negated })
    }
}
