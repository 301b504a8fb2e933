//! Structured SELECT statement and its rendering.

use crate::dialect::Dialect;
use crate::filter::{Predicate, normalize, render};
use crate::projection::Projection;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub alias: Option<String>,
    pub on: String,
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.keyword(), self.table)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {alias}")?;
        }
        write!(f, " ON {}", self.on)
    }
}

/// FROM clause: a table, an optional alias and any joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub table: String,
    pub alias: Option<String>,
    pub joins: Vec<Join>,
}

impl Source {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: None,
            joins: Vec::new(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FROM {}", self.table)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {alias}")?;
        }
        for join in &self.joins {
            write!(f, " {join}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.descending { "DESC" } else { "ASC" };
        write!(f, "ORDER BY {} {}", self.column, direction)
    }
}

/// Everything one SELECT needs, assembled per invocation.
#[derive(Debug, Clone, Default)]
pub struct QueryPlan {
    pub(crate) projection: Projection,
    pub(crate) source: Option<Source>,
    pub(crate) predicates: Vec<Predicate>,
    pub(crate) order_by: Option<OrderBy>,
    pub(crate) distinct: bool,
    pub(crate) top: Option<u32>,
}

impl QueryPlan {
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    pub fn order_by(&self) -> Option<&OrderBy> {
        self.order_by.as_ref()
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn top(&self) -> Option<u32> {
        self.top
    }

    /// Rendered predicate text: empty or starting with `WHERE`.
    pub fn predicate_text(&self) -> String {
        render(&self.predicates)
    }

    /// Render the statement with named placeholders.
    ///
    /// `TOP(n)` follows `DISTINCT` for [`Dialect::Named`]; PostgreSQL gets a
    /// trailing `LIMIT n` instead.
    pub fn render(&self, dialect: Dialect) -> String {
        let mut parts = vec!["SELECT".to_string()];
        if self.distinct {
            parts.push("DISTINCT".to_string());
        }
        if let (Some(n), Dialect::Named) = (self.top, dialect) {
            parts.push(format!("TOP({n})"));
        }
        parts.push(self.projection.to_string());
        if let Some(source) = &self.source {
            parts.push(source.to_string());
        }
        parts.push(self.predicate_text());
        if let Some(order) = &self.order_by {
            parts.push(order.to_string());
        }
        if let (Some(n), Dialect::Postgres) = (self.top, dialect) {
            parts.push(format!("LIMIT {n}"));
        }
        normalize(&parts.join(" "))
    }
}

/// Collects the joins of a view-style FROM clause.
#[derive(Debug, Default)]
pub struct ViewBuilder {
    joins: Vec<Join>,
}

impl ViewBuilder {
    pub(crate) fn into_joins(self) -> Vec<Join> {
        self.joins
    }

    pub fn join(&mut self, table: &str, alias: Option<&str>) -> JoinOn<'_> {
        self.pending(JoinKind::Inner, table, alias)
    }

    pub fn left_join(&mut self, table: &str, alias: Option<&str>) -> JoinOn<'_> {
        self.pending(JoinKind::Left, table, alias)
    }

    pub fn right_join(&mut self, table: &str, alias: Option<&str>) -> JoinOn<'_> {
        self.pending(JoinKind::Right, table, alias)
    }

    fn pending(&mut self, kind: JoinKind, table: &str, alias: Option<&str>) -> JoinOn<'_> {
        JoinOn {
            view: self,
            kind,
            table: table.trim().to_string(),
            alias: alias
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
        }
    }
}

/// A join waiting for its ON condition.
#[must_use = "a join is only added once `on` is called"]
pub struct JoinOn<'v> {
    view: &'v mut ViewBuilder,
    kind: JoinKind,
    table: String,
    alias: Option<String>,
}

impl<'v> JoinOn<'v> {
    pub fn on(self, condition: &str) -> &'v mut ViewBuilder {
        self.view.joins.push(Join {
            kind: self.kind,
            table: self.table,
            alias: self.alias,
            on: condition.trim().to_string(),
        });
        self.view
    }
}
