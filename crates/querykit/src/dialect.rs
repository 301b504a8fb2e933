//! Statement rendering styles and parameter binding.
//!
//! Builders always produce the canonical form with named `@Name0` markers.
//! [`Dialect::bind`] turns that text plus its [`ParamList`] into a
//! [`BoundStatement`] the provider can execute as is.

use crate::error::{OrmError, OrmResult};
use crate::param::ParamList;
use crate::value::Value;
use serde::Deserialize;
use std::collections::HashMap;

/// Rendering style of placeholders, row limits and generated keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `@Name0` markers, `SELECT TOP(n)`, `OUTPUT Inserted.ID`.
    #[default]
    Named,
    /// `$1` markers, trailing `LIMIT n`, `RETURNING id`.
    Postgres,
}

/// Statement text plus positional values, ready to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    sql: String,
    params: Vec<Value>,
}

impl BoundStatement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

impl Dialect {
    /// Bind canonical `sql` and its parameters for this dialect.
    ///
    /// For [`Dialect::Postgres`], every `@name` known to `params` becomes
    /// `$k`, numbered by first appearance; repeated names reuse their number
    /// and parameters that never appear in the text are not sent. Markers
    /// inside single-quoted literals are left alone.
    pub fn bind(self, sql: &str, params: &ParamList) -> OrmResult<BoundStatement> {
        match self {
            Dialect::Named => Ok(BoundStatement::new(
                sql,
                params.iter().map(|p| p.value().clone()).collect(),
            )),
            Dialect::Postgres => bind_positional(sql, params),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn bind_positional(sql: &str, params: &ParamList) -> OrmResult<BoundStatement> {
    let lookup: HashMap<&str, &Value> = params.iter().map(|p| (p.name(), p.value())).collect();
    if lookup.len() != params.len() {
        return Err(OrmError::configuration(
            "duplicate parameter name in statement",
        ));
    }

    let mut numbers: HashMap<&str, usize> = HashMap::new();
    let mut values = Vec::new();
    let mut out = String::with_capacity(sql.len());
    let mut in_literal = false;
    let mut chars = sql.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if c == '\'' {
            in_literal = !in_literal;
            out.push(c);
            continue;
        }
        if c != '@' || in_literal {
            out.push(c);
            continue;
        }

        let start = idx + 1;
        let mut end = start;
        while let Some(&(next_idx, next)) = chars.peek() {
            if !is_ident_char(next) {
                break;
            }
            end = next_idx + next.len_utf8();
            chars.next();
        }
        let name = &sql[start..end];

        match lookup.get_key_value(name) {
            Some((&key, &value)) => {
                let number = *numbers.entry(key).or_insert_with(|| {
                    values.push(value.clone());
                    values.len()
                });
                out.push('$');
                out.push_str(&number.to_string());
            }
            None => {
                out.push('@');
                out.push_str(name);
            }
        }
    }

    Ok(BoundStatement::new(out, values))
}
