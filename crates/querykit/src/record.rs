//! Result rows as provider-independent records.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type};
use uuid::Uuid;

/// One result row: the column names of its result set plus one value per column.
///
/// Records from the same result set share their column list.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Record {
    /// Build a record; `values` is truncated or padded with NULL to the column count.
    pub fn new(columns: Arc<[String]>, mut values: Vec<Value>) -> Self {
        values.resize(columns.len(), Value::Null);
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Position of `column`, matched exactly first and then ASCII case-insensitively.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .or_else(|| {
                self.columns
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(column))
            })
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    /// Borrow the value of `column`.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.position(column).map(|idx| &self.values[idx])
    }

    /// Take a copy of the value of `column`, failing if the result set lacks it.
    pub fn try_get(&self, column: &str) -> OrmResult<Value> {
        self.get(column)
            .cloned()
            .ok_or_else(|| OrmError::decode(column, "column not present in result set"))
    }

    /// Convert every row of a tokio-postgres result set.
    pub fn from_pg_rows(rows: &[Row]) -> OrmResult<Vec<Record>> {
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let columns: Arc<[String]> = first
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        rows.iter()
            .map(|row| {
                let values = (0..row.len())
                    .map(|idx| pg_cell(row, idx))
                    .collect::<OrmResult<Vec<_>>>()?;
                Ok(Record::new(Arc::clone(&columns), values))
            })
            .collect()
    }
}

fn pg_get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize) -> OrmResult<Option<T>> {
    row.try_get::<_, Option<T>>(idx)
        .map_err(|e| OrmError::decode(row.columns()[idx].name(), e.to_string()))
}

/// Decode one cell by the column's Postgres type.
fn pg_cell(row: &Row, idx: usize) -> OrmResult<Value> {
    let ty = row.columns()[idx].type_().clone();

    let value = if ty == Type::BOOL {
        pg_get::<bool>(row, idx)?.map(Value::Bool)
    } else if ty == Type::INT2 {
        pg_get::<i16>(row, idx)?.map(Value::from)
    } else if ty == Type::INT4 {
        pg_get::<i32>(row, idx)?.map(Value::from)
    } else if ty == Type::INT8 {
        pg_get::<i64>(row, idx)?.map(Value::Int)
    } else if ty == Type::FLOAT4 {
        pg_get::<f32>(row, idx)?.map(Value::from)
    } else if ty == Type::FLOAT8 {
        pg_get::<f64>(row, idx)?.map(Value::Float)
    } else if ty == Type::NUMERIC {
        pg_get::<Decimal>(row, idx)?.map(Value::Decimal)
    } else if ty == Type::TEXT
        || ty == Type::VARCHAR
        || ty == Type::BPCHAR
        || ty == Type::NAME
        || ty == Type::UNKNOWN
    {
        pg_get::<String>(row, idx)?.map(Value::Text)
    } else if ty == Type::DATE {
        pg_get::<NaiveDate>(row, idx)?.map(Value::Date)
    } else if ty == Type::TIMESTAMP {
        pg_get::<NaiveDateTime>(row, idx)?.map(Value::Timestamp)
    } else if ty == Type::TIMESTAMPTZ {
        pg_get::<DateTime<Utc>>(row, idx)?.map(Value::TimestampTz)
    } else if ty == Type::UUID {
        pg_get::<Uuid>(row, idx)?.map(Value::Uuid)
    } else if ty == Type::JSON || ty == Type::JSONB {
        pg_get::<serde_json::Value>(row, idx)?.map(Value::Json)
    } else if ty == Type::BYTEA {
        pg_get::<Vec<u8>>(row, idx)?.map(Value::Bytes)
    } else {
        return Err(OrmError::decode(
            row.columns()[idx].name(),
            format!("unsupported column type `{}`", ty.name()),
        ));
    };

    Ok(value.unwrap_or(Value::Null))
}
