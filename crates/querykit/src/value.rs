//! Dynamic values used for statement parameters and result cells.
//!
//! Filter builders accept anything convertible into [`Value`], the mapping
//! resolver hands cells to [`FromValue`] implementations, and `Value`
//! implements [`ToSql`] so the same list can be bound to tokio-postgres.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use uuid::Uuid;

/// A single parameter or cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

/// The declared kind of a destination field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Decimal,
    Text,
    Date,
    Timestamp,
    TimestampTz,
    Uuid,
    Json,
    Bytes,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the inner string of a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    fn type_label(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamptz",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
            Value::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Date(v) => write!(f, "{v}"),
            Value::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
            Value::TimestampTz(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Uuid(v) => write!(f, "{v}"),
            Value::Json(v) => write!(f, "{v}"),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

// ========== conversions into Value ==========

macro_rules! value_from {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

value_from! {
    bool => |v| Value::Bool(v),
    i16 => |v| Value::Int(i64::from(v)),
    i32 => |v| Value::Int(i64::from(v)),
    i64 => |v| Value::Int(v),
    u32 => |v| Value::Int(i64::from(v)),
    f32 => |v| Value::Float(f64::from(v)),
    f64 => |v| Value::Float(v),
    Decimal => |v| Value::Decimal(v),
    &str => |v| Value::Text(v.to_string()),
    String => |v| Value::Text(v),
    &String => |v| Value::Text(v.clone()),
    NaiveDate => |v| Value::Date(v),
    NaiveDateTime => |v| Value::Timestamp(v),
    DateTime<Utc> => |v| Value::TimestampTz(v),
    Uuid => |v| Value::Uuid(v),
    serde_json::Value => |v| Value::Json(v),
    Vec<u8> => |v| Value::Bytes(v),
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

// ========== conversions out of Value ==========

/// Typed extraction of a destination field from a [`Value`].
///
/// `Value::Null` always converts into the destination's default value
/// (`None` for `Option<T>`). A value that cannot be coerced yields an error
/// message; the mapping resolver attaches the column name to it.
pub trait FromValue: Sized {
    /// Kind recorded in the entity descriptor.
    const KIND: ValueKind;

    fn from_value(value: Value) -> Result<Self, String>;
}

fn mismatch(value: &Value, target: &str) -> String {
    format!("cannot convert {} value `{}` into {}", value.type_label(), value, target)
}

impl FromValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(v) => Ok(v),
            Value::Int(v) => Ok(v != 0),
            Value::Text(ref s) => parse_bool(s),
            other => Err(mismatch(&other, "bool")),
        }
    }
}

/// `-2^63..2^63`: every float in this range truncates into an `i64` exactly.
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

impl FromValue for i64 {
    const KIND: ValueKind = ValueKind::Int;

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(0),
            Value::Int(v) => Ok(v),
            Value::Bool(v) => Ok(i64::from(v)),
            Value::Float(v) if v.fract() == 0.0 && (I64_LOWER..I64_UPPER).contains(&v) => {
                Ok(v as i64)
            }
            Value::Decimal(v) if v.fract().is_zero() => {
                v.to_i64().ok_or_else(|| mismatch(&value, "i64"))
            }
            Value::Text(ref s) => s.trim().parse().map_err(|_| mismatch(&value, "i64")),
            other => Err(mismatch(&other, "i64")),
        }
    }
}

macro_rules! narrow_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                const KIND: ValueKind = ValueKind::Int;

                fn from_value(value: Value) -> Result<Self, String> {
                    let label = value.to_string();
                    let wide = i64::from_value(value)?;
                    <$ty>::try_from(wide).map_err(|_| {
                        format!("value `{}` out of range for {}", label, stringify!($ty))
                    })
                }
            }
        )*
    };
}

narrow_int!(i16, i32, u32);

impl FromValue for f64 {
    const KIND: ValueKind = ValueKind::Float;

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(0.0),
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            Value::Decimal(v) => v.to_f64().ok_or_else(|| mismatch(&value, "f64")),
            Value::Text(ref s) => s.trim().parse().map_err(|_| mismatch(&value, "f64")),
            other => Err(mismatch(&other, "f64")),
        }
    }
}

impl FromValue for f32 {
    const KIND: ValueKind = ValueKind::Float;

    fn from_value(value: Value) -> Result<Self, String> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl FromValue for Decimal {
    const KIND: ValueKind = ValueKind::Decimal;

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(Decimal::ZERO),
            Value::Decimal(v) => Ok(v),
            Value::Int(v) => Ok(Decimal::from(v)),
            Value::Float(v) => Decimal::try_from(v).map_err(|_| mismatch(&value, "Decimal")),
            Value::Text(ref s) => parse_decimal(s),
            other => Err(mismatch(&other, "Decimal")),
        }
    }
}

impl FromValue for String {
    const KIND: ValueKind = ValueKind::Text;

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Text(v) => Ok(v),
            other @ Value::Bytes(_) => Err(mismatch(&other, "String")),
            other => Ok(other.to_string()),
        }
    }
}

impl FromValue for NaiveDateTime {
    const KIND: ValueKind = ValueKind::Timestamp;

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(NaiveDateTime::default()),
            Value::Timestamp(v) => Ok(v),
            Value::TimestampTz(v) => Ok(v.naive_utc()),
            Value::Date(v) => Ok(v.and_time(NaiveTime::MIN)),
            Value::Text(ref s) => parse_naive_datetime(s),
            other => Err(mismatch(&other, "NaiveDateTime")),
        }
    }
}

impl FromValue for DateTime<Utc> {
    const KIND: ValueKind = ValueKind::TimestampTz;

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(DateTime::<Utc>::default()),
            Value::TimestampTz(v) => Ok(v),
            Value::Timestamp(v) => Ok(v.and_utc()),
            Value::Date(v) => Ok(v.and_time(NaiveTime::MIN).and_utc()),
            Value::Text(ref s) => parse_datetime_utc(s),
            other => Err(mismatch(&other, "DateTime<Utc>")),
        }
    }
}

impl FromValue for NaiveDate {
    const KIND: ValueKind = ValueKind::Date;

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(NaiveDate::default()),
            Value::Date(v) => Ok(v),
            Value::Timestamp(v) => Ok(v.date()),
            Value::TimestampTz(v) => Ok(v.date_naive()),
            Value::Text(ref s) => parse_date(s),
            other => Err(mismatch(&other, "NaiveDate")),
        }
    }
}

impl FromValue for Uuid {
    const KIND: ValueKind = ValueKind::Uuid;

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(Uuid::nil()),
            Value::Uuid(v) => Ok(v),
            Value::Text(ref s) => Uuid::parse_str(s.trim()).map_err(|e| e.to_string()),
            other => Err(mismatch(&other, "Uuid")),
        }
    }
}

impl FromValue for serde_json::Value {
    const KIND: ValueKind = ValueKind::Json;

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(serde_json::Value::Null),
            Value::Json(v) => Ok(v),
            Value::Text(ref s) => serde_json::from_str(s).map_err(|e| e.to_string()),
            Value::Bool(v) => Ok(serde_json::Value::Bool(v)),
            Value::Int(v) => Ok(serde_json::Value::from(v)),
            other => Err(mismatch(&other, "serde_json::Value")),
        }
    }
}

impl FromValue for Vec<u8> {
    const KIND: ValueKind = ValueKind::Bytes;

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Bytes(v) => Ok(v),
            Value::Text(v) => Ok(v.into_bytes()),
            other => Err(mismatch(&other, "Vec<u8>")),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

// ========== text parsing shared by FromValue and ToSql ==========

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Ok(true),
        "false" | "f" | "0" | "no" => Ok(false),
        other => Err(format!("cannot convert text `{other}` into bool")),
    }
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

fn parse_naive_datetime(s: &str) -> Result<NaiveDateTime, String> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| parse_date(s).ok().map(|d| d.and_time(NaiveTime::MIN)))
        .ok_or_else(|| format!("cannot convert text `{s}` into a timestamp"))
}

fn parse_datetime_utc(s: &str) -> Result<DateTime<Utc>, String> {
    match DateTime::parse_from_rfc3339(s.trim()) {
        Ok(v) => Ok(v.with_timezone(&Utc)),
        Err(_) => parse_naive_datetime(s).map(|v| v.and_utc()),
    }
}

fn parse_decimal(s: &str) -> Result<Decimal, String> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map_err(|_| format!("cannot convert text `{s}` into a decimal"))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("cannot convert text `{}` into a date", s.trim()))
}

// ========== binding ==========

type BoxError = Box<dyn Error + Sync + Send>;

fn is_text_type(ty: &Type) -> bool {
    *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
}

/// Bind text against the type Postgres inferred for the placeholder, so a
/// literal like `"500"` works against an integer column.
fn text_to_sql(text: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if *ty == Type::BOOL {
        parse_bool(text)?.to_sql(ty, out)
    } else if *ty == Type::INT2 {
        text.trim().parse::<i16>()?.to_sql(ty, out)
    } else if *ty == Type::INT4 {
        text.trim().parse::<i32>()?.to_sql(ty, out)
    } else if *ty == Type::INT8 {
        text.trim().parse::<i64>()?.to_sql(ty, out)
    } else if *ty == Type::FLOAT4 {
        text.trim().parse::<f32>()?.to_sql(ty, out)
    } else if *ty == Type::FLOAT8 {
        text.trim().parse::<f64>()?.to_sql(ty, out)
    } else if *ty == Type::NUMERIC {
        parse_decimal(text)?.to_sql(ty, out)
    } else if *ty == Type::UUID {
        Uuid::parse_str(text.trim())?.to_sql(ty, out)
    } else if *ty == Type::DATE {
        parse_date(text)?.to_sql(ty, out)
    } else if *ty == Type::TIMESTAMP {
        parse_naive_datetime(text)?.to_sql(ty, out)
    } else if *ty == Type::TIMESTAMPTZ {
        parse_datetime_utc(text)?.to_sql(ty, out)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        serde_json::from_str::<serde_json::Value>(text)?.to_sql(ty, out)
    } else {
        ToSql::to_sql(&text, ty, out)
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::Int(v) => {
                if *ty == Type::INT2 {
                    i16::try_from(*v)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*v)?.to_sql(ty, out)
                } else if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    (*v as f64).to_sql(ty, out)
                } else if *ty == Type::NUMERIC {
                    Decimal::from(*v).to_sql(ty, out)
                } else if is_text_type(ty) {
                    v.to_string().to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::Float(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else if *ty == Type::NUMERIC {
                    Decimal::try_from(*v)?.to_sql(ty, out)
                } else if is_text_type(ty) {
                    v.to_string().to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::Decimal(v) => {
                if *ty == Type::FLOAT8 {
                    v.to_f64()
                        .ok_or("decimal out of range for float8")?
                        .to_sql(ty, out)
                } else if is_text_type(ty) {
                    v.to_string().to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::Text(v) => text_to_sql(v, ty, out),
            Value::Date(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => {
                if *ty == Type::TIMESTAMPTZ {
                    v.and_utc().to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::TimestampTz(v) => {
                if *ty == Type::TIMESTAMP {
                    v.naive_utc().to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Json(v) => v.to_sql(ty, out),
            Value::Bytes(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_converts_to_defaults() {
        assert_eq!(i64::from_value(Value::Null), Ok(0));
        assert_eq!(String::from_value(Value::Null), Ok(String::new()));
        assert_eq!(Option::<String>::from_value(Value::Null), Ok(None));
        assert_eq!(
            NaiveDateTime::from_value(Value::Null),
            Ok(NaiveDateTime::default())
        );
    }

    #[test]
    fn text_coerces_into_numbers() {
        assert_eq!(i32::from_value(Value::from("42")), Ok(42));
        assert_eq!(f64::from_value(Value::from("1.5")), Ok(1.5));
        assert!(i32::from_value(Value::from("abc")).is_err());
    }

    #[test]
    fn narrow_ints_reject_out_of_range() {
        let err = i16::from_value(Value::Int(100_000)).unwrap_err();
        assert!(err.contains("out of range"));
    }

    #[test]
    fn timestamps_parse_from_text() {
        let ts = NaiveDateTime::from_value(Value::from("2023-01-02 00:00:00")).unwrap();
        assert_eq!(ts.format("%Y-%m-%d").to_string(), "2023-01-02");
    }

    #[test]
    fn option_from_value_wraps_some() {
        assert_eq!(Option::<i64>::from_value(Value::Int(7)), Ok(Some(7)));
        assert_eq!(<Option<i64> as FromValue>::KIND, ValueKind::Int);
    }

    #[test]
    fn option_into_value() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }

    #[test]
    fn text_binds_against_integer_columns() {
        let mut buf = BytesMut::new();
        let res = Value::from("500").to_sql(&Type::INT4, &mut buf).unwrap();
        assert!(matches!(res, IsNull::No));
        assert_eq!(&buf[..], &500i32.to_be_bytes());
    }

    #[test]
    fn whole_floats_outside_i64_are_rejected() {
        assert_eq!(i64::from_value(Value::Float(42.0)), Ok(42));
        assert_eq!(i64::from_value(Value::Float(-9.223372036854775808e18)), Ok(i64::MIN));
        assert!(i64::from_value(Value::Float(9.223372036854775808e18)).is_err());
        assert!(i64::from_value(Value::Float(1e300)).is_err());
        assert!(i64::from_value(Value::Float(f64::INFINITY)).is_err());
        assert!(i32::from_value(Value::Float(-1e19)).is_err());
    }

    #[test]
    fn decimals_coerce_both_ways() {
        let price = Decimal::from_str("19.99").unwrap();
        assert_eq!(Decimal::from_value(Value::from("19.99")), Ok(price));
        assert_eq!(Decimal::from_value(Value::Int(500)), Ok(Decimal::from(500)));
        assert_eq!(Decimal::from_value(Value::Null), Ok(Decimal::ZERO));
        assert!(Decimal::from_value(Value::from("abc")).is_err());

        assert_eq!(f64::from_value(Value::Decimal(Decimal::new(25, 1))), Ok(2.5));
        assert_eq!(i64::from_value(Value::Decimal(Decimal::from(7))), Ok(7));
        assert!(i64::from_value(Value::Decimal(price)).is_err());
        assert_eq!(String::from_value(Value::Decimal(price)), Ok("19.99".to_string()));
        assert_eq!(<Decimal as FromValue>::KIND, ValueKind::Decimal);
    }

    #[test]
    fn numeric_placeholders_bind_as_decimal() {
        let expected = |d: Decimal| {
            let mut buf = BytesMut::new();
            d.to_sql(&Type::NUMERIC, &mut buf).unwrap();
            buf
        };

        let mut buf = BytesMut::new();
        Value::from("500").to_sql(&Type::NUMERIC, &mut buf).unwrap();
        assert_eq!(buf, expected(Decimal::from(500)));

        let mut buf = BytesMut::new();
        Value::Int(500).to_sql(&Type::NUMERIC, &mut buf).unwrap();
        assert_eq!(buf, expected(Decimal::from(500)));

        let mut buf = BytesMut::new();
        Value::Float(2.5).to_sql(&Type::NUMERIC, &mut buf).unwrap();
        assert_eq!(buf, expected(Decimal::try_from(2.5).unwrap()));

        let mut buf = BytesMut::new();
        assert!(Value::from("abc").to_sql(&Type::NUMERIC, &mut buf).is_err());
    }

    #[test]
    fn null_binds_as_sql_null() {
        let mut buf = BytesMut::new();
        let res = Value::Null.to_sql(&Type::TEXT, &mut buf).unwrap();
        assert!(matches!(res, IsNull::Yes));
        assert!(buf.is_empty());
    }
}
