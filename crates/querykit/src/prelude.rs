//! Convenient imports for typical `querykit` usage.
//!
//! ```ignore
//! use querykit::prelude::*;
//! ```

pub use crate::{
    ConnectionProvider, DatabaseConfig, Entity, FieldMap, FilterBuilder, Keyword, OrmError,
    OrmResult, Outcome, Repository, TypedRepository, Value,
};
