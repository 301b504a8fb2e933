//! # querykit
//!
//! A fluent, parameter-safe SELECT and filter builder with typed row mapping.
//!
//! ## Features
//!
//! - **Parameter safe**: every literal becomes a named placeholder (`@Price0`);
//!   values never reach the statement text
//! - **Nested boolean groups**: `group` / `and_group` / `or_group` with
//!   ordinals unique across the whole statement
//! - **Typed mapping**: rows become entities through `#[derive(Entity)]`
//!   metadata, an explicit field map, or same-name matching
//! - **Outcomes, not panics**: every execution returns [`Outcome`]
//!   (`Success`, `Fail` or `Exception`)
//! - **Safe defaults**: UPDATE and DELETE without a predicate touch no rows
//!
//! ## Example
//!
//! ```ignore
//! use querykit::prelude::*;
//!
//! #[derive(Debug, Default, Entity)]
//! #[orm(table = "TestTable")]
//! struct TestItem {
//!     #[orm(column = "Id")]
//!     id: i32,
//!     #[orm(column = "Name")]
//!     name: Option<String>,
//! }
//!
//! let repo = Repository::connect(&DatabaseConfig::from_env()?).await?;
//!
//! let outcome = repo
//!     .auto_select::<TestItem>()
//!     .where_(|f| {
//!         f.group(|g| {
//!             g.push(|f| {
//!                 f.column("Id").not_null().and("Id").less_or_equal_to(500);
//!             });
//!         })
//!         .or_group(|g| {
//!             g.push(|f| {
//!                 f.column("Name").like("Victor");
//!             });
//!         });
//!     })
//!     .order_by("Id")
//!     .build()?
//!     .get_list()
//!     .await;
//!
//! match outcome {
//!     Outcome::Success(items) => println!("{} items", items.len()),
//!     other => eprintln!("{}", other.message().unwrap_or_default()),
//! }
//! ```

extern crate self as querykit;

pub mod command;
pub mod config;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod filter;
pub mod mapping;
pub mod outcome;
pub mod param;
pub mod prelude;
pub mod projection;
pub mod provider;
pub mod record;
pub mod repository;
pub mod select;
pub mod testing;
pub mod value;

pub use command::{CommandReady, DeleteCommand, InsertCommand, UpdateCommand};
pub use config::{Backend, DATABASE_URL_ENV, DatabaseConfig};
pub use dialect::{BoundStatement, Dialect};
pub use entity::{Entity, EntityDescriptor, FieldDescriptor, FieldSetter};
pub use error::{OrmError, OrmResult};
pub use filter::{Column, FilterBuilder, GroupRegistry, Keyword, Modifier};
pub use mapping::{ColumnSource, ColumnSpec, FieldMap, Resolver};
pub use outcome::{Outcome, OutcomeKind};
pub use param::{ParamList, Placeholder};
pub use projection::{Projection, ProjectionColumn};
pub use provider::{ConnectionProvider, PostgresProvider};
pub use record::Record;
pub use repository::{Repository, TypedRepository};
pub use select::{PreparedQuery, QueryPlan, SelectQuery, ViewBuilder};
pub use value::{FromValue, Value, ValueKind};

#[cfg(feature = "derive")]
pub use querykit_derive::Entity;
