//! Derive macros for querykit
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity;

/// Derive the `Entity` column metadata for a struct.
///
/// # Example
///
/// ```ignore
/// use querykit::Entity;
///
/// #[derive(Debug, Default, Entity)]
/// #[orm(table = "TestTable")]
/// struct TestItem {
///     #[orm(column = "Id")]
///     id: i32,
///     #[orm(column = "Name")]
///     name: Option<String>,
///     #[orm(name = "Nick")]
///     nickname: String,
///     #[orm(skip)]
///     cache: Vec<u8>,
/// }
/// ```
///
/// # Generated
///
/// - `impl Entity`, returning a descriptor built once and cached in a `OnceLock`
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Default table of the type (optional)
/// - `#[orm(column = "name")]` - Declare the physical column of a field
/// - `#[orm(name = "name")]` - Property name used by field maps and by-name matching
/// - `#[orm(skip)]` - Leave the field out of mapping entirely
///
/// Every mapped field type must implement `querykit::FromValue`, and the
/// struct must implement `Default`.
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
