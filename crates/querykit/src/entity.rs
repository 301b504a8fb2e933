//! Per-type column metadata.
//!
//! An [`EntityDescriptor`] lists, once per type, the optional default table
//! and every mappable field with its declared column and a typed setter.
//! `#[derive(Entity)]` builds the descriptor lazily and caches it in a
//! `OnceLock`, so lookups never repeat the work.

use crate::value::{FromValue, Value, ValueKind};
use std::fmt;

/// Setter writing a coerced value into one field.
pub type FieldSetter<T> = fn(&mut T, Value) -> Result<(), String>;

/// One mappable field of an entity.
pub struct FieldDescriptor<T> {
    /// Property name used by explicit maps and by-name matching.
    pub property: &'static str,
    /// Physical column declared with `#[orm(column = "...")]`.
    pub column: Option<&'static str>,
    /// Kind the setter coerces into.
    pub kind: ValueKind,
    pub set: FieldSetter<T>,
}

impl<T> FieldDescriptor<T> {
    /// Descriptor for a field of type `V`; `kind` is taken from `V`.
    pub fn of<V: FromValue>(
        property: &'static str,
        column: Option<&'static str>,
        set: FieldSetter<T>,
    ) -> Self {
        Self {
            property,
            column,
            kind: V::KIND,
            set,
        }
    }

    /// Coerce `value` into this field of `target`.
    pub fn apply(&self, target: &mut T, value: Value) -> Result<(), String> {
        (self.set)(target, value)
    }
}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("property", &self.property)
            .field("column", &self.column)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Column metadata of one entity type.
#[derive(Debug)]
pub struct EntityDescriptor<T> {
    type_name: &'static str,
    table: Option<&'static str>,
    fields: Vec<FieldDescriptor<T>>,
}

impl<T> EntityDescriptor<T> {
    pub fn new(
        type_name: &'static str,
        table: Option<&'static str>,
        fields: Vec<FieldDescriptor<T>>,
    ) -> Self {
        Self {
            type_name,
            table,
            fields,
        }
    }

    /// Rust type name, used in configuration error messages.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Table declared with `#[orm(table = "...")]`.
    pub fn default_table(&self) -> Option<&'static str> {
        self.table
    }

    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    /// Field by property name (exact match).
    pub fn field(&self, property: &str) -> Option<&FieldDescriptor<T>> {
        self.fields.iter().find(|f| f.property == property)
    }

    /// Declared columns in field order.
    pub fn columns(&self) -> Vec<&'static str> {
        self.fields.iter().filter_map(|f| f.column).collect()
    }

    /// True if some field declares exactly `column`.
    pub fn has_column(&self, column: &str) -> bool {
        self.fields.iter().any(|f| f.column == Some(column))
    }
}

/// A type whose rows can be materialized by the mapping resolver.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Debug, Default, Entity)]
/// #[orm(table = "TestTable")]
/// struct TestItem {
///     #[orm(column = "Id")]
///     id: i32,
///     #[orm(column = "Name")]
///     name: Option<String>,
///     #[orm(skip)]
///     cached: Vec<u8>,
/// }
/// ```
pub trait Entity: Default + Sized + 'static {
    fn descriptor() -> &'static EntityDescriptor<Self>;
}
