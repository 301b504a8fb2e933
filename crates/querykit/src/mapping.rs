//! Field mapping: which result column feeds which entity property.
//!
//! For every property the resolver walks a fixed priority chain:
//!
//! 1. the explicit [`FieldMap`] of the query, when it names the property;
//! 2. the column declared in the entity metadata, when that column is part of
//!    the active projection;
//! 3. a same-name column of the result set, when by-name matching is enabled;
//! 4. otherwise the property keeps its default value.
//!
//! Rows where no property resolves are dropped.

use crate::entity::{Entity, EntityDescriptor};
use crate::error::{OrmError, OrmResult};
use crate::projection::{Projection, ProjectionColumn};
use crate::record::Record;
use std::marker::PhantomData;

/// Ordered property → column pairs supplied for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    pairs: Vec<(String, String)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `property` to `column`. Re-mapping a property keeps its position.
    pub fn insert(&mut self, property: impl Into<String>, column: impl Into<String>) -> &mut Self {
        let property = property.into();
        let column = column.into();
        match self.pairs.iter_mut().find(|(p, _)| *p == property) {
            Some(pair) => pair.1 = column,
            None => self.pairs.push((property, column)),
        }
        self
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(p, _)| p == property)
            .map(|(_, c)| c.as_str())
    }

    /// Mapped columns in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(_, c)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<P: Into<String>, C: Into<String>> FromIterator<(P, C)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (property, column) in iter {
            map.insert(property, column);
        }
        map
    }
}

/// Where a resolved column came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
    ExplicitMap,
    Attribute,
    PropertyNameMatch,
}

/// One resolved property: the result-set column it reads and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub property: &'static str,
    /// Column name looked up in the result set.
    pub column: String,
    pub source: ColumnSource,
    /// Missing columns are skipped instead of failing the row.
    optional: bool,
}

/// Per-query resolver for entity `T`.
#[derive(Debug, Clone)]
pub struct Resolver<T: Entity> {
    projection: Projection,
    map: Option<FieldMap>,
    by_name: bool,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Resolver<T> {
    pub fn new(projection: Projection, map: Option<FieldMap>, by_name: bool) -> Self {
        Self {
            projection,
            map,
            by_name,
            _entity: PhantomData,
        }
    }

    fn descriptor(&self) -> &'static EntityDescriptor<T> {
        T::descriptor()
    }

    /// Result-set name of a metadata column if the projection selects it.
    fn projected(&self, column: &str) -> Option<(String, bool)> {
        if let Some(entry) = self.projection.columns().iter().find(|c| c.matches(column)) {
            return Some((entry.output_name().to_string(), false));
        }
        let wildcard = self
            .projection
            .columns()
            .iter()
            .any(|c| c.alias().is_none() && (c.expr() == "*" || c.expr().ends_with(".*")));
        wildcard.then(|| (column.to_string(), true))
    }

    /// Resolve every property of `T` against one row.
    pub fn resolve(&self, record: &Record) -> Vec<ColumnSpec> {
        let mut specs = Vec::new();
        for field in self.descriptor().fields() {
            if let Some(column) = self.map.as_ref().and_then(|m| m.get(field.property)) {
                specs.push(ColumnSpec {
                    property: field.property,
                    column: ProjectionColumn::parse(column).output_name().to_string(),
                    source: ColumnSource::ExplicitMap,
                    optional: false,
                });
                continue;
            }

            if let Some((column, optional)) = field.column.and_then(|c| self.projected(c)) {
                if !optional || record.has_column(&column) {
                    specs.push(ColumnSpec {
                        property: field.property,
                        column,
                        source: ColumnSource::Attribute,
                        optional,
                    });
                    continue;
                }
            }

            if self.by_name && record.has_column(field.property) {
                specs.push(ColumnSpec {
                    property: field.property,
                    column: field.property.to_string(),
                    source: ColumnSource::PropertyNameMatch,
                    optional: true,
                });
            }
        }
        specs
    }

    /// Build an entity from one row; `None` when no property resolved.
    pub fn materialize(&self, record: &Record) -> OrmResult<Option<T>> {
        let specs = self.resolve(record);
        if specs.is_empty() {
            tracing::debug!(
                target: "querykit.sql",
                entity = self.descriptor().type_name(),
                columns = ?record.columns(),
                "row dropped: no property resolved"
            );
            return Ok(None);
        }

        let mut item = T::default();
        for spec in specs {
            let Some(field) = self.descriptor().field(spec.property) else {
                continue;
            };
            let value = match record.get(&spec.column) {
                Some(value) => value.clone(),
                None if spec.optional => continue,
                None => {
                    return Err(OrmError::decode(
                        spec.column,
                        "column not present in result set",
                    ));
                }
            };
            field
                .apply(&mut item, value)
                .map_err(|message| OrmError::decode(&spec.column, message))?;
        }
        Ok(Some(item))
    }

    /// Materialize every row, keeping only rows with at least one resolved property.
    pub fn materialize_all(&self, records: &[Record]) -> OrmResult<Vec<T>> {
        let mut items = Vec::with_capacity(records.len());
        for record in records {
            if let Some(item) = self.materialize(record)? {
                items.push(item);
            }
        }
        Ok(items)
    }
}
