//! Named statement parameters and the per-statement ordinal allocator.

use crate::value::Value;

/// One named parameter slot and the value bound to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    name: String,
    value: Value,
}

impl Placeholder {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parameter name without the `@` sigil, e.g. `Price0`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter marker as written in statement text, e.g. `@Price0`.
    pub fn marker(&self) -> String {
        format!("@{}", self.name)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Ordered parameter list of one statement.
///
/// Ordinals handed out by [`ParamList::allocate`] equal the number of
/// parameters already in the list, so they are unique and strictly increasing
/// for the whole statement no matter how deeply the callers nest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamList {
    items: Vec<Placeholder>,
}

impl ParamList {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Ordinal the next allocated parameter will receive.
    pub fn next_ordinal(&self) -> usize {
        self.items.len()
    }

    /// Allocate `<stem><ordinal>` bound to `value` and return its name.
    pub fn allocate(&mut self, stem: &str, value: impl Into<Value>) -> String {
        let name = format!("{}{}", stem, self.next_ordinal());
        self.items.push(Placeholder::new(name.clone(), value));
        name
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Placeholder> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Placeholder] {
        &self.items
    }

    /// Parameter names in allocation order.
    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(Placeholder::name).collect()
    }

    /// Bound values in allocation order.
    pub fn values(&self) -> Vec<&Value> {
        self.items.iter().map(Placeholder::value).collect()
    }

    /// Append another list's parameters.
    pub fn extend(&mut self, other: ParamList) {
        self.items.extend(other.items);
    }

    pub fn into_vec(self) -> Vec<Placeholder> {
        self.items
    }
}

/// Placeholder stem for a column expression: ASCII alphanumerics and `_` only.
///
/// `a.Id` becomes `aId`; an expression with no usable characters becomes `p`.
pub(crate) fn placeholder_stem(column: &str) -> String {
    let stem: String = column
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if stem.is_empty() { "p".to_string() } else { stem }
}
