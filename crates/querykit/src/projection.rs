//! Structured SELECT field list.

use std::fmt;

/// One projected column: an expression and an optional alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionColumn {
    expr: String,
    alias: Option<String>,
}

impl ProjectionColumn {
    pub fn new(expr: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            expr: expr.into().trim().to_string(),
            alias: alias
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
        }
    }

    /// Parse a caller field such as `a.Name AS Title`.
    pub fn parse(field: &str) -> Self {
        let field = field.trim();
        let upper = field.to_ascii_uppercase();
        match upper.rfind(" AS ") {
            Some(idx) => Self::new(&field[..idx], Some(field[idx + 4..].to_string())),
            None => Self::new(field, None),
        }
    }

    pub fn expr(&self) -> &str {
        &self.expr
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Name the column carries in the result set: the alias, otherwise the
    /// segment after the last `.` of the expression.
    pub fn output_name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => self.expr.rsplit('.').next().unwrap_or(&self.expr),
        }
    }

    /// True if `column` names this entry by expression or by output name.
    pub fn matches(&self, column: &str) -> bool {
        self.expr == column || self.output_name().eq_ignore_ascii_case(column)
    }
}

impl fmt::Display for ProjectionColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} AS {}", self.expr, alias),
            None => f.write_str(&self.expr),
        }
    }
}

/// Ordered list of projected columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    columns: Vec<ProjectionColumn>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from caller fields; blank entries are ignored.
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns = fields
            .into_iter()
            .filter(|f| !f.as_ref().trim().is_empty())
            .map(|f| ProjectionColumn::parse(f.as_ref()))
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[ProjectionColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.matches(column))
    }

    /// Drop every entry matching `column`; returns whether anything was removed.
    pub fn remove(&mut self, column: &str) -> bool {
        let before = self.columns.len();
        self.columns.retain(|c| !c.matches(column));
        before != self.columns.len()
    }

    /// Rewrite the entry for `column` to `expr`, optionally aliased.
    pub fn rename(&mut self, column: &str, expr: &str, alias: Option<&str>) -> bool {
        let mut changed = false;
        for entry in self.columns.iter_mut().filter(|c| c.matches(column)) {
            *entry = ProjectionColumn::new(expr, alias.map(str::to_string));
            changed = true;
        }
        changed
    }

    /// Replace the whole list.
    pub fn replace<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        *self = Self::from_fields(fields);
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, column) in self.columns.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{column}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        let c = ProjectionColumn::parse("a.Name as Title");
        assert_eq!(c.expr(), "a.Name");
        assert_eq!(c.alias(), Some("Title"));
        assert_eq!(c.output_name(), "Title");
        assert_eq!(ProjectionColumn::parse("a.Name").output_name(), "Name");
    }

    #[test]
    fn renders_in_order() {
        let p = Projection::from_fields(["Id", " Name ", "", "Price AS Cost"]);
        assert_eq!(p.to_string(), "Id, Name, Price AS Cost");
    }

    #[test]
    fn remove_does_not_touch_similar_names() {
        let mut p = Projection::from_fields(["Id", "ProductId", "Name"]);
        assert!(p.remove("Id"));
        assert_eq!(p.to_string(), "ProductId, Name");
        assert!(!p.remove("Missing"));
    }

    #[test]
    fn rename_with_alias() {
        let mut p = Projection::from_fields(["Id", "Name"]);
        assert!(p.rename("Name", "c.Name", Some("Name")));
        assert_eq!(p.to_string(), "Id, c.Name AS Name");
        assert!(p.contains("Name"));
        assert!(p.contains("c.Name"));
    }
}
