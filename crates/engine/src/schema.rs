//! Grid schema: column definitions, value accessors, grouping configuration.
//!
//! Rows are opaque to the engine; every read goes through a column's value
//! accessor. Field references (grouping, sorting, filtering) are validated
//! against the schema once, at configuration time.

use std::fmt;

use rowgrid_core::value::RowValue;
use rustc_hash::FxHashMap;

use crate::aggregate::AggFunc;

/// Configuration errors, surfaced once at setup and never retried.
#[derive(Debug)]
pub enum GridError {
    /// A sort/group/filter referenced a field with no configured column.
    UnknownField(String),
    /// Two columns were configured with the same field id.
    DuplicateColumn(String),
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField(field) => write!(f, "unknown field: {field}"),
            Self::DuplicateColumn(field) => write!(f, "duplicate column: {field}"),
        }
    }
}

impl std::error::Error for GridError {}

/// One column: a field id, a value accessor, and an optional aggregate.
pub struct Column<R> {
    id: String,
    getter: Box<dyn Fn(&R) -> RowValue>,
    aggregate: Option<AggFunc>,
}

impl<R> Column<R> {
    pub fn new(id: impl Into<String>, getter: impl Fn(&R) -> RowValue + 'static) -> Self {
        Self { id: id.into(), getter: Box::new(getter), aggregate: None }
    }

    pub fn with_aggregate(mut self, func: AggFunc) -> Self {
        self.aggregate = Some(func);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read this column's value from a row.
    pub fn value(&self, row: &R) -> RowValue {
        (self.getter)(row)
    }

    pub fn aggregate(&self) -> Option<&AggFunc> {
        self.aggregate.as_ref()
    }
}

impl<R> fmt::Debug for Column<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("id", &self.id)
            .field("aggregate", &self.aggregate)
            .finish_non_exhaustive()
    }
}

/// Column set plus grouping configuration.
pub struct GridSchema<R> {
    columns: Vec<Column<R>>,
    by_id: FxHashMap<String, usize>,
    group_fields: Vec<String>,
    group_default_expanded: bool,
}

impl<R> GridSchema<R> {
    pub fn new(columns: Vec<Column<R>>) -> Result<Self, GridError> {
        let mut by_id = FxHashMap::default();
        for (index, column) in columns.iter().enumerate() {
            if by_id.insert(column.id.clone(), index).is_some() {
                return Err(GridError::DuplicateColumn(column.id.clone()));
            }
        }
        Ok(Self { columns, by_id, group_fields: Vec::new(), group_default_expanded: false })
    }

    /// Group rows by these fields, outermost first.
    pub fn with_group_by(mut self, fields: &[&str]) -> Result<Self, GridError> {
        self.set_group_fields(fields.iter().map(|f| f.to_string()).collect())?;
        Ok(self)
    }

    /// Whether new groups start expanded.
    pub fn with_groups_expanded(mut self, expanded: bool) -> Self {
        self.group_default_expanded = expanded;
        self
    }

    pub fn set_group_fields(&mut self, fields: Vec<String>) -> Result<(), GridError> {
        for field in &fields {
            if !self.by_id.contains_key(field) {
                return Err(GridError::UnknownField(field.clone()));
            }
        }
        self.group_fields = fields;
        Ok(())
    }

    pub fn column(&self, field: &str) -> Option<&Column<R>> {
        self.by_id.get(field).map(|&index| &self.columns[index])
    }

    pub fn require_column(&self, field: &str) -> Result<&Column<R>, GridError> {
        self.column(field).ok_or_else(|| GridError::UnknownField(field.to_string()))
    }

    pub fn columns(&self) -> &[Column<R>] {
        &self.columns
    }

    pub fn group_fields(&self) -> &[String] {
        &self.group_fields
    }

    pub fn grouping_enabled(&self) -> bool {
        !self.group_fields.is_empty()
    }

    pub fn group_default_expanded(&self) -> bool {
        self.group_default_expanded
    }

    pub fn aggregated_columns(&self) -> impl Iterator<Item = &Column<R>> {
        self.columns.iter().filter(|c| c.aggregate.is_some())
    }

    pub fn is_aggregated(&self, field: &str) -> bool {
        self.column(field).map_or(false, |c| c.aggregate.is_some())
    }
}

impl<R> fmt::Debug for GridSchema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridSchema")
            .field("columns", &self.columns)
            .field("group_fields", &self.group_fields)
            .field("group_default_expanded", &self.group_default_expanded)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        name: &'static str,
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = GridSchema::new(vec![
            Column::new("name", |r: &Row| r.name.into()),
            Column::new("name", |r: &Row| r.name.into()),
        ]);
        assert!(matches!(result, Err(GridError::DuplicateColumn(f)) if f == "name"));
    }

    #[test]
    fn test_unknown_group_field_rejected() {
        let schema = GridSchema::new(vec![Column::new("name", |r: &Row| r.name.into())]).unwrap();
        let result = schema.with_group_by(&["missing"]);
        assert!(matches!(result, Err(GridError::UnknownField(f)) if f == "missing"));
    }

    #[test]
    fn test_column_lookup_and_value() {
        let schema = GridSchema::new(vec![Column::new("name", |r: &Row| r.name.into())]).unwrap();
        let column = schema.require_column("name").unwrap();
        assert_eq!(column.value(&Row { name: "Ann" }), RowValue::Text("Ann".into()));
        assert!(schema.require_column("other").is_err());
    }
}
