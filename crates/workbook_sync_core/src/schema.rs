use std::collections::BTreeMap;

use crate::change::Fields;
use crate::contract::ValidationError;
use crate::workbook::{CellValues, ColumnRef, TableRef};

/// Table name to table id for one workbook, listed once per invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCatalog {
    ids: BTreeMap<String, String>,
}

impl TableCatalog {
    pub fn from_tables(tables: impl IntoIterator<Item = TableRef>) -> Self {
        let ids = tables
            .into_iter()
            .map(|table| (table.name, table.id))
            .collect();
        Self { ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn table_id(&self, name: &str) -> Result<&str, ValidationError> {
        self.ids
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ValidationError::new(format!("Workbook has no table named '{name}'")))
    }
}

/// Ordered columns of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    table_name: String,
    columns: Vec<ColumnRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedCells {
    pub cells: CellValues,
    /// Field names with no matching column; their values are not written.
    pub unmapped: Vec<String>,
}

impl TableSchema {
    pub fn new(table_name: impl Into<String>, columns: Vec<ColumnRef>) -> Self {
        Self {
            table_name: table_name.into(),
            columns,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn columns(&self) -> &[ColumnRef] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    pub fn column_id(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| column.id.as_str())
    }

    /// Position of a column in query results, which return cells in
    /// column order.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn require_column_index(&self, name: &str) -> Result<usize, ValidationError> {
        self.column_index(name).ok_or_else(|| {
            ValidationError::new(format!(
                "Table '{}' has no column named '{name}'",
                self.table_name
            ))
        })
    }

    /// The export-date column: by convention the table's last column.
    pub fn last_column(&self) -> Result<&ColumnRef, ValidationError> {
        self.columns.last().ok_or_else(|| {
            ValidationError::new(format!("Table '{}' has no columns", self.table_name))
        })
    }

    /// Maps field names to column ids, producing a new cell map.
    pub fn resolve_cells(&self, fields: &Fields) -> ResolvedCells {
        let mut resolved = ResolvedCells::default();
        for (name, value) in fields {
            match self.column_id(name) {
                Some(id) => {
                    resolved.cells.insert(id.to_string(), value.clone());
                }
                None => resolved.unmapped.push(name.clone()),
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customers_schema() -> TableSchema {
        TableSchema::new(
            "Customers",
            vec![
                ColumnRef {
                    id: "col-company".to_string(),
                    name: "Company".to_string(),
                },
                ColumnRef {
                    id: "col-country".to_string(),
                    name: "Country".to_string(),
                },
                ColumnRef {
                    id: "col-status".to_string(),
                    name: "Status".to_string(),
                },
            ],
        )
    }

    #[test]
    fn catalog_resolves_table_ids_by_name() {
        let catalog = TableCatalog::from_tables(vec![
            TableRef {
                id: "t-1".to_string(),
                name: "Customers".to_string(),
            },
            TableRef {
                id: "t-2".to_string(),
                name: "Country".to_string(),
            },
        ]);

        assert_eq!(catalog.table_id("Country").expect("known table"), "t-2");
        let error = catalog.table_id("Status").expect_err("unknown table");
        assert_eq!(error.message(), "Workbook has no table named 'Status'");
    }

    #[test]
    fn resolve_cells_builds_new_map_keyed_by_column_id() {
        let schema = customers_schema();
        let fields = Fields::from([
            ("Company".to_string(), "Acme".to_string()),
            ("Country".to_string(), "row-us".to_string()),
            ("Notes".to_string(), "ignored".to_string()),
        ]);

        let resolved = schema.resolve_cells(&fields);

        assert_eq!(
            resolved.cells,
            CellValues::from([
                ("col-company".to_string(), "Acme".to_string()),
                ("col-country".to_string(), "row-us".to_string()),
            ])
        );
        assert_eq!(resolved.unmapped, vec!["Notes".to_string()]);
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn column_positions_follow_schema_order() {
        let schema = customers_schema();
        assert_eq!(schema.column_index("Status"), Some(2));
        assert_eq!(schema.last_column().expect("has columns").id, "col-status");
        assert!(schema.require_column_index("Missing").is_err());
    }

    #[test]
    fn empty_schema_has_no_last_column() {
        let schema = TableSchema::new("ContactHistory", Vec::new());
        let error = schema.last_column().expect_err("no columns");
        assert_eq!(error.message(), "Table 'ContactHistory' has no columns");
    }
}
