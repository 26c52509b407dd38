//! Row-link lookups for reference tables such as Country and Status.

use std::collections::BTreeMap;

use crate::change::Fields;
use crate::workbook::WorkbookRow;

/// First-column display value to row id of a reference table.
///
/// The first column is assumed to be the table's unique key. When it is not,
/// the last row seen for a value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupMap {
    row_ids: BTreeMap<String, String>,
}

impl LookupMap {
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a WorkbookRow>) -> Self {
        let mut row_ids = BTreeMap::new();
        for row in rows {
            if let Some(value) = row.cell(0) {
                row_ids.insert(value.to_string(), row.row_id.clone());
            }
        }
        Self { row_ids }
    }

    pub fn len(&self) -> usize {
        self.row_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    pub fn row_id(&self, value: &str) -> Option<&str> {
        self.row_ids.get(value).map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.row_ids
    }
}

/// Lookup maps keyed by the field they substitute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupSet {
    by_field: BTreeMap<String, LookupMap>,
}

impl LookupSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, lookup: LookupMap) {
        self.by_field.insert(field.into(), lookup);
    }

    pub fn get(&self, field: &str) -> Option<&LookupMap> {
        self.by_field.get(field)
    }

    /// Returns a copy of `fields` with linked values replaced by row ids.
    /// Values missing from a lookup are kept as they are.
    pub fn apply(&self, fields: &Fields) -> Fields {
        fields
            .iter()
            .map(|(name, value)| {
                let linked = self
                    .by_field
                    .get(name)
                    .and_then(|lookup| lookup.row_id(value))
                    .map(str::to_string)
                    .unwrap_or_else(|| value.clone());
                (name.clone(), linked)
            })
            .collect()
    }
}
