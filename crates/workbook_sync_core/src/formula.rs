//! Filter formula builder for workbook row queries.
//!
//! Values never become part of the condition text. Every comparison uses a
//! `%` placeholder and the value is appended as a quoted formula argument, so
//! a company called `Acme" OR 1=1` is still matched literally.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Every row of the table.
    All,
    /// `column = value`
    Equals { column: String, value: String },
    /// `column = v1 OR column = v2 ...`, with at least one value.
    AnyOf { column: String, values: Vec<String> },
}

impl Predicate {
    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equals {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Blank cells compare equal to the empty string.
    pub fn is_blank(column: impl Into<String>) -> Self {
        Self::equals(column, "")
    }

    /// Builds an OR of equalities, dropping duplicate values while keeping
    /// first-seen order. `None` when there are no values to match.
    pub fn any_of<I, S>(column: impl Into<String>, values: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for value in values {
            let value = value.into();
            if !unique.contains(&value) {
                unique.push(value);
            }
        }
        if unique.is_empty() {
            return None;
        }
        Some(Self::AnyOf {
            column: column.into(),
            values: unique,
        })
    }
}

/// Renders `=FILTER(table, "condition", args...)`.
pub fn filter_formula(table: &str, predicate: &Predicate) -> String {
    let mut formula = format!("=FILTER({table}");
    match predicate {
        Predicate::All => {}
        Predicate::Equals { column, value } => {
            let condition = comparison(table, column);
            formula.push_str(&format!(", {}, {}", quote(&condition), quote(value)));
        }
        Predicate::AnyOf { column, values } => {
            let condition = vec![comparison(table, column); values.len()].join(" OR ");
            formula.push_str(&format!(", {}", quote(&condition)));
            for value in values {
                formula.push_str(&format!(", {}", quote(value)));
            }
        }
    }
    formula.push(')');
    formula
}

fn comparison(table: &str, column: &str) -> String {
    format!("{table}[{column}] = %")
}

/// Formula string literal: wrapped in double quotes, inner quotes doubled.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
