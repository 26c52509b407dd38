//! Function configuration read from the Lambda environment.
//!
//! Every constructor takes a lookup function so tests can supply values
//! without touching the process environment; `from_env` wires in
//! `std::env::var`.

pub const DEFAULT_WORKBOOK_REGION: &str = "us-west-2";
pub const DEFAULT_CUSTOMER_KEY_COLUMN: &str = "Company";
pub const DEFAULT_CONTACT_HISTORY_CUSTOMER_COLUMN: &str = "Customer";
pub const DEFAULT_EXPORTED_COLUMN: &str = "Exported";
pub const DEFAULT_EXPORT_PAGE_SIZE: usize = 100;
pub const MAX_EXPORT_PAGE_SIZE: usize = 100;

pub const COUNTRY_FIELD: &str = "Country";
pub const STATUS_FIELD: &str = "Status";

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String, String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| format!("{name} must be configured"))
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn or_default(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional(lookup, name).unwrap_or_else(|| default.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookAccess {
    pub workbook_id: String,
    pub region: String,
    /// Role to assume when the workbook lives in another account.
    pub cross_account_role_arn: Option<String>,
}

impl WorkbookAccess {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        Ok(Self {
            workbook_id: required(lookup, "WORKBOOK_ID")?,
            region: or_default(lookup, "WORKBOOK_REGION", DEFAULT_WORKBOOK_REGION),
            cross_account_role_arn: optional(lookup, "CROSS_ACCOUNT_ROLE_ARN")
                .filter(|arn| arn.starts_with("arn:aws")),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerTables {
    pub customers_table: String,
    pub country_table: String,
    pub status_table: String,
    pub key_column: String,
}

impl CustomerTables {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        Ok(Self {
            customers_table: required(lookup, "CUSTOMERS_TABLE_NAME")?,
            country_table: required(lookup, "COUNTRY_TABLE_NAME")?,
            status_table: required(lookup, "STATUS_TABLE_NAME")?,
            key_column: or_default(lookup, "CUSTOMER_KEY_COLUMN", DEFAULT_CUSTOMER_KEY_COLUMN),
        })
    }

    /// Reference tables whose first-column values are replaced by row links,
    /// paired with the customer field they apply to.
    pub fn lookup_tables(&self) -> [(&'static str, &str); 2] {
        [
            (COUNTRY_FIELD, self.country_table.as_str()),
            (STATUS_FIELD, self.status_table.as_str()),
        ]
    }
}

/// Contact-history rows linked to a customer through a name column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactHistoryLink {
    pub table: String,
    pub customer_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamImportConfig {
    pub access: WorkbookAccess,
    pub customers: CustomerTables,
    pub contact_history: Option<ContactHistoryLink>,
}

impl StreamImportConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let contact_history =
            optional(lookup, "CONTACT_HISTORY_TABLE_NAME").map(|table| ContactHistoryLink {
                table,
                customer_column: or_default(
                    lookup,
                    "CONTACT_HISTORY_CUSTOMER_COLUMN",
                    DEFAULT_CONTACT_HISTORY_CUSTOMER_COLUMN,
                ),
            });
        Ok(Self {
            access: WorkbookAccess::from_lookup(lookup)?,
            customers: CustomerTables::from_lookup(lookup)?,
            contact_history,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvImportConfig {
    pub access: WorkbookAccess,
    pub customers: CustomerTables,
    pub bucket: String,
    pub key: String,
}

impl CsvImportConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        Ok(Self {
            access: WorkbookAccess::from_lookup(lookup)?,
            customers: CustomerTables::from_lookup(lookup)?,
            bucket: required(lookup, "IMPORT_BUCKET")?,
            key: required(lookup, "IMPORT_KEY")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportJobConfig {
    pub access: WorkbookAccess,
    pub customers_table: String,
}

impl ImportJobConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        Ok(Self {
            access: WorkbookAccess::from_lookup(lookup)?,
            customers_table: required(lookup, "CUSTOMERS_TABLE_NAME")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub access: WorkbookAccess,
    pub table: String,
    pub exported_column: String,
    pub bucket: String,
    pub prefix: String,
    pub page_size: usize,
}

impl ExportConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let page_size = match optional(lookup, "EXPORT_PAGE_SIZE") {
            None => DEFAULT_EXPORT_PAGE_SIZE,
            Some(raw) => {
                let parsed: usize = raw
                    .parse()
                    .map_err(|_| format!("EXPORT_PAGE_SIZE must be a positive integer, got '{raw}'"))?;
                if parsed == 0 || parsed > MAX_EXPORT_PAGE_SIZE {
                    return Err(format!(
                        "EXPORT_PAGE_SIZE must be between 1 and {MAX_EXPORT_PAGE_SIZE}"
                    ));
                }
                parsed
            }
        };

        Ok(Self {
            access: WorkbookAccess::from_lookup(lookup)?,
            table: required(lookup, "CONTACT_HISTORY_TABLE_NAME")?,
            exported_column: or_default(lookup, "EXPORTED_COLUMN_NAME", DEFAULT_EXPORTED_COLUMN),
            bucket: required(lookup, "EXPORT_BUCKET")?,
            prefix: optional(lookup, "EXPORT_PREFIX").unwrap_or_default(),
            page_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name| values.get(name).cloned()
    }

    fn customer_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("WORKBOOK_ID", "wb-1"),
            ("CUSTOMERS_TABLE_NAME", "Customers"),
            ("COUNTRY_TABLE_NAME", "Country"),
            ("STATUS_TABLE_NAME", "Status"),
        ]
    }

    #[test]
    fn stream_import_applies_defaults() {
        let config = StreamImportConfig::from_lookup(&lookup_from(&customer_env()))
            .expect("config should load");

        assert_eq!(config.access.region, DEFAULT_WORKBOOK_REGION);
        assert_eq!(config.customers.key_column, "Company");
        assert!(config.contact_history.is_none());
        assert!(config.access.cross_account_role_arn.is_none());
    }

    #[test]
    fn stream_import_links_contact_history_when_configured() {
        let mut env = customer_env();
        env.push(("CONTACT_HISTORY_TABLE_NAME", "ContactHistory"));
        let config =
            StreamImportConfig::from_lookup(&lookup_from(&env)).expect("config should load");

        let link = config.contact_history.expect("contact history link");
        assert_eq!(link.table, "ContactHistory");
        assert_eq!(link.customer_column, "Customer");
    }

    #[test]
    fn reports_missing_required_value() {
        let error = StreamImportConfig::from_lookup(&lookup_from(&[("WORKBOOK_ID", "wb-1")]))
            .expect_err("customers table is required");
        assert_eq!(error, "CUSTOMERS_TABLE_NAME must be configured");
    }

    #[test]
    fn blank_values_count_as_missing() {
        let error = ImportJobConfig::from_lookup(&lookup_from(&[
            ("WORKBOOK_ID", "  "),
            ("CUSTOMERS_TABLE_NAME", "Customers"),
        ]))
        .expect_err("blank workbook id");
        assert_eq!(error, "WORKBOOK_ID must be configured");
    }

    #[test]
    fn ignores_placeholder_role_arn() {
        let mut env = customer_env();
        env.push(("CROSS_ACCOUNT_ROLE_ARN", "none"));
        let config =
            StreamImportConfig::from_lookup(&lookup_from(&env)).expect("config should load");
        assert!(config.access.cross_account_role_arn.is_none());

        let mut env = customer_env();
        env.push(("CROSS_ACCOUNT_ROLE_ARN", "arn:aws:iam::123456789012:role/workbook"));
        let config =
            StreamImportConfig::from_lookup(&lookup_from(&env)).expect("config should load");
        assert_eq!(
            config.access.cross_account_role_arn.as_deref(),
            Some("arn:aws:iam::123456789012:role/workbook")
        );
    }

    #[test]
    fn export_validates_page_size() {
        let base = [
            ("WORKBOOK_ID", "wb-1"),
            ("CONTACT_HISTORY_TABLE_NAME", "ContactHistory"),
            ("EXPORT_BUCKET", "exports"),
        ];
        let config = ExportConfig::from_lookup(&lookup_from(&base)).expect("config should load");
        assert_eq!(config.page_size, DEFAULT_EXPORT_PAGE_SIZE);
        assert_eq!(config.exported_column, "Exported");
        assert_eq!(config.prefix, "");

        let mut with_size = base.to_vec();
        with_size.push(("EXPORT_PAGE_SIZE", "0"));
        let error =
            ExportConfig::from_lookup(&lookup_from(&with_size)).expect_err("zero page size");
        assert_eq!(error, "EXPORT_PAGE_SIZE must be between 1 and 100");

        let mut with_size = base.to_vec();
        with_size.push(("EXPORT_PAGE_SIZE", "ten"));
        assert!(ExportConfig::from_lookup(&lookup_from(&with_size)).is_err());
    }
}
