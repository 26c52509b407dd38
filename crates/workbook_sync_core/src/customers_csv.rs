use crate::change::Fields;
use crate::contract::ValidationError;

/// One customer row read from an import file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    pub natural_key: String,
    pub fields: Fields,
}

/// Parses a headed CSV document into customer records keyed by
/// `key_column`.
pub fn parse_customers(body: &[u8], key_column: &str) -> Result<Vec<CustomerRecord>, ValidationError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(body);

    let headers = reader
        .headers()
        .map_err(|error| ValidationError::new(format!("Malformed CSV header: {error}")))?
        .clone();
    let Some(key_index) = headers.iter().position(|name| name == key_column) else {
        return Err(ValidationError::new(format!(
            "CSV header has no '{key_column}' column"
        )));
    };

    let mut records = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let row = result.map_err(|error| {
            ValidationError::new(format!("Malformed CSV row {}: {error}", line + 1))
        })?;
        let natural_key = row.get(key_index).unwrap_or_default().to_string();
        let fields = headers
            .iter()
            .zip(row.iter())
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        records.push(CustomerRecord {
            natural_key,
            fields,
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_keyed_by_company() {
        let body = b"Company, Country,Status\nAcme,US,Active\nGlobex,CA,Prospect\n";

        let records = parse_customers(body, "Company").expect("csv should parse");

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].natural_key, "Globex");
        assert_eq!(records[1].fields["Country"], "CA");
        assert_eq!(records[0].fields["Status"], "Active");
    }

    #[test]
    fn rejects_file_without_key_column() {
        let error = parse_customers(b"Name,Country\nAcme,US\n", "Company")
            .expect_err("missing key column");
        assert_eq!(error.message(), "CSV header has no 'Company' column");
    }

    #[test]
    fn rejects_ragged_rows() {
        let error = parse_customers(b"Company,Country\nAcme\n", "Company")
            .expect_err("ragged row");
        assert!(error.message().starts_with("Malformed CSV row 1"));
    }

    #[test]
    fn header_only_file_has_no_records() {
        let records = parse_customers(b"Company,Country\n", "Company").expect("csv should parse");
        assert!(records.is_empty());
    }
}
