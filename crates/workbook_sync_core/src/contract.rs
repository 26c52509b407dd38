use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::change::{ChangeKind, ChangeRecord, Fields};

/// A DynamoDB attribute value. Only scalar members are read; sets, lists
/// and maps are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttributeValue {
    #[serde(rename = "S", default, skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,
    #[serde(rename = "N", default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(rename = "BOOL", default, skip_serializing_if = "Option::is_none")]
    pub bool: Option<bool>,
}

impl AttributeValue {
    pub fn scalar(&self) -> Option<String> {
        self.s
            .clone()
            .or_else(|| self.n.clone())
            .or_else(|| self.bool.map(|value| value.to_string()))
    }
}

pub type Item = BTreeMap<String, AttributeValue>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StreamEvent {
    #[serde(rename = "Records", default)]
    pub records: Option<Vec<StreamRecord>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamRecord {
    #[serde(rename = "eventID", default)]
    pub event_id: Option<String>,
    pub event_name: String,
    #[serde(default)]
    pub event_source: Option<String>,
    pub dynamodb: StreamChange,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct StreamChange {
    #[serde(default)]
    pub keys: Item,
    #[serde(default)]
    pub new_image: Option<Item>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Option<Vec<S3EventRecord>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct S3EventRecord {
    #[serde(default)]
    pub event_source: Option<String>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct S3Object {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Converts stream records into change records, keeping stream order.
pub fn decode_change_records(
    records: &[StreamRecord],
    key_attribute: &str,
) -> Result<Vec<ChangeRecord>, ValidationError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| decode_change_record(record, key_attribute, index + 1))
        .collect()
}

fn decode_change_record(
    record: &StreamRecord,
    key_attribute: &str,
    position: usize,
) -> Result<ChangeRecord, ValidationError> {
    let kind = ChangeKind::parse(&record.event_name).ok_or_else(|| {
        ValidationError::new(format!(
            "Record {position} has unsupported eventName '{}'",
            record.event_name
        ))
    })?;

    let natural_key = record
        .dynamodb
        .keys
        .get(key_attribute)
        .and_then(AttributeValue::scalar)
        .ok_or_else(|| {
            ValidationError::new(format!(
                "Record {position} is missing key attribute '{key_attribute}'"
            ))
        })?;

    if kind == ChangeKind::Remove {
        return Ok(ChangeRecord::Remove { natural_key });
    }

    let image = record.dynamodb.new_image.as_ref().ok_or_else(|| {
        ValidationError::new(format!(
            "Record {position} ({}) has no NewImage",
            kind.as_str()
        ))
    })?;
    let fields: Fields = image
        .iter()
        .filter_map(|(name, value)| value.scalar().map(|scalar| (name.clone(), scalar)))
        .collect();

    Ok(match kind {
        ChangeKind::Insert => ChangeRecord::Insert {
            natural_key,
            fields,
        },
        _ => ChangeRecord::Modify {
            natural_key,
            fields,
        },
    })
}
