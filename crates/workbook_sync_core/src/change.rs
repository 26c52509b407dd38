use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field name to scalar value, as carried by a change record.
pub type Fields = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Modify,
    Remove,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Modify => "MODIFY",
            Self::Remove => "REMOVE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "INSERT" => Some(Self::Insert),
            "MODIFY" => Some(Self::Modify),
            "REMOVE" => Some(Self::Remove),
            _ => None,
        }
    }

    pub fn class(self) -> ChangeClass {
        match self {
            Self::Insert | Self::Modify => ChangeClass::Write,
            Self::Remove => ChangeClass::Remove,
        }
    }
}

/// Grouping the batcher flushes on: inserts and modifies share a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeClass {
    Write,
    Remove,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChangeRecord {
    Insert { natural_key: String, fields: Fields },
    Modify { natural_key: String, fields: Fields },
    Remove { natural_key: String },
}

impl ChangeRecord {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Insert { .. } => ChangeKind::Insert,
            Self::Modify { .. } => ChangeKind::Modify,
            Self::Remove { .. } => ChangeKind::Remove,
        }
    }

    pub fn class(&self) -> ChangeClass {
        self.kind().class()
    }

    pub fn natural_key(&self) -> &str {
        match self {
            Self::Insert { natural_key, .. }
            | Self::Modify { natural_key, .. }
            | Self::Remove { natural_key } => natural_key,
        }
    }

    pub fn fields(&self) -> Option<&Fields> {
        match self {
            Self::Insert { fields, .. } | Self::Modify { fields, .. } => Some(fields),
            Self::Remove { .. } => None,
        }
    }
}
