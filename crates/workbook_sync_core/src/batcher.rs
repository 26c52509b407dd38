//! Groups an ordered change stream into create/update/delete batches.
//!
//! Consecutive inserts and modifies accumulate together, consecutive removes
//! accumulate together. Whenever the class switches, everything open is
//! flushed before the incoming record is appended, so the writer never sees a
//! remove ahead of a write that preceded it in the stream.

use serde::Serialize;

use crate::change::{ChangeClass, ChangeRecord, Fields};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchKind {
    Create,
    Update,
    Delete,
}

impl BatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// One record inside a batch, tagged with its 1-based position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub position: usize,
    pub natural_key: String,
    pub fields: Fields,
}

impl BatchItem {
    pub fn batch_item_id(&self) -> String {
        self.position.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub kind: BatchKind,
    pub items: Vec<BatchItem>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn natural_keys(&self) -> Vec<&str> {
        self.items
            .iter()
            .map(|item| item.natural_key.as_str())
            .collect()
    }

    pub fn item_for_key(&self, natural_key: &str) -> Option<&BatchItem> {
        self.items
            .iter()
            .find(|item| item.natural_key == natural_key)
    }
}

/// The non-empty batches released by one flush, in apply order:
/// deletes, then creates, then updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flush {
    pub batches: Vec<Batch>,
}

impl Flush {
    pub fn record_count(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }

    pub fn batch(&self, kind: BatchKind) -> Option<&Batch> {
        self.batches.iter().find(|batch| batch.kind == kind)
    }
}

#[derive(Debug, Default)]
pub struct ChangeBatcher {
    creates: Vec<BatchItem>,
    updates: Vec<BatchItem>,
    deletes: Vec<BatchItem>,
    last_class: Option<ChangeClass>,
    next_position: usize,
}

impl ChangeBatcher {
    pub fn new() -> Self {
        Self {
            next_position: 1,
            ..Self::default()
        }
    }

    /// Number of records pushed so far.
    pub fn records_seen(&self) -> usize {
        self.next_position.saturating_sub(1)
    }

    /// Appends a record, returning the batches that must be written first
    /// when the record starts a new class run.
    pub fn push(&mut self, record: ChangeRecord) -> Option<Flush> {
        let class = record.class();
        let flushed = match self.last_class {
            Some(previous) if previous != class => self.take_open(),
            _ => None,
        };

        let position = self.next_position.max(1);
        self.next_position = position + 1;
        self.last_class = Some(class);

        match record {
            ChangeRecord::Insert {
                natural_key,
                fields,
            } => self.creates.push(BatchItem {
                position,
                natural_key,
                fields,
            }),
            ChangeRecord::Modify {
                natural_key,
                fields,
            } => self.updates.push(BatchItem {
                position,
                natural_key,
                fields,
            }),
            ChangeRecord::Remove { natural_key } => self.deletes.push(BatchItem {
                position,
                natural_key,
                fields: Fields::new(),
            }),
        }

        flushed
    }

    /// Releases whatever is still open at end of input.
    pub fn finish(mut self) -> Option<Flush> {
        self.take_open()
    }

    fn take_open(&mut self) -> Option<Flush> {
        let mut batches = Vec::with_capacity(3);
        for (kind, items) in [
            (BatchKind::Delete, std::mem::take(&mut self.deletes)),
            (BatchKind::Create, std::mem::take(&mut self.creates)),
            (BatchKind::Update, std::mem::take(&mut self.updates)),
        ] {
            if !items.is_empty() {
                batches.push(Batch { kind, items });
            }
        }

        if batches.is_empty() {
            None
        } else {
            Some(Flush { batches })
        }
    }
}
