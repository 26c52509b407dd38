use workbook_sync_core::contract::ValidationError;

/// Failure that aborts a whole invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncError {
    pub message: String,
}

impl SyncError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SyncError {}

impl From<String> for SyncError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<ValidationError> for SyncError {
    fn from(error: ValidationError) -> Self {
        Self::new(error.message())
    }
}
