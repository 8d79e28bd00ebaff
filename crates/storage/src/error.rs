#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage request '{operation}' failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },

    #[error("Invalid presigning configuration: {0}")]
    Presign(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Some keys of a bulk delete failed; the rest were still attempted.
    #[error(
        "Failed to delete {} of {attempted} objects ({}): {first_error}",
        .failed.len(),
        .failed.join(", ")
    )]
    Delete {
        attempted: usize,
        failed: Vec<String>,
        first_error: String,
    },
}

impl StorageError {
    pub(crate) fn request(operation: &'static str, err: impl std::error::Error) -> Self {
        Self::Request {
            operation,
            message: aws_sdk_s3::error::DisplayErrorContext(err).to_string(),
        }
    }
}

/// Per-key outcome tally for a bulk delete.
#[derive(Debug, Default)]
pub(crate) struct DeleteFailures {
    attempted: usize,
    failed: Vec<String>,
    first_error: Option<String>,
}

impl DeleteFailures {
    pub(crate) fn record(&mut self, key: &str, result: Result<(), StorageError>) {
        self.attempted += 1;
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "Object delete failed");
            self.failed.push(key.to_string());
            self.first_error.get_or_insert_with(|| e.to_string());
        }
    }

    pub(crate) fn finish(self) -> Result<(), StorageError> {
        match self.first_error {
            None => Ok(()),
            Some(first_error) => Err(StorageError::Delete {
                attempted: self.attempted,
                failed: self.failed,
                first_error,
            }),
        }
    }
}
