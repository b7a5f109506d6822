#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("File transfer failed: {0}")]
    Transfer(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
