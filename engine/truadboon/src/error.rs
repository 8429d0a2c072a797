use thiserror::Error;

/// Result alias used across the crate.
pub type TruadboonResult<T> = Result<T, TruadboonError>;

/// Error variants surfaced by the verification engine.
///
/// Decode-side problems never appear here: a malformed QR payload degrades
/// to a partial record and an `unknown` identifier instead of an error.
#[derive(Debug, Error)]
pub enum TruadboonError {
    #[error("identifier must contain at least one digit or letter")]
    InvalidIdentifier,
    #[error("registry lookup timed out")]
    RegistryTimeout,
    #[error("registry error: {0}")]
    Registry(String),
    #[error("audit log error: {0}")]
    AuditLog(String),
    #[error("registry data error: {0}")]
    Data(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
