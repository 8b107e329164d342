use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Content is empty, names a modality the embedder does not recognize,
    /// or carries a value that cannot be encoded.
    #[error("Invalid content: {0}")]
    InvalidContent(String),

    /// Components wired together disagree (e.g. embedder modalities not
    /// covered by the serializer). Raised before any I/O.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Parallel input sequences of unequal length.
    #[error("Length mismatch: {0}")]
    ArityMismatch(String),

    /// Any failure from the storage layer, propagated without retry.
    #[error("Backend operation failed: {0}")]
    Backend(String),
}

impl Error {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Error::Backend(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
