use std::time::Duration;
use thiserror::Error;

pub type BulkSmsResult<T> = Result<T, BulkSmsError>;

#[derive(Error, Debug)]
pub enum BulkSmsError {
    #[error("{0}")]
    InputValidation(String),

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Column index {column} is out of range (sheet has {width} columns)")]
    InvalidColumn { column: usize, width: usize },

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Send error: {0}")]
    Send(#[from] SendError),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl BulkSmsError {
    /// Short machine-readable label, used as a metrics tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InputValidation(_) => "input_validation",
            Self::SourceNotFound(_) => "source_not_found",
            Self::InvalidColumn { .. } => "invalid_column",
            Self::InvalidField(_) => "invalid_field",
            Self::Render(_) => "render",
            Self::Send(_) => "send",
            Self::Store(_) => "store",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
            Self::Internal(_) => "internal",
        }
    }
}

/// Failure to turn a template into a message body for one recipient.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("missing placeholder '{0}'")]
    MissingPlaceholder(String),

    #[error("malformed template at byte {position}: {reason}")]
    Malformed { position: usize, reason: &'static str },
}

/// Provider-side failure for a single message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("provider rejected message ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("send timed out after {0:?}")]
    Timeout(Duration),
}

impl SendError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAddress(_) => "invalid_address",
            Self::Rejected { .. } => "rejected",
            Self::Transient(_) => "transient",
            Self::Timeout(_) => "timeout",
        }
    }
}
