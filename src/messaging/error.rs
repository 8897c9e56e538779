// src/messaging/error.rs
use thiserror::Error;

/// Which step of the publish sequence an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    Channel,
    Declaration,
    Publish,
    InvalidProperty,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("Queue declaration error: {0}")]
    DeclarationError(String),

    #[error("Publish error: {0}")]
    PublishError(String),

    #[error("Invalid message property: {0}")]
    InvalidProperty(String),
}

impl PublishError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PublishError::ConnectionError(_) => ErrorKind::Connection,
            PublishError::ChannelError(_) => ErrorKind::Channel,
            PublishError::DeclarationError(_) => ErrorKind::Declaration,
            PublishError::PublishError(_) => ErrorKind::Publish,
            PublishError::InvalidProperty(_) => ErrorKind::InvalidProperty,
        }
    }
}

// Custom Result type for publish operations
pub type Result<T> = std::result::Result<T, PublishError>;
