use derive_more::Display;

use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::with_errors::thiserror::{self, Error};

/// AgentError is the single error type shared by every protocol object
///
/// Each variant carries a human readable message. Consumers that need to branch on
/// the failure category should use [`AgentError::kind`] instead of matching the message.
#[derive(Debug, PartialEq, Error, Serialize, Deserialize, Clone)]
#[serde(crate = "self::serde")]
pub enum AgentError {
    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("invalid attributes structure: {0}")]
    InvalidAttributesStructure(String),

    #[error("action not supported: {0}")]
    ActionNotSupported(String),

    #[error("verification failed: {0}")]
    VerificationFailed(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("ledger error: {0}")]
    LedgerError(String),

    #[error("wallet error: {0}")]
    WalletError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("object busy: {0}")]
    ObjectBusy(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("io error: {0}")]
    IoError(String),
}

/// ErrorKind is a copyable discriminant of [`AgentError`]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidHandle,
    InvalidState,
    ProtocolViolation,
    InvalidAttributesStructure,
    ActionNotSupported,
    VerificationFailed,
    TransportError,
    LedgerError,
    WalletError,
    SerializationError,
    ValidationError,
    ObjectBusy,
    NotFound,
    ConfigError,
    IoError,
}

impl AgentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AgentError::InvalidHandle(_) => ErrorKind::InvalidHandle,
            AgentError::InvalidState(_) => ErrorKind::InvalidState,
            AgentError::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
            AgentError::InvalidAttributesStructure(_) => ErrorKind::InvalidAttributesStructure,
            AgentError::ActionNotSupported(_) => ErrorKind::ActionNotSupported,
            AgentError::VerificationFailed(_) => ErrorKind::VerificationFailed,
            AgentError::TransportError(_) => ErrorKind::TransportError,
            AgentError::LedgerError(_) => ErrorKind::LedgerError,
            AgentError::WalletError(_) => ErrorKind::WalletError,
            AgentError::SerializationError(_) => ErrorKind::SerializationError,
            AgentError::ValidationError(_) => ErrorKind::ValidationError,
            AgentError::ObjectBusy(_) => ErrorKind::ObjectBusy,
            AgentError::NotFound(_) => ErrorKind::NotFound,
            AgentError::ConfigError(_) => ErrorKind::ConfigError,
            AgentError::IoError(_) => ErrorKind::IoError,
        }
    }

    /// Transport and ledger failures are the only ones worth repeating as-is,
    /// everything else needs a different input or a different state
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::TransportError | ErrorKind::LedgerError
        )
    }
}

impl From<std::io::Error> for AgentError {
    fn from(value: std::io::Error) -> Self {
        AgentError::IoError(value.to_string())
    }
}
