use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrokerErrorKind {
    Connection,
    Authentication,
    Timeout,
    NotFound,
    Other,
}

impl fmt::Display for BrokerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BrokerErrorKind::Connection => "connection",
            BrokerErrorKind::Authentication => "authentication",
            BrokerErrorKind::Timeout => "timeout",
            BrokerErrorKind::NotFound => "not found",
            BrokerErrorKind::Other => "broker",
        };
        f.write_str(name)
    }
}

/// A failure reported by a broker implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error: {message}")]
pub struct BrokerError {
    pub kind: BrokerErrorKind,
    pub message: String,
}

impl BrokerError {
    pub fn new(kind: BrokerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(BrokerErrorKind::Connection, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(BrokerErrorKind::Authentication, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(BrokerErrorKind::Timeout, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(BrokerErrorKind::NotFound, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(BrokerErrorKind::Other, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == BrokerErrorKind::NotFound
    }
}

pub type BrokerResult<T> = Result<T, BrokerError>;
