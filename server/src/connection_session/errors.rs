use crate::broker::BrokerError;
use crate::model::EntityKindError;
use crate::utils::ConnectionStringError;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// `connect` called while a connection is open
    AlreadyConnected,
    /// Operation needs an open connection
    NotConnected,
    InvalidConnectionString(String),
    /// Non-administrative connect without an entity to work on
    MissingEntityName,
    /// Topics can only be read through one of their subscriptions
    TopicNotSelectable(String),
    UnknownEntityKind(String),
    EntityNotFound(String),
    /// Operation needs management-plane credentials
    AdministrationUnavailable,

    /// A message was received but could not be acknowledged
    MessageCompleteFailed {
        message_id: String,
        reason: String,
    },

    OperationTimeout {
        operation: &'static str,
        after: Duration,
    },
    Cancelled {
        operation: &'static str,
    },

    Broker(BrokerError),
}

impl SessionError {
    /// Stable machine-readable name of the error variant.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::AlreadyConnected => "AlreadyConnected",
            SessionError::NotConnected => "NotConnected",
            SessionError::InvalidConnectionString(_) => "InvalidConnectionString",
            SessionError::MissingEntityName => "MissingEntityName",
            SessionError::TopicNotSelectable(_) => "TopicNotSelectable",
            SessionError::UnknownEntityKind(_) => "UnknownEntityKind",
            SessionError::EntityNotFound(_) => "EntityNotFound",
            SessionError::AdministrationUnavailable => "AdministrationUnavailable",
            SessionError::MessageCompleteFailed { .. } => "MessageCompleteFailed",
            SessionError::OperationTimeout { .. } => "OperationTimeout",
            SessionError::Cancelled { .. } => "Cancelled",
            SessionError::Broker(_) => "BrokerError",
        }
    }

    /// True for failures caused by calling an operation in the wrong state or
    /// with bad input, as opposed to failures reported by the broker.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            SessionError::AlreadyConnected
                | SessionError::NotConnected
                | SessionError::InvalidConnectionString(_)
                | SessionError::MissingEntityName
                | SessionError::TopicNotSelectable(_)
                | SessionError::UnknownEntityKind(_)
                | SessionError::AdministrationUnavailable
        )
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::AlreadyConnected => {
                write!(f, "Already connected. Disconnect before connecting again")
            }
            SessionError::NotConnected => write!(f, "Not connected to a namespace"),
            SessionError::InvalidConnectionString(msg) => {
                write!(f, "Invalid connection string: {msg}")
            }
            SessionError::MissingEntityName => write!(
                f,
                "An entity name is required when connecting without an admin connection string"
            ),
            SessionError::TopicNotSelectable(topic) => {
                write!(f, "Please select the subscription for the topic {topic}")
            }
            SessionError::UnknownEntityKind(msg) => write!(f, "Unknown entity: {msg}"),
            SessionError::EntityNotFound(entity) => write!(f, "Entity not found: {entity}"),
            SessionError::AdministrationUnavailable => write!(
                f,
                "Entity administration is unavailable. Connect with an admin connection string"
            ),
            SessionError::MessageCompleteFailed { message_id, reason } => write!(
                f,
                "Message {message_id} was received but could not be completed: {reason}"
            ),
            SessionError::OperationTimeout { operation, after } => {
                write!(f, "Operation {operation} timed out after {after:?}")
            }
            SessionError::Cancelled { operation } => {
                write!(f, "Operation {operation} was cancelled")
            }
            SessionError::Broker(err) => write!(f, "Broker error: {err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Broker(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BrokerError> for SessionError {
    fn from(err: BrokerError) -> Self {
        SessionError::Broker(err)
    }
}

impl From<ConnectionStringError> for SessionError {
    fn from(err: ConnectionStringError) -> Self {
        SessionError::InvalidConnectionString(err.to_string())
    }
}

impl From<EntityKindError> for SessionError {
    fn from(err: EntityKindError) -> Self {
        SessionError::UnknownEntityKind(err.to_string())
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_message() {
        let err = SessionError::TopicNotSelectable("events".to_string());
        assert_eq!(err.kind(), "TopicNotSelectable");
        assert_eq!(
            err.to_string(),
            "Please select the subscription for the topic events"
        );
        assert!(err.is_precondition());

        let err = SessionError::from(BrokerError::connection("refused"));
        assert_eq!(err.kind(), "BrokerError");
        assert!(!err.is_precondition());
    }
}
