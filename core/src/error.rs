use thiserror::Error;

use crate::entity::EntityKind;

/// Channelz inspector error types
#[derive(Error, Debug)]
pub enum ChannelzError {
    /// Identifier does not resolve to any entity of the requested kind
    #[error("No such {kind}: {identifier}")]
    NotFound {
        kind: EntityKind,
        identifier: String,
    },

    /// Transport or service failure, with the status kept verbatim
    #[error("{operation} failed: {} ({:?})", .status.message(), .status.code())]
    Unavailable {
        operation: String,
        status: tonic::Status,
    },

    /// Identifier that cannot be used for the requested kind
    #[error("Invalid {kind} identifier \"{identifier}\": {reason}")]
    InvalidInput {
        kind: EntityKind,
        identifier: String,
        reason: String,
    },

    /// Failure while loading a child of the entity being reported
    #[error("{kind} {identifier}: {source}")]
    Child {
        kind: EntityKind,
        identifier: String,
        source: Box<ChannelzError>,
    },

    /// Connection setup error
    #[error("Connection error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ChannelzError {
    /// Map a status returned by `operation` on the entity `kind`/`id`.
    ///
    /// `NOT_FOUND` becomes [`ChannelzError::NotFound`]; every other code is
    /// surfaced as [`ChannelzError::Unavailable`].
    pub fn from_status(status: tonic::Status, operation: &str, kind: EntityKind, id: i64) -> Self {
        if status.code() == tonic::Code::NotFound {
            ChannelzError::NotFound {
                kind,
                identifier: id.to_string(),
            }
        } else {
            ChannelzError::Unavailable {
                operation: format!("{operation}({id})"),
                status,
            }
        }
    }

    /// Attach the parent entity this error was hit under.
    pub fn within(self, kind: EntityKind, id: i64) -> Self {
        ChannelzError::Child {
            kind,
            identifier: id.to_string(),
            source: Box::new(self),
        }
    }

    /// Whether this error means the entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ChannelzError::NotFound { .. })
    }
}

impl From<serde_yaml::Error> for ChannelzError {
    fn from(err: serde_yaml::Error) -> Self {
        ChannelzError::SerializationError(err.to_string())
    }
}

/// Result type alias for channelz operations
pub type Result<T> = std::result::Result<T, ChannelzError>;
