//! Error types for the transaction scheduler

use std::fmt;
use thiserror::Error;

/// Classification surfaced to callers so they can decide whether to retry,
/// fix their input or treat the failure as final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidParameter,
    InvalidState,
    Data,
    Connection,
    Config,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not-found",
            ErrorKind::AlreadyExists => "already-exists",
            ErrorKind::InvalidParameter => "invalid-parameter",
            ErrorKind::InvalidState => "invalid-state",
            ErrorKind::Data => "data",
            ErrorKind::Connection => "connection",
            ErrorKind::Config => "config",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Main error type for the scheduler
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Broker error on topic {topic}: {message}")]
    Broker { topic: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{component}: {source}")]
    Component {
        component: &'static str,
        #[source]
        source: Box<SchedulerError>,
    },
}

impl SchedulerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        SchedulerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Tag the error with the component it is surfacing through. Tagging twice
    /// with the same component is a no-op.
    pub fn extend_component(self, component: &'static str) -> Self {
        match self {
            SchedulerError::Component {
                component: existing,
                source,
            } if existing == component => SchedulerError::Component {
                component: existing,
                source,
            },
            other => SchedulerError::Component {
                component,
                source: Box::new(other),
            },
        }
    }

    /// Kind of the innermost error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SchedulerError::NotFound { .. } => ErrorKind::NotFound,
            SchedulerError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            SchedulerError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            SchedulerError::InvalidState(_) => ErrorKind::InvalidState,
            SchedulerError::Data(_) | SchedulerError::Serialization(_) => ErrorKind::Data,
            SchedulerError::Connection(_) | SchedulerError::Broker { .. } => ErrorKind::Connection,
            SchedulerError::Database(e) => database_error_kind(e),
            SchedulerError::Config(_) => ErrorKind::Config,
            SchedulerError::Internal(_) => ErrorKind::Internal,
            SchedulerError::Component { source, .. } => source.kind(),
        }
    }

    /// Components the error travelled through, outermost first
    pub fn components(&self) -> Vec<&'static str> {
        let mut components = Vec::new();
        let mut current = self;
        while let SchedulerError::Component { component, source } = current {
            components.push(*component);
            current = source;
        }
        components
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

fn database_error_kind(e: &sqlx::Error) -> ErrorKind {
    match e {
        sqlx::Error::RowNotFound => ErrorKind::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => ErrorKind::AlreadyExists,
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => ErrorKind::InvalidParameter,
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => ErrorKind::Data,
        sqlx::Error::Configuration(_) => ErrorKind::Config,
        _ => ErrorKind::Connection,
    }
}

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
