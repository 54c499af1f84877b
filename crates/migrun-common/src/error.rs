use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error(transparent)]
    Migration(Box<MigrationError>),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<MigrationError> for Error {
    fn from(e: MigrationError) -> Self {
        Error::Migration(Box::new(e))
    }
}

/// Which step of a migration run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The migration list itself cannot be turned into identifiers.
    InvalidList,
    /// Creating or verifying the bookkeeping table failed.
    Bookkeeping,
    /// Loading the applied set failed.
    StoreRead,
    /// A migration's own operation returned an error.
    Apply,
    /// The operation succeeded but recording it as applied did not.
    /// The schema change is in place without a bookkeeping row.
    StoreWrite,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidList => "invalid migration list",
            ErrorKind::Bookkeeping => "bookkeeping table setup failed",
            ErrorKind::StoreRead => "failed to load applied migrations",
            ErrorKind::Apply => "migration failed",
            ErrorKind::StoreWrite => "migration applied but not recorded",
        };
        f.write_str(s)
    }
}

/// The first failure of a migration run, tagged with the step that failed
/// and, once migrations are being applied, the identifier involved.
#[derive(Debug)]
pub struct MigrationError {
    kind: ErrorKind,
    identifier: Option<String>,
    cause: Error,
}

impl MigrationError {
    pub fn new(kind: ErrorKind, cause: Error) -> Self {
        Self {
            kind,
            identifier: None,
            cause,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn cause(&self) -> &Error {
        &self.cause
    }

    pub fn into_cause(self) -> Error {
        self.cause
    }
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.identifier {
            Some(id) => write!(f, "{} ({id}): {}", self.kind, self.cause),
            None => write!(f, "{}: {}", self.kind, self.cause),
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}
