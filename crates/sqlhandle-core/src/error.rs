//! Error types for sqlhandle operations.

use std::fmt;
use std::sync::Arc;

/// The primary error type for all sqlhandle operations.
#[derive(Debug)]
pub enum Error {
    /// Connection-related errors (connect, ping, disconnect)
    Connection(ConnectionError),
    /// Query execution errors
    Query(QueryError),
    /// Type conversion errors
    Type(TypeError),
    /// Pool and prepared-statement errors
    Pool(PoolError),
    /// Schema parsing and relationship wiring errors
    Schema(SchemaError),
    /// Configuration errors (dialector initialization, missing collaborators)
    Config(ConfigError),
    /// The handle has no usable raw connection pool
    InvalidDb,
    /// Operation timed out
    Timeout,
    /// Operation was cancelled via asupersync
    Cancelled,
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish connection
    Connect,
    /// Connectivity check failed
    Ping,
    /// Connection lost during operation
    Disconnected,
    /// Connection refused
    Refused,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Syntax error in SQL
    Syntax,
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Table or column not found
    NotFound,
    /// Statement could not be prepared
    Prepare,
    /// Bound parameters do not match the prepared statement
    Bind,
    /// Other database error
    Database,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

#[derive(Debug)]
pub struct PoolError {
    pub kind: PoolErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolErrorKind {
    /// Pool is closed
    Closed,
    /// A lock guarding pool state could not be acquired
    Lock,
    /// Configuration error
    Config,
}

#[derive(Debug)]
pub struct SchemaError {
    pub kind: SchemaErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorKind {
    /// A model could not be reflected into a schema
    Parse,
    /// Relationship not found (or has no join table where one is required)
    RelationNotFound,
    /// Join table lacks a field required by a foreign-key reference
    MissingJoinField,
    /// Invalid schema definition
    Invalid,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a schema error of the given kind.
    pub fn schema(kind: SchemaErrorKind, message: impl Into<String>) -> Self {
        Error::Schema(SchemaError {
            kind,
            message: message.into(),
            source: None,
        })
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            message: message.into(),
            source: None,
        })
    }

    /// Create a query error carrying the offending SQL.
    pub fn query(kind: QueryErrorKind, sql: Option<&str>, message: impl Into<String>) -> Self {
        Error::Query(QueryError {
            kind,
            sql: sql.map(str::to_string),
            message: message.into(),
            source: None,
        })
    }

    /// Is this a connection error that likely requires reconnection?
    pub fn is_connection_error(&self) -> bool {
        match self {
            Error::Connection(c) => matches!(
                c.kind,
                ConnectionErrorKind::Connect
                    | ConnectionErrorKind::Ping
                    | ConnectionErrorKind::Disconnected
                    | ConnectionErrorKind::Refused
            ),
            _ => false,
        }
    }

    /// Schema error kind, if this is a schema error.
    pub fn schema_kind(&self) -> Option<SchemaErrorKind> {
        match self {
            Error::Schema(s) => Some(s.kind),
            _ => None,
        }
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Query(e) => write!(f, "Query error: {}", e.message),
            Error::Type(e) => write!(f, "Type error: {}", e),
            Error::Pool(e) => write!(f, "Pool error: {}", e.message),
            Error::Schema(e) => write!(f, "Schema error: {}", e.message),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::InvalidDb => write!(f, "invalid db"),
            Error::Timeout => write!(f, "Operation timed out"),
            Error::Cancelled => write!(f, "Operation cancelled"),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        let boxed = match self {
            Error::Connection(e) => e.source.as_deref(),
            Error::Query(e) => e.source.as_deref(),
            Error::Pool(e) => e.source.as_deref(),
            Error::Schema(e) => e.source.as_deref(),
            Error::Config(e) => e.source.as_deref(),
            _ => None,
        };
        boxed.map(|err| err as &(dyn std::error::Error + 'static))
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<PoolError> for Error {
    fn from(err: PoolError) -> Self {
        Error::Pool(err)
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Error::Schema(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

/// Result type alias for sqlhandle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors accumulated on a handle.
///
/// The first error is kept verbatim; later ones are appended, never
/// replacing what is already there. Every cause stays reachable through
/// [`iter`](Self::iter) so callers can test whether a particular failure
/// happened anywhere in the chain.
#[derive(Debug, Clone)]
pub struct ErrorChain {
    errors: Vec<Arc<Error>>,
}

impl ErrorChain {
    /// Start a chain with its first error.
    pub fn new(first: impl Into<Arc<Error>>) -> Self {
        Self {
            errors: vec![first.into()],
        }
    }

    /// Append another error.
    pub fn push(&mut self, err: impl Into<Arc<Error>>) {
        self.errors.push(err.into());
    }

    /// The first error recorded.
    pub fn first(&self) -> &Error {
        &self.errors[0]
    }

    /// The most recently recorded error.
    pub fn last(&self) -> &Error {
        &self.errors[self.errors.len() - 1]
    }

    /// Number of recorded errors (always at least one).
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always false; a chain is created with its first error.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate over every cause, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.errors.iter().map(AsRef::as_ref)
    }

    /// Does any recorded cause satisfy `pred`?
    pub fn any(&self, pred: impl Fn(&Error) -> bool) -> bool {
        self.iter().any(pred)
    }

    /// Is this exact error instance among the causes?
    pub fn contains(&self, err: &Arc<Error>) -> bool {
        self.errors.iter().any(|e| Arc::ptr_eq(e, err))
    }
}

impl fmt::Display for ErrorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorChain {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.last())
    }
}
