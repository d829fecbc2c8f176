//! Error types for zobject operations.
//!
//! Two families live here. [`Error`] is returned from calls that fail as a
//! whole (transport, malformed responses, rejected batches, `save_strict`).
//! [`ObjectErrors`] is the per-object collection that records validation
//! failures and remote rejections without aborting the caller.

use std::fmt;

/// The primary error type for all zobject operations.
#[derive(Debug)]
pub enum Error {
    /// Connection-related errors (connect, authentication, disconnect)
    Connection(ConnectionError),
    /// Query errors (pagination limit, record not found)
    Query(QueryError),
    /// Malformed or unexpected response from the remote service
    Protocol(ProtocolError),
    /// A bulk request was rejected as a whole
    Batch(BatchError),
    /// `save_strict` could not persist the object
    Save(SaveError),
    /// Schema declaration errors
    Schema(SchemaError),
    /// Configuration errors
    Config(ConfigError),
    /// Custom error with message
    Custom(String),
}

/// Transport failure reported by a [`Connector`](crate::Connector).
///
/// The query and lifecycle layers never build these; they pass them through
/// unchanged. Cancellation and deadlines arrive as `Outcome::Cancelled` from
/// the `Cx`, not as an error.
#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to reach the service
    Connect,
    /// Login or session token rejected
    Authentication,
    /// Connection lost during operation
    Disconnected,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub statement: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// The service kept reporting more pages past the configured cap
    PaginationLimit,
    /// No record matched
    NotFound,
    /// The service rejected the statement (reported by connectors)
    Invalid,
}

#[derive(Debug)]
pub struct ProtocolError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Top-level rejection of a bulk create or update.
///
/// Raised before any object in the batch is touched, so none of them can
/// be assumed persisted.
#[derive(Debug, Clone)]
pub struct BatchError {
    pub operation: &'static str,
    pub remote_name: &'static str,
    pub detail: String,
}

/// Raised by `save_strict` when the underlying save reported failure.
#[derive(Debug, Clone)]
pub struct SaveError {
    pub remote_name: &'static str,
    pub messages: Vec<String>,
}

#[derive(Debug)]
pub struct SchemaError {
    pub kind: SchemaErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorKind {
    /// Attribute name not declared for the object type
    UnknownAttribute,
    /// Operation not valid for the object's lifecycle state
    InvalidState,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

impl Error {
    /// Is this a connection error that likely requires reconnection?
    pub fn is_connection_error(&self) -> bool {
        match self {
            Error::Connection(_) | Error::Protocol(_) => true,
            _ => false,
        }
    }

    /// Get the query statement that caused this error, if available.
    pub fn statement(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.statement.as_deref(),
            _ => None,
        }
    }

    /// Error for an attribute name the object type does not declare.
    pub fn unknown_attribute(remote_name: &str, name: &str) -> Self {
        Error::Schema(SchemaError {
            kind: SchemaErrorKind::UnknownAttribute,
            message: format!("unknown attribute '{name}' for {remote_name}"),
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Query(e) => {
                if let Some(statement) = &e.statement {
                    write!(f, "Query error: {} ({})", e.message, statement)
                } else {
                    write!(f, "Query error: {}", e.message)
                }
            }
            Error::Protocol(e) => write!(f, "Protocol error: {}", e.message),
            Error::Batch(e) => write!(f, "{}", e),
            Error::Save(e) => write!(f, "{}", e),
            Error::Schema(e) => write!(f, "Schema error: {}", e.message),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Protocol(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bulk {} of {} rejected: {}",
            self.operation, self.remote_name, self.detail
        )
    }
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to save {}: [{}]",
            self.remote_name,
            self.messages.join(", ")
        )
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
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

impl From<ProtocolError> for Error {
    fn from(err: ProtocolError) -> Self {
        Error::Protocol(err)
    }
}

impl From<BatchError> for Error {
    fn from(err: BatchError) -> Self {
        Error::Batch(err)
    }
}

impl From<SaveError> for Error {
    fn from(err: SaveError) -> Self {
        Error::Save(err)
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

/// Result type alias for zobject operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Scope used for errors that belong to the object as a whole.
pub const BASE_SCOPE: &str = "base";

/// A single recorded error on an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectError {
    /// Attribute name, or [`BASE_SCOPE`] for object-level errors
    pub scope: String,
    /// Human-readable error message
    pub message: String,
}

/// Accumulating error collection attached to each object.
///
/// Validation writes attribute-scoped entries; remote rejections append
/// `base` entries. Entries are never removed except by re-validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectErrors {
    entries: Vec<ObjectError>,
}

impl ObjectErrors {
    /// Create a new empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if there are any errors.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of recorded errors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Record an error under a scope.
    pub fn add(&mut self, scope: impl Into<String>, message: impl Into<String>) {
        self.entries.push(ObjectError {
            scope: scope.into(),
            message: message.into(),
        });
    }

    /// Record an object-level error.
    pub fn add_base(&mut self, message: impl Into<String>) {
        self.add(BASE_SCOPE, message);
    }

    /// Record that a required attribute is missing.
    pub fn add_required(&mut self, attribute: impl Into<String>) {
        self.add(attribute, "can't be blank");
    }

    /// Messages recorded under one scope.
    pub fn on<'a>(&'a self, scope: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.scope == scope)
            .map(|e| e.message.as_str())
    }

    /// All messages, in recording order.
    pub fn messages(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.message.clone()).collect()
    }

    /// Messages prefixed with their attribute scope (base messages unprefixed).
    pub fn full_messages(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| {
                if e.scope == BASE_SCOPE {
                    e.message.clone()
                } else {
                    format!("{} {}", e.scope, e.message)
                }
            })
            .collect()
    }

    /// Check whether any entry carries this exact message.
    pub fn contains_message(&self, message: &str) -> bool {
        self.entries.iter().any(|e| e.message == message)
    }

    /// Iterate over recorded errors.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectError> {
        self.entries.iter()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
