//! Core types and traits for zobject.
//!
//! This crate provides the foundational abstractions for mapping remote
//! billing objects to local instances:
//!
//! - `ObjectSchema` trait describing a remote object type
//! - `ZObject` instances with dirty-attribute tracking and error collection
//! - `Connector` trait for the transport to the remote service
//! - `Value` / `Row` for dynamically typed attribute data
//! - `Outcome` re-export from asupersync for cancel-correct operations
//! - `Cx` context for structured concurrency

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod connector;
pub mod error;
pub mod object;
pub mod row;
pub mod schema;
pub mod tracked;
pub mod value;
pub mod xml;

pub use connector::{
    BatchResponse, Connector, OneOrMany, Operation, QueryResult, ResultError, SaveResponse,
    SaveResult, WriteRequest,
};
pub use error::{
    BASE_SCOPE, BatchError, ConfigError, ConnectionError, ConnectionErrorKind, Error, ObjectError,
    ObjectErrors, ProtocolError, QueryError, QueryErrorKind, Result, SaveError, SchemaError,
    SchemaErrorKind,
};
pub use object::{ObjectState, ZObject};
pub use row::{ColumnInfo, FromValue, ID_COLUMN, Row};
pub use schema::{AttributeInfo, ComplexAttribute, ID_FIELD, ObjectSchema};
pub use tracked::{AttributeTracker, Change};
pub use value::{DATE_TIME_FORMAT, Value};
pub use xml::{XmlBuilder, XmlNamespaces};
