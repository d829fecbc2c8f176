//! zobject - client-side object mapping for a subscription-billing query/CRUD API.
//!
//! Remote records are represented as [`ZObject`] instances described by an
//! [`ObjectSchema`]. Objects track which attributes changed since they were
//! last saved, collect validation and remote errors, and are persisted
//! through a [`Session`] that owns the [`Connector`] to the service.
//!
//! # Quick Start
//!
//! ```ignore
//! use zobject::prelude::*;
//!
//! struct Account;
//!
//! impl ObjectSchema for Account {
//!     const REMOTE_NAME: &'static str = "Account";
//!
//!     fn attributes() -> &'static [AttributeInfo] {
//!         const ATTRS: &[AttributeInfo] = &[
//!             AttributeInfo::new("name", "Name"),
//!             AttributeInfo::new("auto_pay", "AutoPay"),
//!         ];
//!         ATTRS
//!     }
//!
//!     fn default_attributes() -> Vec<(&'static str, Value)> {
//!         vec![("auto_pay", Value::Bool(false))]
//!     }
//! }
//!
//! async fn sync(cx: &Cx, session: &Session<impl Connector>, last_sync: DateTime<Utc>) {
//!     // Create
//!     let mut account = ZObject::<Account>::with_attributes([("name", "Acme")]).unwrap();
//!     session.save(cx, &mut account).await;
//!
//!     // Query everything changed since the last run
//!     let window = UpdatedWindow::since(last_sync);
//!     let changed = session.get_updated::<Account, &str>(cx, &window, None).await;
//!
//!     // Bulk update
//!     let mut accounts = session.all::<Account>(cx).await.unwrap();
//!     for account in &mut accounts {
//!         account.set("auto_pay", true).unwrap();
//!     }
//!     session.bulk().update_chunked(cx, &mut accounts).await;
//! }
//! ```
//!
//! # Crates
//!
//! - `zobject-core`: values, rows, schemas, objects, errors and the `Connector` trait
//! - `zobject-query`: field planning, statements, pagination and result merging
//! - `zobject-session`: single-object lifecycle and bulk writes

pub use zobject_core::{
    AttributeInfo, AttributeTracker, BASE_SCOPE, BatchError, BatchResponse, Change,
    ComplexAttribute, ConfigError, ConnectionError, ConnectionErrorKind, Connector, Cx, Error,
    FromValue, ID_COLUMN, ID_FIELD, ObjectError, ObjectErrors, ObjectSchema, ObjectState,
    OneOrMany, Operation, Outcome, ProtocolError, QueryError, QueryErrorKind, QueryResult,
    Result, ResultError, Row, SaveError, SaveResponse, SaveResult, SchemaError, SchemaErrorKind,
    Value, WriteRequest, XmlBuilder, XmlNamespaces, ZObject,
};

pub use zobject_query::{
    DEFAULT_MAX_QUERY_PAGES, Finder, QueryPlan, UPDATED_DATE_FIELD, UpdatedWindow,
    combine_results, criteria_clause, materialize, query_all, select_statement, where_statement,
};

pub use zobject_session::{
    BulkReport, BulkWriter, DEFAULT_BULK_BATCH_SIZE, Session, SessionBuilder, SessionConfig,
    apply_batch_response, apply_response, create_payload, update_payload,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        // Schema and objects
        AttributeInfo,
        ComplexAttribute,
        // Transport
        Connector,
        Cx,
        Error,
        ObjectErrors,
        ObjectSchema,
        Outcome,
        Result,
        Row,
        // Session
        Session,
        SessionBuilder,
        SessionConfig,
        // Queries
        UpdatedWindow,
        Value,
        ZObject,
    };
}
