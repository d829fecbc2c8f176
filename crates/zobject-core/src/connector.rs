//! Connector traits and response shapes.
//!
//! A [`Connector`] is the transport to the remote service. It turns a query
//! string or write request into a call, and the service's reply into the
//! structured responses below. Envelopes, authentication, retries and
//! timeouts are all the connector's business.
//!
//! All operations are async and take a `Cx` context for cancellation and
//! timeout support.

use crate::object::ZObject;
use crate::row::Row;
use crate::schema::{AttributeInfo, ObjectSchema};
use crate::value::Value;
use asupersync::{Cx, Outcome};
use serde::{Deserialize, Deserializer, Serialize};

/// Zero, one, or many items.
///
/// The service returns a bare item when a result holds exactly one record
/// and a sequence otherwise. Connectors report what they received; the
/// query and bulk layers normalize it with [`into_vec`](Self::into_vec).
///
/// When deserializing, `null` and an empty sequence both read as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// No items
    None,
    /// A single bare item
    One(T),
    /// A sequence of items
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Number of items.
    pub fn len(&self) -> usize {
        match self {
            OneOrMany::None => 0,
            OneOrMany::One(_) => 1,
            OneOrMany::Many(items) => items.len(),
        }
    }

    /// Check if there are no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalize into a list of zero or more items.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::None => Vec::new(),
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OneOrMany<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Sequence before bare item: a row is itself map-shaped, and an empty
        // sequence must not be taken for a record with no columns.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape<U> {
            Empty,
            Many(Vec<U>),
            One(U),
        }

        Ok(match Shape::deserialize(deserializer)? {
            Shape::Empty => OneOrMany::None,
            Shape::Many(items) if items.is_empty() => OneOrMany::None,
            Shape::Many(items) => OneOrMany::Many(items),
            Shape::One(item) => OneOrMany::One(item),
        })
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::None
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(items: Vec<T>) -> Self {
        OneOrMany::Many(items)
    }
}

/// One page of query results plus the pagination cursor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Records on this page
    #[serde(default)]
    pub records: OneOrMany<Row>,
    /// No further pages remain
    pub done: bool,
    /// Opaque continuation token for `query_more`
    pub query_locator: Option<String>,
    /// Total number of records the service reports for the query
    pub size: usize,
}

impl QueryResult {
    /// A single, final page.
    pub fn complete(records: Vec<Row>) -> Self {
        let size = records.len();
        Self {
            records: OneOrMany::Many(records),
            done: true,
            query_locator: None,
            size,
        }
    }

    /// A page that continues at `locator`.
    pub fn partial(records: Vec<Row>, locator: impl Into<String>, size: usize) -> Self {
        Self {
            records: OneOrMany::Many(records),
            done: false,
            query_locator: Some(locator.into()),
            size,
        }
    }

    /// The locator to continue with, if more pages should be fetched.
    pub fn next_locator(&self) -> Option<&str> {
        if self.done {
            return None;
        }
        self.query_locator.as_deref().filter(|l| !l.is_empty())
    }
}

/// Write operation a response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Lowercase name used in logs and errors.
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

/// Error details of a rejected write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultError {
    /// Platform error code, when supplied
    pub code: Option<String>,
    /// Human-readable message
    pub message: String,
}

/// Per-record outcome of a write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResult {
    pub success: bool,
    /// Id of the affected record (set on success)
    pub id: Option<String>,
    /// Errors reported on failure
    #[serde(default)]
    pub errors: OneOrMany<ResultError>,
}

impl SaveResult {
    /// A successful result carrying the record id.
    pub fn ok(id: impl Into<String>) -> Self {
        Self {
            success: true,
            id: Some(id.into()),
            errors: OneOrMany::None,
        }
    }

    /// A failed result with one error message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            id: None,
            errors: OneOrMany::One(ResultError {
                code: None,
                message: message.into(),
            }),
        }
    }

    /// Error messages, in the order reported.
    pub fn messages(&self) -> Vec<String> {
        match &self.errors {
            OneOrMany::None => Vec::new(),
            OneOrMany::One(e) => vec![e.message.clone()],
            OneOrMany::Many(errors) => errors.iter().map(|e| e.message.clone()).collect(),
        }
    }
}

/// Typed response envelope for a single-object write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {
    pub operation: Operation,
    pub result: SaveResult,
}

/// Response to a bulk create or update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponse {
    /// Top-level error; set when the batch as a whole was rejected
    pub errors: Option<String>,
    /// One result per submitted object, in submission order
    #[serde(default)]
    pub results: OneOrMany<SaveResult>,
}

/// Fields sent for a single-object create or update.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    /// Remote collection name
    pub remote_name: &'static str,
    /// Record id (updates only)
    pub id: Option<String>,
    /// `(remote field name, value)` pairs
    pub fields: Vec<(&'static str, Value)>,
}

impl WriteRequest {
    /// Every non-null attribute of a new object.
    pub fn for_create<S: ObjectSchema>(object: &ZObject<S>) -> Self {
        Self {
            remote_name: S::REMOTE_NAME,
            id: None,
            fields: collect_fields(object.present_attributes()),
        }
    }

    /// The id plus every dirty attribute of a persisted object.
    pub fn for_update<S: ObjectSchema>(object: &ZObject<S>) -> Self {
        Self {
            remote_name: S::REMOTE_NAME,
            id: object.id().map(str::to_string),
            fields: collect_fields(object.changed_values()),
        }
    }

    /// Look up a field by remote name.
    pub fn field(&self, remote_name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| *name == remote_name)
            .map(|(_, v)| v)
    }
}

fn collect_fields<'a>(
    attrs: impl Iterator<Item = (&'static AttributeInfo, &'a Value)>,
) -> Vec<(&'static str, Value)> {
    attrs
        .map(|(info, value)| (info.remote_name, value.clone()))
        .collect()
}

/// Transport to the remote service.
///
/// Implementations must be `Send + Sync`; the core never retries, so any
/// retry policy lives in the implementation.
pub trait Connector: Send + Sync {
    /// Run a query statement and return the first page.
    fn query(
        &self,
        cx: &Cx,
        statement: &str,
    ) -> impl Future<Output = Outcome<QueryResult, crate::Error>> + Send;

    /// Fetch the page following `query_locator`.
    fn query_more(
        &self,
        cx: &Cx,
        query_locator: &str,
    ) -> impl Future<Output = Outcome<QueryResult, crate::Error>> + Send;

    /// Create one record.
    fn create(
        &self,
        cx: &Cx,
        request: &WriteRequest,
    ) -> impl Future<Output = Outcome<SaveResponse, crate::Error>> + Send;

    /// Update one record.
    fn update(
        &self,
        cx: &Cx,
        request: &WriteRequest,
    ) -> impl Future<Output = Outcome<SaveResponse, crate::Error>> + Send;

    /// Delete one record.
    fn destroy(
        &self,
        cx: &Cx,
        remote_name: &str,
        id: &str,
    ) -> impl Future<Output = Outcome<SaveResponse, crate::Error>> + Send;

    /// Submit a bulk create whose body is `payload` (one element per object).
    fn create_batch(
        &self,
        cx: &Cx,
        remote_name: &str,
        payload: &str,
    ) -> impl Future<Output = Outcome<BatchResponse, crate::Error>> + Send;

    /// Submit a bulk update whose body is `payload` (one element per object).
    fn update_batch(
        &self,
        cx: &Cx,
        remote_name: &str,
        payload: &str,
    ) -> impl Future<Output = Outcome<BatchResponse, crate::Error>> + Send;
}
