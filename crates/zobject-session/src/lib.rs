//! Object lifecycle and bulk writes for zobject.
//!
//! A [`Session`] owns the connector and the [`SessionConfig`]. It persists
//! single objects (`save`, `create`, `update`, `destroy`, `reload`), hands
//! out a [`Finder`] for lookups and a [`BulkWriter`] for batched writes.
//!
//! # Example
//!
//! ```ignore
//! let session = SessionBuilder::new().bulk_batch_size(25).build_with(connector)?;
//!
//! let mut account = ZObject::<Account>::with_attributes([("name", "Acme")])?;
//! match session.save(&cx, &mut account).await {
//!     Outcome::Ok(true) => println!("created {:?}", account.id()),
//!     Outcome::Ok(false) => println!("{:?}", account.errors().full_messages()),
//!     Outcome::Err(e) => eprintln!("save failed: {e}"),
//!     Outcome::Cancelled(_) | Outcome::Panicked(_) => {}
//! }
//! ```
//!
//! # Applying write responses
//!
//! On success the id is recorded (create only), the dirty set is cleared and
//! cached complex sub-objects are dropped so the next access refetches them.
//! On failure every reported message is appended to the object's errors
//! under `base` and nothing else changes.

pub mod bulk;
pub mod config;

#[cfg(test)]
mod testing;

pub use bulk::{BulkReport, BulkWriter, apply_batch_response, create_payload, update_payload};
pub use config::{DEFAULT_BULK_BATCH_SIZE, SessionConfig};

use asupersync::{Cx, Outcome};
use zobject_core::{
    Connector, Error, ObjectSchema, Operation, ProtocolError, QueryError, QueryErrorKind,
    SaveError, SaveResponse, SchemaError, SchemaErrorKind, Value, WriteRequest, XmlNamespaces,
    ZObject,
};
use zobject_query::{Finder, UpdatedWindow};

/// Persistence and lookup entry point bound to one connector.
#[derive(Debug)]
pub struct Session<C: Connector> {
    connection: C,
    config: SessionConfig,
}

impl<C: Connector> Session<C> {
    /// Create a session with default configuration.
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            config: SessionConfig::default(),
        }
    }

    /// Create a session with the given configuration.
    pub fn with_config(connection: C, config: SessionConfig) -> zobject_core::Result<Self> {
        config.validate()?;
        Ok(Self { connection, config })
    }

    /// Get a reference to the underlying connector.
    #[must_use]
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Get a mutable reference to the underlying connector.
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// Consume the session and return the underlying connector.
    pub fn into_connection(self) -> C {
        self.connection
    }

    /// The session's configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// A finder honoring the session's page cap.
    pub fn finder(&self) -> Finder<'_, C> {
        Finder::new(&self.connection).max_pages(self.config.max_query_pages)
    }

    /// A bulk writer honoring the session's batch size and namespaces.
    pub fn bulk(&self) -> BulkWriter<'_, C> {
        BulkWriter::new(&self.connection, &self.config)
    }

    // ==================== Single-object writes ====================

    /// Validate, then create or update depending on whether the object has an id.
    ///
    /// Returns `false` without contacting the service when validation fails,
    /// and `false` when the service rejects the write.
    #[tracing::instrument(level = "debug", skip(self, cx, object), fields(remote_name = S::REMOTE_NAME))]
    pub async fn save<S: ObjectSchema>(
        &self,
        cx: &Cx,
        object: &mut ZObject<S>,
    ) -> Outcome<bool, Error> {
        if object.is_destroyed() {
            return Outcome::Err(invalid_state::<S>("cannot save a destroyed record"));
        }
        if !object.is_valid() {
            tracing::debug!(
                errors = object.errors().len(),
                "Validation failed; not saving"
            );
            return Outcome::Ok(false);
        }
        if object.is_new_record() {
            self.create(cx, object).await
        } else {
            self.update(cx, object).await
        }
    }

    /// Like [`save`](Self::save), but a `false` result becomes [`Error::Save`]
    /// carrying every recorded message.
    pub async fn save_strict<S: ObjectSchema>(
        &self,
        cx: &Cx,
        object: &mut ZObject<S>,
    ) -> Outcome<(), Error> {
        match self.save(cx, object).await {
            Outcome::Ok(true) => Outcome::Ok(()),
            Outcome::Ok(false) => Outcome::Err(Error::Save(SaveError {
                remote_name: S::REMOTE_NAME,
                messages: object.errors().full_messages(),
            })),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Create the object remotely, sending every non-null attribute.
    #[tracing::instrument(level = "debug", skip(self, cx, object), fields(remote_name = S::REMOTE_NAME))]
    pub async fn create<S: ObjectSchema>(
        &self,
        cx: &Cx,
        object: &mut ZObject<S>,
    ) -> Outcome<bool, Error> {
        if object.is_persisted() {
            return Outcome::Err(invalid_state::<S>("cannot create a record that already has an id"));
        }
        let request = WriteRequest::for_create(object);
        tracing::trace!(fields = request.fields.len(), "Sending create");

        let response = match self.connection.create(cx, &request).await {
            Outcome::Ok(response) => response,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        match apply_response(Operation::Create, object, response) {
            Ok(saved) => Outcome::Ok(saved),
            Err(e) => Outcome::Err(e),
        }
    }

    /// Update the object remotely, sending its id and dirty attributes.
    #[tracing::instrument(level = "debug", skip(self, cx, object), fields(remote_name = S::REMOTE_NAME, id = object.id()))]
    pub async fn update<S: ObjectSchema>(
        &self,
        cx: &Cx,
        object: &mut ZObject<S>,
    ) -> Outcome<bool, Error> {
        if object.is_new_record() {
            return Outcome::Err(invalid_state::<S>("cannot update a record without an id"));
        }
        let request = WriteRequest::for_update(object);
        tracing::trace!(fields = request.fields.len(), "Sending update");

        let response = match self.connection.update(cx, &request).await {
            Outcome::Ok(response) => response,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        match apply_response(Operation::Update, object, response) {
            Ok(saved) => Outcome::Ok(saved),
            Err(e) => Outcome::Err(e),
        }
    }

    /// Delete the object remotely.
    ///
    /// Dirty state is left alone. A destroyed object cannot be saved again.
    #[tracing::instrument(level = "debug", skip(self, cx, object), fields(remote_name = S::REMOTE_NAME, id = object.id()))]
    pub async fn destroy<S: ObjectSchema>(
        &self,
        cx: &Cx,
        object: &mut ZObject<S>,
    ) -> Outcome<bool, Error> {
        let Some(id) = object.id().map(str::to_string) else {
            return Outcome::Err(Error::Custom(format!(
                "cannot destroy a new {} record",
                S::REMOTE_NAME
            )));
        };

        let response = match self.connection.destroy(cx, S::REMOTE_NAME, &id).await {
            Outcome::Ok(response) => response,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        match apply_response(Operation::Delete, object, response) {
            Ok(destroyed) => Outcome::Ok(destroyed),
            Err(e) => Outcome::Err(e),
        }
    }

    /// Refetch the object by id, discarding local edits.
    #[tracing::instrument(level = "debug", skip(self, cx, object), fields(remote_name = S::REMOTE_NAME, id = object.id()))]
    pub async fn reload<S: ObjectSchema>(
        &self,
        cx: &Cx,
        object: &mut ZObject<S>,
    ) -> Outcome<(), Error> {
        let Some(id) = object.id().map(str::to_string) else {
            return Outcome::Err(invalid_state::<S>("cannot reload a record without an id"));
        };

        let fetched = match self.finder().find::<S>(cx, &id).await {
            Outcome::Ok(Some(fetched)) => fetched,
            Outcome::Ok(None) => {
                return Outcome::Err(Error::Query(QueryError {
                    kind: QueryErrorKind::NotFound,
                    statement: None,
                    message: format!("{} {} not found", S::REMOTE_NAME, id),
                }));
            }
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        object.overwrite_from_row(&fetched.to_row());
        object.reset_complex_cache();
        Outcome::Ok(())
    }

    // ==================== Lookups ====================

    /// Every record of `S`, with the default field set.
    pub async fn all<S: ObjectSchema>(&self, cx: &Cx) -> Outcome<Vec<ZObject<S>>, Error> {
        self.finder().all::<S>(cx).await
    }

    /// Every record of `S`, selecting the given remote fields.
    pub async fn all_with_fields<S: ObjectSchema, F: AsRef<str>>(
        &self,
        cx: &Cx,
        fields: &[F],
    ) -> Outcome<Vec<ZObject<S>>, Error> {
        self.finder().all_with_fields::<S, F>(cx, fields).await
    }

    /// Records of `S` modified inside `window`.
    pub async fn get_updated<S: ObjectSchema, F: AsRef<str>>(
        &self,
        cx: &Cx,
        window: &UpdatedWindow,
        fields: Option<&[F]>,
    ) -> Outcome<Vec<ZObject<S>>, Error> {
        self.finder().get_updated::<S, F>(cx, window, fields).await
    }

    /// Records of `S` matching every equality criterion.
    pub async fn find_where<S: ObjectSchema>(
        &self,
        cx: &Cx,
        criteria: &[(&str, Value)],
    ) -> Outcome<Vec<ZObject<S>>, Error> {
        self.finder().find_where::<S>(cx, criteria).await
    }

    /// Records of `S` matching a caller-built where clause.
    pub async fn find_where_raw<S: ObjectSchema>(
        &self,
        cx: &Cx,
        clause: &str,
    ) -> Outcome<Vec<ZObject<S>>, Error> {
        self.finder().find_where_raw::<S>(cx, clause).await
    }

    /// The record of `S` with this id, if any.
    pub async fn find<S: ObjectSchema>(
        &self,
        cx: &Cx,
        id: &str,
    ) -> Outcome<Option<ZObject<S>>, Error> {
        self.finder().find::<S>(cx, id).await
    }
}

fn invalid_state<S: ObjectSchema>(message: &str) -> Error {
    Error::Schema(SchemaError {
        kind: SchemaErrorKind::InvalidState,
        message: format!("{}: {}", S::REMOTE_NAME, message),
    })
}

/// Apply a single-object write response.
///
/// Returns whether the service accepted the write. A response for a
/// different operation, or a successful create without an id, is a protocol
/// error and leaves the object untouched.
pub fn apply_response<S: ObjectSchema>(
    expected: Operation,
    object: &mut ZObject<S>,
    response: SaveResponse,
) -> zobject_core::Result<bool> {
    if response.operation != expected {
        return Err(Error::Protocol(ProtocolError {
            message: format!(
                "expected a {} response for {}, got {}",
                expected.as_str(),
                S::REMOTE_NAME,
                response.operation.as_str()
            ),
            source: None,
        }));
    }

    let result = response.result;
    if !result.success {
        let messages = result.messages();
        tracing::debug!(
            remote_name = S::REMOTE_NAME,
            operation = expected.as_str(),
            errors = messages.len(),
            "Write rejected"
        );
        if messages.is_empty() {
            object
                .errors_mut()
                .add_base(format!("{} rejected by the service", expected.as_str()));
        }
        for message in messages {
            object.errors_mut().add_base(message);
        }
        return Ok(false);
    }

    match expected {
        Operation::Create => {
            let Some(id) = result.id else {
                return Err(Error::Protocol(ProtocolError {
                    message: format!("create of {} succeeded without an id", S::REMOTE_NAME),
                    source: None,
                }));
            };
            object.apply_remote_id(id);
            object.clear_changed();
            object.reset_complex_cache();
        }
        Operation::Update => {
            object.clear_changed();
            object.reset_complex_cache();
        }
        Operation::Delete => object.mark_destroyed(),
    }
    tracing::debug!(
        remote_name = S::REMOTE_NAME,
        operation = expected.as_str(),
        id = object.id(),
        "Write applied"
    );
    Ok(true)
}

/// Builder for [`Session`] instances.
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    /// Create a builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the page cap for a single query statement.
    #[must_use]
    pub fn max_query_pages(mut self, max_pages: Option<usize>) -> Self {
        self.config = self.config.max_query_pages(max_pages);
        self
    }

    /// Set the number of objects sent per bulk request.
    #[must_use]
    pub fn bulk_batch_size(mut self, size: usize) -> Self {
        self.config = self.config.bulk_batch_size(size);
        self
    }

    /// Set the namespace prefixes for bulk payloads.
    #[must_use]
    pub fn namespaces(mut self, namespaces: XmlNamespaces) -> Self {
        self.config = self.config.namespaces(namespaces);
        self
    }

    /// Build the session with the provided connector.
    pub fn build_with<C: Connector>(self, connection: C) -> zobject_core::Result<Session<C>> {
        Session::with_config(connection, self.config)
    }
}
