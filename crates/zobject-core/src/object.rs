//! Remote object instances.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use crate::Result;
use crate::error::{Error, ObjectErrors, SchemaError, SchemaErrorKind};
use crate::row::{FromValue, ID_COLUMN, Row};
use crate::schema::{AttributeInfo, ObjectSchema};
use crate::tracked::{AttributeTracker, Change};
use crate::value::Value;

/// Where an object is in its remote lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    /// Never persisted (no id)
    New,
    /// Has a remote id
    Persisted,
    /// Deleted remotely; terminal
    Destroyed,
}

/// One instance of a remote object type.
///
/// Holds the identity, tracked attributes, the error collection and the
/// cache of complex sub-objects. Persistence goes through a session; the
/// object itself never talks to the remote service.
pub struct ZObject<S: ObjectSchema> {
    id: Option<String>,
    tracker: AttributeTracker,
    errors: ObjectErrors,
    complex_cache: BTreeMap<&'static str, Value>,
    destroyed: bool,
    _schema: PhantomData<S>,
}

impl<S: ObjectSchema> ZObject<S> {
    /// Build a new object with the schema defaults applied.
    ///
    /// Defaults are force-marked dirty so they are sent on create.
    pub fn new() -> Self {
        let mut object = Self::blank();
        object.apply_default_attributes();
        object
    }

    /// Build a new object with defaults, then assign `attrs` over them.
    pub fn with_attributes<K, V>(attrs: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut object = Self::new();
        object.assign_attributes(attrs)?;
        Ok(object)
    }

    /// Materialize an object from a query row.
    ///
    /// The result starts clean: nothing is dirty after loading.
    pub fn from_row(row: &Row) -> Result<Self> {
        let mut object = Self::new();
        for (name, value) in row.iter() {
            if name == ID_COLUMN {
                object.id = id_from_value(value);
                continue;
            }
            if !object.tracker.set(name, value.clone()) {
                return Err(Error::unknown_attribute(S::REMOTE_NAME, name));
            }
        }
        object.tracker.clear_changed();
        Ok(object)
    }

    fn blank() -> Self {
        Self {
            id: None,
            tracker: AttributeTracker::new(S::attributes()),
            errors: ObjectErrors::new(),
            complex_cache: BTreeMap::new(),
            destroyed: false,
            _schema: PhantomData,
        }
    }

    fn apply_default_attributes(&mut self) {
        for (name, value) in S::default_attributes() {
            if !(self.tracker.mark_changed(name) && self.tracker.set(name, value)) {
                tracing::warn!(
                    remote_name = S::REMOTE_NAME,
                    attribute = name,
                    "Ignoring default for undeclared attribute"
                );
            }
        }
    }

    /// Assign several attributes through their setters.
    ///
    /// Names are checked first, so an unknown name leaves the object untouched.
    pub fn assign_attributes<K, V>(&mut self, attrs: impl IntoIterator<Item = (K, V)>) -> Result<()>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let attrs: Vec<(K, Value)> = attrs.into_iter().map(|(k, v)| (k, v.into())).collect();
        if let Some((name, _)) = attrs
            .iter()
            .find(|(k, _)| self.tracker.index_of(k.as_ref()).is_none())
        {
            return Err(Error::unknown_attribute(S::REMOTE_NAME, name.as_ref()));
        }
        for (name, value) in attrs {
            self.tracker.set(name.as_ref(), value);
        }
        Ok(())
    }

    /// Assign one attribute.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        if self.tracker.set(name, value.into()) {
            Ok(())
        } else {
            Err(Error::unknown_attribute(S::REMOTE_NAME, name))
        }
    }

    /// Current value of an attribute.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.tracker.get(name)
    }

    /// Current value of an attribute, converted.
    #[allow(clippy::result_large_err)]
    pub fn get_as<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self
            .get(name)
            .ok_or_else(|| Error::unknown_attribute(S::REMOTE_NAME, name))?;
        T::from_value(value)
    }

    /// Force an attribute dirty without changing it.
    pub fn mark_changed(&mut self, name: &str) -> Result<()> {
        if self.tracker.mark_changed(name) {
            Ok(())
        } else {
            Err(Error::unknown_attribute(S::REMOTE_NAME, name))
        }
    }

    /// The remote id, if persisted.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Record the identity reported by the remote service.
    ///
    /// Only write paths and reloads call this; it does not dirty anything.
    pub fn apply_remote_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Mark the object as deleted remotely.
    pub fn mark_destroyed(&mut self) {
        self.destroyed = true;
    }

    /// Lifecycle state.
    pub fn state(&self) -> ObjectState {
        if self.destroyed {
            ObjectState::Destroyed
        } else if self.id.is_some() {
            ObjectState::Persisted
        } else {
            ObjectState::New
        }
    }

    /// Has this object never been saved?
    pub fn is_new_record(&self) -> bool {
        self.id.is_none()
    }

    /// Has this object been saved?
    pub fn is_persisted(&self) -> bool {
        !self.is_new_record()
    }

    /// Has this object been deleted remotely?
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // Dirty tracking

    /// Names of dirty attributes.
    pub fn changed(&self) -> Vec<&'static str> {
        self.tracker.changed()
    }

    /// Dirty attributes mapped to their last-saved value.
    pub fn changed_attributes(&self) -> Vec<(&'static str, Value)> {
        self.tracker.changed_attributes()
    }

    /// Dirty attributes with last-saved and current values.
    pub fn changes(&self) -> Vec<Change> {
        self.tracker.changes()
    }

    /// Dirty attributes with their current value.
    pub fn changed_values(&self) -> impl Iterator<Item = (&'static AttributeInfo, &Value)> {
        self.tracker.changed_values()
    }

    /// Is `name` dirty?
    pub fn is_changed(&self, name: &str) -> bool {
        self.tracker.is_changed(name)
    }

    /// Is anything dirty?
    pub fn has_changes(&self) -> bool {
        self.tracker.has_changes()
    }

    /// Accept the current values as last-saved.
    pub fn clear_changed(&mut self) {
        self.tracker.clear_changed();
    }

    /// Discard local edits, restoring last-saved values.
    pub fn revert_changes(&mut self) {
        self.tracker.revert_changes();
    }

    /// Changes accepted by the most recent clear.
    pub fn previously_changed(&self) -> &[Change] {
        self.tracker.previously_changed()
    }

    /// Iterate over `(attribute, current value)` pairs in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = (&'static AttributeInfo, &Value)> {
        self.tracker.iter()
    }

    /// Attributes with a non-null value.
    pub fn present_attributes(&self) -> impl Iterator<Item = (&'static AttributeInfo, &Value)> {
        self.tracker.iter().filter(|(_, v)| !v.is_null())
    }

    /// Overwrite every attribute from a freshly fetched row and clear dirty state.
    ///
    /// Attributes missing from the row become null.
    pub fn overwrite_from_row(&mut self, row: &Row) {
        if let Some(id) = row.id().and_then(id_from_value) {
            self.id = Some(id);
        }
        for info in S::attributes() {
            let value = row.get_by_name(info.name).cloned().unwrap_or(Value::Null);
            self.tracker.set(info.name, value);
        }
        self.tracker.clear_changed();
    }

    /// Snapshot the identity and attributes as a row.
    pub fn to_row(&self) -> Row {
        let id = self.id.clone().map_or(Value::Null, Value::Text);
        Row::from_pairs(
            std::iter::once((ID_COLUMN.to_string(), id)).chain(
                self.tracker
                    .iter()
                    .map(|(info, value)| (info.name.to_string(), value.clone())),
            ),
        )
    }

    // Errors and validation

    /// Errors recorded by validation and failed writes.
    pub fn errors(&self) -> &ObjectErrors {
        &self.errors
    }

    /// Mutable access to the error collection.
    pub fn errors_mut(&mut self) -> &mut ObjectErrors {
        &mut self.errors
    }

    /// Run validation, replacing the error collection with its findings.
    pub fn is_valid(&mut self) -> bool {
        let mut errors = ObjectErrors::new();
        S::validate(self, &mut errors);
        self.errors = errors;
        self.errors.is_empty()
    }

    // Complex attribute cache

    /// The cached sub-object for a complex attribute, if loaded.
    pub fn complex_attribute(&self, name: &str) -> Option<&Value> {
        self.complex_cache.get(name)
    }

    /// Whether a complex attribute is currently cached.
    pub fn is_complex_cached(&self, name: &str) -> bool {
        self.complex_cache.contains_key(name)
    }

    /// Cache a loaded sub-object for a complex attribute.
    pub fn cache_complex_attribute(&mut self, name: &str, value: Value) -> Result<()> {
        let Some(complex) = S::COMPLEX_ATTRIBUTES.iter().find(|c| c.name == name) else {
            return Err(Error::Schema(SchemaError {
                kind: SchemaErrorKind::UnknownAttribute,
                message: format!(
                    "'{}' is not a complex attribute of {}",
                    name,
                    S::REMOTE_NAME
                ),
            }));
        };
        tracing::trace!(
            remote_name = S::REMOTE_NAME,
            attribute = complex.name,
            cache_flag = complex.cache_flag,
            "Caching complex attribute"
        );
        self.complex_cache.insert(complex.name, value);
        Ok(())
    }

    /// Return the cached sub-object, loading it with `load` on a miss.
    pub fn complex_attribute_or_load(
        &mut self,
        name: &str,
        load: impl FnOnce(&Self) -> Value,
    ) -> Result<&Value> {
        if !self.is_complex_cached(name) {
            let value = load(self);
            self.cache_complex_attribute(name, value)?;
        }
        self.complex_cache
            .get(name)
            .ok_or_else(|| Error::unknown_attribute(S::REMOTE_NAME, name))
    }

    /// Drop every cached sub-object so the next access reloads it.
    pub fn reset_complex_cache(&mut self) {
        if !self.complex_cache.is_empty() {
            tracing::trace!(
                remote_name = S::REMOTE_NAME,
                cached = self.complex_cache.len(),
                "Resetting complex attribute cache"
            );
        }
        self.complex_cache.clear();
    }
}

fn id_from_value(value: &Value) -> Option<String> {
    if value.is_null() {
        None
    } else {
        Some(value.to_literal())
    }
}

impl<S: ObjectSchema> Default for ZObject<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ObjectSchema> Clone for ZObject<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            tracker: self.tracker.clone(),
            errors: self.errors.clone(),
            complex_cache: self.complex_cache.clone(),
            destroyed: self.destroyed,
            _schema: PhantomData,
        }
    }
}

impl<S: ObjectSchema> fmt::Debug for ZObject<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZObject")
            .field("type", &S::REMOTE_NAME)
            .field("id", &self.id)
            .field("attributes", &self.tracker)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ComplexAttribute;

    struct Account;

    impl ObjectSchema for Account {
        const REMOTE_NAME: &'static str = "Account";
        const COMPLEX_ATTRIBUTES: &'static [ComplexAttribute] =
            &[ComplexAttribute::new("bill_to_contact", "bill_to_contact_cached")];

        fn attributes() -> &'static [AttributeInfo] {
            const ATTRS: &[AttributeInfo] = &[
                AttributeInfo::new("name", "Name"),
                AttributeInfo::new("auto_pay", "AutoPay"),
                AttributeInfo::new("bill_to_contact", "BillToContact"),
            ];
            ATTRS
        }

        fn default_attributes() -> Vec<(&'static str, Value)> {
            vec![("auto_pay", Value::Bool(false))]
        }

        fn validate(object: &ZObject<Self>, errors: &mut ObjectErrors) {
            if object.get("name").is_none_or(Value::is_null) {
                errors.add_required("name");
            }
        }
    }

    #[test]
    fn defaults_are_applied_and_dirty() {
        let account = ZObject::<Account>::new();
        assert_eq!(account.get("auto_pay"), Some(&Value::Bool(false)));
        assert!(account.is_changed("auto_pay"));
        assert!(account.is_new_record());
        assert_eq!(account.state(), ObjectState::New);
    }

    #[test]
    fn assignment_overrides_defaults() {
        let mut account = ZObject::<Account>::with_attributes([("name", "Test Name")]).unwrap();
        assert_eq!(account.get_as::<String>("name").unwrap(), "Test Name");

        account.set("auto_pay", true).unwrap();
        let changes = account.changes();
        let auto_pay = changes.iter().find(|c| c.name == "auto_pay").unwrap();
        assert_eq!(auto_pay.new, Value::Bool(true));
    }

    #[test]
    fn assign_attributes_on_existing_instance() {
        let mut account = ZObject::<Account>::with_attributes([("name", "Test Name")]).unwrap();
        account.assign_attributes([("name", "New Name")]).unwrap();
        assert_eq!(account.get("name"), Some(&Value::from("New Name")));
    }

    #[test]
    fn unknown_attribute_leaves_object_untouched() {
        let mut account = ZObject::<Account>::new();
        let err = account
            .assign_attributes([("name", Value::from("A")), ("bogus", Value::from("B"))])
            .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
        assert_eq!(account.get("name"), Some(&Value::Null));
    }

    #[test]
    fn rows_load_clean() {
        let row = Row::from_pairs([
            ("id", Value::from("2c92")),
            ("name", Value::from("Acme")),
            ("auto_pay", Value::Bool(true)),
        ]);
        let account = ZObject::<Account>::from_row(&row).unwrap();
        assert_eq!(account.id(), Some("2c92"));
        assert!(account.is_persisted());
        assert!(!account.has_changes());
        assert_eq!(account.get("auto_pay"), Some(&Value::Bool(true)));
    }

    #[test]
    fn rows_with_unknown_columns_are_rejected() {
        let row = Row::from_pairs([("id", "1"), ("nope", "x")]);
        assert!(ZObject::<Account>::from_row(&row).is_err());
    }

    #[test]
    fn validation_replaces_errors() {
        let mut account = ZObject::<Account>::new();
        assert!(!account.is_valid());
        assert_eq!(account.errors().full_messages(), vec!["name can't be blank"]);

        account.set("name", "Acme").unwrap();
        assert!(account.is_valid());
        assert!(account.errors().is_empty());
    }

    #[test]
    fn complex_cache_round_trip() {
        let mut account = ZObject::<Account>::new();
        assert!(!account.is_complex_cached("bill_to_contact"));

        let loaded = account
            .complex_attribute_or_load("bill_to_contact", |_| {
                Value::Json(serde_json::json!({"first_name": "Ada"}))
            })
            .unwrap()
            .clone();
        assert!(matches!(loaded, Value::Json(_)));
        assert!(account.is_complex_cached("bill_to_contact"));

        account.reset_complex_cache();
        assert!(account.complex_attribute("bill_to_contact").is_none());
        assert!(account.cache_complex_attribute("name", Value::Null).is_err());
    }

    #[test]
    fn overwrite_from_row_discards_edits() {
        let mut account = ZObject::<Account>::with_attributes([("name", "Local")]).unwrap();
        account.apply_remote_id("9");
        let fetched = Row::from_pairs([("id", Value::from("9")), ("name", Value::from("Remote"))]);

        account.overwrite_from_row(&fetched);
        assert_eq!(account.get("name"), Some(&Value::from("Remote")));
        assert_eq!(account.get("auto_pay"), Some(&Value::Null));
        assert!(!account.has_changes());
    }

    #[test]
    fn to_row_includes_identity() {
        let mut account = ZObject::<Account>::with_attributes([("name", "Acme")]).unwrap();
        account.apply_remote_id("7");
        let row = account.to_row();
        assert_eq!(row.id(), Some(&Value::from("7")));
        assert_eq!(row.get_by_name("name"), Some(&Value::from("Acme")));
    }
}
