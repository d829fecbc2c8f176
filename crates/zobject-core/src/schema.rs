//! Object schema declarations.
//!
//! The `ObjectSchema` trait is the contract between an object type and the
//! core: which attributes exist, how they map to remote field names, which
//! of them must stay out of default queries, and which remote fields the
//! platform refuses to select together with anything else.
//!
//! Schemas are normally declared once per remote type:
//!
//! ```ignore
//! struct Account;
//!
//! impl ObjectSchema for Account {
//!     const REMOTE_NAME: &'static str = "Account";
//!     const COMPLEX_ATTRIBUTES: &'static [ComplexAttribute] =
//!         &[ComplexAttribute::new("bill_to_contact", "bill_to_contact_cached")];
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
//! ```

use crate::error::ObjectErrors;
use crate::object::ZObject;
use crate::value::Value;
use crate::xml::XmlBuilder;

/// Remote field carrying the record identity.
pub const ID_FIELD: &str = "Id";

/// Metadata about one declared attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeInfo {
    /// Local (semantic) attribute name
    pub name: &'static str,
    /// Field name used by the remote service
    pub remote_name: &'static str,
}

impl AttributeInfo {
    /// Declare an attribute with its remote field name.
    pub const fn new(name: &'static str, remote_name: &'static str) -> Self {
        Self { name, remote_name }
    }
}

/// A complex (cacheable sub-object) attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComplexAttribute {
    /// Local attribute name
    pub name: &'static str,
    /// Name of the per-instance flag telling whether the sub-object is cached
    pub cache_flag: &'static str,
}

impl ComplexAttribute {
    /// Declare a complex attribute and its cache flag name.
    pub const fn new(name: &'static str, cache_flag: &'static str) -> Self {
        Self { name, cache_flag }
    }
}

/// Schema contract for one remote object type.
pub trait ObjectSchema: Sized + Send + Sync + 'static {
    /// Name of the remote collection (query source and payload type).
    const REMOTE_NAME: &'static str;

    /// Complex attributes, keyed by local name.
    const COMPLEX_ATTRIBUTES: &'static [ComplexAttribute] = &[];

    /// Attributes that can be written but never selected.
    const WRITE_ONLY_ATTRIBUTES: &'static [&'static str] = &[];

    /// Attributes excluded from default queries.
    const DEFERRED_ATTRIBUTES: &'static [&'static str] = &[];

    /// Remote field names that must each be queried in a statement of their own.
    const SELECTABLE_ONLY_ALONE: &'static [&'static str] = &[];

    /// Declared attributes, in declaration order. The identity is not listed.
    fn attributes() -> &'static [AttributeInfo];

    /// Defaults applied (and force-marked dirty) when a new object is built.
    fn default_attributes() -> Vec<(&'static str, Value)> {
        Vec::new()
    }

    /// Record validation failures for `object` into `errors`.
    fn validate(_object: &ZObject<Self>, _errors: &mut ObjectErrors) {}

    /// Render the body of one bulk-update element.
    ///
    /// Defaults to the id followed by every dirty attribute.
    fn write_bulk_update(object: &ZObject<Self>, xml: &mut XmlBuilder) {
        let object_ns = xml.namespaces().object_prefix;
        if let Some(id) = object.id() {
            xml.text_element(object_ns, ID_FIELD, id);
        }
        for (info, value) in object.changed_values() {
            xml.value_element(object_ns, info.remote_name, value);
        }
    }

    /// Look up an attribute by local name.
    fn attribute(name: &str) -> Option<&'static AttributeInfo> {
        Self::attributes().iter().find(|a| a.name == name)
    }

    /// Look up an attribute by remote field name.
    fn attribute_by_remote(remote_name: &str) -> Option<&'static AttributeInfo> {
        Self::attributes()
            .iter()
            .find(|a| a.remote_name == remote_name)
    }

    /// Check whether `name` is a complex, write-only, or deferred attribute.
    fn is_unselectable(name: &str) -> bool {
        Self::COMPLEX_ATTRIBUTES.iter().any(|c| c.name == name)
            || Self::WRITE_ONLY_ATTRIBUTES.contains(&name)
            || Self::DEFERRED_ATTRIBUTES.contains(&name)
    }

    /// Remote fields selected when the caller gives no field list.
    ///
    /// The identity comes first, followed by every selectable attribute in
    /// declaration order.
    fn default_query_fields() -> Vec<&'static str> {
        std::iter::once(ID_FIELD)
            .chain(
                Self::attributes()
                    .iter()
                    .filter(|a| !Self::is_unselectable(a.name))
                    .map(|a| a.remote_name),
            )
            .collect()
    }
}
