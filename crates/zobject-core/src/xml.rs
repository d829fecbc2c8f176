//! Minimal XML markup writer for bulk payloads.
//!
//! Only what bulk create/update needs: namespaced elements, attributes and
//! escaped text. The connector wraps the output in its own envelope.

use crate::value::Value;

/// Namespace prefixes used when rendering bulk payloads.
///
/// Prefixes must match the ones the connector binds in its envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlNamespaces {
    /// Prefix bound to the API namespace (wraps each object)
    pub api_prefix: &'static str,
    /// Prefix bound to the object namespace (field elements, `xsi:type`)
    pub object_prefix: &'static str,
    /// Prefix bound to the XML Schema instance namespace
    pub xsi_prefix: &'static str,
}

impl Default for XmlNamespaces {
    fn default() -> Self {
        Self {
            api_prefix: "ins0",
            object_prefix: "ins1",
            xsi_prefix: "xsi",
        }
    }
}

/// Append-only XML writer.
#[derive(Debug, Clone)]
pub struct XmlBuilder {
    namespaces: XmlNamespaces,
    buf: String,
}

impl XmlBuilder {
    /// Create an empty builder.
    pub fn new(namespaces: XmlNamespaces) -> Self {
        Self {
            namespaces,
            buf: String::new(),
        }
    }

    /// Namespace prefixes this builder renders with.
    pub fn namespaces(&self) -> XmlNamespaces {
        self.namespaces
    }

    /// Write an element whose children are produced by `body`.
    pub fn element(
        &mut self,
        prefix: &str,
        name: &str,
        attrs: &[(&str, &str)],
        body: impl FnOnce(&mut Self),
    ) -> &mut Self {
        self.open_tag(prefix, name, attrs);
        body(self);
        self.close_tag(prefix, name);
        self
    }

    /// Write an element containing escaped text.
    pub fn text_element(&mut self, prefix: &str, name: &str, text: &str) -> &mut Self {
        self.open_tag(prefix, name, &[]);
        escape_into(&mut self.buf, text);
        self.close_tag(prefix, name);
        self
    }

    /// Write an element holding a value; null values are skipped.
    pub fn value_element(&mut self, prefix: &str, name: &str, value: &Value) -> &mut Self {
        if value.is_null() {
            return self;
        }
        let text = value.to_wire_text();
        self.text_element(prefix, name, &text)
    }

    /// Check if nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrow the markup written so far.
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Consume the builder, returning the markup.
    pub fn finish(self) -> String {
        self.buf
    }

    fn open_tag(&mut self, prefix: &str, name: &str, attrs: &[(&str, &str)]) {
        self.buf.push('<');
        push_qualified(&mut self.buf, prefix, name);
        for (key, value) in attrs {
            self.buf.push(' ');
            self.buf.push_str(key);
            self.buf.push_str("=\"");
            escape_into(&mut self.buf, value);
            self.buf.push('"');
        }
        self.buf.push('>');
    }

    fn close_tag(&mut self, prefix: &str, name: &str) {
        self.buf.push_str("</");
        push_qualified(&mut self.buf, prefix, name);
        self.buf.push('>');
    }
}

fn push_qualified(buf: &mut String, prefix: &str, name: &str) {
    if !prefix.is_empty() {
        buf.push_str(prefix);
        buf.push(':');
    }
    buf.push_str(name);
}

/// Escape text for use in element content or a double-quoted attribute.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(&mut out, text);
    out
}

fn escape_into(buf: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '"' => buf.push_str("&quot;"),
            '\'' => buf.push_str("&apos;"),
            c => buf.push(c),
        }
    }
}
