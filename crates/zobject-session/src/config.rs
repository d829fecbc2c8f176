//! Session configuration.
//!
//! Settings that the remote platform imposes or that bound how much work a
//! single call may do. Everything here is owned by one session; there is no
//! process-wide state.

use zobject_core::{ConfigError, Error, Result, XmlNamespaces};
use zobject_query::DEFAULT_MAX_QUERY_PAGES;

/// Largest number of objects the platform accepts in one bulk call.
pub const DEFAULT_BULK_BATCH_SIZE: usize = 50;

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Page cap for a single query statement (`None` for unbounded)
    pub max_query_pages: Option<usize>,
    /// Objects per bulk request when chunking (default: 50)
    pub bulk_batch_size: usize,
    /// Prefixes used in bulk payload markup
    pub namespaces: XmlNamespaces,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_query_pages: Some(DEFAULT_MAX_QUERY_PAGES),
            bulk_batch_size: DEFAULT_BULK_BATCH_SIZE,
            namespaces: XmlNamespaces::default(),
        }
    }
}

impl SessionConfig {
    /// Create a configuration with platform defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page cap for a single query statement.
    pub fn max_query_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_query_pages = max_pages;
        self
    }

    /// Set the number of objects sent per bulk request.
    pub fn bulk_batch_size(mut self, size: usize) -> Self {
        self.bulk_batch_size = size;
        self
    }

    /// Set the namespace prefixes for bulk payloads.
    pub fn namespaces(mut self, namespaces: XmlNamespaces) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Check the configuration for values that would make every call fail.
    pub fn validate(&self) -> Result<()> {
        if self.bulk_batch_size == 0 {
            return Err(Error::Config(ConfigError {
                message: "bulk_batch_size must be at least 1".to_string(),
            }));
        }
        if self.max_query_pages == Some(0) {
            return Err(Error::Config(ConfigError {
                message: "max_query_pages must be at least 1 when set".to_string(),
            }));
        }
        for prefix in [
            self.namespaces.api_prefix,
            self.namespaces.object_prefix,
            self.namespaces.xsi_prefix,
        ] {
            if prefix.is_empty() {
                return Err(Error::Config(ConfigError {
                    message: "namespace prefixes must not be empty".to_string(),
                }));
            }
        }
        Ok(())
    }
}
