//! Key Space Module
//!
//! Maps caller keys into this application's namespace and back.

use crate::cache::NAMESPACE_SEPARATOR;
use crate::error::{CacheError, Result};

// == Key Space ==
/// An application-owned slice of a shared store.
///
/// Every key the façade touches lives under `{namespace}:`, so store-wide
/// enumeration and flushes cannot reach data owned by other applications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    /// Namespace with its trailing separator, e.g. `magazine:`
    root: String,
}

impl KeySpace {
    /// Creates a key space for `namespace`, which must be non-empty.
    pub fn new(namespace: &str) -> Result<Self> {
        let namespace = namespace.trim().trim_end_matches(NAMESPACE_SEPARATOR);
        if namespace.is_empty() {
            return Err(CacheError::InvalidInput(
                "cache namespace must not be empty".to_string(),
            ));
        }
        Ok(Self {
            root: format!("{namespace}{NAMESPACE_SEPARATOR}"),
        })
    }

    /// The namespace without its separator.
    pub fn namespace(&self) -> &str {
        &self.root[..self.root.len() - NAMESPACE_SEPARATOR.len_utf8()]
    }

    /// Full store key for a caller key.
    pub fn qualify(&self, key: &str) -> String {
        format!("{}{}", self.root, key)
    }

    /// Caller key for a full store key, None if it lies outside the namespace.
    pub fn strip<'a>(&self, full_key: &'a str) -> Option<&'a str> {
        full_key.strip_prefix(self.root.as_str())
    }

    /// Full store prefix selecting every caller key that starts with `prefix`.
    pub fn prefix(&self, prefix: &str) -> String {
        self.qualify(prefix)
    }
}
