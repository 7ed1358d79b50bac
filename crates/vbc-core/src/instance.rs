//! Source instance canonicalization.
//!
//! The instance URL is the top-level ledger namespace, so two spellings of the
//! same server must map to the same key. Canonical form:
//!
//! - Scheme forced to `https`
//! - Path reset to `/`
//! - Query, fragment and user info dropped
//! - Host lowercased, default port removed
//!
//! Opaque URLs (`mailto:`-style, no authority) are rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::error::CoreError;

/// A canonicalized source instance URL, e.g. `https://mastodon.social/`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceName(String);

impl InstanceName {
    /// Canonicalize a user-supplied instance URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use vbc_core::InstanceName;
    ///
    /// let name = InstanceName::canonicalize("http://Tiggi.es/@mbr?x=1#top").unwrap();
    /// assert_eq!(name.as_str(), "https://tiggi.es/");
    /// ```
    pub fn canonicalize(input: &str) -> Result<Self, CoreError> {
        let trimmed = input.trim();
        let parsed = Url::parse(trimmed).map_err(|e| CoreError::InvalidInstance {
            input: trimmed.to_string(),
            reason: e.to_string(),
        })?;

        if parsed.cannot_be_a_base() {
            return Err(CoreError::OpaqueInstance(trimmed.to_string()));
        }

        let host = parsed.host_str().ok_or_else(|| CoreError::InvalidInstance {
            input: trimmed.to_string(),
            reason: "missing host".to_string(),
        })?;

        let mut rebuilt = format!("https://{}", host);
        if let Some(port) = parsed.port() {
            rebuilt.push_str(&format!(":{}", port));
        }
        rebuilt.push('/');

        // Re-parse so the host and default port are normalized by the URL
        // parser rather than by hand.
        let canonical = Url::parse(&rebuilt).map_err(|e| CoreError::InvalidInstance {
            input: trimmed.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self(canonical.to_string()))
    }

    /// The canonical URL string, always ending in `/`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join an API path onto the instance base URL.
    ///
    /// `path` must not start with `/`.
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}

impl fmt::Debug for InstanceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceName({})", self.0)
    }
}

impl fmt::Display for InstanceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for InstanceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for InstanceName {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::canonicalize(&value)
    }
}

impl From<InstanceName> for String {
    fn from(name: InstanceName) -> Self {
        name.0
    }
}
