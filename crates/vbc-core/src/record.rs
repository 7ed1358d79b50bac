//! Ledger values and reserved instance keys.
//!
//! A ledger value is either empty (a bootstrap sentinel) or the JSON encoding
//! of the destination's create-record response:
//!
//! ```text
//! {"cid":"bafyrei...","uri":"at://did:plc:.../app.bsky.feed.post/3k..."}
//! ```
//!
//! Older stores wrote sentinels as a record with both fields empty; those
//! decode as [`LedgerEntry::Sentinel`] too.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Reserved instance-level key holding the registered application's client ID.
pub const APP_ID_KEY: &[u8] = b"`appId";

/// Reserved instance-level key holding the registered application's secret.
pub const APP_SECRET_KEY: &[u8] = b"`appSecret";

/// Descriptor of a post created on the destination platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedRecord {
    /// Content identifier of the created record.
    pub cid: String,
    /// URI of the created record.
    pub uri: String,
}

impl PublishedRecord {
    pub fn new(cid: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            cid: cid.into(),
            uri: uri.into(),
        }
    }

    fn is_blank(&self) -> bool {
        self.cid.is_empty() && self.uri.is_empty()
    }
}

/// What the ledger knows about one source post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEntry {
    /// Seen during bootstrap, intentionally never mirrored.
    Sentinel,
    /// Mirrored to the destination.
    Published(PublishedRecord),
}

impl LedgerEntry {
    /// Serialize for storage.
    pub fn to_value(&self) -> Result<Vec<u8>, CoreError> {
        match self {
            LedgerEntry::Sentinel => Ok(Vec::new()),
            LedgerEntry::Published(record) => {
                serde_json::to_vec(record).map_err(|e| CoreError::MalformedValue {
                    value: format!("{:?}", record),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Deserialize a stored value.
    pub fn from_value(value: &[u8]) -> Result<Self, CoreError> {
        if value.is_empty() {
            return Ok(LedgerEntry::Sentinel);
        }

        let record: PublishedRecord =
            serde_json::from_slice(value).map_err(|e| CoreError::MalformedValue {
                value: hex::encode(value),
                reason: e.to_string(),
            })?;

        if record.is_blank() {
            Ok(LedgerEntry::Sentinel)
        } else {
            Ok(LedgerEntry::Published(record))
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, LedgerEntry::Sentinel)
    }

    pub fn published(&self) -> Option<&PublishedRecord> {
        match self {
            LedgerEntry::Published(record) => Some(record),
            LedgerEntry::Sentinel => None,
        }
    }
}

/// Credentials of the application registered with the source instance.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_empty_value() {
        assert!(LedgerEntry::Sentinel.to_value().unwrap().is_empty());
        assert_eq!(LedgerEntry::from_value(&[]).unwrap(), LedgerEntry::Sentinel);
    }

    #[test]
    fn test_legacy_sentinel_decodes() {
        let legacy = br#"{ "cid": "", "uri": "" }"#;
        assert!(LedgerEntry::from_value(legacy).unwrap().is_sentinel());
    }

    #[test]
    fn test_published_record_value() {
        let entry = LedgerEntry::Published(PublishedRecord::new(
            "bafyreib2rxk3rybk",
            "at://did:plc:abc/app.bsky.feed.post/3kxyz",
        ));
        let value = entry.to_value().unwrap();
        assert_eq!(
            value,
            br#"{"cid":"bafyreib2rxk3rybk","uri":"at://did:plc:abc/app.bsky.feed.post/3kxyz"}"#
        );
        assert_eq!(LedgerEntry::from_value(&value).unwrap(), entry);
    }

    #[test]
    fn test_malformed_value() {
        let err = LedgerEntry::from_value(b"not json").unwrap_err();
        assert!(matches!(err, CoreError::MalformedValue { .. }));
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = AppCredentials {
            client_id: "id".into(),
            client_secret: "hunter2".into(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
