//! Strong type definitions for source and destination identities.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, VarintError};
use crate::instance::InstanceName;
use crate::varint::{decode_varint, encode_varint};

/// A numeric account identifier, unique within one source instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub i64);

/// A numeric post identifier, monotonically increasing within one source
/// instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostId(pub i64);

macro_rules! varint_id {
    ($name:ident) => {
        impl $name {
            /// Encode as a ledger key.
            pub fn to_key(self) -> Vec<u8> {
                encode_varint(self.0)
            }

            /// Decode from a ledger key.
            pub fn from_key(key: &[u8]) -> Result<Self, VarintError> {
                decode_varint(key).map(|(value, _)| Self(value))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            // Mastodon serializes snowflake IDs as JSON strings.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .map(Self)
                    .map_err(|_| CoreError::InvalidId(s.to_string()))
            }
        }
    };
}

varint_id!(AccountId);
varint_id!(PostId);

/// The mirrored account on the source instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Display-only handle, without the leading `@`.
    pub handle: String,
}

/// A single post authored by the mirrored account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub created_at: DateTime<Utc>,
    /// Raw (HTML) content as served by the source instance.
    pub content: String,
    /// Public URL of the post, if the instance reported one.
    pub url: Option<String>,
    pub in_reply_to: Option<PostId>,
    pub attachment_count: usize,
}

impl Post {
    pub fn is_reply(&self) -> bool {
        self.in_reply_to.is_some()
    }

    pub fn has_attachments(&self) -> bool {
        self.attachment_count > 0
    }

    /// URL for log lines, falling back to the bare ID.
    pub fn display_url(&self) -> String {
        self.url.clone().unwrap_or_else(|| format!("post {}", self.id))
    }
}

/// The operator's identity on the destination platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationProfile {
    /// Repository identifier that created records are written under.
    pub did: String,
    pub handle: String,
}

/// Scope of every ledger operation: one account on one instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountNamespace {
    pub instance: InstanceName,
    pub account: AccountId,
}

impl AccountNamespace {
    pub fn new(instance: InstanceName, account: AccountId) -> Self {
        Self { instance, account }
    }

    /// The nested namespace key for the account.
    pub fn account_key(&self) -> Vec<u8> {
        self.account.to_key()
    }
}

impl fmt::Display for AccountNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.instance, self.account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(in_reply_to: Option<i64>, attachments: usize) -> Post {
        Post {
            id: PostId(1),
            created_at: Utc::now(),
            content: "<p>hi</p>".to_string(),
            url: None,
            in_reply_to: in_reply_to.map(PostId),
            attachment_count: attachments,
        }
    }

    #[test]
    fn test_post_id_key_roundtrip() {
        let id = PostId(112_233_445_566_778_899);
        assert_eq!(PostId::from_key(&id.to_key()).unwrap(), id);
    }

    #[test]
    fn test_post_id_from_empty_key() {
        assert_eq!(PostId::from_key(&[]), Err(VarintError::BufferTooSmall));
    }

    #[test]
    fn test_id_parse_from_string() {
        assert_eq!("109876543210".parse::<AccountId>().unwrap(), AccountId(109876543210));
        assert!("abc".parse::<PostId>().is_err());
    }

    #[test]
    fn test_post_flags() {
        assert!(!post(None, 0).is_reply());
        assert!(post(Some(7), 0).is_reply());
        assert!(post(None, 2).has_attachments());
    }

    #[test]
    fn test_display_url_fallback() {
        assert_eq!(post(None, 0).display_url(), "post 1");
    }

    #[test]
    fn test_namespace_display() {
        let ns = AccountNamespace::new(
            InstanceName::canonicalize("https://tiggi.es").unwrap(),
            AccountId(42),
        );
        assert_eq!(ns.to_string(), "https://tiggi.es/#42");
        assert_eq!(ns.account_key(), vec![84]);
    }
}
